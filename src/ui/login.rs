use std::rc::Rc;

use adw::prelude::*;
use adw::Application;
use gtk4 as gtk;
use log::{info, warn};

use crate::api::client::ApiClient;
use crate::app::AppState;

pub fn show_login_window(app: &Application) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("FlexPBX Login")
        .default_width(420)
        .default_height(300)
        .resizable(false)
        .build();

    let toast_overlay = adw::ToastOverlay::new();
    let saved = AppState::load();

    let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
    root.set_margin_top(24);
    root.set_margin_bottom(24);
    root.set_margin_start(24);
    root.set_margin_end(24);

    let title = gtk::Label::new(Some("Sign in to FlexPBX"));
    title.add_css_class("title-2");
    title.set_halign(gtk::Align::Start);
    root.append(&title);

    let server_entry = gtk::Entry::new();
    server_entry.set_placeholder_text(Some("Server URL (e.g. https://pbx.example.com)"));
    server_entry.set_text(&saved.base_url);
    server_entry.set_hexpand(true);

    let user_entry = gtk::Entry::new();
    user_entry.set_placeholder_text(Some("Admin username"));
    user_entry.set_text(&saved.username);
    user_entry.set_hexpand(true);

    let pass_entry = gtk::PasswordEntry::new();
    pass_entry.set_placeholder_text(Some("Password"));
    pass_entry.set_show_peek_icon(true);
    pass_entry.set_hexpand(true);

    let form = gtk::Box::new(gtk::Orientation::Vertical, 8);
    form.append(&server_entry);
    form.append(&user_entry);
    form.append(&pass_entry);
    root.append(&form);

    let status = gtk::Label::new(None);
    status.add_css_class("dim-label");
    status.set_halign(gtk::Align::Start);
    root.append(&status);

    let login_btn = gtk::Button::with_label("Sign in");
    login_btn.add_css_class("suggested-action");
    login_btn.set_halign(gtk::Align::End);
    root.append(&login_btn);

    toast_overlay.set_child(Some(&root));
    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let header_title = gtk::Label::new(Some("FlexPBX Console"));
    header.set_title_widget(Some(&header_title));
    container.append(&header);
    container.append(&toast_overlay);
    window.set_content(Some(&container));

    let on_connect = {
        let app = app.clone();
        let window = window.clone();
        let overlay = toast_overlay.clone();
        let server_entry = server_entry.clone();
        let user_entry = user_entry.clone();
        let pass_entry = pass_entry.clone();
        let login_btn = login_btn.clone();
        move || {
            let url = crate::utils::normalize_url(&server_entry.text());
            let username = user_entry.text().trim().to_string();
            let password = pass_entry.text().to_string();
            if url.is_empty() || username.is_empty() || password.is_empty() {
                overlay.add_toast(adw::Toast::new("Please enter server URL, username and password."));
                return;
            }

            let mut state = AppState::load();
            state.base_url = url;
            let mut client = match ApiClient::from_state(&state) {
                Ok(client) => client,
                Err(e) => {
                    overlay.add_toast(adw::Toast::new(&e.to_string()));
                    return;
                }
            };

            status.set_label("Signing in…");
            login_btn.set_sensitive(false);

            let creds = (username.clone(), password.clone());
            let app = app.clone();
            let window = window.clone();
            let overlay = overlay.clone();
            let status = status.clone();
            let login_btn = login_btn.clone();
            crate::utils::run_async_to_main(
                async move { client.login(&creds.0, &creds.1).await },
                move |res| {
                    login_btn.set_sensitive(true);
                    match res {
                        Ok(token) => {
                            info!("signed in to {} as {username}", state.base_url);
                            state.username = username;
                            state.password = password;
                            state.remember_token(token);
                            if let Err(e) = state.save() {
                                overlay.add_toast(adw::Toast::new(&format!("Failed to save settings: {e}")));
                            }
                            crate::ui::main_window::show_main_window(&app);
                            window.close();
                        }
                        Err(e) => {
                            warn!("sign-in failed: {e}");
                            status.set_label("Sign-in failed");
                            overlay.add_toast(adw::Toast::new(&e.to_string()));
                        }
                    }
                },
            );
        }
    };

    let on_connect: Rc<dyn Fn()> = Rc::new(on_connect);
    {
        let on_connect = on_connect.clone();
        login_btn.connect_clicked(move |_| (on_connect)());
    }
    {
        let on_connect = on_connect.clone();
        server_entry.connect_activate(move |_| (on_connect)());
    }
    {
        let on_connect = on_connect.clone();
        user_entry.connect_activate(move |_| (on_connect)());
    }
    {
        let on_connect = on_connect.clone();
        pass_entry.connect_activate(move |_| (on_connect)());
    }

    window.present();
}
