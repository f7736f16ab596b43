use std::cell::Cell;
use std::rc::Rc;

use adw::prelude::*;
use adw::Application;
use gtk4 as gtk;
use log::{info, warn};

use crate::api::client::{ApiClient, ModuleAction};
use crate::api::models::{
    Announcement, AnnouncementAnalytics, CallQueue, Extension, GoogleVoiceConfig, HelpArticle, Mailbox,
    MattermostConfig, Module, TwilioConfig, VoicemailSettings,
};
use crate::api::resources::VOICEMAIL_SETTINGS_FIELDS;
use crate::app::AppState;
use crate::form::FormDraft;
use crate::ui::form_dialog;
use crate::ui::integration_view::{IntegrationPanel, MaintenancePanel};
use crate::ui::resource_view::ResourceView;
use crate::ui::sidebar::Sidebar;
use crate::ui::wallboard_view::WallboardView;
use crate::ui::{parent_window, toast, Page};
use crate::utils::run_async_to_main;

const STYLE: &str = "
.status-online { color: #2ec27e; }
.status-busy { color: #e01b24; }
.status-away { color: #f5c211; }
.status-offline { color: #9a9996; }
.status-unknown { color: #c0bfbc; }
";

fn install_css() {
    let provider = gtk::CssProvider::new();
    provider.load_from_data(STYLE);
    if let Some(display) = gtk::gdk::Display::default() {
        gtk::style_context_add_provider_for_display(&display, &provider, gtk::STYLE_PROVIDER_PRIORITY_APPLICATION);
    }
}

pub fn show_main_window(app: &Application) {
    let state = AppState::load();
    let client = match ApiClient::from_state(&state) {
        Ok(client) => client,
        Err(e) => {
            warn!("invalid saved server settings: {e}");
            crate::ui::login::show_login_window(app);
            return;
        }
    };

    // Saved password but no token: the PHP session is gone, sign in again.
    if state.token.is_none() && !state.password.is_empty() {
        let app = app.clone();
        let mut client = client;
        let (username, password) = (state.username.clone(), state.password.clone());
        run_async_to_main(
            async move {
                let res = client.login(&username, &password).await;
                (client, res)
            },
            move |(client, res)| match res {
                Ok(token) => {
                    let mut state = state;
                    state.remember_token(token);
                    if let Err(e) = state.save() {
                        warn!("failed to save session token: {e}");
                    }
                    open(&app, &state, client)
                }
                Err(e) => {
                    warn!("automatic sign-in failed: {e}");
                    crate::ui::login::show_login_window(&app);
                }
            },
        );
        return;
    }
    open(app, &state, client);
}

fn open(app: &Application, state: &AppState, client: ApiClient) {
    install_css();

    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("FlexPBX Console")
        .default_width(1180)
        .default_height(760)
        .build();

    let overlay = adw::ToastOverlay::new();

    let split = adw::Flap::builder()
        .reveal_flap(true)
        .locked(true)
        .modal(false)
        .build();

    let sidebar = Rc::new(Sidebar::new());
    split.set_flap(Some(&sidebar.widget()));

    let stack = gtk::Stack::new();
    stack.set_transition_type(gtk::StackTransitionType::Crossfade);
    stack.set_hexpand(true);
    split.set_content(Some(&stack));
    overlay.set_child(Some(&split));

    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title = gtk::Label::new(Some(&state.base_url));
    title.add_css_class("dim-label");
    header.set_title_widget(Some(&title));
    let sign_out_btn = gtk::Button::with_label("Sign out");
    header.pack_end(&sign_out_btn);
    container.append(&header);
    container.append(&overlay);
    window.set_content(Some(&container));

    let pages = build_pages(&client, &overlay, state);
    let nav: Vec<(&str, &str)> = pages.iter().map(|(section, title, _)| (*section, *title)).collect();
    sidebar.set_pages(&nav);
    for (index, (_, title, page)) in pages.iter().enumerate() {
        stack.add_titled(&page.widget(), Some(&index.to_string()), title);
    }

    let pages: Rc<Vec<Rc<dyn Page>>> = Rc::new(pages.into_iter().map(|(_, _, page)| page).collect());
    let current: Rc<Cell<Option<usize>>> = Rc::new(Cell::new(None));
    {
        let pages = pages.clone();
        let stack = stack.clone();
        sidebar.connect_selected(move |index| {
            if current.get() == Some(index) {
                return;
            }
            if let Some(previous) = current.get().and_then(|i| pages.get(i)) {
                previous.deactivate();
            }
            if let Some(page) = pages.get(index) {
                stack.set_visible_child_name(&index.to_string());
                page.activate();
                current.set(Some(index));
            }
        });
    }

    {
        let app = app.clone();
        let window = window.clone();
        let pages = pages.clone();
        sign_out_btn.connect_clicked(move |_| {
            for page in pages.iter() {
                page.deactivate();
            }
            let mut state = AppState::load();
            state.password.clear();
            state.token = None;
            if let Err(e) = state.save() {
                warn!("failed to clear saved credentials: {e}");
            }
            info!("signed out");
            crate::ui::login::show_login_window(&app);
            window.close();
        });
    }
    {
        let pages = pages.clone();
        window.connect_close_request(move |_| {
            for page in pages.iter() {
                page.deactivate();
            }
            glib::Propagation::Proceed
        });
    }

    window.present();
    sidebar.select(0);

    // Reachability check; pages still report their own errors.
    let overlay2 = overlay.clone();
    let ping_client = client.clone();
    run_async_to_main(async move { ping_client.ping().await }, move |res| {
        if let Err(e) = res {
            toast(&overlay2, &format!("Server unreachable: {e}"));
        }
    });
}

type PageEntry = (&'static str, &'static str, Rc<dyn Page>);

fn build_pages(client: &ApiClient, overlay: &adw::ToastOverlay, state: &AppState) -> Vec<PageEntry> {
    let extensions = ResourceView::<Extension>::new(client.clone(), overlay.clone());
    wire_extensions(&extensions, state);

    let queues = ResourceView::<CallQueue>::new(client.clone(), overlay.clone());
    {
        let weak = Rc::downgrade(&queues);
        queues.connect_page_action("Apply Configuration", move || {
            let Some(view) = weak.upgrade() else { return };
            let client = view.client().clone();
            view.write("Queue configuration applied.".into(), async move { client.apply_queue_config().await }, None);
        });
    }

    let wallboard = WallboardView::new(client.clone(), overlay.clone(), state.wallboard_poll_interval());

    let mailboxes = ResourceView::<Mailbox>::new(client.clone(), overlay.clone());
    wire_voicemail(&mailboxes);

    let announcements = ResourceView::<Announcement>::new(client.clone(), overlay.clone());
    {
        let weak = Rc::downgrade(&announcements);
        announcements.connect_page_action("Analytics", move || {
            if let Some(view) = weak.upgrade() {
                show_analytics(&view);
            }
        });
    }

    let articles = ResourceView::<HelpArticle>::new(client.clone(), overlay.clone());

    let modules = ResourceView::<Module>::new(client.clone(), overlay.clone());
    for action in [ModuleAction::Install, ModuleAction::Enable, ModuleAction::Disable] {
        let weak = Rc::downgrade(&modules);
        let label = match action {
            ModuleAction::Install => "Install",
            ModuleAction::Enable => "Enable",
            ModuleAction::Disable => "Disable",
        };
        modules.add_row_action(label, move |key| {
            let Some(view) = weak.upgrade() else { return };
            let client = view.client().clone();
            let key = key.to_string();
            let done = format!("{label}: {key} done.");
            view.write(done, async move { client.module_action(&key, action).await }, None);
        });
    }

    let maintenance = MaintenancePanel::new(client.clone(), overlay.clone());
    let twilio = IntegrationPanel::<TwilioConfig>::new(client.clone(), overlay.clone()).with_sms();
    let mattermost = IntegrationPanel::<MattermostConfig>::new(client.clone(), overlay.clone());
    let google_voice = IntegrationPanel::<GoogleVoiceConfig>::new(client.clone(), overlay.clone());

    vec![
        ("Telephony", "Extensions", extensions as Rc<dyn Page>),
        ("Telephony", "Manage Queues", queues as Rc<dyn Page>),
        ("Telephony", "Queue Wallboard", wallboard as Rc<dyn Page>),
        ("Telephony", "Voicemail", mailboxes as Rc<dyn Page>),
        ("Content", "Announcements", announcements as Rc<dyn Page>),
        ("Content", "Help Articles", articles as Rc<dyn Page>),
        ("System", "Modules", modules as Rc<dyn Page>),
        ("System", "Maintenance", maintenance as Rc<dyn Page>),
        ("Integrations", "Twilio", twilio as Rc<dyn Page>),
        ("Integrations", "Mattermost", mattermost as Rc<dyn Page>),
        ("Integrations", "Google Voice", google_voice as Rc<dyn Page>),
    ]
}

fn wire_extensions(view: &Rc<ResourceView<Extension>>, state: &AppState) {
    let interval = state.status_poll_interval();
    {
        let weak = Rc::downgrade(view);
        view.connect_activated(move || {
            if let Some(view) = weak.upgrade() {
                view.start_status_poller(interval);
            }
        });
    }

    let weak = Rc::downgrade(view);
    view.connect_page_action("Migrate Users", move || {
        let Some(view) = weak.upgrade() else { return };
        let ids = view.checked_ids();
        if ids.is_empty() {
            view.toast("Select at least one extension first.");
            return;
        }
        let Some(parent) = parent_window(&view.widget()) else { return };
        let heading = format!("Migrate {} user(s)", ids.len());
        let weak = Rc::downgrade(&view);
        form_dialog::prompt(&parent, &heading, "Target department", "Migrate", true, move |department| {
            let Some(view) = weak.upgrade() else { return };
            let client = view.client().clone();
            let ids = ids.clone();
            let done = format!("{} user(s) moved to {department}.", ids.len());
            view.write(done, async move { client.migrate_users(&ids, &department).await }, None);
        });
    });
}

fn wire_voicemail(view: &Rc<ResourceView<Mailbox>>) {
    let weak = Rc::downgrade(view);
    view.connect_page_action("Global Settings", move || {
        let Some(view) = weak.upgrade() else { return };
        let client = view.client().clone();
        let weak = Rc::downgrade(&view);
        run_async_to_main(async move { client.voicemail_settings().await }, move |res| {
            let Some(view) = weak.upgrade() else { return };
            let draft = res.and_then(|settings| FormDraft::settings(VOICEMAIL_SETTINGS_FIELDS, &settings));
            let draft = match draft {
                Ok(draft) => draft,
                Err(e) => return view.toast(&e.to_string()),
            };
            let Some(parent) = parent_window(&view.widget()) else { return };
            let client = view.client().clone();
            let overlay_view = Rc::downgrade(&view);
            form_dialog::present(&parent, "Voicemail settings", draft, move |draft, done| {
                let settings = match draft.to_typed::<VoicemailSettings>() {
                    Ok(settings) => settings,
                    Err(e) => return done(Err(e)),
                };
                let client = client.clone();
                let weak = overlay_view.clone();
                run_async_to_main(async move { client.save_voicemail_settings(&settings).await }, move |res| {
                    let message = res.as_ref().ok().and_then(|env| env.message().map(str::to_string));
                    if let (Ok(_), Some(view)) = (&res, weak.upgrade()) {
                        view.toast(message.as_deref().unwrap_or("Voicemail settings saved."));
                    }
                    done(res.map(|_| message));
                });
            });
        });
    });
}

fn show_analytics(view: &Rc<ResourceView<Announcement>>) {
    let client = view.client().clone();
    let weak = Rc::downgrade(view);
    run_async_to_main(async move { client.announcement_analytics().await }, move |res| {
        let Some(view) = weak.upgrade() else { return };
        match res {
            Ok(analytics) => match parent_window(&view.widget()) {
                Some(parent) => present_analytics(&parent, &analytics),
                None => view.toast(&format!("{} views, {} dismissals", analytics.total_views, analytics.total_dismissals)),
            },
            Err(e) => view.toast(&e.to_string()),
        }
    });
}

fn present_analytics(parent: &gtk::Window, analytics: &AnnouncementAnalytics) {
    let dialog = gtk::Dialog::builder()
        .title("Announcement analytics")
        .transient_for(parent)
        .modal(true)
        .default_width(420)
        .build();
    let content = gtk::Box::new(gtk::Orientation::Vertical, 8);
    content.set_margin_top(12);
    content.set_margin_bottom(12);
    content.set_margin_start(12);
    content.set_margin_end(12);

    let totals = gtk::Label::new(Some(&format!(
        "{} views, {} dismissals",
        analytics.total_views, analytics.total_dismissals
    )));
    totals.add_css_class("heading");
    totals.set_halign(gtk::Align::Start);
    content.append(&totals);

    for stat in &analytics.per_announcement {
        let line = gtk::Label::new(Some(&format!("{}: {} views, {} dismissed", stat.title, stat.views, stat.dismissals)));
        line.set_halign(gtk::Align::Start);
        content.append(&line);
    }

    dialog.content_area().append(&content);
    let _ = dialog.add_button("Close", gtk::ResponseType::Close);
    dialog.connect_response(|dlg, _| dlg.close());
    dialog.present();
}
