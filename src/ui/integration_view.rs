use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gtk4 as gtk;
use gtk4::prelude::*;

use crate::api::client::ApiClient;
use crate::api::models::TwilioConfig;
use crate::error::Result;
use crate::form::FormDraft;
use crate::integrations::{self, IntegrationConfig, SmsRequest};
use crate::ui::form_dialog::FormGrid;
use crate::ui::{toast, Page};
use crate::utils::run_async_to_main;

fn page_box(title: &str) -> gtk::Box {
    let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
    root.set_margin_top(12);
    root.set_margin_bottom(12);
    root.set_margin_start(12);
    root.set_margin_end(12);
    let label = gtk::Label::new(Some(title));
    label.add_css_class("title-2");
    label.set_halign(gtk::Align::Start);
    root.append(&label);
    root
}

fn result_label() -> gtk::Label {
    let label = gtk::Label::new(None);
    label.set_wrap(true);
    label.set_halign(gtk::Align::Start);
    label.set_visible(false);
    label
}

fn show_result(label: &gtk::Label, ok: bool, message: &str) {
    label.remove_css_class(if ok { "error" } else { "success" });
    label.add_css_class(if ok { "success" } else { "error" });
    label.set_label(message);
    label.set_visible(true);
}

/// Config panel for one external service.
pub struct IntegrationPanel<C: IntegrationConfig> {
    this: Weak<Self>,
    client: ApiClient,
    overlay: adw::ToastOverlay,
    root: gtk::Box,
    holder: gtk::Box,
    result: gtk::Label,
    test_btn: gtk::Button,
    save_btn: gtk::Button,
    form: RefCell<Option<(FormDraft, FormGrid)>>,
    _config: std::marker::PhantomData<C>,
}

impl<C: IntegrationConfig> IntegrationPanel<C> {
    pub fn new(client: ApiClient, overlay: adw::ToastOverlay) -> Rc<Self> {
        let root = page_box(C::NAME);

        let holder = gtk::Box::new(gtk::Orientation::Vertical, 0);
        root.append(&holder);

        let result = result_label();
        root.append(&result);

        let buttons = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        buttons.set_halign(gtk::Align::End);
        let test_btn = gtk::Button::with_label("Test Connection");
        let save_btn = gtk::Button::with_label("Save");
        save_btn.add_css_class("suggested-action");
        buttons.append(&test_btn);
        buttons.append(&save_btn);
        root.append(&buttons);

        let panel = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            client,
            overlay,
            root,
            holder,
            result,
            test_btn,
            save_btn,
            form: RefCell::new(None),
            _config: std::marker::PhantomData,
        });

        {
            let weak = panel.this.clone();
            panel.test_btn.connect_clicked(move |_| {
                if let Some(panel) = weak.upgrade() {
                    panel.test();
                }
            });
        }
        {
            let weak = panel.this.clone();
            panel.save_btn.connect_clicked(move |_| {
                if let Some(panel) = weak.upgrade() {
                    panel.save();
                }
            });
        }
        panel
    }

    fn set_busy(&self, busy: bool) {
        self.test_btn.set_sensitive(!busy);
        self.save_btn.set_sensitive(!busy);
    }

    /// What is in the form right now, secrets at their mask left out.
    fn entered(&self) -> Result<C> {
        let mut form = self.form.borrow_mut();
        match form.as_mut() {
            Some((draft, grid)) => {
                grid.read_into(draft);
                draft.to_typed::<C>()
            }
            None => Err(crate::error::ConsoleError::precondition("Settings have not loaded yet.")),
        }
    }

    fn load(&self) {
        self.set_busy(true);
        let client = self.client.clone();
        let weak = self.this.clone();
        run_async_to_main(async move { integrations::load_config::<C>(&client).await }, move |res| {
            let Some(panel) = weak.upgrade() else { return };
            panel.set_busy(false);
            let config = match res {
                Ok(config) => config,
                Err(e) => {
                    show_result(&panel.result, false, &e.to_string());
                    C::default()
                }
            };
            match FormDraft::settings(C::FIELDS, &config) {
                Ok(draft) => {
                    let grid = FormGrid::new(&draft);
                    while let Some(child) = panel.holder.first_child() {
                        panel.holder.remove(&child);
                    }
                    panel.holder.append(&grid.widget());
                    *panel.form.borrow_mut() = Some((draft, grid));
                }
                Err(e) => show_result(&panel.result, false, &e.to_string()),
            }
        });
    }

    fn test(&self) {
        let config = match self.entered() {
            Ok(config) => config,
            Err(e) => return show_result(&self.result, false, &e.to_string()),
        };
        self.set_busy(true);
        let client = self.client.clone();
        let weak = self.this.clone();
        run_async_to_main(async move { integrations::test_connection(&client, &config).await }, move |res| {
            let Some(panel) = weak.upgrade() else { return };
            panel.set_busy(false);
            match res {
                Ok(outcome) => show_result(&panel.result, outcome.success, &outcome.message),
                Err(e) => show_result(&panel.result, false, &e.to_string()),
            }
        });
    }

    fn save(&self) {
        let config = match self.entered() {
            Ok(config) => config,
            Err(e) => return show_result(&self.result, false, &e.to_string()),
        };
        self.set_busy(true);
        let client = self.client.clone();
        let weak = self.this.clone();
        run_async_to_main(async move { integrations::save_config(&client, &config).await }, move |res| {
            let Some(panel) = weak.upgrade() else { return };
            panel.set_busy(false);
            match res {
                Ok(env) => {
                    toast(&panel.overlay, env.message().unwrap_or("Settings saved."));
                    panel.result.set_visible(false);
                    // Reload so secrets come back masked.
                    panel.load();
                }
                Err(e) => show_result(&panel.result, false, &e.to_string()),
            }
        });
    }
}

impl IntegrationPanel<TwilioConfig> {
    /// Adds the "Send SMS" box below the settings.
    pub fn with_sms(self: Rc<Self>) -> Rc<Self> {
        let frame = gtk::Frame::new(Some("Send SMS"));
        let inner = gtk::Box::new(gtk::Orientation::Vertical, 8);
        inner.set_margin_top(8);
        inner.set_margin_bottom(8);
        inner.set_margin_start(8);
        inner.set_margin_end(8);

        let to_entry = gtk::Entry::new();
        to_entry.set_placeholder_text(Some("To (E.164 number)"));
        to_entry.set_input_purpose(gtk::InputPurpose::Phone);
        inner.append(&to_entry);

        let body_view = gtk::TextView::new();
        body_view.set_wrap_mode(gtk::WrapMode::WordChar);
        let scroller = gtk::ScrolledWindow::builder().child(&body_view).min_content_height(80).build();
        scroller.add_css_class("card");
        inner.append(&scroller);

        let status = result_label();
        inner.append(&status);

        let send_btn = gtk::Button::with_label("Send");
        send_btn.set_halign(gtk::Align::End);
        inner.append(&send_btn);
        frame.set_child(Some(&inner));
        self.root.append(&frame);

        let weak = self.this.clone();
        send_btn.connect_clicked(move |btn| {
            let Some(panel) = weak.upgrade() else { return };
            let buffer = body_view.buffer();
            let sms = SmsRequest {
                to: to_entry.text().to_string(),
                body: buffer.text(&buffer.start_iter(), &buffer.end_iter(), false).to_string(),
            };
            if let Err(e) = sms.validate() {
                return show_result(&status, false, &e.to_string());
            }
            btn.set_sensitive(false);
            let client = panel.client.clone();
            let btn = btn.clone();
            let status = status.clone();
            let buffer = buffer.clone();
            run_async_to_main(async move { integrations::send_sms(&client, &sms).await }, move |res| {
                btn.set_sensitive(true);
                match res {
                    Ok(env) => {
                        show_result(&status, true, env.message().unwrap_or("Message sent."));
                        buffer.set_text("");
                    }
                    Err(e) => show_result(&status, false, &e.to_string()),
                }
            });
        });
        self
    }
}

impl<C: IntegrationConfig> Page for IntegrationPanel<C> {
    fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    fn activate(&self) {
        self.result.set_visible(false);
        self.load();
    }
}

/// Maintenance mode: banner shown to non-admin users while enabled.
pub struct MaintenancePanel {
    this: Weak<Self>,
    client: ApiClient,
    overlay: adw::ToastOverlay,
    root: gtk::Box,
    switch: gtk::Switch,
    message: gtk::Entry,
    result: gtk::Label,
    apply_btn: gtk::Button,
}

impl MaintenancePanel {
    pub fn new(client: ApiClient, overlay: adw::ToastOverlay) -> Rc<Self> {
        let root = page_box("Maintenance");

        let row = gtk::Box::new(gtk::Orientation::Horizontal, 12);
        let label = gtk::Label::new(Some("Maintenance mode"));
        label.set_hexpand(true);
        label.set_halign(gtk::Align::Start);
        let switch = gtk::Switch::new();
        row.append(&label);
        row.append(&switch);
        root.append(&row);

        let message = gtk::Entry::new();
        message.set_placeholder_text(Some("Message shown to users (optional)"));
        root.append(&message);

        let result = result_label();
        root.append(&result);

        let apply_btn = gtk::Button::with_label("Apply");
        apply_btn.add_css_class("suggested-action");
        apply_btn.set_halign(gtk::Align::End);
        root.append(&apply_btn);

        let panel = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            client,
            overlay,
            root,
            switch,
            message,
            result,
            apply_btn,
        });
        let weak = panel.this.clone();
        panel.apply_btn.connect_clicked(move |_| {
            if let Some(panel) = weak.upgrade() {
                panel.apply();
            }
        });
        panel
    }

    fn apply(&self) {
        let enabled = self.switch.is_active();
        let message = self.message.text().to_string();
        self.apply_btn.set_sensitive(false);
        let client = self.client.clone();
        let weak = self.this.clone();
        run_async_to_main(
            async move { integrations::set_maintenance(&client, enabled, &message).await },
            move |res| {
                let Some(panel) = weak.upgrade() else { return };
                panel.apply_btn.set_sensitive(true);
                match res {
                    Ok(status) => {
                        panel.switch.set_active(status.enabled);
                        panel.message.set_text(&status.message);
                        panel.result.set_visible(false);
                        let text = if status.enabled { "Maintenance mode enabled." } else { "Maintenance mode disabled." };
                        toast(&panel.overlay, text);
                    }
                    Err(e) => show_result(&panel.result, false, &e.to_string()),
                }
            },
        );
    }
}

impl Page for MaintenancePanel {
    fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    fn activate(&self) {
        let client = self.client.clone();
        let weak = self.this.clone();
        run_async_to_main(async move { integrations::maintenance_status(&client).await }, move |res| {
            let Some(panel) = weak.upgrade() else { return };
            match res {
                Ok(status) => {
                    panel.switch.set_active(status.enabled);
                    panel.message.set_text(&status.message);
                    panel.result.set_visible(false);
                }
                Err(e) => show_result(&panel.result, false, &e.to_string()),
            }
        });
    }
}
