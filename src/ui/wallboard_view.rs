use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use gtk4 as gtk;
use gtk4::prelude::*;
use log::debug;

use crate::api::client::ApiClient;
use crate::api::envelope::Envelope;
use crate::api::events::StatusEvent;
use crate::api::models::{CallQueue, QueueMember, QueueWallboard};
use crate::api::resources::Resource;
use crate::error::Result;
use crate::poller::{self, Backoff, PollerSlot, MAX_BACKOFF};
use crate::render::{format_duration, status_class, wallboard_counters};
use crate::ui::form_dialog;
use crate::ui::{parent_window, toast, Page};
use crate::utils::{run_async_to_main, RUNTIME};

/// Supervisor view of one queue: live counters, members and waiting calls.
pub struct WallboardView {
    this: Weak<Self>,
    client: ApiClient,
    overlay: adw::ToastOverlay,
    interval: Duration,
    root: gtk::Box,
    queue_picker: gtk::DropDown,
    queues: RefCell<Vec<String>>,
    counters: gtk::Grid,
    poll_status: gtk::Label,
    members: gtk::ListBox,
    waiting: gtk::ListBox,
    add_entry: gtk::Entry,
    penalty: gtk::SpinButton,
    poller: RefCell<PollerSlot>,
}

fn clear(list: &gtk::ListBox) {
    while let Some(child) = list.first_child() {
        list.remove(&child);
    }
}

fn text_row(text: &str) -> gtk::ListBoxRow {
    let label = gtk::Label::new(Some(text));
    label.set_halign(gtk::Align::Start);
    label.set_margin_top(6);
    label.set_margin_bottom(6);
    label.set_margin_start(8);
    let row = gtk::ListBoxRow::new();
    row.set_activatable(false);
    row.set_child(Some(&label));
    row
}

fn section(title: &str) -> gtk::Label {
    let label = gtk::Label::new(Some(title));
    label.add_css_class("heading");
    label.set_halign(gtk::Align::Start);
    label.set_margin_top(8);
    label
}

impl WallboardView {
    pub fn new(client: ApiClient, overlay: adw::ToastOverlay, interval: Duration) -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 8);
        root.set_margin_top(12);
        root.set_margin_bottom(12);
        root.set_margin_start(12);
        root.set_margin_end(12);

        let top = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        let title = gtk::Label::new(Some("Queue Wallboard"));
        title.add_css_class("title-2");
        title.set_hexpand(true);
        title.set_halign(gtk::Align::Start);
        top.append(&title);
        let queue_picker = gtk::DropDown::from_strings(&[]);
        queue_picker.set_tooltip_text(Some("Queue"));
        top.append(&queue_picker);
        root.append(&top);

        let poll_status = gtk::Label::new(Some("Select a queue first."));
        poll_status.add_css_class("dim-label");
        poll_status.set_halign(gtk::Align::Start);
        root.append(&poll_status);

        let counters = gtk::Grid::new();
        counters.set_column_spacing(24);
        counters.set_row_spacing(4);
        root.append(&counters);

        root.append(&section("Members"));
        let members = gtk::ListBox::new();
        members.set_selection_mode(gtk::SelectionMode::None);
        members.add_css_class("boxed-list");
        root.append(&members);

        let add_row = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        let add_entry = gtk::Entry::new();
        add_entry.set_placeholder_text(Some("Extension"));
        add_entry.set_hexpand(true);
        let penalty = gtk::SpinButton::with_range(0.0, 10.0, 1.0);
        penalty.set_tooltip_text(Some("Penalty"));
        let add_btn = gtk::Button::with_label("Add member");
        add_row.append(&add_entry);
        add_row.append(&penalty);
        add_row.append(&add_btn);
        root.append(&add_row);

        root.append(&section("Waiting calls"));
        let waiting = gtk::ListBox::new();
        waiting.set_selection_mode(gtk::SelectionMode::None);
        waiting.add_css_class("boxed-list");
        root.append(&waiting);

        let view = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            client,
            overlay,
            interval,
            root,
            queue_picker,
            queues: RefCell::new(Vec::new()),
            counters,
            poll_status,
            members,
            waiting,
            add_entry,
            penalty,
            poller: RefCell::new(PollerSlot::default()),
        });

        {
            let weak = view.this.clone();
            view.queue_picker.connect_selected_notify(move |_| {
                if let Some(view) = weak.upgrade() {
                    view.start_poller();
                }
            });
        }
        {
            let weak = view.this.clone();
            add_btn.connect_clicked(move |_| {
                if let Some(view) = weak.upgrade() {
                    view.add_member();
                }
            });
        }
        view
    }

    fn selected_queue(&self) -> String {
        let index = self.queue_picker.selected() as usize;
        self.queues.borrow().get(index).cloned().unwrap_or_default()
    }

    fn load_queues(&self) {
        let client = self.client.clone();
        let weak = self.this.clone();
        run_async_to_main(async move { client.list::<CallQueue>(None).await }, move |res| {
            let Some(view) = weak.upgrade() else { return };
            if !view.poller.borrow().is_shown() {
                return;
            }
            match res {
                Ok(queues) => {
                    let labels: Vec<String> =
                        queues.iter().map(|q| format!("{} {}", q.id(), q.name).trim().to_string()).collect();
                    *view.queues.borrow_mut() = queues.iter().map(|q| q.id().to_string()).collect();
                    let strings: Vec<&str> = labels.iter().map(String::as_str).collect();
                    view.queue_picker.set_model(Some(&gtk::StringList::new(&strings)));
                    if queues.is_empty() {
                        view.poll_status.set_label("No queues are configured.");
                    }
                    // Selection notify only fires when the index changed.
                    if !view.poller.borrow().is_running() {
                        view.start_poller();
                    }
                }
                Err(e) => view.poll_status.set_label(&e.to_string()),
            }
        });
    }

    /// (Re)starts the wallboard poller for the selected queue.
    fn start_poller(&self) {
        let queue = self.selected_queue();
        if queue.is_empty() {
            self.poller.borrow_mut().stop();
            return;
        }
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<StatusEvent>();
        let client = self.client.clone();
        let polled = queue.clone();
        let started = self.poller.borrow_mut().restart(|| {
            poller::spawn(
                RUNTIME.handle(),
                "queue wallboard",
                Backoff::new(self.interval, MAX_BACKOFF),
                move || {
                    let client = client.clone();
                    let queue = polled.clone();
                    async move { client.queue_wallboard(&queue).await.map(|stats| (queue, stats)) }
                },
                move |result| {
                    let event = match result {
                        Ok((queue, stats)) => StatusEvent::Wallboard { queue, stats },
                        Err(e) => StatusEvent::failed("queue wallboard", &e),
                    };
                    let _ = tx.send(event);
                },
            )
        });
        if !started {
            return;
        }

        let weak = self.this.clone();
        glib::spawn_future_local(async move {
            while let Some(event) = rx.recv().await {
                let Some(view) = weak.upgrade() else { break };
                view.apply_event(event);
            }
            debug!("wallboard channel for {queue} closed");
        });
    }

    fn apply_event(&self, event: StatusEvent) {
        match event {
            StatusEvent::Wallboard { queue, stats } => {
                // A late snapshot from a queue no longer selected.
                if queue != self.selected_queue() {
                    return;
                }
                self.poll_status.set_label(&format!("Queue {queue}, refreshed every {}s", self.interval.as_secs()));
                self.show(&stats);
            }
            StatusEvent::PollFailed { message, .. } => {
                self.poll_status.set_label(&format!("Wallboard unavailable: {message}"));
            }
            StatusEvent::ExtensionStatuses(_) => {}
        }
    }

    fn show(&self, stats: &QueueWallboard) {
        while let Some(child) = self.counters.first_child() {
            self.counters.remove(&child);
        }
        for (column, (label, value)) in wallboard_counters(stats).into_iter().enumerate() {
            let value_label = gtk::Label::new(Some(&value));
            value_label.add_css_class("title-3");
            let caption = gtk::Label::new(Some(label));
            caption.add_css_class("caption");
            caption.add_css_class("dim-label");
            self.counters.attach(&value_label, column as i32, 0, 1, 1);
            self.counters.attach(&caption, column as i32, 1, 1, 1);
        }
        self.show_members(&stats.members);

        clear(&self.waiting);
        for call in &stats.waiting_calls {
            let caller = if call.caller_name.is_empty() {
                call.caller_id.clone()
            } else {
                format!("{} <{}>", call.caller_name, call.caller_id)
            };
            let text = format!("#{}  {caller}  waiting {}", call.position, format_duration(call.wait_time));
            self.waiting.append(&text_row(&text));
        }
    }

    fn show_members(&self, members: &[QueueMember]) {
        clear(&self.members);
        for member in members {
            let line = gtk::Box::new(gtk::Orientation::Horizontal, 8);
            line.set_margin_top(6);
            line.set_margin_bottom(6);
            line.set_margin_start(8);
            line.set_margin_end(8);

            let dot = gtk::Label::new(Some("●"));
            dot.add_css_class(status_class(member.status));
            line.append(&dot);

            let mut text = format!("{} {}", member.extension, member.display_name);
            text.push_str(&format!("  penalty {}  calls {}", member.penalty, member.calls_taken));
            if member.paused {
                text.push_str("  (paused");
                if let Some(reason) = member.paused_reason.as_deref().filter(|r| !r.is_empty()) {
                    text.push_str(&format!(": {reason}"));
                }
                text.push(')');
            }
            let label = gtk::Label::new(Some(&text));
            label.set_hexpand(true);
            label.set_halign(gtk::Align::Start);
            line.append(&label);

            let pause_btn = gtk::Button::with_label(if member.paused { "Resume" } else { "Pause" });
            let remove_btn = gtk::Button::with_label("Remove");
            remove_btn.add_css_class("destructive-action");
            line.append(&pause_btn);
            line.append(&remove_btn);
            {
                let weak = self.this.clone();
                let extension = member.extension.clone();
                let paused = member.paused;
                pause_btn.connect_clicked(move |_| {
                    let Some(view) = weak.upgrade() else { return };
                    if paused {
                        view.set_paused(&extension, false, String::new());
                        return;
                    }
                    let Some(parent) = parent_window(&view.root) else { return };
                    let heading = format!("Pause {extension}");
                    let weak = weak.clone();
                    let extension = extension.clone();
                    form_dialog::prompt(&parent, &heading, "Reason (optional)", "Pause", false, move |reason| {
                        if let Some(view) = weak.upgrade() {
                            view.set_paused(&extension, true, reason);
                        }
                    });
                });
            }
            {
                let weak = self.this.clone();
                let extension = member.extension.clone();
                remove_btn.connect_clicked(move |_| {
                    let Some(view) = weak.upgrade() else { return };
                    let client = view.client.clone();
                    let queue = view.selected_queue();
                    let extension = extension.clone();
                    view.write(async move { client.remove_queue_member(&queue, &extension).await });
                });
            }

            let row = gtk::ListBoxRow::new();
            row.set_activatable(false);
            row.set_child(Some(&line));
            self.members.append(&row);
        }
    }

    fn set_paused(&self, extension: &str, paused: bool, reason: String) {
        let client = self.client.clone();
        let queue = self.selected_queue();
        let extension = extension.to_string();
        self.write(async move {
            let reason = Some(reason.as_str()).filter(|r| !r.is_empty());
            client.pause_queue_member(&queue, &extension, paused, reason).await
        });
    }

    fn add_member(&self) {
        let queue = self.selected_queue();
        let extension = self.add_entry.text().trim().to_string();
        if queue.is_empty() || extension.is_empty() {
            toast(&self.overlay, "Select a queue and enter an extension.");
            return;
        }
        let penalty = self.penalty.value_as_int().max(0) as u32;
        let client = self.client.clone();
        self.add_entry.set_text("");
        self.write(async move { client.add_queue_member(&queue, &extension, penalty).await });
    }

    /// Membership change, then an immediate member refresh instead of
    /// waiting for the next poll.
    fn write<F>(&self, fut: F)
    where
        F: std::future::Future<Output = Result<Envelope>> + Send + 'static,
    {
        let client = self.client.clone();
        let queue = self.selected_queue();
        let weak = self.this.clone();
        run_async_to_main(
            async move {
                let env = fut.await?;
                let members = client.queue_members(&queue).await?;
                Ok::<_, crate::error::ConsoleError>((env, members))
            },
            move |res| {
                let Some(view) = weak.upgrade() else { return };
                match res {
                    Ok((env, members)) => {
                        toast(&view.overlay, env.message().unwrap_or("Queue membership updated."));
                        view.show_members(&members);
                    }
                    Err(e) => toast(&view.overlay, &e.to_string()),
                }
            },
        );
    }
}

impl Page for WallboardView {
    fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    fn activate(&self) {
        self.poller.borrow_mut().show();
        self.load_queues();
    }

    fn deactivate(&self) {
        if self.poller.borrow_mut().hide() {
            debug!("wallboard hidden");
        }
    }
}
