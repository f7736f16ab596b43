use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Duration;

use gtk4 as gtk;
use gtk4::prelude::*;
use log::{debug, warn};

use crate::api::client::ApiClient;
use crate::api::envelope::Envelope;
use crate::api::events::StatusEvent;
use crate::api::models::Extension;
use crate::api::resources::Resource;
use crate::bulk::BulkAction;
use crate::error::{ConsoleError, Result};
use crate::filter::facet_values;
use crate::form::FormDraft;
use crate::poller::{self, Backoff, PollerSlot, MAX_BACKOFF};
use crate::render::{status_class, Row};
use crate::store::{LoadTicket, ResourceStore};
use crate::ui::form_dialog::{self, Done};
use crate::ui::{parent_window, toast, Page};
use crate::utils::{run_async_to_main, RUNTIME};

type RowAction = (&'static str, Rc<dyn Fn(&str)>);

/// One list page: toolbar, bulk bar, rows and the store behind them.
pub struct ResourceView<R: Resource> {
    this: Weak<Self>,
    client: ApiClient,
    overlay: adw::ToastOverlay,
    store: RefCell<ResourceStore<R>>,
    root: gtk::Box,
    search: gtk::SearchEntry,
    facets: Vec<(&'static str, gtk::DropDown)>,
    spinner: gtk::Spinner,
    new_btn: gtk::Button,
    page_actions: Vec<(&'static str, gtk::Button)>,
    banner: gtk::Label,
    poll_status: gtk::Label,
    bulk_bar: gtk::Box,
    bulk_count: gtk::Label,
    bulk_buttons: Vec<(BulkAction, gtk::Button)>,
    list: gtk::ListBox,
    more_btn: gtk::Button,
    row_actions: RefCell<Vec<RowAction>>,
    on_activate: RefCell<Vec<Box<dyn Fn()>>>,
    dots: RefCell<HashMap<String, gtk::Label>>,
    poller: RefCell<PollerSlot>,
    syncing: Cell<bool>,
}

fn cell_box() -> gtk::Box {
    let cells = gtk::Box::new(gtk::Orientation::Horizontal, 12);
    cells.set_homogeneous(true);
    cells.set_hexpand(true);
    cells
}

fn cell_label(text: &str) -> gtk::Label {
    let label = gtk::Label::new(Some(text));
    label.set_xalign(0.0);
    label.set_ellipsize(gtk::pango::EllipsizeMode::End);
    label.set_tooltip_text(Some(text));
    label
}

fn set_dot_class(dot: &gtk::Label, class: &str) {
    for existing in dot.css_classes() {
        if existing.starts_with("status-") {
            dot.remove_css_class(&existing);
        }
    }
    dot.add_css_class(class);
}

impl<R: Resource> ResourceView<R> {
    pub fn new(client: ApiClient, overlay: adw::ToastOverlay) -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 8);
        root.set_margin_top(12);
        root.set_margin_bottom(12);
        root.set_margin_start(12);
        root.set_margin_end(12);

        let title = gtk::Label::new(Some(R::TITLE));
        title.add_css_class("title-2");
        title.set_halign(gtk::Align::Start);
        root.append(&title);

        // Toolbar
        let toolbar = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        let search = gtk::SearchEntry::new();
        search.set_placeholder_text(Some("Search"));
        search.set_hexpand(true);
        toolbar.append(&search);

        let facets: Vec<(&'static str, gtk::DropDown)> = R::FACETS
            .iter()
            .map(|&(name, label)| {
                let dropdown = gtk::DropDown::from_strings(&["Any"]);
                dropdown.set_tooltip_text(Some(label));
                toolbar.append(&dropdown);
                (name, dropdown)
            })
            .collect();

        let spinner = gtk::Spinner::new();
        spinner.set_visible(false);
        toolbar.append(&spinner);

        let page_actions: Vec<(&'static str, gtk::Button)> = R::PAGE_ACTIONS
            .iter()
            .map(|&label| {
                let btn = gtk::Button::with_label(label);
                toolbar.append(&btn);
                (label, btn)
            })
            .collect();

        let refresh_btn = gtk::Button::from_icon_name("view-refresh-symbolic");
        refresh_btn.set_tooltip_text(Some("Reload"));
        toolbar.append(&refresh_btn);

        let new_btn = gtk::Button::with_label("New");
        new_btn.add_css_class("suggested-action");
        new_btn.set_visible(R::ENDPOINT.creatable && !R::FIELDS.is_empty());
        toolbar.append(&new_btn);
        root.append(&toolbar);

        let banner = gtk::Label::new(None);
        banner.add_css_class("error");
        banner.set_wrap(true);
        banner.set_halign(gtk::Align::Start);
        banner.set_visible(false);
        root.append(&banner);

        let poll_status = gtk::Label::new(None);
        poll_status.add_css_class("dim-label");
        poll_status.set_halign(gtk::Align::Start);
        poll_status.set_visible(false);
        root.append(&poll_status);

        // Bulk bar, shown while rows are checked
        let bulk_bar = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        bulk_bar.add_css_class("toolbar");
        let bulk_count = gtk::Label::new(None);
        bulk_count.set_hexpand(true);
        bulk_count.set_halign(gtk::Align::Start);
        bulk_bar.append(&bulk_count);
        let mut bulk_buttons = Vec::new();
        for action in [BulkAction::Enable, BulkAction::Disable, BulkAction::Delete] {
            if action == BulkAction::Delete && !R::ENDPOINT.deletable {
                continue;
            }
            let btn = gtk::Button::with_label(action.label());
            if action == BulkAction::Delete {
                btn.add_css_class("destructive-action");
            }
            bulk_bar.append(&btn);
            bulk_buttons.push((action, btn));
        }
        bulk_bar.set_visible(false);
        root.append(&bulk_bar);

        // Column headers
        let header = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        header.set_margin_start(8);
        header.set_margin_end(8);
        let select_all = gtk::Button::from_icon_name("object-select-symbolic");
        select_all.add_css_class("flat");
        select_all.set_tooltip_text(Some("Select all shown"));
        header.append(&select_all);
        let columns = cell_box();
        for column in R::COLUMNS {
            let label = cell_label(column);
            label.add_css_class("heading");
            columns.append(&label);
        }
        header.append(&columns);
        root.append(&header);

        let list = gtk::ListBox::new();
        list.set_selection_mode(gtk::SelectionMode::None);
        list.add_css_class("boxed-list");
        let empty = gtk::Label::new(Some("Nothing to show."));
        empty.add_css_class("dim-label");
        empty.set_margin_top(24);
        empty.set_margin_bottom(24);
        list.set_placeholder(Some(&empty));
        let scroller = gtk::ScrolledWindow::builder().child(&list).vexpand(true).build();
        root.append(&scroller);

        let more_btn = gtk::Button::with_label("Load more");
        more_btn.set_halign(gtk::Align::Center);
        more_btn.set_visible(false);
        root.append(&more_btn);

        let view = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            client,
            overlay,
            store: RefCell::new(ResourceStore::new()),
            root,
            search,
            facets,
            spinner,
            new_btn,
            page_actions,
            banner,
            poll_status,
            bulk_bar,
            bulk_count,
            bulk_buttons,
            list,
            more_btn,
            row_actions: RefCell::new(Vec::new()),
            on_activate: RefCell::new(Vec::new()),
            dots: RefCell::new(HashMap::new()),
            poller: RefCell::new(PollerSlot::default()),
            syncing: Cell::new(false),
        });

        {
            let weak = view.this.clone();
            view.search.connect_search_changed(move |entry| {
                if let Some(view) = weak.upgrade() {
                    view.store.borrow_mut().filter_mut().set_query(&entry.text());
                    view.refresh();
                }
            });
        }
        for (name, dropdown) in &view.facets {
            let weak = view.this.clone();
            let name = *name;
            dropdown.connect_selected_notify(move |dd| {
                let Some(view) = weak.upgrade() else { return };
                if view.syncing.get() {
                    return;
                }
                let value = (dd.selected() > 0)
                    .then(|| dd.selected_item().and_downcast::<gtk::StringObject>())
                    .flatten()
                    .map(|s| s.string().to_string());
                view.store.borrow_mut().filter_mut().set_facet(name, value.as_deref());
                view.refresh();
            });
        }
        {
            let weak = view.this.clone();
            select_all.connect_clicked(move |_| {
                if let Some(view) = weak.upgrade() {
                    {
                        let mut store = view.store.borrow_mut();
                        let visible: Vec<String> = store.visible().iter().map(|i| i.id().to_string()).collect();
                        store.selection_mut().toggle_all(visible.iter().map(String::as_str));
                    }
                    view.refresh();
                }
            });
        }
        {
            let weak = view.this.clone();
            refresh_btn.connect_clicked(move |_| {
                if let Some(view) = weak.upgrade() {
                    view.reload();
                }
            });
        }
        {
            let weak = view.this.clone();
            view.new_btn.connect_clicked(move |_| {
                if let Some(view) = weak.upgrade() {
                    view.open_form(None);
                }
            });
        }
        {
            let weak = view.this.clone();
            view.more_btn.connect_clicked(move |_| {
                if let Some(view) = weak.upgrade() {
                    view.load_more();
                }
            });
        }
        for (action, btn) in &view.bulk_buttons {
            let action = *action;
            let weak = view.this.clone();
            btn.connect_clicked(move |_| {
                if let Some(view) = weak.upgrade() {
                    view.bulk(action);
                }
            });
        }

        view
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn toast(&self, message: &str) {
        toast(&self.overlay, message);
    }

    pub fn checked_ids(&self) -> Vec<String> {
        self.store.borrow().checked_ids()
    }

    pub fn connect_page_action(&self, label: &str, f: impl Fn() + 'static) {
        if let Some((_, btn)) = self.page_actions.iter().find(|(l, _)| *l == label) {
            btn.connect_clicked(move |_| f());
        }
    }

    /// Extra per-row button; takes effect on the next render.
    pub fn add_row_action(&self, label: &'static str, f: impl Fn(&str) + 'static) {
        self.row_actions.borrow_mut().push((label, Rc::new(f)));
    }

    pub fn connect_activated(&self, f: impl Fn() + 'static) {
        self.on_activate.borrow_mut().push(Box::new(f));
    }

    /// Full reload. Any load still in flight is superseded.
    pub fn reload(&self) {
        let ticket = self.store.borrow_mut().begin_load();
        self.sync_state();
        self.fetch(ticket);
    }

    pub fn load_more(&self) {
        let ticket = self.store.borrow_mut().begin_load_more();
        self.sync_state();
        self.fetch(ticket);
    }

    fn fetch(&self, ticket: LoadTicket) {
        let loaded = self.store.borrow().items().len();
        let client = self.client.clone();
        let weak = self.this.clone();
        run_async_to_main(async move { ticket.fetch::<R>(&client, loaded).await }, move |result| {
            let Some(view) = weak.upgrade() else { return };
            let applied = view.store.borrow_mut().finish_load(ticket, result);
            if applied {
                view.refresh_facets();
                view.refresh();
            }
            view.sync_state();
        });
    }

    fn sync_state(&self) {
        let store = self.store.borrow();
        let state = store.state();
        let busy = state.is_busy();
        self.spinner.set_visible(busy);
        self.spinner.set_spinning(busy);
        match state.error() {
            Some(message) => {
                self.banner.set_label(message);
                self.banner.set_visible(true);
            }
            None => self.banner.set_visible(false),
        }
        self.new_btn.set_sensitive(!busy);
        for (_, btn) in &self.bulk_buttons {
            btn.set_sensitive(!busy);
        }
        self.more_btn.set_visible(!store.items().is_empty());
        self.more_btn.set_sensitive(!busy);
    }

    fn sync_bulk_bar(&self) {
        let checked = self.checked_ids().len();
        self.bulk_bar.set_visible(checked > 0);
        self.bulk_count.set_label(&format!("{checked} selected"));
    }

    /// Rebuilds the facet dropdowns from the cached values, keeping the
    /// current choice when it still exists.
    fn refresh_facets(&self) {
        self.syncing.set(true);
        for (name, dropdown) in &self.facets {
            let (values, current) = {
                let store = self.store.borrow();
                (facet_values(store.items(), name), store.filter().facet(name).map(str::to_string))
            };
            let mut strings: Vec<&str> = vec!["Any"];
            strings.extend(values.iter().map(String::as_str));
            dropdown.set_model(Some(&gtk::StringList::new(&strings)));
            let position = current.as_deref().and_then(|c| values.iter().position(|v| v.to_lowercase() == c));
            match position {
                Some(i) => dropdown.set_selected(i as u32 + 1),
                None => {
                    dropdown.set_selected(0);
                    self.store.borrow_mut().filter_mut().set_facet(name, None);
                }
            }
        }
        self.syncing.set(false);
    }

    /// Re-renders the rows for the current filter and selection.
    pub fn refresh(&self) {
        let table = self.store.borrow().render();
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        self.dots.borrow_mut().clear();
        for row in &table.rows {
            let widget = self.build_row(row);
            self.list.append(&widget);
        }
        self.sync_bulk_bar();
    }

    fn build_row(&self, row: &Row) -> gtk::ListBoxRow {
        let line = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        line.set_margin_top(6);
        line.set_margin_bottom(6);
        line.set_margin_start(8);
        line.set_margin_end(8);

        let check = gtk::CheckButton::new();
        check.set_active(row.checked);
        {
            let weak = self.this.clone();
            let id = row.id.clone();
            check.connect_toggled(move |check| {
                if let Some(view) = weak.upgrade() {
                    view.store.borrow_mut().selection_mut().set(&id, check.is_active());
                    view.sync_bulk_bar();
                }
            });
        }
        line.append(&check);

        if let Some(class) = row.status_class {
            let dot = gtk::Label::new(Some("●"));
            dot.add_css_class(class);
            line.append(&dot);
            self.dots.borrow_mut().insert(row.id.clone(), dot);
        }

        let cells = cell_box();
        for text in &row.cells {
            cells.append(&cell_label(text));
        }
        line.append(&cells);

        if R::ENDPOINT.update_verb.is_some() && !R::FIELDS.is_empty() {
            let edit = gtk::Button::from_icon_name("document-edit-symbolic");
            edit.add_css_class("flat");
            edit.set_tooltip_text(Some("Edit"));
            let weak = self.this.clone();
            let id = row.id.clone();
            edit.connect_clicked(move |_| {
                if let Some(view) = weak.upgrade() {
                    view.open_form(Some(&id));
                }
            });
            line.append(&edit);
        }
        for (label, action) in self.row_actions.borrow().iter() {
            let btn = gtk::Button::with_label(label);
            btn.add_css_class("flat");
            let action = action.clone();
            let id = row.id.clone();
            btn.connect_clicked(move |_| action(&id));
            line.append(&btn);
        }
        if R::ENDPOINT.deletable {
            let delete = gtk::Button::from_icon_name("user-trash-symbolic");
            delete.add_css_class("flat");
            delete.set_tooltip_text(Some("Delete"));
            let weak = self.this.clone();
            let id = row.id.clone();
            delete.connect_clicked(move |_| {
                if let Some(view) = weak.upgrade() {
                    view.confirm_delete(&id);
                }
            });
            line.append(&delete);
        }

        let widget = gtk::ListBoxRow::new();
        widget.set_activatable(false);
        widget.set_child(Some(&line));
        widget
    }

    /// "New" when `id` is `None`, otherwise "Edit" on the cached entry.
    fn open_form(&self, id: Option<&str>) {
        let Some(parent) = parent_window(&self.root) else { return };
        let draft = match id {
            None => FormDraft::create::<R>(),
            Some(id) => match self.store.borrow().get(id) {
                Some(item) => FormDraft::edit(item),
                None => Err(ConsoleError::precondition(format!("That {} is no longer listed.", R::NOUN))),
            },
        };
        let draft = match draft {
            Ok(draft) => draft,
            Err(e) => {
                self.toast(&e.to_string());
                return;
            }
        };
        let title = match id {
            None => format!("New {}", R::NOUN),
            Some(_) => format!("Edit {}", R::NOUN),
        };
        let weak = self.this.clone();
        form_dialog::present(&parent, &title, draft, move |draft, done| {
            let Some(view) = weak.upgrade() else { return };
            let client = view.client.clone();
            view.write(format!("{} saved.", R::NOUN), async move { draft.submit::<R>(&client).await }, Some(done));
        });
    }

    fn confirm_delete(&self, id: &str) {
        let Some(parent) = parent_window(&self.root) else { return };
        let weak = self.this.clone();
        let id = id.to_string();
        let body = format!("Delete {} {id}? This cannot be undone.", R::NOUN);
        form_dialog::confirm(&parent, &format!("Delete {}", R::NOUN), &body, move || {
            let Some(view) = weak.upgrade() else { return };
            let client = view.client.clone();
            let id = id.clone();
            view.write(format!("{} deleted.", R::NOUN), async move { client.delete::<R>(&id).await }, None);
        });
    }

    fn bulk(&self, action: BulkAction) {
        let count = match self.store.borrow().bulk_ids() {
            Ok(ids) => ids.len(),
            Err(e) => {
                self.toast(&e.to_string());
                return;
            }
        };
        if action == BulkAction::Delete {
            let Some(parent) = parent_window(&self.root) else { return };
            let weak = self.this.clone();
            let body = format!("Delete {count} selected {}(s)? This cannot be undone.", R::NOUN);
            form_dialog::confirm(&parent, "Delete selected", &body, move || {
                if let Some(view) = weak.upgrade() {
                    view.run_bulk(action);
                }
            });
        } else {
            self.run_bulk(action);
        }
    }

    /// Sends the checked, visible rows to the bulk endpoint.
    fn run_bulk(&self, action: BulkAction) {
        let ids = match self.store.borrow_mut().begin_bulk() {
            Ok(ids) => ids,
            Err(e) => {
                self.toast(&e.to_string());
                return;
            }
        };
        self.sync_state();
        let fallback = format!("{} applied to {} {}(s).", action.label(), ids.len(), R::NOUN);
        let client = self.client.clone();
        let weak = self.this.clone();
        run_async_to_main(async move { client.bulk::<R>(action, &ids).await }, move |result| {
            let Some(view) = weak.upgrade() else { return };
            view.store.borrow_mut().finish_bulk(&result);
            view.sync_bulk_bar();
            view.report(&result, &fallback);
        });
    }

    /// Runs a write through the page's submit state: refused while another
    /// request is outstanding, toasts the outcome and reloads on success.
    pub fn write<Fut>(&self, fallback: String, fut: Fut, done: Option<Done>)
    where
        Fut: Future<Output = Result<Envelope>> + Send + 'static,
    {
        if let Err(e) = self.store.borrow_mut().begin_submit() {
            self.toast(&e.to_string());
            if let Some(done) = done {
                done(Err(e));
            }
            return;
        }
        self.sync_state();
        let weak = self.this.clone();
        run_async_to_main(fut, move |result| {
            if let Some(view) = weak.upgrade() {
                view.store.borrow_mut().finish_submit(&result);
                view.report(&result, &fallback);
            }
            if let Some(done) = done {
                done(result.map(|env| env.message().map(str::to_string)));
            }
        });
    }

    fn report(&self, result: &Result<Envelope>, fallback: &str) {
        self.sync_state();
        match result {
            Ok(env) => {
                self.toast(env.message().unwrap_or(fallback));
                self.reload();
            }
            Err(e) => {
                if !e.is_precondition() {
                    warn!("{} change failed: {e}", R::NOUN);
                }
                self.toast(&e.to_string());
            }
        }
    }

    fn hide_poller(&self) {
        if self.poller.borrow_mut().hide() {
            self.poll_status.set_visible(false);
        }
    }
}

impl ResourceView<Extension> {
    /// Starts the live presence poller; replaces one already running and
    /// does nothing while the page is hidden.
    pub fn start_status_poller(&self, interval: Duration) {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<StatusEvent>();
        let client = self.client.clone();
        let started = self.poller.borrow_mut().restart(|| {
            poller::spawn(
                RUNTIME.handle(),
                "extension status",
                Backoff::new(interval, MAX_BACKOFF),
                move || {
                    let client = client.clone();
                    async move { client.extension_statuses().await }
                },
                move |result| {
                    let event = match result {
                        Ok(pairs) => StatusEvent::statuses(pairs),
                        Err(e) => StatusEvent::failed("extension status", &e),
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
            debug!("extension status channel closed");
        });
    }

    /// Patches presence dots in place; the list is only re-filtered when a
    /// status facet is active.
    pub fn apply_event(&self, event: StatusEvent) {
        match event {
            StatusEvent::ExtensionStatuses(statuses) => {
                self.poll_status.set_visible(false);
                let refilter = {
                    let mut store = self.store.borrow_mut();
                    let dots = self.dots.borrow();
                    for (id, status) in &statuses {
                        store.patch(id, |ext| ext.status = *status);
                        if let Some(dot) = dots.get(id) {
                            set_dot_class(dot, status_class(*status));
                        }
                    }
                    store.filter().facet("status").is_some()
                };
                if refilter {
                    self.refresh();
                }
            }
            StatusEvent::PollFailed { message, .. } => {
                self.poll_status.set_label(&format!("Live status unavailable: {message}"));
                self.poll_status.set_visible(true);
            }
            StatusEvent::Wallboard { .. } => {}
        }
    }
}

impl<R: Resource> Page for ResourceView<R> {
    fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    fn activate(&self) {
        self.poller.borrow_mut().show();
        self.reload();
        for hook in self.on_activate.borrow().iter() {
            hook();
        }
    }

    fn deactivate(&self) {
        self.hide_poller();
        self.store.borrow_mut().invalidate();
        self.refresh();
        self.sync_state();
    }
}
