use gtk4::prelude::*;
use gtk4 as gtk;

/// Navigation list; one row per page, grouped under section headings.
pub struct Sidebar {
    root: gtk::Box,
    list: gtk::ListBox,
}

impl Sidebar {
    pub fn new() -> Self {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);
        root.set_width_request(220);

        let title = gtk::Label::new(Some("FlexPBX"));
        title.add_css_class("heading");
        title.set_halign(gtk::Align::Start);
        root.append(&title);

        let list = gtk::ListBox::new();
        list.add_css_class("navigation-sidebar");
        list.set_vexpand(true);
        root.append(&list);

        Self { root, list }
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    /// `pages` are `(section, title)` pairs in display order; a heading is
    /// emitted whenever the section changes.
    pub fn set_pages(&self, pages: &[(&str, &str)]) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        let mut section = "";
        for (index, &(group, title)) in pages.iter().enumerate() {
            let row = gtk::ListBoxRow::new();
            row.set_widget_name(&index.to_string());
            let label = gtk::Label::new(Some(title));
            label.set_margin_top(8);
            label.set_margin_bottom(8);
            label.set_margin_start(8);
            label.set_margin_end(8);
            label.set_halign(gtk::Align::Start);
            row.set_child(Some(&label));
            self.list.append(&row);
            if group != section {
                section = group;
                let heading = gtk::Label::new(Some(group));
                heading.add_css_class("dim-label");
                heading.add_css_class("caption-heading");
                heading.set_halign(gtk::Align::Start);
                heading.set_margin_start(8);
                heading.set_margin_top(if index == 0 { 0 } else { 12 });
                row.set_header(Some(&heading));
            }
        }
    }

    /// `f` gets the index of the chosen page.
    pub fn connect_selected(&self, f: impl Fn(usize) + 'static) {
        self.list.connect_row_selected(move |_, row| {
            if let Some(index) = row.and_then(|r| r.widget_name().parse::<usize>().ok()) {
                f(index);
            }
        });
    }

    pub fn select(&self, index: usize) {
        if let Some(row) = self.list.row_at_index(index as i32) {
            self.list.select_row(Some(&row));
        }
    }
}
