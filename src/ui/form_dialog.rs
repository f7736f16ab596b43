use std::cell::RefCell;
use std::rc::Rc;

use gtk4 as gtk;
use gtk4::prelude::*;

use crate::error::Result;
use crate::form::{FieldKind, FieldSpec, FormDraft};

/// Called with the outcome of a submission; `Ok` carries the server message.
pub type Done = Box<dyn FnOnce(Result<Option<String>>)>;

enum Input {
    Entry(gtk::Entry),
    Secret(gtk::PasswordEntry),
    Multiline(gtk::TextView),
    Toggle(gtk::Switch),
    Choice(gtk::DropDown),
}

/// Label/input grid generated from a draft's field list.
pub struct FormGrid {
    grid: gtk::Grid,
    inputs: Vec<(FieldSpec, Input)>,
}

impl FormGrid {
    pub fn new(draft: &FormDraft) -> Self {
        let grid = gtk::Grid::new();
        grid.set_row_spacing(8);
        grid.set_column_spacing(12);

        let mut inputs = Vec::with_capacity(draft.fields().len());
        for (row, spec) in draft.fields().iter().enumerate() {
            let text = if spec.required { format!("{} *", spec.label) } else { spec.label.to_string() };
            let label = gtk::Label::new(Some(&text));
            label.set_halign(gtk::Align::End);
            label.set_valign(gtk::Align::Start);
            label.set_margin_top(6);

            let current = draft.text(spec.key);
            let (widget, input): (gtk::Widget, Input) = match spec.kind {
                FieldKind::Toggle => {
                    let switch = gtk::Switch::new();
                    switch.set_active(draft.flag(spec.key));
                    switch.set_halign(gtk::Align::Start);
                    (switch.clone().upcast(), Input::Toggle(switch))
                }
                FieldKind::Secret => {
                    let entry = gtk::PasswordEntry::new();
                    entry.set_show_peek_icon(true);
                    entry.set_text(current);
                    entry.set_hexpand(true);
                    (entry.clone().upcast(), Input::Secret(entry))
                }
                FieldKind::Multiline => {
                    let view = gtk::TextView::new();
                    view.set_wrap_mode(gtk::WrapMode::WordChar);
                    view.buffer().set_text(current);
                    let scroller = gtk::ScrolledWindow::builder()
                        .child(&view)
                        .min_content_height(120)
                        .hexpand(true)
                        .build();
                    scroller.add_css_class("card");
                    (scroller.upcast(), Input::Multiline(view))
                }
                FieldKind::Choice(options) => {
                    // Keep a server value the console does not know about.
                    let mut choices: Vec<&str> = options.to_vec();
                    if !current.is_empty() && !choices.contains(&current) {
                        choices.push(current);
                    }
                    let dropdown = gtk::DropDown::from_strings(&choices);
                    let selected = choices.iter().position(|c| *c == current).unwrap_or(0);
                    dropdown.set_selected(selected as u32);
                    dropdown.set_hexpand(true);
                    (dropdown.clone().upcast(), Input::Choice(dropdown))
                }
                FieldKind::Text | FieldKind::Number | FieldKind::List | FieldKind::DateTime => {
                    let entry = gtk::Entry::new();
                    entry.set_text(current);
                    entry.set_hexpand(true);
                    match spec.kind {
                        FieldKind::List => entry.set_placeholder_text(Some("Comma separated")),
                        FieldKind::DateTime => entry.set_placeholder_text(Some("YYYY-MM-DD HH:MM")),
                        FieldKind::Number => entry.set_input_purpose(gtk::InputPurpose::Digits),
                        _ => {}
                    }
                    (entry.clone().upcast(), Input::Entry(entry))
                }
            };

            grid.attach(&label, 0, row as i32, 1, 1);
            grid.attach(&widget, 1, row as i32, 1, 1);
            inputs.push((*spec, input));
        }

        Self { grid, inputs }
    }

    pub fn widget(&self) -> gtk::Widget {
        self.grid.clone().upcast()
    }

    /// Copies what the user typed back into the draft.
    pub fn read_into(&self, draft: &mut FormDraft) {
        for (spec, input) in &self.inputs {
            match input {
                Input::Entry(entry) => draft.set_text(spec.key, entry.text()),
                Input::Secret(entry) => draft.set_text(spec.key, entry.text()),
                Input::Multiline(view) => {
                    let buffer = view.buffer();
                    let text = buffer.text(&buffer.start_iter(), &buffer.end_iter(), false);
                    draft.set_text(spec.key, text);
                }
                Input::Toggle(switch) => draft.set_flag(spec.key, switch.is_active()),
                Input::Choice(dropdown) => {
                    let value = dropdown
                        .selected_item()
                        .and_downcast::<gtk::StringObject>()
                        .map(|s| s.string().to_string())
                        .unwrap_or_default();
                    draft.set_text(spec.key, value);
                }
            }
        }
    }
}

/// Modal create/edit dialog. Validation errors stay inline and nothing is
/// submitted; `submit` is only called with a draft that serializes.
pub fn present<S>(parent: &gtk::Window, title: &str, draft: FormDraft, submit: S)
where
    S: Fn(FormDraft, Done) + 'static,
{
    let dialog = gtk::Dialog::builder()
        .title(title)
        .transient_for(parent)
        .modal(true)
        .default_width(520)
        .build();

    let content = gtk::Box::new(gtk::Orientation::Vertical, 12);
    content.set_margin_top(12);
    content.set_margin_bottom(12);
    content.set_margin_start(12);
    content.set_margin_end(12);

    let grid = FormGrid::new(&draft);
    let scroller = gtk::ScrolledWindow::builder()
        .child(&grid.widget())
        .propagate_natural_height(true)
        .max_content_height(560)
        .hscrollbar_policy(gtk::PolicyType::Never)
        .build();
    content.append(&scroller);

    let error = gtk::Label::new(None);
    error.add_css_class("error");
    error.set_wrap(true);
    error.set_halign(gtk::Align::Start);
    error.set_visible(false);
    content.append(&error);

    dialog.content_area().append(&content);
    let _ = dialog.add_button("Cancel", gtk::ResponseType::Cancel);
    let save_btn = dialog.add_button("Save", gtk::ResponseType::Ok);
    save_btn.add_css_class("suggested-action");
    dialog.set_default_response(gtk::ResponseType::Ok);

    let draft = Rc::new(RefCell::new(draft));
    dialog.connect_response(move |dlg, resp| {
        if resp != gtk::ResponseType::Ok {
            dlg.close();
            return;
        }
        grid.read_into(&mut draft.borrow_mut());
        if let Err(e) = draft.borrow().to_payload() {
            error.set_label(&e.to_string());
            error.set_visible(true);
            return;
        }

        error.set_visible(false);
        save_btn.set_sensitive(false);
        let dlg = dlg.clone();
        let error = error.clone();
        let save_btn = save_btn.clone();
        submit(
            draft.borrow().clone(),
            Box::new(move |res| match res {
                Ok(_) => dlg.close(),
                Err(e) => {
                    error.set_label(&e.to_string());
                    error.set_visible(true);
                    save_btn.set_sensitive(true);
                }
            }),
        );
    });

    dialog.present();
}

/// Yes/no question before a destructive action.
pub fn confirm(parent: &gtk::Window, heading: &str, body: &str, on_yes: impl Fn() + 'static) {
    let dialog = gtk::Dialog::builder().title(heading).transient_for(parent).modal(true).build();
    let label = gtk::Label::new(Some(body));
    label.set_wrap(true);
    label.set_margin_top(12);
    label.set_margin_bottom(12);
    label.set_margin_start(12);
    label.set_margin_end(12);
    dialog.content_area().append(&label);
    let _ = dialog.add_button("Cancel", gtk::ResponseType::Cancel);
    let ok_btn = dialog.add_button("Delete", gtk::ResponseType::Ok);
    ok_btn.add_css_class("destructive-action");
    dialog.connect_response(move |dlg, resp| {
        if resp == gtk::ResponseType::Ok {
            on_yes();
        }
        dlg.close();
    });
    dialog.present();
}

/// Single-line prompt; `on_ok` receives the trimmed answer, which is never
/// empty when `required`.
pub fn prompt(
    parent: &gtk::Window,
    heading: &str,
    hint: &str,
    action: &str,
    required: bool,
    on_ok: impl Fn(String) + 'static,
) {
    let dialog = gtk::Dialog::builder().title(heading).transient_for(parent).modal(true).build();
    let content = gtk::Box::new(gtk::Orientation::Vertical, 8);
    content.set_margin_top(12);
    content.set_margin_bottom(12);
    content.set_margin_start(12);
    content.set_margin_end(12);
    let entry = gtk::Entry::new();
    entry.set_placeholder_text(Some(hint));
    entry.set_activates_default(true);
    content.append(&entry);
    dialog.content_area().append(&content);
    let _ = dialog.add_button("Cancel", gtk::ResponseType::Cancel);
    let ok_btn = dialog.add_button(action, gtk::ResponseType::Ok);
    ok_btn.add_css_class("suggested-action");
    dialog.set_default_response(gtk::ResponseType::Ok);
    dialog.connect_response(move |dlg, resp| {
        if resp == gtk::ResponseType::Ok {
            let answer = entry.text().trim().to_string();
            if required && answer.is_empty() {
                return;
            }
            on_ok(answer);
        }
        dlg.close();
    });
    dialog.present();
}
