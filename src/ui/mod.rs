pub mod form_dialog;
pub mod integration_view;
pub mod login;
pub mod main_window;
pub mod resource_view;
pub mod sidebar;
pub mod wallboard_view;

use gtk4 as gtk;

/// A sidebar destination. Pages load when shown and stop their pollers when
/// hidden.
pub trait Page {
    fn widget(&self) -> gtk::Widget;
    fn activate(&self);
    fn deactivate(&self) {}
}

/// Window a page's dialogs should be transient for.
pub fn parent_window(widget: &impl gtk4::prelude::IsA<gtk::Widget>) -> Option<gtk::Window> {
    use gtk4::prelude::*;
    widget.root().and_downcast::<gtk::Window>()
}

pub fn toast(overlay: &adw::ToastOverlay, message: &str) {
    overlay.add_toast(adw::Toast::new(message));
}
