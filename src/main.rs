mod api;
mod app;
mod bulk;
mod error;
mod filter;
mod form;
mod integrations;
mod poller;
mod render;
mod store;
mod ui;
mod utils;

use adw::prelude::*;
use adw::Application;

fn main() -> glib::ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = Application::builder()
        .application_id("com.flexpbx.Console")
        .build();
    app.connect_activate(|app| {
        crate::app::build_ui(app);
    });
    app.run()
}
