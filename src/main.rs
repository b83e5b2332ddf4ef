mod ui;
mod utils;

use adw::prelude::*;
use adw::Application;
use gtk4::gio;
use converse::LaunchParams;

static GLIB_LOGGER: glib::GlibLogger = glib::GlibLogger::new(
    glib::GlibLoggerFormat::Plain,
    glib::GlibLoggerDomain::CrateTarget,
);

fn main() -> gtk4::glib::ExitCode {
    if log::set_logger(&GLIB_LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let app = Application::builder()
        .application_id("com.example.ConverseGtk")
        .flags(gio::ApplicationFlags::HANDLES_OPEN)
        .build();

    // Plain launch: no identity, no greeting.
    app.connect_activate(|app| {
        crate::ui::main_window::show_main_window(app, LaunchParams::default());
    });

    // Launched with a URI such as converse://screen?phoneNumber=...&responseMessage=...
    app.connect_open(|app, files, _hint| {
        let params = match files.first() {
            Some(file) => {
                let uri = file.uri();
                LaunchParams::from_uri(&uri).unwrap_or_else(|e| {
                    log::warn!("{e}");
                    LaunchParams::default()
                })
            }
            None => LaunchParams::default(),
        };
        crate::ui::main_window::show_main_window(app, params);
    });

    app.run()
}
