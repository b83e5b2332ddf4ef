use std::sync::Arc;

use adw::prelude::*;
use adw::Application;
use chrono::Utc;
use converse::storage::{KeyValueStore, MemoryStore, SqliteStore};
use converse::{AppConfig, ConversationScreen, LaunchParams};

use crate::ui::conversation_view::ConversationView;

const CSS: &str = r#"
.received-bubble { background-color: alpha(@accent_bg_color, 0.15); border-radius: 12px; padding: 8px 12px; }
.sent-bubble { background-color: alpha(@success_bg_color, 0.2); border-radius: 12px; padding: 8px 12px; }
.conversation { margin-bottom: 12px; }
.error { color: @error_color; }
"#;

fn load_css() {
    let provider = gtk4::CssProvider::new();
    provider.load_from_data(CSS);
    if let Some(display) = gtk4::gdk::Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}

fn open_store(config: &AppConfig) -> Result<SqliteStore, converse::storage::StorageError> {
    match &config.database_path {
        Some(path) => SqliteStore::open(path),
        None => SqliteStore::open_default(),
    }
}

pub fn show_main_window(app: &Application, params: LaunchParams) {
    load_css();
    let config = AppConfig::load();

    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("Converse")
        .default_width(480)
        .default_height(720)
        .build();

    let overlay = adw::ToastOverlay::new();
    overlay.set_vexpand(true);

    let store: Box<dyn KeyValueStore> = match open_store(&config) {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::error!("Failed to open conversation store: {e}");
            overlay.add_toast(adw::Toast::new("Conversations won't be saved on this device."));
            Box::new(MemoryStore::new())
        }
    };

    let client = match config.api_client() {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            log::error!("{e}");
            overlay.add_toast(adw::Toast::new(&format!("Message service unavailable: {e}")));
            None
        }
    };

    let screen = ConversationScreen::init_scoped(params, store, config.storage_scope, Utc::now());
    let view = ConversationView::new(screen, client, &config.banner, overlay.clone());
    overlay.set_child(Some(&view.widget()));

    let container = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title = gtk4::Label::new(Some("Converse"));
    header.set_title_widget(Some(&title));
    container.append(&header);
    container.append(&overlay);
    window.set_content(Some(&container));

    // Signal handlers only hold weak references; the window keeps the view alive.
    window.connect_close_request(move |_| {
        log::debug!("Closing conversation for {:?}", view.phone_number());
        gtk4::glib::Propagation::Proceed
    });
    window.present();
}
