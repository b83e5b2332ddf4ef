//! Core of the conversation screen: launch parameters, the message endpoint
//! client, local persistence and the screen state. The GTK front end lives in
//! the `converse-gtk` binary.

pub mod api;
pub mod app;
pub mod launch;
pub mod screen;
pub mod storage;

pub use api::client::{ApiClient, MessageTransport, SubmitError};
pub use api::models::{Conversation, OutgoingMessage};
pub use app::AppConfig;
pub use launch::LaunchParams;
pub use screen::{ConversationScreen, ScreenView};
pub use storage::{ConversationStore, KeyValueStore, MemoryStore, SqliteStore, StorageScope};
