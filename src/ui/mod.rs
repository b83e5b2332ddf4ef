pub mod conversation_view;
pub mod main_window;
