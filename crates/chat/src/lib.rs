#![deny(unsafe_code)]

/// Conversation store: domain model, intent core, and orchestrating shell.
pub mod chat;
/// Settings persistence.
pub mod settings;

pub use chat::{ChatStore, StoreEvent, StoreEvents, StoreSnapshot};
pub use settings::{SettingsStore, StoreSettings};
