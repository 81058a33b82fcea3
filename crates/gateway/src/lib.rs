//! Gateway: host adapter between a chat event source and the relay plugins.
//!
//! Lifecycle:
//! 1. Load config
//! 2. Open the settings store
//! 3. Register the enabled destination plugins
//! 4. Dispatch each inbound message as an admin command or a listener event
//! 5. Shut plugins down

pub mod registry;
pub mod server;
pub mod settings_store;

pub use {registry::PluginRegistry, server::Gateway, settings_store::SqliteSettingsStore};
