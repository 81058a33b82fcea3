//! Configuration loading and env substitution.
//!
//! Config files: `hookrelay.toml`, `hookrelay.yaml` or `hookrelay.json`.
//! Searched in `./` then `~/.config/hookrelay/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{ConfigError, config_dir, discover_and_load, load_config},
    schema::{CommandsConfig, HookrelayConfig, HttpConfig, PluginsConfig, StoreConfig},
};
