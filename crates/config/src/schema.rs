//! Config schema types (http client, command prefix, settings store, plugins).
use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HookrelayConfig {
    pub http: HttpConfig,
    pub commands: CommandsConfig,
    pub store: StoreConfig,
    pub plugins: PluginsConfig,
}

/// Outbound HTTP client settings shared by every destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Upper bound for a single webhook POST, in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: concat!("hookrelay/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Prefix that marks a chat message as a bot command.
    pub prefix: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self { prefix: "!".into() }
    }
}

/// Where per-guild settings live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file. Settings are kept in memory when unset.
    pub path: Option<PathBuf>,
}

/// Which destinations are loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    pub ifttt: bool,
    pub ntfy: bool,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            ifttt: true,
            ntfy: true,
        }
    }
}
