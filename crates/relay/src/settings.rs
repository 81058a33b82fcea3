use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use {
    async_trait::async_trait,
    hookrelay_common::{GuildId, UserId},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tokio::sync::RwLock,
};

use crate::Result;

/// Cooldown applied to a guild that never ran `ratelimit`.
pub const DEFAULT_RATE_LIMIT_SECS: u64 = 30;

/// Floor enforced by the `ratelimit` command.
pub const MIN_RATE_LIMIT_SECS: u64 = 30;

/// Per-guild destination settings for one plugin.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildSettings {
    /// Webhook or topic URL. Nothing is sent while unset.
    pub destination_url: Option<String>,

    /// Extra request headers (NTFY only).
    pub headers: BTreeMap<String, String>,

    /// Bearer token sent as `Authorization` (NTFY only).
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub auth_token: Option<Secret<String>>,

    /// Minimum seconds between successful forwards per channel.
    pub rate_limit_seconds: u64,

    /// The only bot whose messages the listener forwards.
    pub allowed_bot_id: Option<UserId>,

    pub enabled: bool,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            destination_url: None,
            headers: BTreeMap::new(),
            auth_token: None,
            rate_limit_seconds: DEFAULT_RATE_LIMIT_SECS,
            allowed_bot_id: None,
            enabled: true,
        }
    }
}

impl std::fmt::Debug for GuildSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildSettings")
            .field("destination_url", &self.destination_url)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("rate_limit_seconds", &self.rate_limit_seconds)
            .field("allowed_bot_id", &self.allowed_bot_id)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl GuildSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_seconds)
    }

    /// Configured destination, ignoring an empty string.
    pub fn destination(&self) -> Option<&str> {
        self.destination_url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.auth_token
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .map(String::as_str)
            .filter(|token| !token.is_empty())
    }
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// Persistent per-guild settings, namespaced by plugin scope.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Settings for `guild_id`, or the defaults when nothing was saved yet.
    async fn load(&self, scope: &str, guild_id: GuildId) -> Result<GuildSettings>;

    async fn save(&self, scope: &str, guild_id: GuildId, settings: &GuildSettings) -> Result<()>;
}

/// Process-local settings store. Contents are lost on exit.
#[derive(Default)]
pub struct MemorySettingsStore {
    entries: RwLock<HashMap<(String, GuildId), GuildSettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self, scope: &str, guild_id: GuildId) -> Result<GuildSettings> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&(scope.to_string(), guild_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, scope: &str, guild_id: GuildId, settings: &GuildSettings) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert((scope.to_string(), guild_id), settings.clone());
        Ok(())
    }
}
