use std::sync::Arc;

use {
    futures::future::join_all,
    hookrelay_common::InboundMessage,
    hookrelay_config::HookrelayConfig,
    hookrelay_ifttt::IftttPayload,
    hookrelay_ntfy::NtfyPayload,
    hookrelay_relay::{
        CommandReply, Forwarder, PayloadStrategy, RelayPlugin, SettingsStore, WebhookPlugin,
    },
    tracing::{debug, info},
};

use crate::{registry::PluginRegistry, settings_store::SqliteSettingsStore};

/// Routes inbound messages to the registered plugins.
pub struct Gateway {
    registry: PluginRegistry,
    prefix: String,
}

/// A message addressed to one plugin's command group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInvocation<'a> {
    pub plugin: &'a str,
    /// Text after the group name, e.g. `url https://...`.
    pub args: &'a str,
}

impl Gateway {
    pub fn new(registry: PluginRegistry, prefix: impl Into<String>) -> Self {
        Self {
            registry,
            prefix: prefix.into(),
        }
    }

    /// Open the configured store and register every enabled plugin.
    pub async fn from_config(config: &HookrelayConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn SettingsStore> =
            Arc::new(SqliteSettingsStore::open(config.store.path.as_deref()).await?);
        Self::with_store(config, store)
    }

    /// Register every enabled plugin on top of an existing store.
    pub fn with_store(
        config: &HookrelayConfig,
        store: Arc<dyn SettingsStore>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http.timeout())
            .user_agent(&config.http.user_agent)
            .build()?;

        let mut registry = PluginRegistry::new();
        if config.plugins.ifttt {
            registry.register(webhook_plugin(IftttPayload, &store, &http, config));
        }
        if config.plugins.ntfy {
            registry.register(webhook_plugin(NtfyPayload, &store, &http, config));
        }
        info!(plugins = ?registry.list(), prefix = %config.commands.prefix, "gateway ready");

        Ok(Self::new(registry, config.commands.prefix.clone()))
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Recognize `<prefix><plugin> [args]` for a registered plugin.
    pub fn parse_command<'a>(&self, content: &'a str) -> Option<CommandInvocation<'a>> {
        let rest = content.trim_start().strip_prefix(self.prefix.as_str())?;
        let (group, args) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(group, args)| (group, args.trim()));
        self.registry.get(group)?;
        Some(CommandInvocation {
            plugin: group,
            args,
        })
    }

    /// Handle one inbound message.
    ///
    /// Commands for a registered plugin return that plugin's replies. Every
    /// other message goes to all plugin listeners and returns nothing.
    pub async fn dispatch(&self, message: &InboundMessage) -> Vec<CommandReply> {
        let Some(invocation) = self.parse_command(&message.content) else {
            join_all(self.registry.iter().map(|plugin| plugin.on_message(message))).await;
            return Vec::new();
        };
        let Some(plugin) = self.registry.get(invocation.plugin) else {
            return Vec::new();
        };

        let Some(guild) = message.guild.as_ref() else {
            return vec![CommandReply::error("This command only works in a server.")];
        };
        if !message.author_is_admin {
            debug!(
                plugin = plugin.id(),
                guild_id = %guild.id,
                user_id = %message.author.id,
                "rejected command from non-admin"
            );
            return vec![CommandReply::error(
                "You need the Manage Server permission to use this command.",
            )];
        }

        let mut command = message.clone();
        command.is_command = true;
        plugin.on_command(&command, invocation.args).await
    }

    /// Shut every plugin down. Later forwards are refused.
    pub async fn shutdown(&self) {
        join_all(self.registry.iter().map(|plugin| plugin.shutdown())).await;
        info!("gateway shut down");
    }
}

fn webhook_plugin<P: PayloadStrategy>(
    strategy: P,
    store: &Arc<dyn SettingsStore>,
    http: &reqwest::Client,
    config: &HookrelayConfig,
) -> Box<dyn RelayPlugin> {
    let forwarder = Forwarder::new(strategy, Arc::clone(store))
        .with_http_client(http.clone())
        .with_timeout(config.http.timeout());
    Box::new(
        WebhookPlugin::from_forwarder(forwarder).with_command_prefix(config.commands.prefix.clone()),
    )
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        hookrelay_common::{Author, ChannelId, GuildId, GuildRef, UserId},
        hookrelay_relay::{MemorySettingsStore, ReplyLevel},
    };

    use super::*;

    fn gateway(config: &HookrelayConfig) -> Gateway {
        Gateway::with_store(config, Arc::new(MemorySettingsStore::new())).unwrap()
    }

    fn message(content: &str, admin: bool) -> InboundMessage {
        InboundMessage {
            guild: Some(GuildRef {
                id: GuildId(1),
                name: "Lounge".into(),
            }),
            channel_id: ChannelId(2),
            author: Author {
                id: UserId(3),
                display_name: "dana".into(),
                bot: false,
            },
            content: content.into(),
            mentions: Vec::new(),
            is_command: false,
            author_is_admin: admin,
        }
    }

    #[test]
    fn registers_enabled_plugins() {
        let mut config = HookrelayConfig::default();
        assert_eq!(gateway(&config).registry().list(), vec!["ifttt", "ntfy"]);

        config.plugins.ntfy = false;
        assert_eq!(gateway(&config).registry().list(), vec!["ifttt"]);
    }

    #[test]
    fn parses_command_groups() {
        let gw = gateway(&HookrelayConfig::default());
        assert_eq!(
            gw.parse_command("!ntfy url https://ntfy.sh/x"),
            Some(CommandInvocation {
                plugin: "ntfy",
                args: "url https://ntfy.sh/x",
            })
        );
        assert_eq!(
            gw.parse_command("!IFTTT"),
            Some(CommandInvocation {
                plugin: "IFTTT",
                args: "",
            })
        );
        assert!(gw.parse_command("!slack url x").is_none());
        assert!(gw.parse_command("ntfy url x").is_none());
        assert!(gw.parse_command("hello !ntfy").is_none());
    }

    #[tokio::test]
    async fn commands_require_admin() {
        let gw = gateway(&HookrelayConfig::default());
        let replies = gw.dispatch(&message("!ntfy toggle", false)).await;
        assert_eq!(replies, vec![CommandReply::error(
            "You need the Manage Server permission to use this command."
        )]);
    }

    #[tokio::test]
    async fn commands_require_a_guild() {
        let gw = gateway(&HookrelayConfig::default());
        let mut dm = message("!ifttt toggle", true);
        dm.guild = None;
        let replies = gw.dispatch(&dm).await;
        assert_eq!(replies[0].level, ReplyLevel::Error);
    }

    #[tokio::test]
    async fn admin_command_reaches_plugin() {
        let gw = gateway(&HookrelayConfig::default());
        let replies = gw.dispatch(&message("!ifttt ratelimit 10", true)).await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].level, ReplyLevel::Warning);
        assert_eq!(replies[1].text, "Rate limit set to 30 seconds.");
    }

    #[tokio::test]
    async fn custom_prefix_shows_in_help() {
        let mut config = HookrelayConfig::default();
        config.commands.prefix = "?".into();
        let gw = gateway(&config);

        assert!(gw.dispatch(&message("!ntfy", true)).await.is_empty());
        let replies = gw.dispatch(&message("?ntfy", true)).await;
        assert!(replies[0].text.contains("`?ntfy token <token>`"));
    }

    #[tokio::test]
    async fn plain_messages_produce_no_replies() {
        let gw = gateway(&HookrelayConfig::default());
        assert!(gw.dispatch(&message("just chatting", false)).await.is_empty());
    }
}
