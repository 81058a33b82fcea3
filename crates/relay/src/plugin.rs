use std::sync::Arc;

use {
    async_trait::async_trait,
    hookrelay_common::{GuildRef, InboundMessage},
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    ForwardError,
    commands::{AdminCommand, CommandReply, help_text},
    error::retry_secs,
    forwarder::{ForwardRequest, Forwarder, Origin},
    payload::{Notice, PayloadStrategy},
    settings::SettingsStore,
};

/// A destination loaded into the host.
#[async_trait]
pub trait RelayPlugin: Send + Sync {
    /// Plugin identifier, also its command group (e.g. "ifttt").
    fn id(&self) -> &str;

    /// Human-readable destination name.
    fn name(&self) -> &str;

    /// Passive listener, called for every message the host sees.
    ///
    /// Never reports anything back to the chat.
    async fn on_message(&self, message: &InboundMessage);

    /// Run an admin subcommand. `args` is the text after the group name.
    async fn on_command(&self, message: &InboundMessage, args: &str) -> Vec<CommandReply>;

    /// Stop accepting new forwards.
    async fn shutdown(&self);
}

/// Generic webhook destination: one [`Forwarder`] plus the admin commands
/// that edit its settings.
pub struct WebhookPlugin<P> {
    forwarder: Forwarder<P>,
    command_prefix: String,
}

impl<P: PayloadStrategy> WebhookPlugin<P> {
    pub fn new(strategy: P, store: Arc<dyn SettingsStore>) -> Self {
        Self::from_forwarder(Forwarder::new(strategy, store))
    }

    pub fn from_forwarder(forwarder: Forwarder<P>) -> Self {
        Self {
            forwarder,
            command_prefix: "!".into(),
        }
    }

    /// Prefix shown in help text.
    #[must_use]
    pub fn with_command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command_prefix = prefix.into();
        self
    }

    pub fn forwarder(&self) -> &Forwarder<P> {
        &self.forwarder
    }

    fn notice(&self, notice: Notice<'_>) -> String {
        self.forwarder.strategy().notice(notice)
    }

    async fn apply(
        &self,
        guild: &GuildRef,
        message: &InboundMessage,
        command: AdminCommand,
    ) -> Vec<CommandReply> {
        let name = P::NAME;
        let forwarder = &self.forwarder;

        let saved = match command {
            AdminCommand::Help => {
                return vec![CommandReply::info(help_text(
                    &self.command_prefix,
                    P::ID,
                    name,
                    P::SUPPORTS_HEADERS,
                ))];
            },
            AdminCommand::Send(text) => return vec![self.send(guild, message, &text).await],
            AdminCommand::Url(url) => {
                let reply = CommandReply::info(self.notice(Notice::UrlSet(&url)));
                forwarder
                    .update_settings(guild.id, move |s| s.destination_url = Some(url))
                    .await
                    .map(|_| vec![reply])
            },
            AdminCommand::RateLimit(requested) => {
                let (secs, raised) = AdminCommand::clamp_rate_limit(requested);
                let mut replies = Vec::new();
                if raised {
                    replies.push(CommandReply::warning(format!(
                        "Rate limit cannot be less than {secs} seconds. Using {secs}."
                    )));
                }
                replies.push(CommandReply::info(format!(
                    "Rate limit set to {secs} seconds."
                )));
                forwarder
                    .update_settings(guild.id, |s| s.rate_limit_seconds = secs)
                    .await
                    .map(|_| replies)
            },
            AdminCommand::AllowBot(bot) => {
                let reply =
                    CommandReply::info(self.notice(Notice::BotAllowed(&bot.display_name)));
                forwarder
                    .update_settings(guild.id, |s| s.allowed_bot_id = Some(bot.id))
                    .await
                    .map(|_| vec![reply])
            },
            AdminCommand::DisableBot => forwarder
                .update_settings(guild.id, |s| s.allowed_bot_id = None)
                .await
                .map(|_| vec![CommandReply::info(self.notice(Notice::BotFilterCleared))]),
            AdminCommand::Toggle => forwarder
                .update_settings(guild.id, |s| s.enabled = !s.enabled)
                .await
                .map(|s| vec![CommandReply::info(self.notice(Notice::Toggled(s.enabled)))]),
            AdminCommand::Token(token) => forwarder
                .update_settings(guild.id, move |s| s.auth_token = Some(Secret::new(token)))
                .await
                .map(|_| vec![CommandReply::info("Authorization token set.")]),
            AdminCommand::Headers(headers) => forwarder
                .update_settings(guild.id, move |s| s.headers = headers)
                .await
                .map(|_| vec![CommandReply::info("Headers updated.")]),
        };

        saved.unwrap_or_else(|e| {
            warn!(plugin = P::ID, guild_id = %guild.id, error = %e, "failed to save settings");
            vec![CommandReply::error(
                "Settings could not be saved. Check your logs.",
            )]
        })
    }

    async fn send(&self, guild: &GuildRef, message: &InboundMessage, text: &str) -> CommandReply {
        let name = P::NAME;
        let request = ForwardRequest {
            guild,
            channel_id: message.channel_id,
            author: &message.author,
            content: text,
            origin: Origin::Command,
        };
        match self.forwarder.forward(&request).await {
            Ok(_) => CommandReply::info(format!("Message sent to {name} successfully!")),
            Err(ForwardError::Disabled) => CommandReply::error(self.notice(Notice::SendDisabled)),
            Err(ForwardError::RateLimited { retry_after }) => CommandReply::warning(format!(
                "Please wait {} seconds before sending another message.",
                retry_secs(&retry_after)
            )),
            Err(ForwardError::InvalidContent) => CommandReply::error("Message content is invalid."),
            Err(ForwardError::NotConfigured) => {
                CommandReply::error(format!("{name} URL is not configured."))
            },
            Err(ForwardError::DeliveryFailed { status, .. }) => {
                CommandReply::error(format!("Failed to send message: {status}"))
            },
            Err(ForwardError::Transport(e)) => {
                CommandReply::error(format!("Error sending message: {e}"))
            },
            Err(ForwardError::InvalidSettings(reason)) => {
                CommandReply::error(format!("Message was not sent: {reason}."))
            },
            Err(e @ (ForwardError::Store(_) | ForwardError::BotFiltered | ForwardError::Closed)) => {
                warn!(plugin = P::ID, guild_id = %guild.id, error = %e, "manual send failed");
                CommandReply::error("Message was not sent. Check your logs.")
            },
        }
    }
}

#[async_trait]
impl<P: PayloadStrategy> RelayPlugin for WebhookPlugin<P> {
    fn id(&self) -> &str {
        P::ID
    }

    fn name(&self) -> &str {
        P::NAME
    }

    async fn on_message(&self, message: &InboundMessage) {
        let Some(guild) = message.guild.as_ref() else {
            return;
        };
        if message.is_command {
            return;
        }

        let request = ForwardRequest {
            guild,
            channel_id: message.channel_id,
            author: &message.author,
            content: &message.content,
            origin: Origin::Listener,
        };
        match self.forwarder.forward(&request).await {
            Ok(_) => {},
            Err(e) if e.is_policy() => {
                debug!(
                    plugin = P::ID,
                    guild_id = %guild.id,
                    channel_id = %message.channel_id,
                    reason = %e,
                    "message not forwarded"
                );
            },
            // Delivery failures are already logged by the forwarder.
            Err(ForwardError::DeliveryFailed { .. } | ForwardError::Transport(_)) => {},
            Err(e) => {
                warn!(plugin = P::ID, guild_id = %guild.id, error = %e, "listener forward failed");
            },
        }
    }

    async fn on_command(&self, message: &InboundMessage, args: &str) -> Vec<CommandReply> {
        let Some(guild) = message.guild.as_ref() else {
            return vec![CommandReply::error("This command only works in a server.")];
        };
        match AdminCommand::parse(args, message, P::SUPPORTS_HEADERS) {
            Ok(command) => self.apply(guild, message, command).await,
            Err(e) => vec![CommandReply::error(e.to_string())],
        }
    }

    async fn shutdown(&self) {
        self.forwarder.shutdown();
        debug!(plugin = P::ID, "plugin shut down");
    }
}
