use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    hookrelay_common::{Author, ChannelId, GuildId, GuildRef},
    reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
    tracing::{info, warn},
};

use crate::{
    ForwardError,
    gating::author_allowed,
    payload::{Delivery, DeliveryBody, PayloadContext, PayloadStrategy},
    rate_limit::{RateLimitKey, RateLimiter},
    sanitize::sanitize,
    settings::{GuildSettings, SettingsStore},
};

/// Upper bound for one webhook POST unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Who triggered a forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Passive message listener. Subject to the bot-author filter.
    Listener,
    /// The admin `send` command.
    Command,
}

#[derive(Debug, Clone, Copy)]
pub struct ForwardRequest<'a> {
    pub guild: &'a GuildRef,
    pub channel_id: ChannelId,
    pub author: &'a Author,
    pub content: &'a str,
    pub origin: Origin,
}

/// A forward the destination accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub status: u16,
    /// The sanitized text that was sent.
    pub content: String,
}

/// Sanitize, rate-limit and POST messages for one destination.
pub struct Forwarder<P> {
    strategy: P,
    store: Arc<dyn SettingsStore>,
    limiter: RateLimiter,
    http: reqwest::Client,
    timeout: Duration,
    closed: AtomicBool,
}

impl<P: PayloadStrategy> Forwarder<P> {
    pub fn new(strategy: P, store: Arc<dyn SettingsStore>) -> Self {
        Self {
            strategy,
            store,
            limiter: RateLimiter::new(),
            http: reqwest::Client::new(),
            timeout: DEFAULT_TIMEOUT,
            closed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn strategy(&self) -> &P {
        &self.strategy
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub async fn settings(&self, guild_id: GuildId) -> crate::Result<GuildSettings> {
        self.store.load(P::ID, guild_id).await
    }

    /// Load, modify and persist the settings for `guild_id`.
    pub async fn update_settings(
        &self,
        guild_id: GuildId,
        update: impl FnOnce(&mut GuildSettings),
    ) -> crate::Result<GuildSettings> {
        let mut settings = self.settings(guild_id).await?;
        update(&mut settings);
        self.store.save(P::ID, guild_id, &settings).await?;
        Ok(settings)
    }

    /// Deliver one message if the guild's settings and the channel cooldown
    /// allow it.
    ///
    /// The cooldown only starts on a response below 400; every error path
    /// leaves the channel's last send time as it was.
    pub async fn forward(&self, req: &ForwardRequest<'_>) -> Result<Delivered, ForwardError> {
        if self.is_closed() {
            return Err(ForwardError::Closed);
        }

        let settings = self.settings(req.guild.id).await?;
        if !settings.enabled {
            return Err(ForwardError::Disabled);
        }
        if req.origin == Origin::Listener && !author_allowed(req.author, settings.allowed_bot_id)
        {
            return Err(ForwardError::BotFiltered);
        }

        let key = RateLimitKey::new(req.guild.id, req.channel_id);
        let reservation = self
            .limiter
            .try_reserve(key, settings.cooldown())
            .map_err(|retry_after| ForwardError::RateLimited { retry_after })?;

        let content = sanitize(req.content).ok_or(ForwardError::InvalidContent)?;
        let url = settings.destination().ok_or(ForwardError::NotConfigured)?;

        let delivery = self.strategy.build(&PayloadContext {
            guild_name: &req.guild.name,
            author_name: &req.author.display_name,
            content: &content,
            settings: &settings,
        })?;

        match self.post(url, delivery).await {
            Ok(status) => {
                reservation.commit();
                info!(
                    plugin = P::ID,
                    guild_id = %key.guild_id,
                    channel_id = %key.channel_id,
                    status,
                    "message forwarded"
                );
                Ok(Delivered { status, content })
            },
            Err(e) => {
                warn!(
                    plugin = P::ID,
                    guild_id = %key.guild_id,
                    channel_id = %key.channel_id,
                    error = %e,
                    "{} delivery failed",
                    P::NAME
                );
                Err(e)
            },
        }
    }

    async fn post(&self, url: &str, delivery: Delivery) -> Result<u16, ForwardError> {
        let mut headers = HeaderMap::new();
        if matches!(delivery.body, DeliveryBody::Text(_)) {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
        }
        for (name, value) in &delivery.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ForwardError::InvalidSettings(format!("bad header name `{name}`")))?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                ForwardError::InvalidSettings(format!("bad value for header `{}`", name.as_str()))
            })?;
            headers.insert(name, value);
        }

        let request = self.http.post(url).timeout(self.timeout).headers(headers);
        let request = match delivery.body {
            DeliveryBody::Json(value) => request.json(&value),
            DeliveryBody::Text(text) => request.body(text),
        };

        let resp = request.send().await?;
        let status = resp.status().as_u16();
        if status >= 400 {
            let body = resp.text().await.unwrap_or_default();
            return Err(ForwardError::DeliveryFailed { status, body });
        }
        Ok(status)
    }

    /// Refuse further forwards. Requests already in flight run to completion.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
