//! Webhook relay core.
//!
//! Every destination (IFTTT, NTFY, ...) is a [`WebhookPlugin`] parameterized
//! by a [`PayloadStrategy`]. The plugin owns a [`Forwarder`], which combines
//! the sanitizer, the per-channel rate limiter and the HTTP POST, and an
//! admin command surface that edits per-guild [`GuildSettings`].

pub mod commands;
pub mod error;
pub mod forwarder;
pub mod gating;
pub mod payload;
pub mod plugin;
pub mod rate_limit;
pub mod sanitize;
pub mod settings;

pub use {
    commands::{AdminCommand, CommandError, CommandReply, ReplyLevel},
    error::{Error, ForwardError, Result},
    forwarder::{Delivered, ForwardRequest, Forwarder, Origin},
    payload::{Delivery, DeliveryBody, Notice, PayloadContext, PayloadStrategy},
    plugin::{RelayPlugin, WebhookPlugin},
    rate_limit::{RateLimitKey, RateLimiter, Reservation},
    sanitize::{MAX_CONTENT_CHARS, sanitize},
    settings::{GuildSettings, MemorySettingsStore, SettingsStore},
};
