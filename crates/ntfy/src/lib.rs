//! NTFY destination for hookrelay.
//!
//! Posts the sanitized message as a plain-text body to the guild's topic URL,
//! with the guild's custom headers and an optional bearer token.

pub mod payload;

pub use payload::NtfyPayload;

/// NTFY destination plugin.
pub type NtfyPlugin = hookrelay_relay::WebhookPlugin<NtfyPayload>;
