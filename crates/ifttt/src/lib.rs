//! IFTTT Webhooks destination for hookrelay.
//!
//! Posts `{"value1": guild, "value2": author, "value3": message}` to the
//! guild's Maker Webhooks URL.

pub mod payload;

pub use payload::{IftttPayload, IftttValues};

/// IFTTT destination plugin.
pub type IftttPlugin = hookrelay_relay::WebhookPlugin<IftttPayload>;
