use std::{error::Error as StdError, time::Duration};

/// Crate-wide result type for settings and plugin plumbing.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed relay errors shared across the settings and plugin traits.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Settings backend could not be reached or returned bad data.
    #[error("settings store unavailable: {message}")]
    Store { message: String },

    /// Wrapped source error from an external dependency.
    #[error("relay operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn store(message: impl std::fmt::Display) -> Self {
        Self::Store {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// Why a forward did not reach the destination.
///
/// None of these are process faults: the listener logs them, the `send`
/// command turns them into a reply.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("forwarding is disabled in this guild")]
    Disabled,

    /// Bot author that is not the configured allowed bot.
    #[error("author is not the allowed bot")]
    BotFiltered,

    #[error("rate limited for another {}s", retry_secs(.retry_after))]
    RateLimited { retry_after: Duration },

    /// Sanitizing left nothing to send.
    #[error("message content is empty after sanitizing")]
    InvalidContent,

    #[error("destination URL is not configured")]
    NotConfigured,

    /// The configured settings cannot be turned into a request.
    #[error("invalid delivery settings: {0}")]
    InvalidSettings(String),

    /// Destination answered with status >= 400.
    #[error("destination returned {status}: {body}")]
    DeliveryFailed { status: u16, body: String },

    /// Connection, TLS or timeout failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Store(#[from] Error),

    #[error("forwarder is shut down")]
    Closed,
}

/// Whole seconds left on a cooldown, rounded up.
#[must_use]
pub fn retry_secs(retry_after: &Duration) -> u64 {
    retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0)
}

impl ForwardError {
    /// Policy outcomes are expected and only worth a debug log; everything
    /// else means a configured destination did not get the message.
    #[must_use]
    pub fn is_policy(&self) -> bool {
        matches!(
            self,
            Self::Disabled
                | Self::BotFiltered
                | Self::RateLimited { .. }
                | Self::InvalidContent
                | Self::NotConfigured
                | Self::Closed
        )
    }
}
