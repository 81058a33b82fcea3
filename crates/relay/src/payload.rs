use crate::{ForwardError, settings::GuildSettings};

/// Everything a destination may put in its request.
#[derive(Debug, Clone, Copy)]
pub struct PayloadContext<'a> {
    pub guild_name: &'a str,
    pub author_name: &'a str,
    /// Already sanitized, never empty.
    pub content: &'a str,
    pub settings: &'a GuildSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryBody {
    Json(serde_json::Value),
    /// Sent as `text/plain; charset=utf-8` unless a header overrides it.
    Text(String),
}

/// A ready-to-send request body plus extra headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub body: DeliveryBody,
    pub headers: Vec<(String, String)>,
}

impl Delivery {
    pub fn json(value: serde_json::Value) -> Self {
        Self {
            body: DeliveryBody::Json(value),
            headers: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            body: DeliveryBody::Text(text.into()),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Confirmation texts whose wording differs per destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice<'a> {
    UrlSet(&'a str),
    /// Display name of the bot now allowed.
    BotAllowed(&'a str),
    BotFilterCleared,
    /// New `enabled` state after `toggle`.
    Toggled(bool),
    /// `send` refused because forwarding is off.
    SendDisabled,
}

/// Destination-specific request shape.
///
/// The strategy's `ID` doubles as the settings scope and the command group
/// name, so two destinations never share settings.
pub trait PayloadStrategy: Send + Sync + 'static {
    /// Stable identifier, e.g. `"ifttt"`.
    const ID: &'static str;

    /// Human-readable name used in replies.
    const NAME: &'static str;

    /// Whether the `token` and `headers` commands apply.
    const SUPPORTS_HEADERS: bool = false;

    fn build(&self, ctx: &PayloadContext<'_>) -> Result<Delivery, ForwardError>;

    /// Reply text for `notice`.
    fn notice(&self, notice: Notice<'_>) -> String {
        let name = Self::NAME;
        match notice {
            Notice::UrlSet(url) => format!("{name} URL set to:\n{url}"),
            Notice::BotAllowed(bot) => format!("Now listening only to messages from **{bot}**."),
            Notice::BotFilterCleared => "Bot filter disabled.".to_string(),
            Notice::Toggled(enabled) => {
                let state = if enabled { "enabled" } else { "disabled" };
                format!("{name} forwarding is now {state}.")
            },
            Notice::SendDisabled => format!("{name} forwarding is disabled in this guild."),
        }
    }
}
