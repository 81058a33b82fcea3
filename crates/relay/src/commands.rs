//! Admin subcommands shared by every destination.
//!
//! The host checks permissions and strips the `<prefix><plugin>` part; this
//! module parses what is left (`url https://...`, `ratelimit 60`, ...).

use std::{collections::BTreeMap, fmt};

use {
    hookrelay_common::{Author, InboundMessage},
    reqwest::header::{HeaderName, HeaderValue},
};

use crate::settings::MIN_RATE_LIMIT_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyLevel {
    Info,
    Warning,
    Error,
}

/// One message sent back to the channel that issued a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub level: ReplyLevel,
    pub text: String,
}

impl CommandReply {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: ReplyLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: ReplyLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: ReplyLevel::Error,
            text: text.into(),
        }
    }
}

impl fmt::Display for CommandReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = match self.level {
            ReplyLevel::Info => "ℹ️",
            ReplyLevel::Warning => "⚠️",
            ReplyLevel::Error => "🚫",
        };
        write!(f, "{icon} {}", self.text)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    /// Argument failed validation. The message is shown to the user as-is.
    #[error("{0}")]
    MalformedInput(String),

    #[error("Unknown subcommand `{0}`.")]
    UnknownSubcommand(String),
}

impl CommandError {
    fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }
}

/// A parsed admin subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Help,
    Url(String),
    /// Raw requested value; clamping happens when applied.
    RateLimit(i64),
    AllowBot(Author),
    DisableBot,
    Toggle,
    Send(String),
    Token(String),
    Headers(BTreeMap<String, String>),
}

impl AdminCommand {
    /// Parse `args`, the text following the command group name.
    ///
    /// `token` and `headers` are only recognized when the destination
    /// supports request headers.
    pub fn parse(
        args: &str,
        message: &InboundMessage,
        supports_headers: bool,
    ) -> Result<Self, CommandError> {
        let args = args.trim();
        let (sub, rest) = args
            .split_once(char::is_whitespace)
            .map_or((args, ""), |(sub, rest)| (sub, rest.trim()));

        match sub.to_ascii_lowercase().as_str() {
            "" | "help" => Ok(Self::Help),
            "url" => parse_url(rest).map(Self::Url),
            "ratelimit" => rest
                .parse::<i64>()
                .map(Self::RateLimit)
                .map_err(|_| CommandError::malformed("Rate limit must be a whole number of seconds.")),
            "allowbot" => {
                let user = message
                    .resolve_mention(rest)
                    .ok_or_else(|| CommandError::malformed("Could not find that user."))?;
                if !user.bot {
                    return Err(CommandError::malformed("That user is not a bot."));
                }
                Ok(Self::AllowBot(user.clone()))
            },
            "disablebot" => Ok(Self::DisableBot),
            "toggle" => Ok(Self::Toggle),
            "send" if rest.is_empty() => Err(CommandError::malformed("Nothing to send.")),
            "send" => Ok(Self::Send(rest.to_string())),
            "token" if supports_headers => {
                if rest.is_empty() || rest.contains(char::is_whitespace) {
                    return Err(CommandError::malformed("Token must be a single word."));
                }
                Ok(Self::Token(rest.to_string()))
            },
            "headers" if supports_headers => parse_headers(rest).map(Self::Headers),
            _ => Err(CommandError::UnknownSubcommand(sub.to_string())),
        }
    }

    /// Clamp a requested rate limit to the allowed floor.
    ///
    /// Returns the value to store and whether it was raised.
    pub fn clamp_rate_limit(requested: i64) -> (u64, bool) {
        match u64::try_from(requested) {
            Ok(secs) if secs >= MIN_RATE_LIMIT_SECS => (secs, false),
            _ => (MIN_RATE_LIMIT_SECS, true),
        }
    }
}

/// Help text listing the subcommands for `group`.
pub fn help_text(prefix: &str, group: &str, name: &str, supports_headers: bool) -> String {
    let mut lines = vec![
        format!("{name} configuration commands:"),
        format!("`{prefix}{group} url <url>` set the destination (https only)"),
        format!("`{prefix}{group} ratelimit <seconds>` minimum seconds between posts (>= {MIN_RATE_LIMIT_SECS})"),
        format!("`{prefix}{group} allowbot <@bot>` forward messages from this bot"),
        format!("`{prefix}{group} disablebot` stop forwarding bot messages"),
        format!("`{prefix}{group} toggle` enable or disable forwarding"),
        format!("`{prefix}{group} send <message>` send a message now"),
    ];
    if supports_headers {
        lines.push(format!("`{prefix}{group} token <token>` set the bearer token"));
        lines.push(format!("`{prefix}{group} headers <json>` set extra request headers"));
    }
    lines.join("\n")
}

fn parse_url(raw: &str) -> Result<String, CommandError> {
    if !raw.starts_with("https://") {
        return Err(CommandError::malformed("URL must start with https://"));
    }
    url::Url::parse(raw).map_err(|e| CommandError::malformed(format!("Invalid URL: {e}")))?;
    Ok(raw.to_string())
}

/// Parse a flat JSON object into header pairs.
///
/// Numbers and booleans are accepted and stringified (`{"Priority": 5}`).
fn parse_headers(raw: &str) -> Result<BTreeMap<String, String>, CommandError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|_| CommandError::malformed("Invalid JSON format."))?;
    let serde_json::Value::Object(object) = value else {
        return Err(CommandError::malformed("Headers must be a JSON object."));
    };

    let mut headers = BTreeMap::new();
    for (name, value) in object {
        let value = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            _ => {
                return Err(CommandError::malformed(format!(
                    "Header `{name}` must be a string, number or boolean."
                )));
            },
        };
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(CommandError::malformed(format!(
                "`{name}` is not a valid header name."
            )));
        }
        if HeaderValue::from_str(&value).is_err() {
            return Err(CommandError::malformed(format!(
                "Header `{name}` has an invalid value."
            )));
        }
        headers.insert(name, value);
    }
    Ok(headers)
}
