use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            #[must_use]
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake_id!(
    /// Chat server identifier. Settings are scoped per guild.
    GuildId
);
snowflake_id!(
    /// Text channel identifier. Rate limits are tracked per channel.
    ChannelId
);
snowflake_id!(UserId);

/// The guild a message was posted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRef {
    pub id: GuildId,
    pub name: String,
}

/// Message author as resolved by the chat host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub bot: bool,
}

/// A chat message delivered by the host to every active plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// `None` for direct messages.
    #[serde(default)]
    pub guild: Option<GuildRef>,
    pub channel_id: ChannelId,
    pub author: Author,
    #[serde(default)]
    pub content: String,
    /// Users mentioned in the message, used to resolve command arguments.
    #[serde(default)]
    pub mentions: Vec<Author>,
    /// Set by the host when the message invoked a registered command.
    #[serde(default)]
    pub is_command: bool,
    /// Whether the author holds the manage-guild permission.
    #[serde(default)]
    pub author_is_admin: bool,
}

impl InboundMessage {
    /// Find a user by raw id or `<@id>` / `<@!id>` mention among the
    /// message's mentions.
    pub fn resolve_mention(&self, token: &str) -> Option<&Author> {
        let raw = token
            .strip_prefix("<@")
            .and_then(|rest| rest.strip_suffix('>'))
            .map(|rest| rest.trim_start_matches('!'))
            .unwrap_or(token);
        let id: u64 = raw.parse().ok()?;
        self.mentions.iter().find(|user| user.id.get() == id)
    }
}
