//! Shared chat-host types used across all hookrelay crates.

pub mod types;

pub use types::{Author, ChannelId, GuildId, GuildRef, InboundMessage, UserId};
