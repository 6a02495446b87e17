//! The event collaborator.
//!
//! The platform binding wraps each incoming message in something that
//! implements [`Event`]. The engine reads the text and ids from it, resolves
//! entities through its [`Directory`], and sends replies back through it; it
//! never talks to the network itself.

use std::fmt;

use serde::{Deserialize, Serialize};

use bronze_core::Directory;

use crate::error::ReplyError;

/// An outbound reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Reply {
    /// Plain text.
    Text(String),
    /// A structured payload, passed to the platform as-is.
    Embed(serde_json::Value),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn embed(value: serde_json::Value) -> Self {
        Self::Embed(value)
    }

    /// The text of a [`Reply::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Embed(_) => None,
        }
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Embed(value) => write!(f, "{value}"),
        }
    }
}

/// One incoming message, as seen by the engine.
pub trait Event: Send + Sync {
    /// The message text with any bot prefix already removed.
    fn content(&self) -> &str;

    /// Whether the message asked for help rather than execution.
    fn help_mode(&self) -> bool {
        false
    }

    /// The guild the message was sent in; `None` for direct messages.
    fn guild_id(&self) -> Option<u64>;

    fn channel_id(&self) -> u64;

    fn author_id(&self) -> u64;

    fn directory(&self) -> &dyn Directory;

    /// Sends a reply to wherever the message came from.
    fn reply(&self, reply: Reply) -> Result<(), ReplyError>;
}

impl fmt::Debug for dyn Event + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("content", &self.content())
            .field("guild_id", &self.guild_id())
            .field("channel_id", &self.channel_id())
            .field("author_id", &self.author_id())
            .field("help_mode", &self.help_mode())
            .finish()
    }
}
