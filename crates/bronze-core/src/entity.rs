//! Platform entity model.
//!
//! These are the snapshots a [`Directory`](crate::directory::Directory)
//! hands back when a mention or id is resolved. They are deliberately plain
//! data: the engine never talks to the platform through them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A platform account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bot: false,
        }
    }

    /// Returns the mention markup for this user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// A user as seen from inside one guild.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub guild_id: u64,
    pub user: User,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub roles: Vec<u64>,
}

impl Member {
    pub fn new(guild_id: u64, user: User) -> Self {
        Self {
            guild_id,
            user,
            nickname: None,
            roles: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.user.id
    }

    /// The nickname if one is set, the account name otherwise.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.user.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub id: u64,
    pub guild_id: u64,
    pub name: String,
}

impl Role {
    pub fn new(id: u64, guild_id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            guild_id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel {
    pub id: u64,
    /// `None` for direct-message channels.
    #[serde(default)]
    pub guild_id: Option<u64>,
    pub name: String,
}

impl Channel {
    pub fn new(id: u64, guild_id: Option<u64>, name: impl Into<String>) -> Self {
        Self {
            id,
            guild_id,
            name: name.into(),
        }
    }
}

/// A custom guild emote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Emote {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub animated: bool,
}

impl Emote {
    pub fn new(id: u64, name: impl Into<String>, animated: bool) -> Self {
        Self {
            id,
            name: name.into(),
            animated,
        }
    }
}

/// A unicode emoji as it appeared in a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Emoji {
    pub code: String,
}

impl Emoji {
    /// Formats the emoji as `U+XXXX` code points joined by spaces.
    pub fn codepoints(&self) -> String {
        self.code
            .chars()
            .map(|c| format!("U+{:04X}", c as u32))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The kind of entity a mention grammar refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionKind {
    User,
    Role,
    Channel,
    Emote,
}

impl MentionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Role => "role",
            Self::Channel => "channel",
            Self::Emote => "emote",
        }
    }
}

impl fmt::Display for MentionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
