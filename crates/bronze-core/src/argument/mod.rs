//! Classified message arguments.
//!
//! An [`Argument`] is one token of a message after classification: either a
//! resolved mention, an emoji, an unresolvable mention or generic text.
//! Arguments are immutable; an [`ArgumentList`] hands out shared references
//! so re-reading a position yields the very same object.

mod classify;
mod list;

pub use classify::classify;
pub use list::ArgumentList;

use std::fmt;

use crate::entity::{Channel, Emoji, Emote, MentionKind, Member, Role, User};
use crate::parse::{number, range};

/// What an argument turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentKind {
    /// Plain text.
    Generic,
    /// A user mention resolved outside of any guild (or to a non-member).
    User(User),
    /// A user mention resolved to a member of the current guild.
    Member(Member),
    Role(Role),
    Channel(Channel),
    Emote(Emote),
    Emoji(Emoji),
    /// A well-formed mention whose target could not be resolved.
    InvalidMention { kind: MentionKind, id: u64 },
}

/// A classified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    raw: String,
    kind: ArgumentKind,
}

impl Argument {
    pub fn new(raw: impl Into<String>, kind: ArgumentKind) -> Self {
        Self {
            raw: raw.into(),
            kind,
        }
    }

    pub fn generic(raw: impl Into<String>) -> Self {
        Self::new(raw, ArgumentKind::Generic)
    }

    /// The token text exactly as written.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> &ArgumentKind {
        &self.kind
    }

    pub fn is_generic(&self) -> bool {
        matches!(self.kind, ArgumentKind::Generic)
    }

    /// `true` for every mention grammar match, resolved or not.
    pub fn is_mention(&self) -> bool {
        self.mention_kind().is_some()
    }

    pub fn is_invalid_mention(&self) -> bool {
        matches!(self.kind, ArgumentKind::InvalidMention { .. })
    }

    pub fn mention_kind(&self) -> Option<MentionKind> {
        match &self.kind {
            ArgumentKind::User(_) | ArgumentKind::Member(_) => Some(MentionKind::User),
            ArgumentKind::Role(_) => Some(MentionKind::Role),
            ArgumentKind::Channel(_) => Some(MentionKind::Channel),
            ArgumentKind::Emote(_) => Some(MentionKind::Emote),
            ArgumentKind::InvalidMention { kind, .. } => Some(*kind),
            ArgumentKind::Generic | ArgumentKind::Emoji(_) => None,
        }
    }

    /// The id carried by a mention, resolved or not.
    pub fn mention_id(&self) -> Option<u64> {
        match &self.kind {
            ArgumentKind::User(user) => Some(user.id),
            ArgumentKind::Member(member) => Some(member.id()),
            ArgumentKind::Role(role) => Some(role.id),
            ArgumentKind::Channel(channel) => Some(channel.id),
            ArgumentKind::Emote(emote) => Some(emote.id),
            ArgumentKind::InvalidMention { id, .. } => Some(*id),
            ArgumentKind::Generic | ArgumentKind::Emoji(_) => None,
        }
    }

    /// The mentioned account, whether it resolved to a member or a user.
    pub fn as_user(&self) -> Option<&User> {
        match &self.kind {
            ArgumentKind::User(user) => Some(user),
            ArgumentKind::Member(member) => Some(&member.user),
            _ => None,
        }
    }

    pub fn as_member(&self) -> Option<&Member> {
        match &self.kind {
            ArgumentKind::Member(member) => Some(member),
            _ => None,
        }
    }

    pub fn as_role(&self) -> Option<&Role> {
        match &self.kind {
            ArgumentKind::Role(role) => Some(role),
            _ => None,
        }
    }

    pub fn as_channel(&self) -> Option<&Channel> {
        match &self.kind {
            ArgumentKind::Channel(channel) => Some(channel),
            _ => None,
        }
    }

    pub fn as_emote(&self) -> Option<&Emote> {
        match &self.kind {
            ArgumentKind::Emote(emote) => Some(emote),
            _ => None,
        }
    }

    pub fn as_emoji(&self) -> Option<&Emoji> {
        match &self.kind {
            ArgumentKind::Emoji(emoji) => Some(emoji),
            _ => None,
        }
    }

    // The predicates below look at the raw text only, so a mention such as
    // `<@123>` is never numeric even though it carries a number.

    pub fn is_integer(&self) -> bool {
        number::parse_i32(&self.raw, false).is_some()
    }

    pub fn is_long(&self) -> bool {
        number::parse_i64(&self.raw, false).is_some()
    }

    pub fn is_hex(&self) -> bool {
        number::parse_i64(&self.raw, true).is_some()
    }

    pub fn is_float(&self) -> bool {
        number::parse_f64(&self.raw).is_some()
    }

    pub fn is_boolean(&self) -> bool {
        number::parse_bool(&self.raw).is_some()
    }

    pub fn is_range(&self) -> bool {
        range::IntRange::parse(&self.raw).is_some()
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
