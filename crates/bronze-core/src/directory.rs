//! Platform directory collaborator.
//!
//! The engine resolves mentions, bare ids and name searches through a
//! [`Directory`]. The chat-platform binding implements it over its own
//! caches; [`MemoryDirectory`] is an in-process implementation used by tests
//! and the console demo.

use std::collections::HashMap;

use crate::entity::{Channel, Emote, Member, Role, User};

/// Read-only view of the platform's entities.
///
/// Implementations must be cheap to query: the classifier calls into the
/// directory once per mention-shaped token.
pub trait Directory: Send + Sync {
    fn user(&self, id: u64) -> Option<User>;

    fn member(&self, guild_id: u64, user_id: u64) -> Option<Member>;

    fn role(&self, guild_id: u64, role_id: u64) -> Option<Role>;

    fn channel(&self, id: u64) -> Option<Channel>;

    fn emote(&self, id: u64) -> Option<Emote>;

    /// All users known to the bot, used by non-strict name search.
    fn users(&self) -> Vec<User> {
        Vec::new()
    }

    fn members(&self, _guild_id: u64) -> Vec<Member> {
        Vec::new()
    }

    fn roles(&self, _guild_id: u64) -> Vec<Role> {
        Vec::new()
    }

    fn channels(&self, _guild_id: u64) -> Vec<Channel> {
        Vec::new()
    }
}

/// A directory that knows nothing. Every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDirectory;

impl Directory for EmptyDirectory {
    fn user(&self, _id: u64) -> Option<User> {
        None
    }

    fn member(&self, _guild_id: u64, _user_id: u64) -> Option<Member> {
        None
    }

    fn role(&self, _guild_id: u64, _role_id: u64) -> Option<Role> {
        None
    }

    fn channel(&self, _id: u64) -> Option<Channel> {
        None
    }

    fn emote(&self, _id: u64) -> Option<Emote> {
        None
    }
}

/// The lookup scope for one message: a directory plus the guild the
/// message was sent in, if any.
#[derive(Clone, Copy)]
pub struct Lookup<'a> {
    directory: &'a dyn Directory,
    guild_id: Option<u64>,
}

impl<'a> Lookup<'a> {
    pub fn new(directory: &'a dyn Directory, guild_id: Option<u64>) -> Self {
        Self {
            directory,
            guild_id,
        }
    }

    pub fn directory(&self) -> &'a dyn Directory {
        self.directory
    }

    pub fn guild_id(&self) -> Option<u64> {
        self.guild_id
    }

    /// Resolves a user mention id: a member of the current guild first, the
    /// global account otherwise.
    pub fn user_or_member(&self, id: u64) -> Option<Result<Member, User>> {
        if let Some(guild_id) = self.guild_id
            && let Some(member) = self.directory.member(guild_id, id)
        {
            return Some(Ok(member));
        }
        self.directory.user(id).map(Err)
    }

    pub fn role(&self, id: u64) -> Option<Role> {
        self.guild_id
            .and_then(|guild_id| self.directory.role(guild_id, id))
    }

    pub fn channel(&self, id: u64) -> Option<Channel> {
        self.directory.channel(id)
    }

    pub fn emote(&self, id: u64) -> Option<Emote> {
        self.directory.emote(id)
    }
}

impl std::fmt::Debug for Lookup<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lookup")
            .field("guild_id", &self.guild_id)
            .finish_non_exhaustive()
    }
}

/// An in-memory [`Directory`].
///
/// Populated once through the builder-style `with_*` methods, then shared
/// read-only.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    users: HashMap<u64, User>,
    members: HashMap<(u64, u64), Member>,
    roles: HashMap<u64, Role>,
    channels: HashMap<u64, Channel>,
    emotes: HashMap<u64, Emote>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id, user);
        self
    }

    /// Adds a member; the underlying user is registered as well.
    pub fn with_member(mut self, member: Member) -> Self {
        self.users.insert(member.user.id, member.user.clone());
        self.members.insert((member.guild_id, member.user.id), member);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role.id, role);
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channels.insert(channel.id, channel);
        self
    }

    pub fn with_emote(mut self, emote: Emote) -> Self {
        self.emotes.insert(emote.id, emote);
        self
    }
}

fn sorted_by_id<T: Clone>(items: impl Iterator<Item = T>, id: impl Fn(&T) -> u64) -> Vec<T> {
    let mut out: Vec<T> = items.collect();
    out.sort_by_key(|item| id(item));
    out
}

impl Directory for MemoryDirectory {
    fn user(&self, id: u64) -> Option<User> {
        self.users.get(&id).cloned()
    }

    fn member(&self, guild_id: u64, user_id: u64) -> Option<Member> {
        self.members.get(&(guild_id, user_id)).cloned()
    }

    fn role(&self, guild_id: u64, role_id: u64) -> Option<Role> {
        self.roles
            .get(&role_id)
            .filter(|role| role.guild_id == guild_id)
            .cloned()
    }

    fn channel(&self, id: u64) -> Option<Channel> {
        self.channels.get(&id).cloned()
    }

    fn emote(&self, id: u64) -> Option<Emote> {
        self.emotes.get(&id).cloned()
    }

    // Name search is first-match-wins, so listings are returned in id order
    // to keep results stable across runs.
    fn users(&self) -> Vec<User> {
        sorted_by_id(self.users.values().cloned(), |u| u.id)
    }

    fn members(&self, guild_id: u64) -> Vec<Member> {
        sorted_by_id(
            self.members
                .values()
                .filter(|m| m.guild_id == guild_id)
                .cloned(),
            |m| m.user.id,
        )
    }

    fn roles(&self, guild_id: u64) -> Vec<Role> {
        sorted_by_id(
            self.roles
                .values()
                .filter(|r| r.guild_id == guild_id)
                .cloned(),
            |r| r.id,
        )
    }

    fn channels(&self, guild_id: u64) -> Vec<Channel> {
        sorted_by_id(
            self.channels
                .values()
                .filter(|c| c.guild_id == Some(guild_id))
                .cloned(),
            |c| c.id,
        )
    }
}
