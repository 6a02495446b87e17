//! Converters for platform entities.
//!
//! In strict mode only an already-resolved mention of the right kind is
//! accepted. Otherwise a bare numeric id is looked up in the directory, and
//! failing that a case-insensitive name search picks an exact match, then a
//! prefix match, then the first substring match.

use crate::argument::Argument;
use crate::directory::Lookup;
use crate::entity::{Channel, Emote, Member, Role, User};

/// Picks the best name match among `items`, preserving their order within
/// each tier.
pub fn fuzzy_find<T, F>(items: Vec<T>, query: &str, names: F) -> Option<T>
where
    F: Fn(&T) -> Vec<String>,
{
    let query = query.to_lowercase();
    if query.is_empty() {
        return None;
    }

    let mut prefix = None;
    let mut substring = None;
    for item in items {
        let lowered: Vec<String> = names(&item).iter().map(|n| n.to_lowercase()).collect();
        if lowered.iter().any(|n| *n == query) {
            return Some(item);
        }
        if prefix.is_none() && lowered.iter().any(|n| n.starts_with(&query)) {
            prefix = Some(item);
        } else if substring.is_none() && lowered.iter().any(|n| n.contains(&query)) {
            substring = Some(item);
        }
    }
    prefix.or(substring)
}

fn bare_id(arg: &Argument) -> Option<u64> {
    if arg.is_mention() {
        return None;
    }
    arg.raw().parse().ok()
}

/// The search text for a non-mention argument, without a leading sigil.
fn query<'a>(arg: &'a Argument, sigil: char) -> Option<&'a str> {
    if arg.is_mention() {
        return None;
    }
    Some(arg.raw().strip_prefix(sigil).unwrap_or(arg.raw()))
}

pub fn user(arg: &Argument, lookup: &Lookup<'_>, strict: bool) -> Option<User> {
    if let Some(user) = arg.as_user() {
        return Some(user.clone());
    }
    if strict {
        return None;
    }
    let directory = lookup.directory();
    if let Some(id) = bare_id(arg) {
        return directory.user(id);
    }
    fuzzy_find(directory.users(), query(arg, '@')?, |u: &User| {
        vec![u.name.clone()]
    })
}

pub fn member(arg: &Argument, lookup: &Lookup<'_>, strict: bool) -> Option<Member> {
    if let Some(member) = arg.as_member() {
        return Some(member.clone());
    }
    if strict {
        return None;
    }
    let guild_id = lookup.guild_id()?;
    let directory = lookup.directory();
    if let Some(id) = bare_id(arg) {
        return directory.member(guild_id, id);
    }
    fuzzy_find(directory.members(guild_id), query(arg, '@')?, |m: &Member| {
        let mut names = vec![m.user.name.clone()];
        names.extend(m.nickname.clone());
        names
    })
}

pub fn role(arg: &Argument, lookup: &Lookup<'_>, strict: bool) -> Option<Role> {
    if let Some(role) = arg.as_role() {
        return Some(role.clone());
    }
    if strict {
        return None;
    }
    if let Some(id) = bare_id(arg) {
        return lookup.role(id);
    }
    let guild_id = lookup.guild_id()?;
    fuzzy_find(
        lookup.directory().roles(guild_id),
        query(arg, '@')?,
        |r: &Role| vec![r.name.clone()],
    )
}

pub fn channel(arg: &Argument, lookup: &Lookup<'_>, strict: bool) -> Option<Channel> {
    if let Some(channel) = arg.as_channel() {
        return Some(channel.clone());
    }
    if strict {
        return None;
    }
    if let Some(id) = bare_id(arg) {
        return lookup.channel(id);
    }
    let guild_id = lookup.guild_id()?;
    fuzzy_find(
        lookup.directory().channels(guild_id),
        query(arg, '#')?,
        |c: &Channel| vec![c.name.clone()],
    )
}

/// Emotes have no name listing in the directory, so non-strict mode only adds
/// bare id lookup.
pub fn emote(arg: &Argument, lookup: &Lookup<'_>, strict: bool) -> Option<Emote> {
    if let Some(emote) = arg.as_emote() {
        return Some(emote.clone());
    }
    if strict {
        return None;
    }
    bare_id(arg).and_then(|id| lookup.emote(id))
}
