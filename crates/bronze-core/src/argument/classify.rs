use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use super::{Argument, ArgumentKind};
use crate::directory::Lookup;
use crate::emoji;
use crate::entity::{Emoji, MentionKind};

// Grammars are anchored by their brackets, so they are tried before emoji
// recognition and can never collide with bare emoji text.
static ROLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^<@&(\d+)>$").expect("valid regex"));
static USER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^<@!?(\d+)>$").expect("valid regex"));
static CHANNEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<#(\d+)>$").expect("valid regex"));
static EMOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<a?:([A-Za-z0-9_~]{1,32}):(\d+)>$").expect("valid regex"));

fn capture_id(re: &Regex, token: &str, group: usize) -> Option<u64> {
    re.captures(token)?.get(group)?.as_str().parse().ok()
}

/// Classifies one token.
///
/// Mention grammars are tried in the order role, user, channel, emote. A
/// grammar only matches when its id fits an unsigned 64-bit integer. A
/// matching mention that the directory cannot resolve becomes
/// [`ArgumentKind::InvalidMention`].
pub fn classify(token: &str, lookup: &Lookup<'_>) -> Argument {
    let kind = mention(token, lookup).unwrap_or_else(|| {
        if emoji::is_emoji(token) {
            ArgumentKind::Emoji(Emoji {
                code: token.to_string(),
            })
        } else {
            ArgumentKind::Generic
        }
    });
    Argument::new(token, kind)
}

fn mention(token: &str, lookup: &Lookup<'_>) -> Option<ArgumentKind> {
    if !token.starts_with('<') || !token.ends_with('>') {
        return None;
    }

    let (kind, id) = if let Some(id) = capture_id(&ROLE, token, 1) {
        (MentionKind::Role, id)
    } else if let Some(id) = capture_id(&USER, token, 1) {
        (MentionKind::User, id)
    } else if let Some(id) = capture_id(&CHANNEL, token, 1) {
        (MentionKind::Channel, id)
    } else if let Some(id) = capture_id(&EMOTE, token, 2) {
        (MentionKind::Emote, id)
    } else {
        return None;
    };

    let resolved = match kind {
        MentionKind::User => lookup.user_or_member(id).map(|found| match found {
            Ok(member) => ArgumentKind::Member(member),
            Err(user) => ArgumentKind::User(user),
        }),
        MentionKind::Role => lookup.role(id).map(ArgumentKind::Role),
        MentionKind::Channel => lookup.channel(id).map(ArgumentKind::Channel),
        MentionKind::Emote => lookup.emote(id).map(ArgumentKind::Emote),
    };

    Some(resolved.unwrap_or_else(|| {
        trace!(%kind, id, "mention did not resolve");
        ArgumentKind::InvalidMention { kind, id }
    }))
}
