//! Unicode emoji recognition.
//!
//! Recognition works on a fixed, sorted table of code-point ranges. Most
//! tokens are rejected before the table is touched: they are too long, or
//! their first scalar is nowhere near an emoji block.
//!
//! An emoji is one element, or several joined by ZWJ. An element is a base
//! code point with an optional variation selector, skin-tone modifier and tag
//! run, or a pair of regional indicators.

use std::iter::Peekable;
use std::str::Chars;

/// Longest token (in UTF-16 units) that can still be a single emoji.
pub const MAX_EMOJI_UNITS: usize = 11;

const ZWJ: char = '\u{200D}';
const KEYCAP: char = '\u{20E3}';
const VS15: char = '\u{FE0E}';
const VS16: char = '\u{FE0F}';

/// Emoji base code points, sorted and non-overlapping.
static EMOJI_RANGES: &[(u32, u32)] = &[
    (0x00A9, 0x00A9),
    (0x00AE, 0x00AE),
    (0x203C, 0x203C),
    (0x2049, 0x2049),
    (0x2122, 0x2122),
    (0x2139, 0x2139),
    (0x2194, 0x2199),
    (0x21A9, 0x21AA),
    (0x231A, 0x231B),
    (0x2328, 0x2328),
    (0x23CF, 0x23CF),
    (0x23E9, 0x23F3),
    (0x23F8, 0x23FA),
    (0x24C2, 0x24C2),
    (0x25AA, 0x25AB),
    (0x25B6, 0x25B6),
    (0x25C0, 0x25C0),
    (0x25FB, 0x25FE),
    (0x2600, 0x27BF),
    (0x2934, 0x2935),
    (0x2B05, 0x2B07),
    (0x2B1B, 0x2B1C),
    (0x2B50, 0x2B50),
    (0x2B55, 0x2B55),
    (0x3030, 0x3030),
    (0x303D, 0x303D),
    (0x3297, 0x3297),
    (0x3299, 0x3299),
    (0x1F004, 0x1F004),
    (0x1F0CF, 0x1F0CF),
    (0x1F170, 0x1F251),
    (0x1F300, 0x1F64F),
    (0x1F680, 0x1F6FF),
    (0x1F7E0, 0x1F7F0),
    (0x1F90C, 0x1F9FF),
    (0x1FA70, 0x1FAFF),
];

fn in_table(c: char) -> bool {
    let cp = c as u32;
    EMOJI_RANGES
        .binary_search_by(|&(lo, hi)| {
            if hi < cp {
                std::cmp::Ordering::Less
            } else if lo > cp {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .is_ok()
}

/// Cheap block check run before the table search.
fn near_emoji_block(c: char) -> bool {
    let cp = c as u32;
    cp == 0xA9 || cp == 0xAE || (0x2000..=0x32FF).contains(&cp) || (0x1F000..=0x1FAFF).contains(&cp)
}

fn is_modifier(c: char) -> bool {
    ('\u{1F3FB}'..='\u{1F3FF}').contains(&c)
}

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

fn is_tag(c: char) -> bool {
    ('\u{E0020}'..='\u{E007F}').contains(&c)
}

/// Consumes one element of a sequence.
fn element(chars: &mut Peekable<Chars<'_>>) -> bool {
    let Some(base) = chars.next() else {
        return false;
    };
    if is_regional_indicator(base) {
        return chars.next().is_some_and(is_regional_indicator);
    }
    if is_modifier(base) || !in_table(base) {
        return false;
    }
    chars.next_if(|&c| c == VS15 || c == VS16);
    chars.next_if(|&c| is_modifier(c));
    while chars.next_if(|&c| is_tag(c)).is_some() {}
    true
}

fn is_keycap(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(base) = chars.next() else {
        return false;
    };
    if !(base.is_ascii_digit() || base == '#' || base == '*') {
        return false;
    }
    match (chars.next(), chars.next(), chars.next()) {
        (Some(KEYCAP), None, _) => true,
        (Some(VS16), Some(KEYCAP), None) => true,
        _ => false,
    }
}

/// Returns `true` if `s` is exactly one emoji: a single code point or a
/// modifier, ZWJ, flag, tag or keycap sequence. Two emoji side by side are
/// not one.
pub fn is_emoji(s: &str) -> bool {
    let units = s.encode_utf16().count();
    if units == 0 || units > MAX_EMOJI_UNITS {
        return false;
    }

    let Some(first) = s.chars().next() else {
        return false;
    };
    if first.is_ascii() {
        return is_keycap(s);
    }
    if !near_emoji_block(first) || !in_table(first) {
        return false;
    }

    let mut chars = s.chars().peekable();
    loop {
        if !element(&mut chars) {
            return false;
        }
        match chars.next() {
            None => return true,
            Some(ZWJ) => {}
            Some(_) => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted() {
        assert!(EMOJI_RANGES.windows(2).all(|w| w[0].1 < w[1].0));
        assert!(EMOJI_RANGES.iter().all(|(lo, hi)| lo <= hi));
    }

    #[test]
    fn test_simple_emoji() {
        assert!(is_emoji("😀"));
        assert!(is_emoji("🏓"));
        assert!(is_emoji("❤️"));
        assert!(is_emoji("©"));
    }

    #[test]
    fn test_sequences() {
        assert!(is_emoji("👍🏽"));
        assert!(is_emoji("👨‍👩‍👧"));
        assert!(is_emoji("🇩🇪"));
        assert!(is_emoji("1️⃣"));
        assert!(is_emoji("#⃣"));
        assert!(is_emoji("🏳️‍🌈"));
        assert!(is_emoji("👩🏽‍💻"));
    }

    #[test]
    fn test_rejects_adjacent_emoji() {
        assert!(!is_emoji("😀😀"));
        assert!(!is_emoji("👍👍🏽"));
        assert!(!is_emoji("🇩🇪🇫🇷"));
        assert!(!is_emoji("🇩"));
        assert!(!is_emoji("😀\u{200D}"));
        assert!(!is_emoji("🏽"));
    }

    #[test]
    fn test_rejects_text() {
        assert!(!is_emoji(""));
        assert!(!is_emoji("a"));
        assert!(!is_emoji("12"));
        assert!(!is_emoji("héllo"));
        assert!(!is_emoji(":smile:"));
        assert!(!is_emoji("😀x"));
    }

    #[test]
    fn test_rejects_long_tokens() {
        assert!(!is_emoji("😀😀😀😀😀😀"));
    }
}
