//! Duration converter.
//!
//! Two notations are understood:
//!
//! * colon segments, right aligned onto `d:h:m:s` (`90`, `1:30`, `2:00:00`);
//! * `<n> <unit>` pairs summed together (`2 min 30 sec`, `1h 15m`).

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

static COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?::\d+){0,3}$").expect("valid regex"));
static UNIT_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*([A-Za-z]+)").expect("valid regex"));

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// Seconds per unit alias, matched case-insensitively.
fn unit_seconds(unit: &str) -> Option<u64> {
    match unit.to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(MINUTE),
        "h" | "hour" | "hours" => Some(HOUR),
        "d" | "day" | "days" => Some(DAY),
        "wk" | "week" | "weeks" => Some(WEEK),
        _ => None,
    }
}

pub fn parse(text: &str) -> Option<Duration> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if COLON.is_match(text) {
        return parse_colon(text);
    }
    parse_units(text)
}

fn parse_colon(text: &str) -> Option<Duration> {
    const WEIGHTS: [u64; 4] = [DAY, HOUR, MINUTE, 1];

    let segments: Vec<u64> = text
        .split(':')
        .map(|s| s.parse().ok())
        .collect::<Option<_>>()?;
    let offset = WEIGHTS.len() - segments.len();

    let mut total: u64 = 0;
    for (value, weight) in segments.iter().zip(&WEIGHTS[offset..]) {
        total = total.checked_add(value.checked_mul(*weight)?)?;
    }
    Some(Duration::from_secs(total))
}

fn parse_units(text: &str) -> Option<Duration> {
    let mut total: u64 = 0;
    let mut consumed = 0;

    for caps in UNIT_PAIR.captures_iter(text) {
        let whole = caps.get(0)?;
        // Only whitespace may separate pairs.
        if !text[consumed..whole.start()].trim().is_empty() {
            return None;
        }
        consumed = whole.end();

        let amount: u64 = caps.get(1)?.as_str().parse().ok()?;
        let unit = unit_seconds(caps.get(2)?.as_str())?;
        total = total.checked_add(amount.checked_mul(unit)?)?;
    }

    if consumed == 0 || !text[consumed..].trim().is_empty() {
        return None;
    }
    Some(Duration::from_secs(total))
}
