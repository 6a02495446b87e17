//! Heuristic date-time converter.
//!
//! Input is read relative to a reference instant. Recognised forms, after
//! lowercasing, stripping ordinal suffixes (`1st` -> `1`) and dropping the
//! word `at`:
//!
//! * `in <duration>` (any form the duration converter accepts);
//! * `today` / `tomorrow`, optionally followed or preceded by a time;
//! * a time (`17:30`, `5pm`, `5:30 pm`, `17:30:15`);
//! * a date (`2026-03-01`, `3/1`, `3/1/2026`, `march 1`, `1 march 2026`);
//! * a date and a time in either order.
//!
//! A bare time already in the past moves to the next day; a date written
//! without a year already in the past moves to the next year. A date with an
//! explicit year is taken as written. Everything is in UTC.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use regex::Regex;

use super::duration;

static ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)\b").expect("valid regex"));
static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})(?::(\d{2}))?(?::(\d{2}))?\s*(am|pm)?$").expect("valid regex")
});
static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("valid regex"));
static SLASH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})(?:/(\d{4}))?$").expect("valid regex"));
static MONTH_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z]{3})[a-z]*\.?\s+(\d{1,2}),?(?:\s+(\d{4}))?$").expect("valid regex")
});
static DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})\s+([a-z]{3})[a-z]*\.?,?(?:\s+(\d{4}))?$").expect("valid regex")
});

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// A calendar date and whether the year was written out.
#[derive(Debug, Clone, Copy)]
struct DateSpec {
    date: NaiveDate,
    explicit_year: bool,
}

pub fn parse(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = normalize(text);
    if text.is_empty() {
        return None;
    }

    if let Some(rest) = text.strip_prefix("in ") {
        let offset = chrono::Duration::from_std(duration::parse(rest)?).ok()?;
        return now.checked_add_signed(offset);
    }

    if let Some((days, rest)) = split_keyword(&text) {
        let date = now.date_naive().checked_add_days(Days::new(days))?;
        if rest.is_empty() {
            return Some(date.and_time(now.time()).and_utc());
        }
        return Some(date.and_time(parse_time(&rest)?).and_utc());
    }

    if let Some(time) = parse_time(&text) {
        let candidate = now.date_naive().and_time(time).and_utc();
        if candidate < now {
            return candidate.checked_add_days(Days::new(1));
        }
        return Some(candidate);
    }

    if let Some(spec) = parse_date(&text, now.year()) {
        return roll_year(spec, spec.date.and_time(now.time()).and_utc(), now);
    }

    let words: Vec<&str> = text.split(' ').collect();
    for split in 1..words.len() {
        let head = words[..split].join(" ");
        let tail = words[split..].join(" ");
        let pair = parse_date(&head, now.year())
            .zip(parse_time(&tail))
            .or_else(|| parse_date(&tail, now.year()).zip(parse_time(&head)));
        if let Some((spec, time)) = pair {
            return roll_year(spec, spec.date.and_time(time).and_utc(), now);
        }
    }
    None
}

fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = ORDINAL.replace_all(&lowered, "$1");
    stripped
        .split_whitespace()
        .filter(|word| *word != "at")
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits off a leading or trailing `today` / `tomorrow`, returning the day
/// offset and the remaining text.
fn split_keyword(text: &str) -> Option<(u64, String)> {
    let days = |word: &str| match word {
        "today" => Some(0),
        "tomorrow" => Some(1),
        _ => None,
    };
    let mut words: Vec<&str> = text.split(' ').collect();
    if let Some(offset) = words.first().and_then(|w| days(*w)) {
        words.remove(0);
        return Some((offset, words.join(" ")));
    }
    if let Some(offset) = words.last().and_then(|w| days(*w)) {
        words.pop();
        return Some((offset, words.join(" ")));
    }
    None
}

/// A bare number is not a time; either minutes or an am/pm marker is needed.
fn parse_time(text: &str) -> Option<NaiveTime> {
    let caps = TIME.captures(text)?;
    let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    let second: u32 = match caps.get(3) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };

    match caps.get(4).map(|m| m.as_str()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            hour %= 12;
            if meridiem == "pm" {
                hour += 12;
            }
        }
        None if caps.get(2).is_none() => return None,
        None => {}
    }
    NaiveTime::from_hms_opt(hour, minute, second)
}

fn parse_date(text: &str, current_year: i32) -> Option<DateSpec> {
    if let Some(caps) = ISO_DATE.captures(text) {
        let date = NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )?;
        return Some(DateSpec {
            date,
            explicit_year: true,
        });
    }

    let (month, day, year) = if let Some(caps) = SLASH_DATE.captures(text) {
        (
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps.get(3).map(|y| y.as_str()),
        )
    } else if let Some(caps) = MONTH_FIRST.captures(text) {
        (
            month_number(&caps[1])?,
            caps[2].parse().ok()?,
            caps.get(3).map(|y| y.as_str()),
        )
    } else if let Some(caps) = DAY_FIRST.captures(text) {
        (
            month_number(&caps[2])?,
            caps[1].parse().ok()?,
            caps.get(3).map(|y| y.as_str()),
        )
    } else {
        return None;
    };

    let explicit_year = year.is_some();
    let year = match year {
        Some(year) => year.parse().ok()?,
        None => current_year,
    };
    Some(DateSpec {
        date: NaiveDate::from_ymd_opt(year, month, day)?,
        explicit_year,
    })
}

fn month_number(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|index| index as u32 + 1)
}

fn roll_year(
    spec: DateSpec,
    candidate: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if spec.explicit_year || candidate >= now {
        return Some(candidate);
    }
    // Feb 29 has no counterpart next year; the value is taken as written.
    Some(candidate.with_year(candidate.year() + 1).unwrap_or(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_time_only_rolls_to_next_day() {
        assert_eq!(parse("5pm", now()), Some(at(2026, 10, 17, 17, 0)));
        assert_eq!(parse("9am", now()), Some(at(2026, 10, 18, 9, 0)));
        assert_eq!(parse("at 11:45", now()), Some(at(2026, 10, 18, 11, 45)));
        assert_eq!(parse("12 am", now()), Some(at(2026, 10, 18, 0, 0)));
    }

    #[test]
    fn test_keywords() {
        assert_eq!(parse("tomorrow at 9:30", now()), Some(at(2026, 10, 18, 9, 30)));
        assert_eq!(parse("9:30 tomorrow", now()), Some(at(2026, 10, 18, 9, 30)));
        assert_eq!(parse("today 8am", now()), Some(at(2026, 10, 17, 8, 0)));
        assert_eq!(parse("tomorrow", now()), Some(at(2026, 10, 18, 12, 0)));
    }

    #[test]
    fn test_relative_offsets() {
        assert_eq!(parse("in 2 hours", now()), Some(at(2026, 10, 17, 14, 0)));
        assert_eq!(
            parse("in 1:30", now()),
            Some(at(2026, 10, 17, 12, 1) + chrono::Duration::seconds(30))
        );
        assert_eq!(parse("in forever", now()), None);
    }

    #[test]
    fn test_dates_without_year_roll_forward() {
        assert_eq!(parse("March 1st", now()), Some(at(2027, 3, 1, 12, 0)));
        assert_eq!(parse("1/2", now()), Some(at(2027, 1, 2, 12, 0)));
        assert_eq!(parse("25 december", now()), Some(at(2026, 12, 25, 12, 0)));
        assert_eq!(
            parse("December 25th at 8pm", now()),
            Some(at(2026, 12, 25, 20, 0))
        );
    }

    #[test]
    fn test_explicit_year_is_never_rolled() {
        assert_eq!(
            parse("2025-01-01 10:00", now()),
            Some(at(2025, 1, 1, 10, 0))
        );
        assert_eq!(parse("3/1/2020", now()), Some(at(2020, 3, 1, 12, 0)));
        assert_eq!(
            parse("10:00 jan 5, 2024", now()),
            Some(at(2024, 1, 5, 10, 0))
        );
    }

    #[test]
    fn test_rejects_nonsense() {
        assert_eq!(parse("", now()), None);
        assert_eq!(parse("soon", now()), None);
        assert_eq!(parse("25:00", now()), None);
        assert_eq!(parse("13pm", now()), None);
        assert_eq!(parse("5", now()), None);
        assert_eq!(parse("2/30", now()), None);
    }
}
