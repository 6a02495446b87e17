//! Inclusive integer ranges written as `a-b`.

use std::sync::LazyLock;

use regex::Regex;

static RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?\d+)(?:-(-?\d+))?$").expect("valid regex"));

/// An inclusive run of integers from `start` to `end`.
///
/// When `start > end` the run counts down, so `8-5` yields `8, 7, 6, 5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntRange {
    pub start: i64,
    pub end: i64,
}

impl IntRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Parses `a-b` or a bare integer `a` (a single-element range).
    pub fn parse(text: &str) -> Option<Self> {
        let caps = RANGE.captures(text)?;
        let start: i64 = caps.get(1)?.as_str().parse().ok()?;
        let end = match caps.get(2) {
            Some(end) => end.as_str().parse().ok()?,
            None => start,
        };
        Some(Self::new(start, end))
    }

    pub fn is_descending(&self) -> bool {
        self.start > self.end
    }

    pub fn len(&self) -> u64 {
        self.start.abs_diff(self.end) + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, value: i64) -> bool {
        value >= self.start.min(self.end) && value <= self.start.max(self.end)
    }

    pub fn iter(&self) -> RangeIter {
        RangeIter {
            next: Some(self.start),
            end: self.end,
        }
    }

    pub fn to_vec(&self) -> Vec<i64> {
        self.iter().collect()
    }
}

impl IntoIterator for IntRange {
    type Item = i64;
    type IntoIter = RangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over an [`IntRange`] in its written direction.
#[derive(Debug, Clone)]
pub struct RangeIter {
    next: Option<i64>,
    end: i64,
}

impl Iterator for RangeIter {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let current = self.next?;
        self.next = match current.cmp(&self.end) {
            std::cmp::Ordering::Less => Some(current + 1),
            std::cmp::Ordering::Greater => Some(current - 1),
            std::cmp::Ordering::Equal => None,
        };
        Some(current)
    }
}

impl std::iter::FusedIterator for RangeIter {}
