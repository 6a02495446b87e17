use std::ops::Range;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Argument, classify};
use crate::directory::Lookup;
use crate::token::{RawToken, Tokenizer};

struct State<'a> {
    tokens: Tokenizer<'a>,
    raw: Vec<RawToken<'a>>,
    args: Vec<Option<Arc<Argument>>>,
    exhausted: bool,
}

impl<'a> State<'a> {
    /// Pulls tokens until position `index` exists or the source runs dry.
    fn fill_to(&mut self, index: usize) -> bool {
        while self.raw.len() <= index {
            if self.exhausted {
                return false;
            }
            match self.tokens.next() {
                Some(token) => {
                    self.raw.push(token);
                    self.args.push(None);
                }
                None => self.exhausted = true,
            }
        }
        true
    }

    fn fill_all(&mut self) {
        while !self.exhausted {
            match self.tokens.next() {
                Some(token) => {
                    self.raw.push(token);
                    self.args.push(None);
                }
                None => self.exhausted = true,
            }
        }
    }
}

/// Lazily tokenized and classified message arguments.
///
/// Positions are tokenized only when first requested and classified only
/// when first read; both results are cached. Reading a position twice returns
/// the same `Arc`.
pub struct ArgumentList<'a> {
    lookup: Lookup<'a>,
    source: &'a str,
    state: Mutex<State<'a>>,
}

impl<'a> ArgumentList<'a> {
    pub fn new(text: &'a str, lookup: Lookup<'a>) -> Self {
        Self {
            lookup,
            source: text,
            state: Mutex::new(State {
                tokens: Tokenizer::new(text),
                raw: Vec::new(),
                args: Vec::new(),
                exhausted: false,
            }),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn lookup(&self) -> &Lookup<'a> {
        &self.lookup
    }

    /// The raw token at `index`, tokenizing up to it if needed.
    pub fn raw(&self, index: usize) -> Option<RawToken<'a>> {
        let mut state = self.state.lock();
        state.fill_to(index).then(|| state.raw[index])
    }

    /// The classified argument at `index`.
    pub fn get(&self, index: usize) -> Option<Arc<Argument>> {
        let mut state = self.state.lock();
        if !state.fill_to(index) {
            return None;
        }
        if let Some(arg) = &state.args[index] {
            return Some(Arc::clone(arg));
        }
        let arg = Arc::new(classify(state.raw[index].text(), &self.lookup));
        state.args[index] = Some(Arc::clone(&arg));
        Some(arg)
    }

    /// Number of arguments. Forces the whole message to be tokenized, which
    /// happens at most once.
    pub fn len(&self) -> usize {
        let mut state = self.state.lock();
        state.fill_all();
        state.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw(0).is_none()
    }

    /// Joins the tokens in `range` with single spaces and classifies the
    /// result as one argument. The range is clamped to the list end; an empty
    /// range yields `None`. Merged arguments are not cached.
    pub fn merge(&self, range: Range<usize>) -> Option<Argument> {
        if range.is_empty() {
            return None;
        }
        let mut state = self.state.lock();
        state.fill_to(range.end - 1);
        let end = range.end.min(state.raw.len());
        if range.start >= end {
            return None;
        }
        let text = state.raw[range.start..end]
            .iter()
            .map(|t| t.text())
            .collect::<Vec<_>>()
            .join(" ");
        Some(classify(&text, &self.lookup))
    }

    pub fn iter(&self) -> Iter<'_, 'a> {
        Iter {
            list: self,
            index: 0,
        }
    }
}

impl std::fmt::Debug for ArgumentList<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ArgumentList")
            .field("source", &self.source)
            .field("materialized", &state.raw.len())
            .field("exhausted", &state.exhausted)
            .finish()
    }
}

/// Lazy iterator over an [`ArgumentList`].
pub struct Iter<'l, 'a> {
    list: &'l ArgumentList<'a>,
    index: usize,
}

impl Iterator for Iter<'_, '_> {
    type Item = Arc<Argument>;

    fn next(&mut self) -> Option<Self::Item> {
        let arg = self.list.get(self.index)?;
        self.index += 1;
        Some(arg)
    }
}

impl<'l, 'a> IntoIterator for &'l ArgumentList<'a> {
    type Item = Arc<Argument>;
    type IntoIter = Iter<'l, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
