//! Binding parameters against an argument list.
//!
//! Parameters are evaluated in declaration order and share one set of
//! consumed positions. The positions of the command keys that resolved the
//! node are consumed before binding starts, and a position is only marked
//! consumed once a conversion on it succeeded.
//!
//! With an explicit index, the position is absolute within the message
//! (index 0 is the first command key) and a negative index counts from the
//! end. The width then selects the tokens: 1 takes that token, more than 1
//! merges that many (clamped to the end of the message), and 0 or less takes
//! everything from the index to the end, or from the first argument up to the
//! index when the index is negative. Single parameters merge the selected
//! tokens into one argument; collections convert each selected token on its
//! own.
//!
//! Without an index, unconsumed positions are scanned in ascending order for
//! the first token that converts. A contiguous parameter only looks at the
//! first unconsumed position (for collections: the run of matches starting
//! there).

use std::ops::Range;

use chrono::{DateTime, Utc};
use tracing::trace;

use bronze_core::{Argument, ArgumentList, BoxedValue, ParseContext, ValueParser};

use crate::parameter::{Collection, Parameter};

/// The value bound to one parameter. `None` only for absent optional
/// singles and for unmatched required parameters.
pub type BoundValue = Option<BoxedValue>;

/// The result of binding one command's parameters.
#[derive(Debug, Default)]
pub struct Binding {
    /// One entry per parameter, in declaration order.
    pub values: Vec<BoundValue>,
    /// `true` if any required parameter found no match.
    pub failed: bool,
    /// Declaration indices of the unmatched required parameters.
    pub missing: Vec<usize>,
}

struct Consumed {
    skip: usize,
    taken: Vec<bool>,
}

impl Consumed {
    fn new(skip: usize) -> Self {
        Self {
            skip,
            taken: Vec::new(),
        }
    }

    fn is_free(&self, position: usize) -> bool {
        position >= self.skip && !self.taken.get(position).copied().unwrap_or(false)
    }

    fn all_free(&self, range: Range<usize>) -> bool {
        !range.is_empty() && range.into_iter().all(|p| self.is_free(p))
    }

    fn take(&mut self, positions: impl IntoIterator<Item = usize>) {
        for position in positions {
            if self.taken.len() <= position {
                self.taken.resize(position + 1, false);
            }
            self.taken[position] = true;
        }
    }
}

/// Binds parameters against one message's arguments.
pub struct CommandParser<'l, 'a> {
    list: &'l ArgumentList<'a>,
    skip: usize,
    now: DateTime<Utc>,
}

impl<'l, 'a> CommandParser<'l, 'a> {
    /// `skip` is the number of leading positions taken by command keys.
    pub fn new(list: &'l ArgumentList<'a>, skip: usize) -> Self {
        Self {
            list,
            skip,
            now: Utc::now(),
        }
    }

    /// Sets the reference instant for relative date-times.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Binds every parameter, calling `on_missing` once per required
    /// parameter that found no match. Evaluation continues past failures so
    /// all missing parameters are reported together.
    pub fn bind<F>(&self, parameters: &[Parameter], mut on_missing: F) -> Binding
    where
        F: FnMut(&Parameter),
    {
        let mut consumed = Consumed::new(self.skip);
        let mut binding = Binding::default();

        for (position, param) in parameters.iter().enumerate() {
            let cx = ParseContext {
                lookup: *self.list.lookup(),
                options: param.options(),
                now: self.now,
            };
            let value = match param.index() {
                Some(index) => self.bind_indexed(param, index, &cx, &mut consumed),
                None => self.bind_scan(param, &cx, &mut consumed),
            };

            match value {
                Some(value) => binding.values.push(Some(value)),
                None if param.is_required() => {
                    trace!(parameter = param.name(), position, "required parameter unmatched");
                    binding.failed = true;
                    binding.missing.push(position);
                    on_missing(param);
                    binding.values.push(None);
                }
                None => binding.values.push(absent(param)),
            }
        }
        binding
    }

    fn bind_indexed(
        &self,
        param: &Parameter,
        index: isize,
        cx: &ParseContext<'_>,
        consumed: &mut Consumed,
    ) -> Option<BoxedValue> {
        let len = self.list.len();
        let start = if index < 0 {
            len.checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        if start >= len {
            return None;
        }

        let range = match param.width() {
            1 => start..start + 1,
            width if width > 1 => start..start.saturating_add(width as usize).min(len),
            _ if index >= 0 => start..len,
            _ => self.skip.min(start)..start + 1,
        };
        if !consumed.all_free(range.clone()) {
            return None;
        }

        if param.collection().is_collection() {
            return self.collect(param, range, cx, consumed);
        }
        let value = self.convert_range(param, range.clone(), cx)?;
        consumed.take(range);
        Some(value)
    }

    fn bind_scan(
        &self,
        param: &Parameter,
        cx: &ParseContext<'_>,
        consumed: &mut Consumed,
    ) -> Option<BoxedValue> {
        if param.collection().is_collection() {
            return self.scan_collection(param, cx, consumed);
        }

        let mut position = self.skip;
        while self.list.raw(position).is_some() {
            if consumed.is_free(position) {
                let range = self.window(param, position);
                if consumed.all_free(range.clone())
                    && let Some(value) = self.convert_range(param, range.clone(), cx)
                {
                    consumed.take(range);
                    return Some(value);
                }
                if param.is_contiguous() {
                    break;
                }
            }
            position += 1;
        }
        None
    }

    fn scan_collection(
        &self,
        param: &Parameter,
        cx: &ParseContext<'_>,
        consumed: &mut Consumed,
    ) -> Option<BoxedValue> {
        let parser = param.parser();
        let mut values = Vec::new();
        let mut positions = Vec::new();
        let mut started = false;

        let mut position = self.skip;
        while let Some(arg) = self.list.get(position) {
            if consumed.is_free(position) {
                started = true;
                match convert(parser.as_ref(), &arg, cx) {
                    Some(value) => {
                        values.push(value);
                        positions.push(position);
                    }
                    None if param.is_contiguous() => break,
                    None => {}
                }
            } else if started && param.is_contiguous() {
                break;
            }
            position += 1;
        }

        if values.is_empty() {
            return None;
        }
        consumed.take(positions);
        Some(finish_collection(param, values))
    }

    /// Converts each token in `range` separately; positions that do not
    /// convert stay unconsumed.
    fn collect(
        &self,
        param: &Parameter,
        range: Range<usize>,
        cx: &ParseContext<'_>,
        consumed: &mut Consumed,
    ) -> Option<BoxedValue> {
        let parser = param.parser();
        let mut values = Vec::new();
        let mut positions = Vec::new();
        for position in range {
            let arg = self.list.get(position)?;
            if let Some(value) = convert(parser.as_ref(), &arg, cx) {
                values.push(value);
                positions.push(position);
            }
        }
        if values.is_empty() {
            return None;
        }
        consumed.take(positions);
        Some(finish_collection(param, values))
    }

    /// The tokens a scanning single parameter covers when starting at
    /// `position`.
    fn window(&self, param: &Parameter, position: usize) -> Range<usize> {
        match param.width() {
            1 => position..position + 1,
            width if width > 1 => {
                position..position.saturating_add(width as usize).min(self.list.len())
            }
            _ => position..self.list.len(),
        }
    }

    fn convert_range(
        &self,
        param: &Parameter,
        range: Range<usize>,
        cx: &ParseContext<'_>,
    ) -> Option<BoxedValue> {
        let parser = param.parser();
        if range.len() == 1 {
            let arg = self.list.get(range.start)?;
            return convert(parser.as_ref(), &arg, cx);
        }
        let merged = self.list.merge(range)?;
        convert(parser.as_ref(), &merged, cx)
    }
}

fn convert(parser: &dyn ValueParser, arg: &Argument, cx: &ParseContext<'_>) -> Option<BoxedValue> {
    if !parser.test(arg, cx) {
        return None;
    }
    parser.parse_boxed(arg, cx)
}

fn finish_collection(param: &Parameter, values: Vec<BoxedValue>) -> BoxedValue {
    match param.collection() {
        Collection::Stream => param.parser().collect_stream(values),
        _ => param.parser().collect_list(values),
    }
}

/// The value an unmatched optional parameter binds.
fn absent(param: &Parameter) -> BoundValue {
    match param.collection() {
        Collection::Single => None,
        Collection::List => Some(param.parser().collect_list(Vec::new())),
        Collection::Stream => Some(param.parser().collect_stream(Vec::new())),
    }
}
