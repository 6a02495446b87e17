//! Type parser registry.
//!
//! A [`TypeParser<T>`] turns an [`Argument`] into a `T`, optionally with a
//! cheaper predicate that answers "would this convert?" without building the
//! value. Parsers are registered per target type in a [`TypeRegistry`];
//! the command binder works with the type-erased [`ValueParser`] view so a
//! single parameter array can hold parameters of different types.

pub mod datetime;
pub mod duration;
pub mod entity;
pub mod number;
pub mod range;

pub use range::IntRange;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::argument::Argument;
use crate::directory::Lookup;
use crate::entity::{Channel, Emoji, Emote, Member, Role, User};
use crate::error::{ParseError, ParseResult};

/// Per-parameter conversion flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Read integers as base 16.
    pub hex: bool,
    /// Accept only resolved mentions for entity types.
    pub strict: bool,
}

/// Everything a converter may look at besides the argument itself.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub lookup: Lookup<'a>,
    pub options: ParseOptions,
    /// Reference instant for relative date-times.
    pub now: DateTime<Utc>,
}

impl<'a> ParseContext<'a> {
    pub fn new(lookup: Lookup<'a>) -> Self {
        Self {
            lookup,
            options: ParseOptions::default(),
            now: Utc::now(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

type Predicate = dyn Fn(&Argument, &ParseContext<'_>) -> bool + Send + Sync;
type Converter<T> = dyn Fn(&Argument, &ParseContext<'_>) -> Option<T> + Send + Sync;

/// A boxed value produced by a type-erased parser.
pub type BoxedValue = Box<dyn Any + Send>;

/// A lazily consumed sequence of converted values.
pub type ValueStream<T> = Box<dyn Iterator<Item = T> + Send>;

/// Predicate and converter for one target type.
pub struct TypeParser<T> {
    predicate: Option<Arc<Predicate>>,
    converter: Arc<Converter<T>>,
}

impl<T> Clone for TypeParser<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            converter: Arc::clone(&self.converter),
        }
    }
}

impl<T> TypeParser<T> {
    /// A parser whose test is a trial conversion.
    pub fn new<F>(converter: F) -> Self
    where
        F: Fn(&Argument, &ParseContext<'_>) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            predicate: None,
            converter: Arc::new(converter),
        }
    }

    pub fn with_predicate<P, F>(predicate: P, converter: F) -> Self
    where
        P: Fn(&Argument, &ParseContext<'_>) -> bool + Send + Sync + 'static,
        F: Fn(&Argument, &ParseContext<'_>) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            predicate: Some(Arc::new(predicate)),
            converter: Arc::new(converter),
        }
    }

    pub fn has_predicate(&self) -> bool {
        self.predicate.is_some()
    }

    /// Whether `arg` would convert.
    pub fn test(&self, arg: &Argument, cx: &ParseContext<'_>) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(arg, cx),
            None => (self.converter)(arg, cx).is_some(),
        }
    }

    pub fn parse(&self, arg: &Argument, cx: &ParseContext<'_>) -> Option<T> {
        (self.converter)(arg, cx)
    }
}

impl<T> fmt::Debug for TypeParser<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeParser")
            .field("type", &std::any::type_name::<T>())
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

/// Type-erased view of a [`TypeParser`].
///
/// Values come back boxed; [`collect_list`](ValueParser::collect_list) and
/// [`collect_stream`](ValueParser::collect_stream) re-type a batch of them
/// into a `Vec<T>` or a [`ValueStream<T>`] respectively.
pub trait ValueParser: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn value_type(&self) -> TypeId;

    fn test(&self, arg: &Argument, cx: &ParseContext<'_>) -> bool;

    fn parse_boxed(&self, arg: &Argument, cx: &ParseContext<'_>) -> Option<BoxedValue>;

    fn collect_list(&self, values: Vec<BoxedValue>) -> BoxedValue;

    fn collect_stream(&self, values: Vec<BoxedValue>) -> BoxedValue;
}

impl<T: Send + 'static> TypeParser<T> {
    fn unbox_all(values: Vec<BoxedValue>) -> Vec<T> {
        values
            .into_iter()
            .filter_map(|value| value.downcast::<T>().ok().map(|v| *v))
            .collect()
    }
}

impl<T: Send + 'static> ValueParser for TypeParser<T> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn test(&self, arg: &Argument, cx: &ParseContext<'_>) -> bool {
        TypeParser::test(self, arg, cx)
    }

    fn parse_boxed(&self, arg: &Argument, cx: &ParseContext<'_>) -> Option<BoxedValue> {
        self.parse(arg, cx).map(|value| Box::new(value) as BoxedValue)
    }

    fn collect_list(&self, values: Vec<BoxedValue>) -> BoxedValue {
        Box::new(Self::unbox_all(values))
    }

    fn collect_stream(&self, values: Vec<BoxedValue>) -> BoxedValue {
        let stream: ValueStream<T> = Box::new(Self::unbox_all(values).into_iter());
        Box::new(stream)
    }
}

struct Entry {
    typed: Arc<dyn Any + Send + Sync>,
    erased: Arc<dyn ValueParser>,
}

/// Parsers keyed by target type.
///
/// Registering a type twice replaces the earlier parser. The registry is
/// filled before the command tree is built and is read-only afterwards.
#[derive(Default)]
pub struct TypeRegistry {
    parsers: HashMap<TypeId, Entry>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in parser.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    pub fn insert<T: Send + 'static>(&mut self, parser: TypeParser<T>) -> &mut Self {
        tracing::trace!(type_name = std::any::type_name::<T>(), "registering type parser");
        self.parsers.insert(
            TypeId::of::<T>(),
            Entry {
                typed: Arc::new(parser.clone()),
                erased: Arc::new(parser),
            },
        );
        self
    }

    /// Registers a converter; testing an argument means trying to convert it.
    pub fn register<T, F>(&mut self, converter: F) -> &mut Self
    where
        T: Send + 'static,
        F: Fn(&Argument, &ParseContext<'_>) -> Option<T> + Send + Sync + 'static,
    {
        self.insert(TypeParser::new(converter))
    }

    /// Registers a converter together with a cheaper predicate.
    pub fn register_with_predicate<T, P, F>(&mut self, predicate: P, converter: F) -> &mut Self
    where
        T: Send + 'static,
        P: Fn(&Argument, &ParseContext<'_>) -> bool + Send + Sync + 'static,
        F: Fn(&Argument, &ParseContext<'_>) -> Option<T> + Send + Sync + 'static,
    {
        self.insert(TypeParser::with_predicate(predicate, converter))
    }

    pub fn get<T: Send + 'static>(&self) -> ParseResult<TypeParser<T>> {
        self.parsers
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.typed.downcast_ref::<TypeParser<T>>())
            .cloned()
            .ok_or_else(ParseError::not_found::<T>)
    }

    /// The erased parser for `T`.
    pub fn erased<T: 'static>(&self) -> ParseResult<Arc<dyn ValueParser>> {
        self.erased_by_id(TypeId::of::<T>())
            .ok_or_else(ParseError::not_found::<T>)
    }

    pub fn erased_by_id(&self, type_id: TypeId) -> Option<Arc<dyn ValueParser>> {
        self.parsers
            .get(&type_id)
            .map(|entry| Arc::clone(&entry.erased))
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.parsers.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    fn register_builtins(&mut self) {
        self.register::<i32, _>(|arg, cx| number::parse_i32(arg.raw(), cx.options.hex))
            .register::<i64, _>(|arg, cx| number::parse_i64(arg.raw(), cx.options.hex))
            .register::<u64, _>(|arg, cx| number::parse_u64(arg.raw(), cx.options.hex))
            .register::<f32, _>(|arg, _| number::parse_f32(arg.raw()))
            .register::<f64, _>(|arg, _| number::parse_f64(arg.raw()))
            .register::<bool, _>(|arg, _| number::parse_bool(arg.raw()))
            .register::<IntRange, _>(|arg, _| IntRange::parse(arg.raw()))
            .register_with_predicate::<String, _, _>(|_, _| true, |arg, _| {
                Some(arg.raw().to_owned())
            })
            .register_with_predicate::<Argument, _, _>(|_, _| true, |arg, _| Some(arg.clone()))
            .register::<User, _>(|arg, cx| entity::user(arg, &cx.lookup, cx.options.strict))
            .register::<Member, _>(|arg, cx| entity::member(arg, &cx.lookup, cx.options.strict))
            .register::<Role, _>(|arg, cx| entity::role(arg, &cx.lookup, cx.options.strict))
            .register::<Channel, _>(|arg, cx| {
                entity::channel(arg, &cx.lookup, cx.options.strict)
            })
            .register::<Emote, _>(|arg, cx| entity::emote(arg, &cx.lookup, cx.options.strict))
            .register_with_predicate::<Emoji, _, _>(
                |arg, _| arg.as_emoji().is_some(),
                |arg, _| arg.as_emoji().cloned(),
            )
            .register::<Duration, _>(|arg, _| duration::parse(arg.raw()))
            .register::<DateTime<Utc>, _>(|arg, cx| datetime::parse(arg.raw(), cx.now));
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.parsers.values().map(|entry| entry.erased.type_name()))
            .finish()
    }
}
