//! Parameter descriptors.
//!
//! A [`Parameter`] says where one handler argument comes from: an explicit
//! token position or a scan for the first convertible token, how many tokens
//! to merge, and how to convert them. Descriptors are produced when the tree
//! is built, from the handler's signature ([`ParamSpec`]) adjusted by a
//! [`ParameterConfig`].

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use bronze_core::{ParseOptions, ValueParser};

use crate::invocation::Invocation;
use crate::property::{Property, PropertyMap};

/// How many values a parameter binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// The first match.
    Single,
    /// Every match, as a `Vec<T>`.
    List,
    /// Every match, as a boxed iterator.
    Stream,
}

impl Collection {
    pub fn is_collection(&self) -> bool {
        !matches!(self, Self::Single)
    }
}

/// The shape of a handler argument as declared by its Rust type.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub value_type: TypeId,
    pub type_name: &'static str,
    pub collection: Collection,
    /// Whether the handler can accept an absent value.
    pub nullable: bool,
    /// Whether the parameter is required unless configured otherwise.
    pub required: bool,
}

impl ParamSpec {
    pub fn of<T: 'static>(collection: Collection, nullable: bool, required: bool) -> Self {
        Self {
            value_type: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            collection,
            nullable,
            required,
        }
    }
}

/// Called when a required parameter finds no match.
pub type Fallback = Arc<dyn Fn(&Invocation<'_>, &Parameter) + Send + Sync>;

/// A built parameter descriptor.
#[derive(Clone)]
pub struct Parameter {
    name: String,
    type_name: &'static str,
    parser: Arc<dyn ValueParser>,
    index: Option<isize>,
    width: isize,
    contiguous: bool,
    required: bool,
    options: ParseOptions,
    collection: Collection,
    fallback: Option<Fallback>,
    properties: PropertyMap,
}

impl Parameter {
    /// A required single-value parameter that scans for its first match.
    pub fn new(name: impl Into<String>, parser: Arc<dyn ValueParser>) -> Self {
        Self {
            name: name.into(),
            type_name: parser.type_name(),
            parser,
            index: None,
            width: 1,
            contiguous: false,
            required: true,
            options: ParseOptions::default(),
            collection: Collection::Single,
            fallback: None,
            properties: PropertyMap::new(),
        }
    }

    pub fn with_index(mut self, index: isize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_width(mut self, width: isize) -> Self {
        self.width = width;
        self
    }

    pub fn with_collection(mut self, collection: Collection) -> Self {
        self.collection = collection;
        self
    }

    pub fn contiguous(mut self) -> Self {
        self.contiguous = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_properties(mut self, properties: PropertyMap) -> Self {
        self.properties = properties;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The unqualified type name, e.g. `User` or `DateTime`.
    pub fn short_type_name(&self) -> &'static str {
        short_type_name(self.type_name)
    }

    pub fn parser(&self) -> &Arc<dyn ValueParser> {
        &self.parser
    }

    pub fn index(&self) -> Option<isize> {
        self.index
    }

    pub fn width(&self) -> isize {
        self.width
    }

    pub fn is_contiguous(&self) -> bool {
        self.contiguous
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn options(&self) -> ParseOptions {
        self.options
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn fallback(&self) -> Option<&Fallback> {
        self.fallback.as_ref()
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    pub fn property<P: Property>(&self) -> Option<&P> {
        self.properties.get::<P>()
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("index", &self.index)
            .field("width", &self.width)
            .field("contiguous", &self.contiguous)
            .field("required", &self.required)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

/// Strips the module path and generic arguments from a type name.
pub fn short_type_name(type_name: &'static str) -> &'static str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Per-parameter adjustments applied on top of the handler signature.
///
/// Fields left unset keep the signature's defaults. Properties attached here
/// are handed to the [`PropertiesManager`](crate::manager::PropertiesManager)
/// configurators, which translate them into the same fields.
#[derive(Clone, Default)]
pub struct ParameterConfig {
    pub name: Option<String>,
    pub index: Option<isize>,
    pub width: Option<isize>,
    pub contiguous: bool,
    pub optional: bool,
    pub hex: bool,
    pub strict: bool,
    pub fallback: Option<Fallback>,
    pub properties: PropertyMap,
}

impl ParameterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn index(mut self, index: isize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn width(mut self, width: isize) -> Self {
        self.width = Some(width);
        self
    }

    pub fn contiguous(mut self) -> Self {
        self.contiguous = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn hex(mut self) -> Self {
        self.hex = true;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&Invocation<'_>, &Parameter) + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    pub fn property<P: Property>(mut self, property: P) -> Self {
        self.properties.insert(property);
        self
    }
}

impl fmt::Debug for ParameterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterConfig")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("width", &self.width)
            .field("contiguous", &self.contiguous)
            .field("optional", &self.optional)
            .field("hex", &self.hex)
            .field("strict", &self.strict)
            .field("fallback", &self.fallback.is_some())
            .field("properties", &self.properties)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bronze_core::{TypeRegistry, User};

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name(std::any::type_name::<User>()), "User");
        assert_eq!(short_type_name("i32"), "i32");
        assert_eq!(
            short_type_name(std::any::type_name::<chrono::DateTime<chrono::Utc>>()),
            "DateTime"
        );
    }

    #[test]
    fn test_parameter_defaults() {
        let registry = TypeRegistry::with_builtins();
        let param = Parameter::new("amount", registry.erased::<i64>().unwrap());
        assert_eq!(param.width(), 1);
        assert!(param.is_required());
        assert!(param.index().is_none());
        assert_eq!(param.collection(), Collection::Single);
        assert_eq!(param.short_type_name(), "i64");
    }
}
