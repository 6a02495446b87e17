//! Error types for the Bronze core layer.
//!
//! Command-level errors (build failures, invocation failures) live in
//! `bronze-framework`; this module only covers the parser registry.

use thiserror::Error;

/// Errors raised by the [`TypeRegistry`](crate::parse::TypeRegistry).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// No parser has been registered for the requested type.
    #[error("no parser registered for type '{type_name}'")]
    NotFound {
        /// Name of the requested type.
        type_name: &'static str,
    },
}

impl ParseError {
    /// Creates a not-found error for `T`.
    pub fn not_found<T: ?Sized>() -> Self {
        Self::NotFound {
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// Result type for registry lookups.
pub type ParseResult<T> = Result<T, ParseError>;
