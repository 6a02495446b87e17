//! Error types for the Bronze framework.

use thiserror::Error;

/// Boxed error returned by preprocessors and instance suppliers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fatal errors raised while building a [`CommandTree`](crate::tree::CommandTree).
///
/// Any of these aborts startup; a tree is never partially built.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    /// A command was declared without any key.
    #[error("command at '{path}' has no keys")]
    MissingKeys { path: String },

    /// Two siblings share a key (compared case-insensitively).
    #[error("duplicate key '{key}' under '{parent}'")]
    DuplicateKey { parent: String, key: String },

    /// No function or method was attached to the command.
    #[error("command '{command}' has no handler")]
    MissingHandler { command: String },

    /// A method handler has no instance source of the right type.
    #[error("command '{command}' has no usable instance source for '{instance_type}'")]
    NoInstanceSource {
        command: String,
        instance_type: &'static str,
    },

    /// A handler parameter uses a type the registry cannot parse.
    #[error("command '{command}' parameter {index}: no parser registered for '{type_name}'")]
    NoParser {
        command: String,
        index: usize,
        type_name: &'static str,
    },

    /// A parameter override does not fit the handler signature.
    #[error("command '{command}' parameter {index}: {reason}")]
    InvalidParameter {
        command: String,
        index: usize,
        reason: String,
    },
}

impl BuildError {
    pub(crate) fn invalid_parameter(
        command: impl Into<String>,
        index: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            command: command.into(),
            index,
            reason: reason.into(),
        }
    }
}

/// Result type for tree construction.
pub type BuildResult<T> = Result<T, BuildError>;

/// Failures while running a resolved command.
///
/// These are caught at the dispatcher boundary and logged; they never reach
/// the event source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The command instance could not be created.
    #[error("failed to construct command instance: {0}")]
    Construction(String),

    /// A preprocessor returned an error or panicked.
    #[error("preprocessor '{id}' failed: {message}")]
    Preprocessor { id: String, message: String },

    /// The handler returned an error.
    #[error("handler error: {0}")]
    Handler(String),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// A bound value did not have the type the handler expects.
    #[error("parameter {index} could not be extracted as '{type_name}'")]
    Extraction {
        index: usize,
        type_name: &'static str,
    },
}

impl CommandError {
    /// Builds a [`CommandError::Panicked`] from a caught panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        Self::Panicked(panic_message(payload.as_ref()))
    }
}

/// Result type for command execution.
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors reported by [`Event::reply`](crate::event::Event::reply).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReplyError {
    /// The platform refused or failed to deliver the reply.
    #[error("reply could not be delivered: {0}")]
    Delivery(String),

    /// The event source does not accept this kind of reply.
    #[error("reply kind not supported: {0}")]
    Unsupported(&'static str),
}

impl ReplyError {
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
