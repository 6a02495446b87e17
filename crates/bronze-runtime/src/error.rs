//! Runtime error types.

use thiserror::Error;

use bronze_framework::BuildError;

use crate::config::ConfigError;

/// Errors that can occur while starting the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The command tree was rejected.
    #[error("Failed to build command tree: {0}")]
    Build(#[from] BuildError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
