//! Configuration for the Bronze runtime.
//!
//! Settings are layered with figment: built-in defaults, then a TOML file,
//! then `BRONZE_*` environment variables, then programmatic overrides. See
//! [`ConfigLoader`] for the search rules.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BronzeConfig, CommandsConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
