//! Bronze Runtime - configuration, logging and dispatch wiring.
//!
//! This crate provides:
//! - Layered configuration (`BronzeConfig`, `ConfigLoader`) backed by figment
//! - Logging setup over `tracing-subscriber` (`LoggingBuilder`)
//! - `CommandRuntime`, which strips the configured prefixes and hands
//!   messages to a `Dispatcher` built from the configuration
//!
//! ```ignore
//! use bronze_runtime::CommandRuntime;
//!
//! let runtime = CommandRuntime::builder()
//!     .commands(commands)
//!     .build()?;
//!
//! for event in platform.events() {
//!     runtime.handle(&event);
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    BronzeConfig, CommandsConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, LoggingGuard, SpanEvents};
pub use runtime::{CommandRuntime, RuntimeBuilder};

// Re-export tracing for use by bots
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for command handlers.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
