//! # Bronze
//!
//! A typed command framework for chat bots.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌──────────┐   ┌───────────────┐   ┌─────────┐
//! │ Platform │──▶│ CommandRuntime │──▶│ Resolver │──▶│ Preprocessors │──▶│ Handler │
//! │  event   │   │ (prefixes)     │   │ (tree)   │   │ (priority)    │   │ (bound) │
//! └──────────┘   └────────────────┘   └──────────┘   └───────────────┘   └─────────┘
//! ```
//!
//! - **Core**: tokenizer, mention classification and the type parser
//!   registry
//! - **Framework**: the command tree, parameter binding, properties and
//!   dispatch
//! - **Runtime**: configuration, logging and prefix handling
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bronze::prelude::*;
//!
//! fn kick(inv: &Invocation<'_>, target: Arg<Member>, reason: Args<String>) -> String {
//!     format!("Kicked {} ({})", target.display_name(), reason.join(" "))
//! }
//!
//! let runtime = CommandRuntime::builder()
//!     .commands(
//!         CommandTree::builder()
//!             .command(CommandBuilder::new(["kick"]).function(kick).property(GuildOnly))
//!             .command(CommandBuilder::help_command(["help"])),
//!     )
//!     .build()?;
//!
//! runtime.handle(&event);
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read `bronze.toml` configuration files (default)
//! - `json-log`: JSON log output

pub use bronze_core as core;
pub use bronze_framework as framework;
pub use bronze_runtime as runtime;

/// Everything needed to write and serve commands.
///
/// ```rust,ignore
/// use bronze::prelude::*;
/// ```
pub mod prelude {
    pub use bronze_framework::prelude::*;

    // Tree assembly beyond the basics
    pub use bronze_framework::{CommandTreeBuilder, PropertiesManager, guild_only};

    // Runtime entry points
    pub use bronze_runtime::{BronzeConfig, CommandRuntime, ConfigLoader, RuntimeError};
}
