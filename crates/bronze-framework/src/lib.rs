//! # Bronze Framework
//!
//! Command resolution and dispatch on top of [`bronze_core`].
//!
//! This layer provides:
//! - [`CommandBuilder`] / [`CommandTreeBuilder`] for declaring commands with
//!   plain functions or methods as handlers
//! - An immutable [`CommandTree`] with case-insensitive, fallback-aware
//!   resolution
//! - A typed [`PropertyMap`] and the [`PropertiesManager`] that turns
//!   properties into configuration while the tree is built
//! - A priority-ordered [`Preprocessor`] pipeline with explicit continuation
//! - The [`CommandParser`] that binds handler parameters against a message
//! - The [`Dispatcher`] tying it all together for one [`Event`] at a time
//!
//! ```rust,ignore
//! use bronze_framework::prelude::*;
//!
//! fn add(_inv: &Invocation<'_>, a: Arg<i64>, b: Arg<i64>) -> String {
//!     (*a + *b).to_string()
//! }
//!
//! let tree = CommandTree::builder()
//!     .command(CommandBuilder::new(["add", "sum"]).function(add))
//!     .command(CommandBuilder::help_command(["help"]))
//!     .build()?;
//! let dispatcher = Dispatcher::new(tree);
//! dispatcher.dispatch(&event);
//! ```

pub mod binder;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod handler;
pub mod help;
pub mod invocation;
pub mod manager;
pub mod parameter;
pub mod preprocessor;
pub mod property;
pub mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use binder::{Binding, BoundValue, CommandParser};
pub use dispatcher::{DEFAULT_MISSING_REPLY, Dispatcher, Outcome};
pub use error::{BoxError, BuildError, BuildResult, CommandError, CommandResult, ReplyError};
pub use event::{Event, Reply};
pub use handler::{Arg, ArgStream, Args, FromBinding, Handler, InstanceSource, IntoReply, Method};
pub use invocation::Invocation;
pub use manager::PropertiesManager;
pub use parameter::{Collection, ParamSpec, Parameter, ParameterConfig};
pub use preprocessor::{GUILD_ONLY, Next, Pipeline, Preprocessor, PriorityOrder, guild_only};
pub use property::{
    Category, Contiguous, Description, GuildOnly, Hex, Hidden, Index, Name, Optional, Persistent,
    Property, PropertyMap, Strict, Usage, Width,
};
pub use tree::{CommandBuilder, CommandNode, CommandTree, CommandTreeBuilder, NodeId, Resolution};

/// Everything needed to declare and dispatch commands.
pub mod prelude {
    pub use crate::{
        Arg, ArgStream, Args, BoxError, BuildError, Category, CommandBuilder, CommandError,
        CommandTree, Contiguous, Description, Dispatcher, Event, GuildOnly, Hex, Hidden, Index,
        Invocation, Name, Optional, Outcome, ParameterConfig, Persistent, Preprocessor,
        PriorityOrder, Property, Reply, ReplyError, Strict, Usage, Width,
    };
    pub use bronze_core::{
        Argument, Channel, Directory, Emoji, Emote, IntRange, Member, MemoryDirectory, Role,
        TypeRegistry, User,
    };
}
