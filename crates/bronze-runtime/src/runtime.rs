//! Wiring configuration into the dispatcher.
//!
//! [`CommandRuntime`] owns the loaded [`BronzeConfig`] and a [`Dispatcher`]
//! built from it. Platform bindings hand it every incoming message; it
//! strips the configured prefix, switches to help mode on the help prefix,
//! and ignores everything else.
//!
//! ```rust,ignore
//! use bronze_runtime::CommandRuntime;
//!
//! let runtime = CommandRuntime::builder()
//!     .config_file("config/bronze.toml")
//!     .commands(CommandTree::builder().command(CommandBuilder::new(["ping"]).function(ping)))
//!     .build()?;
//!
//! runtime.handle(&event);
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{info, trace};

use bronze_core::Directory;
use bronze_framework::{
    CommandTree, CommandTreeBuilder, Dispatcher, Event, Outcome, PriorityOrder, Reply, ReplyError,
};

use crate::config::{BronzeConfig, ConfigLoader, validate_config};
use crate::error::RuntimeResult;
use crate::logging::{self, LoggingGuard};

/// A configured command dispatcher.
#[derive(Debug)]
pub struct CommandRuntime {
    config: BronzeConfig,
    dispatcher: Dispatcher,
    _logging: LoggingGuard,
}

impl CommandRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Builds the command tree under `config` without touching logging.
    ///
    /// A non-empty `commands.preprocessor_order` replaces the order set on
    /// `commands`.
    pub fn from_config(config: &BronzeConfig, commands: CommandTreeBuilder) -> RuntimeResult<Self> {
        validate_config(config)?;

        let commands = if config.commands.preprocessor_order.is_empty() {
            commands
        } else {
            commands.order(PriorityOrder::new(&config.commands.preprocessor_order))
        };
        let tree = commands.build()?;
        let dispatcher =
            Dispatcher::new(tree).with_missing_reply(&config.commands.missing_parameter_reply);

        info!(
            commands = dispatcher.tree().len(),
            prefix = %config.commands.prefix,
            help_prefix = %config.commands.help_prefix,
            "Command runtime ready"
        );

        Ok(Self {
            config: config.clone(),
            dispatcher,
            _logging: LoggingGuard::default(),
        })
    }

    pub fn config(&self) -> &BronzeConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn tree(&self) -> &CommandTree {
        self.dispatcher.tree()
    }

    /// Splits a message into its command text and whether it asks for
    /// help. `None` if it carries neither prefix.
    pub fn strip_prefix<'c>(&self, content: &'c str) -> Option<(&'c str, bool)> {
        let commands = &self.config.commands;
        if !commands.help_prefix.is_empty()
            && let Some(rest) = content.strip_prefix(commands.help_prefix.as_str())
        {
            return Some((rest, true));
        }
        content
            .strip_prefix(commands.prefix.as_str())
            .map(|rest| (rest, false))
    }

    /// Dispatches a raw platform message. Returns `None` when the message
    /// is not addressed to the bot.
    pub fn handle(&self, event: &dyn Event) -> Option<Outcome> {
        self.handle_at(event, Utc::now())
    }

    /// [`handle`](Self::handle) with a fixed clock for relative dates.
    pub fn handle_at(&self, event: &dyn Event, now: DateTime<Utc>) -> Option<Outcome> {
        let Some((content, help)) = self.strip_prefix(event.content()) else {
            trace!(author = event.author_id(), "Message has no command prefix, ignoring");
            return None;
        };

        let stripped = Stripped {
            inner: event,
            content,
            help,
        };
        Some(self.dispatcher.dispatch_at(&stripped, now))
    }
}

/// An event whose content has had the prefix removed.
struct Stripped<'e> {
    inner: &'e dyn Event,
    content: &'e str,
    help: bool,
}

impl Event for Stripped<'_> {
    fn content(&self) -> &str {
        self.content
    }

    fn help_mode(&self) -> bool {
        self.help || self.inner.help_mode()
    }

    fn guild_id(&self) -> Option<u64> {
        self.inner.guild_id()
    }

    fn channel_id(&self) -> u64 {
        self.inner.channel_id()
    }

    fn author_id(&self) -> u64 {
        self.inner.author_id()
    }

    fn directory(&self) -> &dyn Directory {
        self.inner.directory()
    }

    fn reply(&self, reply: Reply) -> Result<(), ReplyError> {
        self.inner.reply(reply)
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Loads configuration, initializes logging and builds a [`CommandRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    commands: CommandTreeBuilder,
    init_logging: bool,
}

impl RuntimeBuilder {
    /// Searches the current directory for configuration and reads
    /// `BRONZE_*` variables.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            commands: CommandTreeBuilder::new(),
            init_logging: true,
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration on top of files and environment.
    pub fn merge(mut self, config: BronzeConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Overrides one value by its dotted path.
    pub fn set<V: serde::Serialize>(mut self, key: &str, value: V) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    /// The commands to serve.
    pub fn commands(mut self, commands: CommandTreeBuilder) -> Self {
        self.commands = commands;
        self
    }

    /// Leaves the global subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    pub fn build(self) -> RuntimeResult<CommandRuntime> {
        let config = self.config_loader.load()?;
        let guard = if self.init_logging {
            logging::init_from_config(&config.logging)
        } else {
            LoggingGuard::default()
        };

        let mut runtime = CommandRuntime::from_config(&config, self.commands)?;
        runtime._logging = guard;
        Ok(runtime)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use bronze_core::MemoryDirectory;
    use bronze_framework::{CommandBuilder, Invocation};

    use super::*;

    struct Message {
        content: String,
        directory: MemoryDirectory,
        replies: Mutex<Vec<String>>,
    }

    impl Message {
        fn new(content: &str) -> Self {
            Self {
                content: content.to_string(),
                directory: MemoryDirectory::new(),
                replies: Mutex::new(Vec::new()),
            }
        }
    }

    impl Event for Message {
        fn content(&self) -> &str {
            &self.content
        }

        fn guild_id(&self) -> Option<u64> {
            Some(1)
        }

        fn channel_id(&self) -> u64 {
            2
        }

        fn author_id(&self) -> u64 {
            3
        }

        fn directory(&self) -> &dyn Directory {
            &self.directory
        }

        fn reply(&self, reply: Reply) -> Result<(), ReplyError> {
            self.replies.lock().push(reply.to_string());
            Ok(())
        }
    }

    fn ping(inv: &Invocation<'_>) -> String {
        format!("pong (help: {})", inv.event().help_mode())
    }

    fn runtime(config: &BronzeConfig) -> CommandRuntime {
        let commands = CommandTree::builder().command(CommandBuilder::new(["ping"]).function(ping));
        CommandRuntime::from_config(config, commands).unwrap()
    }

    #[test]
    fn test_strip_prefix() {
        let runtime = runtime(&BronzeConfig::default());
        assert_eq!(runtime.strip_prefix("!ping"), Some(("ping", false)));
        assert_eq!(runtime.strip_prefix("?ping"), Some(("ping", true)));
        assert_eq!(runtime.strip_prefix("ping"), None);
    }

    #[test]
    fn test_help_prefix_checked_first() {
        let mut config = BronzeConfig::default();
        config.commands.prefix = "!".into();
        config.commands.help_prefix = "!?".into();
        let runtime = runtime(&config);
        assert_eq!(runtime.strip_prefix("!?ping"), Some(("ping", true)));
        assert_eq!(runtime.strip_prefix("!ping"), Some(("ping", false)));
    }

    #[test]
    fn test_handle_ignores_unprefixed() {
        let runtime = runtime(&BronzeConfig::default());
        let message = Message::new("ping");
        assert_eq!(runtime.handle(&message), None);
        assert!(message.replies.lock().is_empty());
    }

    #[test]
    fn test_handle_dispatches_stripped_content() {
        let runtime = runtime(&BronzeConfig::default());
        let message = Message::new("!ping");
        assert_eq!(runtime.handle(&message), Some(Outcome::Completed));
        assert_eq!(*message.replies.lock(), vec!["pong (help: false)"]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = BronzeConfig::default();
        config.commands.preprocessor_order = vec!["*".into(), "*".into()];
        let result = CommandRuntime::from_config(&config, CommandTree::builder());
        assert!(matches!(result, Err(crate::RuntimeError::Config(_))));
    }

    #[test]
    fn test_build_errors_surface() {
        let commands = CommandTree::builder().command(CommandBuilder::new(["ping"]));
        let result = CommandRuntime::from_config(&BronzeConfig::default(), commands);
        assert!(matches!(result, Err(crate::RuntimeError::Build(_))));
    }
}
