//! Message dispatch.
//!
//! The [`Dispatcher`] turns one [`Event`] into at most one command call. The
//! whole chain runs synchronously on the caller's thread:
//!
//! 1. The content is wrapped in a lazy [`ArgumentList`]
//! 2. The leading tokens resolve a node in the [`CommandTree`]; in help mode
//!    a resolved command that is not a help command answers with its help
//!    text instead of running
//! 3. The node's preprocessors run; any of them may deny
//! 4. The node's parameters are bound against the remaining arguments
//! 5. The handler runs and its reply, if any, is sent back through the event
//!
//! Failures at any step are logged with the command path and the event and
//! reported in the returned [`Outcome`]; they never propagate to the caller.
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::new(tree);
//! match dispatcher.dispatch(&event) {
//!     Outcome::NotFound => {}
//!     outcome => tracing::debug!(?outcome, "handled"),
//! }
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{Level, debug, error, span, trace, warn};

use bronze_core::{ArgumentList, Lookup};

use crate::binder::CommandParser;
use crate::error::{CommandError, panic_message};
use crate::event::{Event, Reply};
use crate::help;
use crate::invocation::Invocation;
use crate::parameter::Parameter;
use crate::preprocessor::Pipeline;
use crate::tree::CommandTree;

/// Reply sent when required parameters without a fallback are missing.
/// `{parameters}` is replaced with the comma-separated parameter names.
pub const DEFAULT_MISSING_REPLY: &str = "Missing required parameters: {parameters}";

/// What became of a dispatched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The message does not start with a command key.
    NotFound,
    /// A preprocessor stopped the chain, by choice or by failing.
    Denied,
    /// Required parameters found no match; names in declaration order.
    MissingParameters(Vec<String>),
    /// Instance construction or the handler failed.
    Failed(CommandError),
    /// The handler ran to completion.
    Completed,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Routes events through a [`CommandTree`].
///
/// `Dispatcher` is `Send + Sync` and cheap to clone; one instance can serve
/// any number of threads.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tree: Arc<CommandTree>,
    missing_reply: String,
}

impl Dispatcher {
    pub fn new(tree: CommandTree) -> Self {
        Self::from_shared(Arc::new(tree))
    }

    pub fn from_shared(tree: Arc<CommandTree>) -> Self {
        Self {
            tree,
            missing_reply: DEFAULT_MISSING_REPLY.to_string(),
        }
    }

    /// Replaces the missing-parameter reply template.
    pub fn with_missing_reply(mut self, template: impl Into<String>) -> Self {
        self.missing_reply = template.into();
        self
    }

    pub fn tree(&self) -> &Arc<CommandTree> {
        &self.tree
    }

    /// Dispatches `event`, resolving relative date-times against the current
    /// time.
    pub fn dispatch(&self, event: &dyn Event) -> Outcome {
        self.dispatch_at(event, Utc::now())
    }

    /// Dispatches `event` with `now` as the reference instant for relative
    /// date-times.
    pub fn dispatch_at(&self, event: &dyn Event, now: DateTime<Utc>) -> Outcome {
        let span = span!(Level::DEBUG, "dispatch", author = event.author_id());
        let _enter = span.enter();

        let lookup = Lookup::new(event.directory(), event.guild_id());
        let args = ArgumentList::new(event.content(), lookup);
        let keys = (0..).map_while(|index| args.raw(index).map(|token| token.text()));
        let Some(resolution) = self.tree.resolve(keys, event.help_mode()) else {
            trace!("no command matched");
            return Outcome::NotFound;
        };

        let inv = Invocation::new(event, &self.tree, resolution, &args);
        debug!(command = %inv.path(), depth = inv.depth(), "resolved command");

        if event.help_mode() && !inv.node().is_help() {
            deliver(&inv, Reply::Text(help::render(&self.tree, inv.node_id())));
            return Outcome::Completed;
        }

        let mut outcome = None;
        let reached = Pipeline::new(inv.node().preprocessors()).run(&inv, || {
            outcome = Some(self.execute(&inv, now));
        });
        if !reached {
            debug!(command = %inv.path(), "invocation denied");
        }
        outcome.unwrap_or(Outcome::Denied)
    }

    fn execute(&self, inv: &Invocation<'_>, now: DateTime<Utc>) -> Outcome {
        let node = inv.node();
        let binding = CommandParser::new(inv.args(), inv.depth())
            .at(now)
            .bind(node.parameters(), |param| run_fallback(inv, param));

        if binding.failed {
            let missing: Vec<&Parameter> =
                binding.missing.iter().map(|&index| &node.parameters()[index]).collect();
            debug!(
                command = %inv.path(),
                missing = missing.len(),
                "required parameters missing"
            );
            let unhandled: Vec<&str> = missing
                .iter()
                .filter(|param| param.fallback().is_none())
                .map(|param| param.name())
                .collect();
            if !unhandled.is_empty() {
                let text = self.missing_reply.replace("{parameters}", &unhandled.join(", "));
                deliver(inv, Reply::Text(text));
            }
            return Outcome::MissingParameters(
                missing.iter().map(|param| param.name().to_string()).collect(),
            );
        }

        let invoker = node.invoker();
        let result = catch_unwind(AssertUnwindSafe(|| invoker(inv, binding.values)))
            .unwrap_or_else(|payload| Err(CommandError::from_panic(payload)));
        match result {
            Ok(reply) => {
                if let Some(reply) = reply {
                    deliver(inv, reply);
                }
                Outcome::Completed
            }
            Err(err) => {
                error!(
                    command = %inv.path(),
                    event = ?inv.event(),
                    error = %err,
                    "command failed"
                );
                Outcome::Failed(err)
            }
        }
    }
}

fn run_fallback(inv: &Invocation<'_>, param: &Parameter) {
    let Some(fallback) = param.fallback() else {
        return;
    };
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| fallback(inv, param))) {
        error!(
            command = %inv.path(),
            parameter = param.name(),
            error = %panic_message(payload.as_ref()),
            "parameter fallback panicked"
        );
    }
}

fn deliver(inv: &Invocation<'_>, reply: Reply) {
    if let Err(e) = inv.reply(reply) {
        warn!(command = %inv.path(), error = %e, "failed to deliver reply");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::handler::{Arg, Args};
    use crate::parameter::ParameterConfig;
    use crate::preprocessor::Preprocessor;
    use crate::testing::{GUILD, TestEvent};
    use crate::tree::CommandBuilder;
    use bronze_core::{Member, MemoryDirectory, User};

    fn echo(_inv: &Invocation<'_>, words: Args<String>) -> String {
        words.join(" ")
    }

    fn add(_inv: &Invocation<'_>, a: Arg<i64>, b: Arg<i64>) -> String {
        (*a + *b).to_string()
    }

    fn fails(_inv: &Invocation<'_>) -> Result<(), &'static str> {
        Err("nope")
    }

    fn panics(_inv: &Invocation<'_>) {
        panic!("kaboom");
    }

    fn dispatcher() -> Dispatcher {
        let tree = CommandTree::builder()
            .command(CommandBuilder::new(["echo"]).function(echo))
            .command(CommandBuilder::new(["add"]).function(add))
            .command(
                CommandBuilder::new(["calc"])
                    .function(add)
                    .param(1, ParameterConfig::new().fallback(|inv, _| {
                        let _ = inv.reply("second operand?");
                    })),
            )
            .command(CommandBuilder::new(["fails"]).function(fails))
            .command(CommandBuilder::new(["panics"]).function(panics))
            .command(
                CommandBuilder::new(["locked"])
                    .function(echo)
                    .preprocessor(Preprocessor::new("deny", |_, _| Ok(()))),
            )
            .build()
            .unwrap();
        Dispatcher::new(tree)
    }

    #[test]
    fn test_completed_with_reply() {
        let event = TestEvent::guild("echo hello  world");
        assert_eq!(dispatcher().dispatch(&event), Outcome::Completed);
        assert_eq!(event.reply_texts(), vec!["hello world"]);

        let event = TestEvent::guild("ADD 2 40");
        assert_eq!(dispatcher().dispatch(&event), Outcome::Completed);
        assert_eq!(event.reply_texts(), vec!["42"]);
    }

    #[test]
    fn test_not_found() {
        let event = TestEvent::guild("unknown command");
        assert_eq!(dispatcher().dispatch(&event), Outcome::NotFound);
        assert!(event.replies().is_empty());
    }

    #[test]
    fn test_missing_parameters_are_reported_together() {
        let event = TestEvent::guild("add x");
        assert_eq!(
            dispatcher().dispatch(&event),
            Outcome::MissingParameters(vec!["i64".into(), "i64".into()])
        );
        assert_eq!(event.reply_texts(), vec!["Missing required parameters: i64, i64"]);
    }

    #[test]
    fn test_fallback_replaces_generic_reply() {
        let event = TestEvent::guild("calc 1");
        let outcome = dispatcher()
            .with_missing_reply("missing {parameters}")
            .dispatch(&event);
        assert_eq!(outcome, Outcome::MissingParameters(vec!["i64".into()]));
        assert_eq!(event.reply_texts(), vec!["second operand?"]);

        let event = TestEvent::guild("calc");
        dispatcher().with_missing_reply("missing {parameters}").dispatch(&event);
        assert_eq!(event.reply_texts(), vec!["second operand?", "missing i64"]);
    }

    #[test]
    fn test_handler_errors_and_panics_are_contained() {
        let event = TestEvent::guild("fails");
        assert_eq!(
            dispatcher().dispatch(&event),
            Outcome::Failed(CommandError::Handler("nope".into()))
        );

        let event = TestEvent::guild("panics");
        assert_eq!(
            dispatcher().dispatch(&event),
            Outcome::Failed(CommandError::Panicked("kaboom".into()))
        );
    }

    #[test]
    fn test_denied_by_preprocessor() {
        let event = TestEvent::guild("locked a b");
        assert_eq!(dispatcher().dispatch(&event), Outcome::Denied);
        assert!(event.replies().is_empty());
    }

    #[test]
    fn test_failed_reply_delivery_is_not_an_error() {
        let event = TestEvent::guild("echo hi").failing_replies();
        assert_eq!(dispatcher().dispatch(&event), Outcome::Completed);
    }

    #[test]
    fn test_mentions_resolve_through_the_event_directory() {
        fn greet(_inv: &Invocation<'_>, who: Arg<Member>) -> String {
            format!("hi {}", who.display_name())
        }

        let dispatcher = Dispatcher::new(
            CommandTree::builder()
                .command(CommandBuilder::new(["greet"]).function(greet))
                .build()
                .unwrap(),
        );
        let directory =
            MemoryDirectory::new().with_member(Member::new(GUILD, User::new(5, "alice")));
        let event = TestEvent::guild("greet <@5>").with_directory(directory);
        assert_eq!(dispatcher.dispatch(&event), Outcome::Completed);
        assert_eq!(event.reply_texts(), vec!["hi alice"]);
    }

    #[test]
    fn test_help_mode_renders_help() {
        let dispatcher = Dispatcher::new(
            CommandTree::builder()
                .command(CommandBuilder::new(["add"]).function(add))
                .command(CommandBuilder::help_command(["help"]))
                .build()
                .unwrap(),
        );
        let event = TestEvent::guild("add").help();
        assert_eq!(dispatcher.dispatch(&event), Outcome::Completed);
        assert_eq!(event.reply_texts(), vec!["**add**\nUsage: add <i64> <i64>"]);

        let event = TestEvent::guild("help add");
        dispatcher.dispatch(&event);
        assert_eq!(event.reply_texts(), vec!["**add**\nUsage: add <i64> <i64>"]);

        let event = TestEvent::guild("help");
        dispatcher.dispatch(&event);
        assert_eq!(event.reply_texts(), vec!["Commands:\nOther\n  add\n  help"]);
    }

    #[test]
    fn test_help_mode_unknown_subcommand_uses_help_child() {
        let dispatcher = Dispatcher::new(
            CommandTree::builder()
                .command(
                    CommandBuilder::new(["admin"])
                        .function(panics)
                        .child(CommandBuilder::new(["kick"]).function(panics))
                        .child(CommandBuilder::help_command(["help"])),
                )
                .build()
                .unwrap(),
        );

        let event = TestEvent::guild("admin kick").help();
        assert_eq!(dispatcher.dispatch(&event), Outcome::Completed);
        assert_eq!(event.reply_texts(), vec!["**admin kick**\nUsage: admin kick"]);

        // `admin help` runs and describes the closest command it can find.
        let event = TestEvent::guild("admin nope").help();
        assert_eq!(dispatcher.dispatch(&event), Outcome::Completed);
        assert_eq!(
            event.reply_texts(),
            vec!["**admin**\nUsage: admin\nSubcommands:\n  kick\n  help"]
        );
    }

    #[test]
    fn test_each_dispatch_reads_the_message_once() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        fn count(_inv: &Invocation<'_>) {
            CALLS.fetch_add(1, Ordering::SeqCst);
        }

        let dispatcher = Dispatcher::new(
            CommandTree::builder()
                .command(CommandBuilder::new(["count"]).function(count))
                .build()
                .unwrap(),
        );
        for _ in 0..3 {
            dispatcher.dispatch(&TestEvent::direct("count"));
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 3);
    }
}
