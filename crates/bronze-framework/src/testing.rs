//! Shared helpers for unit tests.

use parking_lot::Mutex;

use bronze_core::{ArgumentList, Directory, Lookup, MemoryDirectory};

use crate::error::ReplyError;
use crate::event::{Event, Reply};
use crate::invocation::Invocation;
use crate::tree::{CommandBuilder, CommandTree, Resolution};

pub(crate) const GUILD: u64 = 10;
pub(crate) const AUTHOR: u64 = 20;
pub(crate) const CHANNEL: u64 = 30;

pub(crate) struct TestEvent {
    content: String,
    guild_id: Option<u64>,
    help: bool,
    fail_replies: bool,
    directory: MemoryDirectory,
    replies: Mutex<Vec<Reply>>,
}

impl TestEvent {
    pub(crate) fn guild(content: &str) -> Self {
        Self {
            content: content.to_string(),
            guild_id: Some(GUILD),
            help: false,
            fail_replies: false,
            directory: MemoryDirectory::new(),
            replies: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn direct(content: &str) -> Self {
        Self {
            guild_id: None,
            ..Self::guild(content)
        }
    }

    pub(crate) fn help(mut self) -> Self {
        self.help = true;
        self
    }

    pub(crate) fn failing_replies(mut self) -> Self {
        self.fail_replies = true;
        self
    }

    pub(crate) fn with_directory(mut self, directory: MemoryDirectory) -> Self {
        self.directory = directory;
        self
    }

    pub(crate) fn replies(&self) -> Vec<Reply> {
        self.replies.lock().clone()
    }

    pub(crate) fn reply_texts(&self) -> Vec<String> {
        self.replies
            .lock()
            .iter()
            .filter_map(|reply| reply.as_text().map(str::to_string))
            .collect()
    }
}

impl Event for TestEvent {
    fn content(&self) -> &str {
        &self.content
    }

    fn help_mode(&self) -> bool {
        self.help
    }

    fn guild_id(&self) -> Option<u64> {
        self.guild_id
    }

    fn channel_id(&self) -> u64 {
        CHANNEL
    }

    fn author_id(&self) -> u64 {
        AUTHOR
    }

    fn directory(&self) -> &dyn Directory {
        &self.directory
    }

    fn reply(&self, reply: Reply) -> Result<(), ReplyError> {
        if self.fail_replies {
            return Err(ReplyError::delivery("channel gone"));
        }
        self.replies.lock().push(reply);
        Ok(())
    }
}

fn pong(_inv: &Invocation<'_>) -> &'static str {
    "pong"
}

/// A one-command tree for exercising code that needs an [`Invocation`].
pub(crate) struct Fixture {
    tree: CommandTree,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let tree = CommandTree::builder()
            .command(CommandBuilder::new(["ping"]).function(pong))
            .build()
            .expect("fixture tree builds");
        Self { tree }
    }

    /// Runs `f` with an invocation of `ping` for `event`.
    pub(crate) fn with_invocation<R>(
        &self,
        event: &TestEvent,
        f: impl FnOnce(&Invocation<'_>) -> R,
    ) -> R {
        let args = ArgumentList::new(
            event.content(),
            Lookup::new(event.directory(), event.guild_id()),
        );
        let resolution = Resolution {
            node: self.tree.roots()[0],
            depth: 1,
        };
        let inv = Invocation::new(event, &self.tree, resolution, &args);
        f(&inv)
    }
}
