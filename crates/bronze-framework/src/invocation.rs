//! The per-message invocation context.

use std::fmt;
use std::sync::Arc;

use bronze_core::{Argument, ArgumentList};

use crate::error::ReplyError;
use crate::event::{Event, Reply};
use crate::property::Property;
use crate::tree::{CommandNode, CommandTree, NodeId, Resolution};

/// Everything a preprocessor or handler gets to see about one resolved
/// command: the triggering event, the node it resolved to and the message's
/// arguments.
#[derive(Clone, Copy)]
pub struct Invocation<'a> {
    event: &'a dyn Event,
    tree: &'a CommandTree,
    node: NodeId,
    depth: usize,
    args: &'a ArgumentList<'a>,
}

impl<'a> Invocation<'a> {
    pub fn new(
        event: &'a dyn Event,
        tree: &'a CommandTree,
        resolution: Resolution,
        args: &'a ArgumentList<'a>,
    ) -> Self {
        Self {
            event,
            tree,
            node: resolution.node,
            depth: resolution.depth,
            args,
        }
    }

    pub fn event(&self) -> &'a dyn Event {
        self.event
    }

    pub fn tree(&self) -> &'a CommandTree {
        self.tree
    }

    pub fn node(&self) -> &'a CommandNode {
        self.tree.node(self.node)
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Number of leading tokens that were command keys.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// All arguments of the message, command keys included.
    pub fn args(&self) -> &'a ArgumentList<'a> {
        self.args
    }

    /// The arguments following the command keys.
    pub fn remaining(&self) -> impl Iterator<Item = Arc<Argument>> + 'a {
        let args = self.args;
        (self.depth..).map_while(move |index| args.get(index))
    }

    /// Space-separated primary keys from the root to this command.
    pub fn path(&self) -> String {
        self.tree.path(self.node)
    }

    pub fn property<P: Property>(&self) -> Option<&'a P> {
        self.node().property::<P>()
    }

    pub fn has<P: Property>(&self) -> bool {
        self.node().properties().has::<P>()
    }

    pub fn guild_id(&self) -> Option<u64> {
        self.event.guild_id()
    }

    pub fn author_id(&self) -> u64 {
        self.event.author_id()
    }

    pub fn reply(&self, reply: impl Into<Reply>) -> Result<(), ReplyError> {
        self.event.reply(reply.into())
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("command", &self.path())
            .field("depth", &self.depth)
            .field("event", &self.event)
            .finish()
    }
}
