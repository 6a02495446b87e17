//! The command tree and its resolver.
//!
//! Nodes live in an arena owned by [`CommandTree`]; children are referenced
//! by [`NodeId`] and each node keeps a non-owning handle to its parent. The
//! tree is produced by [`CommandTreeBuilder`] and never changes afterwards.
//!
//! Resolution walks the leading tokens of a message: the first token selects
//! a root command (keys compare case-insensitively), and each further token
//! descends into a child while one matches. When a token matches no child the
//! walk stops and the current node handles the message, so `parent
//! unknownchild` runs `parent`. In help mode the walk instead ends on a help
//! node when one is reachable: a child of the current node, then a sibling.

mod builder;

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use crate::handler::Invoker;
use crate::parameter::Parameter;
use crate::preprocessor::Preprocessor;
use crate::property::{Hidden, Property, PropertyMap};

pub use builder::{CommandBuilder, CommandTreeBuilder};

/// The key that marks a help command during help-mode resolution.
pub const HELP_KEY: &str = "help";

/// Handle of a node in its [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The node a key path resolved to and how many tokens it consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub node: NodeId,
    pub depth: usize,
}

/// One built command.
pub struct CommandNode {
    keys: Vec<String>,
    parent: Option<NodeId>,
    children: HashMap<String, NodeId>,
    child_order: Vec<NodeId>,
    parameters: Vec<Parameter>,
    invoker: Invoker,
    preprocessors: Vec<Preprocessor>,
    properties: PropertyMap,
    help: bool,
}

impl CommandNode {
    /// All keys, primary first.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn name(&self) -> &str {
        &self.keys[0]
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in declaration order.
    pub fn children(&self) -> &[NodeId] {
        &self.child_order
    }

    pub fn has_children(&self) -> bool {
        !self.child_order.is_empty()
    }

    /// Looks up a child by any of its keys, ignoring case.
    pub fn child(&self, key: &str) -> Option<NodeId> {
        self.children.get(&key.to_lowercase()).copied()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub(crate) fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Preprocessors in execution order.
    pub fn preprocessors(&self) -> &[Preprocessor] {
        &self.preprocessors
    }

    /// The flattened property map: inherited entries overlaid with the
    /// node's own.
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    pub fn property<P: Property>(&self) -> Option<&P> {
        self.properties.get::<P>()
    }

    pub fn is_help(&self) -> bool {
        self.help
    }

    pub fn is_hidden(&self) -> bool {
        self.properties.has::<Hidden>()
    }

    fn answers_help(&self) -> bool {
        self.help || self.keys.iter().any(|key| key.eq_ignore_ascii_case(HELP_KEY))
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("keys", &self.keys)
            .field("parent", &self.parent)
            .field("children", &self.child_order)
            .field("parameters", &self.parameters)
            .field("preprocessors", &self.preprocessors)
            .field("properties", &self.properties)
            .field("help", &self.help)
            .finish()
    }
}

/// An immutable, arena-allocated command hierarchy.
pub struct CommandTree {
    nodes: Vec<CommandNode>,
    roots: HashMap<String, NodeId>,
    root_order: Vec<NodeId>,
}

impl CommandTree {
    pub fn builder() -> CommandTreeBuilder {
        CommandTreeBuilder::new()
    }

    /// The node behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` belongs to a different tree.
    pub fn node(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&CommandNode> {
        self.nodes.get(id.0)
    }

    /// Root commands in declaration order.
    pub fn roots(&self) -> &[NodeId] {
        &self.root_order
    }

    pub fn root(&self, key: &str) -> Option<NodeId> {
        self.roots.get(&key.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids from the root down to `id`, inclusive.
    pub fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut lineage = vec![id];
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            lineage.push(parent);
            current = parent;
        }
        lineage.reverse();
        lineage
    }

    /// Space-separated primary keys from the root down to `id`.
    pub fn path(&self, id: NodeId) -> String {
        self.lineage(id)
            .into_iter()
            .map(|id| self.node(id).name())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Resolves a key path to the deepest matching command.
    ///
    /// Keys are pulled lazily, one per level, so passing the token stream of
    /// a message reads only as far as the command path goes. Returns `None`
    /// when the first key names no root command.
    ///
    /// In help mode, a key that names no subcommand of a node with children
    /// resolves to that node's help child, then a help sibling, then the node
    /// itself. A fully matched path always resolves to its own node.
    pub fn resolve<'k, I>(&self, keys: I, help_mode: bool) -> Option<Resolution>
    where
        I: IntoIterator<Item = &'k str>,
    {
        let mut keys = keys.into_iter();
        let mut current = self.root(keys.next()?)?;
        let mut depth = 1;
        let mut unmatched = false;

        loop {
            let node = self.node(current);
            if !node.has_children() {
                break;
            }
            let Some(key) = keys.next() else { break };
            match node.child(key) {
                Some(child) => {
                    current = child;
                    depth += 1;
                }
                None => {
                    trace!(command = %self.path(current), key, "no matching subcommand");
                    unmatched = true;
                    break;
                }
            }
        }

        if help_mode
            && unmatched
            && let Some(help) = self.help_for(current)
        {
            trace!(command = %self.path(current), help = %self.path(help), "resolved help");
            return Some(Resolution { node: help, depth });
        }
        Some(Resolution {
            node: current,
            depth,
        })
    }

    /// The help node answering for `id`: a help child, then a help sibling.
    fn help_for(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        let siblings = match node.parent {
            Some(parent) => self.node(parent).children(),
            None => self.roots(),
        };
        node.children()
            .iter()
            .chain(siblings)
            .copied()
            .find(|&candidate| candidate != id && self.node(candidate).answers_help())
    }
}

impl fmt::Debug for CommandTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTree")
            .field("nodes", &self.nodes.len())
            .field(
                "roots",
                &self
                    .root_order
                    .iter()
                    .map(|id| self.node(*id).name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::Invocation;

    fn noop(_inv: &Invocation<'_>) {}

    fn tree() -> CommandTree {
        CommandTree::builder()
            .command(
                CommandBuilder::new(["parent", "p"])
                    .function(noop)
                    .child(CommandBuilder::new(["child"]).function(noop))
                    .child(
                        CommandBuilder::new(["nested"])
                            .function(noop)
                            .child(CommandBuilder::new(["deep"]).function(noop)),
                    ),
            )
            .command(CommandBuilder::new(["leaf"]).function(noop))
            .command(CommandBuilder::help_command(["help"]))
            .build()
            .unwrap()
    }

    fn resolve(tree: &CommandTree, text: &str, help: bool) -> Option<(String, usize)> {
        tree.resolve(text.split_whitespace(), help)
            .map(|r| (tree.path(r.node), r.depth))
    }

    #[test]
    fn test_resolve_descends_case_insensitively() {
        let tree = tree();
        assert_eq!(resolve(&tree, "PARENT Child x", false), Some(("parent child".into(), 2)));
        assert_eq!(resolve(&tree, "p nested deep", false), Some(("parent nested deep".into(), 3)));
    }

    #[test]
    fn test_unknown_child_falls_back_to_parent() {
        let tree = tree();
        assert_eq!(resolve(&tree, "parent unknownchild", false), Some(("parent".into(), 1)));
        assert_eq!(resolve(&tree, "parent nested nope", false), Some(("parent nested".into(), 2)));
    }

    #[test]
    fn test_unknown_root_is_not_found() {
        let tree = tree();
        assert_eq!(resolve(&tree, "nothing here", false), None);
        assert_eq!(resolve(&tree, "", false), None);
    }

    #[test]
    fn test_help_mode_keeps_matched_paths() {
        let tree = tree();
        assert_eq!(resolve(&tree, "leaf", true), Some(("leaf".into(), 1)));
        assert_eq!(resolve(&tree, "leaf extra", true), Some(("leaf".into(), 1)));
        assert_eq!(resolve(&tree, "parent child", true), Some(("parent child".into(), 2)));
        assert_eq!(resolve(&tree, "parent", true), Some(("parent".into(), 1)));
        assert_eq!(resolve(&tree, "help", true), Some(("help".into(), 1)));
    }

    #[test]
    fn test_help_mode_on_unknown_subcommand() {
        let tree = tree();
        // `parent` has no help child, so its sibling help answers.
        assert_eq!(resolve(&tree, "parent unknown", true), Some(("help".into(), 1)));
        // Nested nodes have no help sibling and fall back to themselves.
        assert_eq!(
            resolve(&tree, "parent nested nope", true),
            Some(("parent nested".into(), 2))
        );
    }

    #[test]
    fn test_help_child_wins_over_sibling() {
        let tree = CommandTree::builder()
            .command(
                CommandBuilder::new(["admin"])
                    .function(noop)
                    .child(CommandBuilder::new(["kick"]).function(noop))
                    .child(CommandBuilder::help_command(["help"])),
            )
            .command(CommandBuilder::new(["ping"]).function(noop))
            .command(CommandBuilder::help_command(["help"]))
            .build()
            .unwrap();
        assert_eq!(resolve(&tree, "admin foo", true), Some(("admin help".into(), 1)));
        assert_eq!(resolve(&tree, "admin kick", true), Some(("admin kick".into(), 2)));
        assert_eq!(resolve(&tree, "ping", true), Some(("ping".into(), 1)));
    }

    #[test]
    fn test_lineage_and_path() {
        let tree = tree();
        let deep = tree.resolve(["parent", "nested", "deep"], false).unwrap().node;
        assert_eq!(tree.lineage(deep).len(), 3);
        assert_eq!(tree.path(deep), "parent nested deep");
        assert_eq!(tree.roots().len(), 3);
    }
}
