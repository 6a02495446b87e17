//! Help text rendering.

use std::fmt::Write;

use crate::invocation::Invocation;
use crate::parameter::{Collection, Parameter};
use crate::property::{Category, Description, Usage};
use crate::tree::{CommandTree, NodeId};

const UNCATEGORIZED: &str = "Other";

/// Renders help for one command: its path and description, a usage line,
/// aliases, and its visible subcommands.
pub fn render(tree: &CommandTree, id: NodeId) -> String {
    let node = tree.node(id);
    let path = tree.path(id);
    let mut out = format!("**{path}**");
    if let Some(description) = node.property::<Description>() {
        let _ = write!(out, " - {}", description.0);
    }

    let usage = match node.property::<Usage>() {
        Some(usage) => usage.0.clone(),
        None => synopsis(node.parameters()),
    };
    let _ = write!(out, "\nUsage: {path}");
    if !usage.is_empty() {
        let _ = write!(out, " {usage}");
    }

    if node.keys().len() > 1 {
        let _ = write!(out, "\nAliases: {}", node.keys()[1..].join(", "));
    }

    let children: Vec<NodeId> = node
        .children()
        .iter()
        .copied()
        .filter(|&child| !tree.node(child).is_hidden())
        .collect();
    if !children.is_empty() {
        out.push_str("\nSubcommands:");
        for child in children {
            out.push_str("\n  ");
            out.push_str(&summary(tree, child));
        }
    }
    out
}

/// Lists the visible root commands grouped by [`Category`], in declaration
/// order.
pub fn list(tree: &CommandTree) -> String {
    let mut groups: Vec<(&str, Vec<NodeId>)> = Vec::new();
    for &root in tree.roots() {
        let node = tree.node(root);
        if node.is_hidden() {
            continue;
        }
        let category = node
            .property::<Category>()
            .map_or(UNCATEGORIZED, |c| c.0.as_str());
        match groups.iter_mut().find(|(name, _)| *name == category) {
            Some((_, ids)) => ids.push(root),
            None => groups.push((category, vec![root])),
        }
    }

    let mut out = String::from("Commands:");
    for (category, ids) in groups {
        let _ = write!(out, "\n{category}");
        for id in ids {
            let _ = write!(out, "\n  {}", summary(tree, id));
        }
    }
    out
}

/// The parameter synopsis, e.g. `<member> [days] <word...>`.
pub fn synopsis(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(|param| {
            let name = match param.collection() {
                Collection::Single => param.name().to_string(),
                Collection::List | Collection::Stream => format!("{}...", param.name()),
            };
            if param.is_required() {
                format!("<{name}>")
            } else {
                format!("[{name}]")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn summary(tree: &CommandTree, id: NodeId) -> String {
    let node = tree.node(id);
    match node.property::<Description>() {
        Some(description) => format!("{} - {}", node.name(), description.0),
        None => node.name().to_string(),
    }
}

/// Body of help commands.
pub(crate) fn show(inv: &Invocation<'_>) -> String {
    let tree = inv.tree();
    let args = inv.args();

    let tokens = move |from: usize| {
        (from..).map_while(move |index| args.raw(index).map(|t| t.text()))
    };

    let keys: Vec<&str> = if inv.event().help_mode() {
        tokens(0).collect()
    } else {
        // Relative to the help command's parent: `admin help kick` asks about
        // `admin kick`.
        let lineage = tree.lineage(inv.node_id());
        let parents = &lineage[..lineage.len() - 1];
        parents
            .iter()
            .map(|&id| tree.node(id).name())
            .chain(tokens(inv.depth()))
            .collect()
    };

    let target = tree
        .resolve(keys, false)
        .map(|resolution| resolution.node)
        .filter(|&id| !tree.node(id).is_help());
    match target {
        Some(id) => render(tree, id),
        None => list(tree),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Arg, Args};
    use crate::parameter::ParameterConfig;
    use crate::property::Hidden;
    use crate::tree::CommandBuilder;

    fn noop(_inv: &Invocation<'_>) {}

    fn ban(_inv: &Invocation<'_>, _who: Arg<String>, _days: Option<Arg<i32>>, _why: Args<String>) {}

    fn tree() -> CommandTree {
        CommandTree::builder()
            .command(
                CommandBuilder::new(["ban", "b"])
                    .function(ban)
                    .property(Description("Bans someone".into()))
                    .property(Category("Moderation".into()))
                    .param(0, ParameterConfig::new().name("who"))
                    .param(1, ParameterConfig::new().name("days"))
                    .param(2, ParameterConfig::new().name("reason"))
                    .child(CommandBuilder::new(["list"]).function(noop))
                    .child(CommandBuilder::new(["secret"]).function(noop).property(Hidden)),
            )
            .command(CommandBuilder::new(["ping"]).function(noop))
            .command(CommandBuilder::new(["hidden"]).function(noop).property(Hidden))
            .command(CommandBuilder::help_command(["help"]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_render_command() {
        let tree = tree();
        let ban = tree.root("ban").unwrap();
        assert_eq!(
            render(&tree, ban),
            "**ban** - Bans someone\n\
             Usage: ban <who> [days] <reason...>\n\
             Aliases: b\n\
             Subcommands:\n  list"
        );
    }

    #[test]
    fn test_list_groups_by_category() {
        let tree = tree();
        assert_eq!(
            list(&tree),
            "Commands:\nModeration\n  ban - Bans someone\nOther\n  ping\n  help"
        );
    }

    #[test]
    fn test_usage_property_replaces_synopsis() {
        let tree = CommandTree::builder()
            .command(
                CommandBuilder::new(["roll"])
                    .function(noop)
                    .property(Usage("<dice>d<sides>".into())),
            )
            .build()
            .unwrap();
        assert_eq!(
            render(&tree, tree.roots()[0]),
            "**roll**\nUsage: roll <dice>d<sides>"
        );
    }
}
