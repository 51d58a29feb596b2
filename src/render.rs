//! Text and JSON views of the activity forest

use crate::persistence::ProcessRecord;
use crate::tree::{ActivityForest, ActivityNode, NodeId};
use std::fmt::Write as _;

/// Format seconds as `hh:mm:ss`
///
/// Hours keep counting past 24, so a long-lived process shows `27:00:00`
/// rather than wrapping into days.
pub fn format_hms(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Label shown for a node: `<hh:mm:ss> - <name>`
pub fn node_label(node: &ActivityNode) -> String {
    format!("{} - {}", format_hms(node.cumulative_seconds()), node.name())
}

/// Depth-first pre-order walk over every tree, in current child order
pub fn visit_preorder<F>(forest: &ActivityForest, mut visit: F)
where
    F: FnMut(usize, NodeId, &ActivityNode),
{
    // Explicit stack; children pushed in reverse so the first child pops first
    let mut stack: Vec<(usize, NodeId)> = forest.roots().iter().rev().map(|&id| (0, id)).collect();
    while let Some((depth, id)) = stack.pop() {
        let node = forest.node(id);
        visit(depth, id, node);
        stack.extend(node.children().iter().rev().map(|&child| (depth + 1, child)));
    }
}

/// Render the forest as an indented tree, one node per line
pub fn render_text(forest: &ActivityForest) -> String {
    let mut out = String::new();
    visit_preorder(forest, |depth, _, node| {
        let _ = writeln!(out, "{}{}", "  ".repeat(depth), node_label(node));
    });
    out
}

/// Render the forest in its persisted record shape, pretty-printed
pub fn render_json(forest: &ActivityForest) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ProcessRecord::from_forest(forest))
}
