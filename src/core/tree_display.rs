// src/core/tree_display.rs

use crate::core::tree_builder::NodeMap;
use crate::models::Node;

/// Where a node sits among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Single,
    First,
    Middle,
    Last,
}

impl Position {
    fn of(index: usize, count: usize) -> Self {
        if count == 1 {
            Self::Single
        } else if index == 0 {
            Self::First
        } else if index + 1 == count {
            Self::Last
        } else {
            Self::Middle
        }
    }

    fn name_prefix(self) -> &'static str {
        match self {
            Self::Single => " └─",
            Self::First => " └┬",
            Self::Last => "  └",
            Self::Middle => "  ├",
        }
    }

    /// Whether more siblings follow, so the guide line continues.
    fn continues(self) -> bool {
        matches!(self, Self::First | Self::Middle)
    }
}

/// Renders a (filtered) node map as an ASCII tree.
///
/// Roots are the nodes whose parent is absent from the map, sorted by name then path.
/// Children keep the order of the map's children lists.
pub fn render(nodes: &NodeMap) -> String {
    render_lines(nodes).join("\n")
}

/// Renders the tree as lines, without a trailing newline.
pub fn render_lines(nodes: &NodeMap) -> Vec<String> {
    let mut roots: Vec<&Node> = nodes
        .values()
        .filter(|n| n.parent.as_ref().is_none_or(|p| !nodes.contains_key(p)))
        .collect();
    roots.sort_by(|a, b| (a.name(), &a.path).cmp(&(b.name(), &b.path)));
    let roots: Vec<&str> = roots.iter().map(|n| n.id()).collect();

    let mut lines = Vec::new();
    render_level(nodes, &roots, "", &mut lines);
    lines
}

fn render_level(nodes: &NodeMap, ids: &[&str], indent: &str, lines: &mut Vec<String>) {
    let present: Vec<&Node> = ids.iter().filter_map(|id| nodes.get(*id)).collect();
    for (i, node) in present.iter().enumerate() {
        let position = Position::of(i, present.len());
        let children: Vec<&str> = node
            .children
            .iter()
            .filter(|c| nodes.contains_key(*c))
            .map(String::as_str)
            .collect();
        render_node(node, indent, position, !children.is_empty(), lines);

        let guide = if position.continues() { "  │" } else { "   " };
        render_level(nodes, &children, &format!("{}{}", indent, guide), lines);
    }
}

fn render_node(
    node: &Node,
    indent: &str,
    position: Position,
    has_children: bool,
    lines: &mut Vec<String>,
) {
    lines.push(format!("{}{} {}", indent, position.name_prefix(), node.name()));

    let addl = format!(
        "{}{}",
        if position.continues() { "  │" } else { "   " },
        if has_children { " │" } else { "  " }
    );

    let mut fields = vec![
        format!("id: {}", node.id()),
        format!("path: {}", node.path.display()),
    ];
    if !node.record.description.is_empty() {
        fields.push(format!("description: {}", node.record.description));
    }
    for (key, value) in &node.record.tags {
        fields.push(format!("tag: {} = {}", key, value));
    }
    fields.push(String::new());

    for field in fields {
        lines.push(format!("{}{}  {}", indent, addl, field));
    }
}
