//! Text rendering of rule trees

use crate::rule::ast::Node;

/// Render a tree with box-drawing branches, one node per line
///
/// ```text
/// └── AND
///     ├── department == 'Sales'
///     └── OR
///         ├── age > 30
///         └── experience > 5
/// ```
pub fn render_tree(node: &Node) -> String {
    let mut out = String::new();
    render_into(&mut out, node, "", true);
    out
}

fn render_into(out: &mut String, node: &Node, prefix: &str, is_last: bool) {
    out.push_str(prefix);
    out.push_str(if is_last { "└── " } else { "├── " });
    out.push_str(&node.value());
    out.push('\n');

    let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
    match (node.left(), node.right()) {
        (Some(left), Some(right)) => {
            render_into(out, left, &child_prefix, false);
            render_into(out, right, &child_prefix, true);
        }
        (Some(only), None) | (None, Some(only)) => render_into(out, only, &child_prefix, true),
        (None, None) => {}
    }
}
