//! Helper functions for tree-sitter CST navigation.

use tree_sitter::Node;

use crate::tree::Span;

/// Get the text content of a node.
pub fn get_node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    let start = node.start_byte();
    let end = node.end_byte();
    if start < source.len() && end <= source.len() && start < end {
        &source[start..end]
    } else {
        ""
    }
}

/// Get line number (1-indexed) from a node.
pub fn get_start_line(node: &Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// Get end line number (1-indexed) from a node.
pub fn get_end_line(node: &Node) -> u32 {
    node.end_position().row as u32 + 1
}

pub fn span_of(node: &Node) -> Span {
    Span::new(
        node.start_byte(),
        node.end_byte(),
        get_start_line(node),
        get_end_line(node),
    )
}

/// First `ERROR` or missing node below `node`, in document order.
pub fn first_error<'a>(node: &Node<'a>) -> Option<Node<'a>> {
    if node.is_error() || node.is_missing() {
        return Some(*node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(&child) {
            return Some(found);
        }
    }
    None
}

/// Collapse runs of whitespace so labels don't change with reindentation.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("a  +\n\t b"), "a + b");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_first_error_points_at_broken_statement() {
        let source = "def ok():\n    return 1\n\ndef broken(:\n    pass\n";
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse(source, None).unwrap();

        let error = first_error(&tree.root_node()).unwrap();
        assert_eq!(get_start_line(&error), 4);

        let clean = parser.parse("x = 1\n", None).unwrap();
        assert!(first_error(&clean.root_node()).is_none());
    }
}
