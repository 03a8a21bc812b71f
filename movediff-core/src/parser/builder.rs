//! Tree-sitter CST to [`Tree`] conversion.

use tree_sitter::{Node, Parser};

use super::helpers::{first_error, get_node_text, get_start_line, normalize_whitespace, span_of};
use super::languages::{normalize_language, tree_sitter_language};
use super::TreeBuilder;
use crate::error::{DiffError, Result};
use crate::tree::{NodeId, Tree};

/// Builds trees from any bundled tree-sitter grammar.
///
/// Named nodes become tree nodes with the grammar kind as their kind.
/// Anonymous tokens (punctuation, keywords) are dropped. Labels:
///
/// - named leaves carry their source text
/// - nodes with a `name` field carry the name, e.g. `method_declaration "foo"`
/// - nodes with an `operator` field carry the operator, e.g. `binary_expression "+"`
#[derive(Clone, Debug, Default)]
pub struct TreeSitterBuilder {
    keep_comments: bool,
}

impl TreeSitterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep comment nodes. They are dropped by default.
    pub fn with_comments(mut self, keep: bool) -> Self {
        self.keep_comments = keep;
        self
    }

    fn keep(&self, node: &Node) -> bool {
        node.is_named() && (self.keep_comments || !node.is_extra())
    }

    fn label(node: &Node, source: &str) -> String {
        if node.named_child_count() == 0 {
            return normalize_whitespace(get_node_text(node, source));
        }
        for field in ["name", "operator"] {
            if let Some(child) = node.child_by_field_name(field) {
                return normalize_whitespace(get_node_text(&child, source));
            }
        }
        String::new()
    }

    fn push_children<'t>(&self, stack: &mut Vec<(Node<'t>, NodeId)>, node: Node<'t>, id: NodeId) {
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node
            .children(&mut cursor)
            .filter(|c| self.keep(c))
            .collect();
        // reversed so that popping yields document order and ids follow preorder
        stack.extend(children.into_iter().rev().map(|c| (c, id)));
    }

    fn convert(&self, root: Node<'_>, source: &str) -> Tree {
        let mut tree = Tree::new(root.kind(), Self::label(&root, source), span_of(&root));
        let mut stack = Vec::new();
        self.push_children(&mut stack, root, tree.root());
        while let Some((node, parent)) = stack.pop() {
            let id = tree.add_child(parent, node.kind(), Self::label(&node, source), span_of(&node));
            self.push_children(&mut stack, node, id);
        }
        tree
    }
}

impl TreeBuilder for TreeSitterBuilder {
    fn build(&self, path: &str, language: &str, source: &str) -> Result<Tree> {
        let grammar = tree_sitter_language(language)?;
        let mut parser = Parser::new();
        parser.set_language(&grammar).map_err(|e| DiffError::Parse {
            path: path.to_string(),
            message: format!(
                "Failed to set {} language: {}",
                normalize_language(language).unwrap_or(language),
                e
            ),
        })?;

        let cst = parser.parse(source, None).ok_or_else(|| DiffError::Parse {
            path: path.to_string(),
            message: "parser produced no tree".to_string(),
        })?;
        let root = cst.root_node();
        if let Some(error) = first_error(&root) {
            return Err(DiffError::Parse {
                path: path.to_string(),
                message: format!("syntax error at line {}", get_start_line(&error)),
            });
        }

        Ok(self.convert(root, source))
    }
}
