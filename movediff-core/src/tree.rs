//! Arena-backed syntax trees.
//!
//! A [`Tree`] owns every node of one parsed source file in a contiguous
//! store. Parent and child links are [`NodeId`] indices into that store, so
//! two nodes with identical kind and label remain distinct by position.
//!
//! Trees are normally produced by a [`TreeBuilder`](crate::parser::TreeBuilder).
//! Tests and fixtures can also write them as s-expressions:
//!
//! ```text
//! (CompilationUnit
//!   (TypeDeclaration "A"
//!     (MethodDeclaration "foo" (Block))))
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{DiffError, Result};

/// Index of a node inside its owning [`Tree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Position range of a node in its origin file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset.
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// 1-indexed first line.
    pub start_line: u32,
    /// 1-indexed last line.
    pub end_line: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, start_line: u32, end_line: u32) -> Self {
        Self {
            start,
            end,
            start_line,
            end_line,
        }
    }
}

/// A single typed, labeled node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    /// Semantic category, e.g. `method_declaration`.
    pub kind: String,
    /// Textual content; empty for most inner nodes.
    pub label: String,
    pub span: Span,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An ordered, rooted tree for one source file. The root is always `NodeId(0)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Create a tree holding only a root node.
    pub fn new(kind: impl Into<String>, label: impl Into<String>, span: Span) -> Self {
        Self {
            nodes: vec![Node {
                kind: kind.into(),
                label: label.into(),
                span,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Append a new last child under `parent` and return its id.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        kind: impl Into<String>,
        label: impl Into<String>,
        span: Span,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind: kind.into(),
            label: label.into(),
            span,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &str {
        &self.nodes[id.index()].kind
    }

    pub fn label(&self, id: NodeId) -> &str {
        &self.nodes[id.index()].label
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Index of `id` among its parent's children; `None` for the root.
    pub fn position_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Number of edges between `id` and the root.
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// True when `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// All node ids in document (pre-)order.
    pub fn preorder(&self) -> Vec<NodeId> {
        self.preorder_from(self.root())
    }

    /// `id` and its descendants in document order.
    pub fn preorder_from(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Number of nodes in the subtree rooted at `id`.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        self.preorder_from(id).len()
    }

    /// Parse the s-expression fixture format.
    ///
    /// Each node is `(Kind "label" child...)` where the label is optional.
    /// Spans are the byte offsets of the node's parentheses in `text`.
    pub fn from_sexp(text: &str) -> Result<Tree> {
        SexpReader::new(text).read()
    }

    /// Render the tree in the s-expression fixture format on one line.
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        self.write_sexp(self.root(), &mut out);
        out
    }

    fn write_sexp(&self, id: NodeId, out: &mut String) {
        out.push('(');
        out.push_str(self.kind(id));
        let label = self.label(id);
        if !label.is_empty() {
            out.push_str(" \"");
            for c in label.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    c => out.push(c),
                }
            }
            out.push('"');
        }
        for &child in self.children(id) {
            out.push(' ');
            self.write_sexp(child, out);
        }
        out.push(')');
    }
}

struct SexpReader<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SexpReader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> DiffError {
        DiffError::TreeSyntax {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn line_at(&self, offset: usize) -> u32 {
        self.text[..offset].bytes().filter(|&b| b == b'\n').count() as u32 + 1
    }

    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        self.skip_ws();
        if self.bytes.get(self.pos) == Some(&byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", byte as char)))
        }
    }

    fn read(mut self) -> Result<Tree> {
        self.skip_ws();
        let start = self.pos;
        self.expect(b'(')?;
        let (kind, label) = self.read_head()?;
        let mut tree = Tree::new(kind, label, Span::default());
        let root = tree.root();
        self.read_children(&mut tree, root)?;
        let end = self.pos;
        tree.nodes[0].span = Span::new(start, end, self.line_at(start), self.line_at(end));

        self.skip_ws();
        if self.pos != self.bytes.len() {
            return Err(self.error("trailing input after root node"));
        }
        Ok(tree)
    }

    fn read_head(&mut self) -> Result<(String, String)> {
        self.skip_ws();
        let kind_start = self.pos;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b.is_ascii_whitespace() || b == b'(' || b == b')' || b == b'"' {
                break;
            }
            self.pos += 1;
        }
        if self.pos == kind_start {
            return Err(self.error("missing node kind"));
        }
        let kind = self.text[kind_start..self.pos].to_string();

        self.skip_ws();
        let label = if self.bytes.get(self.pos) == Some(&b'"') {
            self.read_string()?
        } else {
            String::new()
        };
        Ok((kind, label))
    }

    fn read_string(&mut self) -> Result<String> {
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.text[self.pos..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return Ok(out);
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, other)) => out.push(other),
                    None => break,
                },
                c => out.push(c),
            }
        }
        self.pos = self.bytes.len();
        Err(self.error("unterminated label"))
    }

    /// Read children until the closing parenthesis of `parent`.
    fn read_children(&mut self, tree: &mut Tree, parent: NodeId) -> Result<()> {
        loop {
            self.skip_ws();
            match self.bytes.get(self.pos) {
                Some(b')') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(b'(') => {
                    let start = self.pos;
                    self.pos += 1;
                    let (kind, label) = self.read_head()?;
                    let child = tree.add_child(parent, kind, label, Span::default());
                    self.read_children(tree, child)?;
                    let end = self.pos;
                    tree.nodes[child.index()].span =
                        Span::new(start, end, self.line_at(start), self.line_at(end));
                }
                Some(_) => return Err(self.error("expected '(' or ')'")),
                None => return Err(self.error("unexpected end of input")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        Tree::from_sexp(
            r#"(CompilationUnit
                 (TypeDeclaration "A"
                   (MethodDeclaration "foo" (Block))
                   (MethodDeclaration "bar")))"#,
        )
        .unwrap()
    }

    #[test]
    fn test_build_and_navigate() {
        let mut tree = Tree::new("CompilationUnit", "", Span::default());
        let class = tree.add_child(tree.root(), "TypeDeclaration", "A", Span::default());
        let m1 = tree.add_child(class, "MethodDeclaration", "foo", Span::default());
        let m2 = tree.add_child(class, "MethodDeclaration", "bar", Span::default());

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.parent(m1), Some(class));
        assert_eq!(tree.children(class), &[m1, m2]);
        assert_eq!(tree.position_in_parent(m2), Some(1));
        assert_eq!(tree.position_in_parent(tree.root()), None);
        assert_eq!(tree.depth(m2), 2);
        assert!(tree.is_ancestor(tree.root(), m2));
        assert!(!tree.is_ancestor(m1, m2));
    }

    #[test]
    fn test_identical_labels_are_distinct_nodes() {
        let tree = Tree::from_sexp(r#"(Block (Name "x") (Name "x"))"#).unwrap();
        let children = tree.children(tree.root());
        assert_eq!(children.len(), 2);
        assert_ne!(children[0], children[1]);
        assert_eq!(tree.label(children[0]), tree.label(children[1]));
    }

    #[test]
    fn test_from_sexp_structure() {
        let tree = sample();
        let order: Vec<&str> = tree.preorder().into_iter().map(|n| tree.kind(n)).collect();
        assert_eq!(
            order,
            vec![
                "CompilationUnit",
                "TypeDeclaration",
                "MethodDeclaration",
                "Block",
                "MethodDeclaration"
            ]
        );
        let class = tree.children(tree.root())[0];
        assert_eq!(tree.label(class), "A");
        assert_eq!(tree.subtree_size(class), 4);
    }

    #[test]
    fn test_from_sexp_spans_and_lines() {
        let tree = Tree::from_sexp("(A\n  (B \"b\"))").unwrap();
        let b = tree.children(tree.root())[0];
        let span = tree.span(b);
        assert_eq!(span.start, 5);
        assert_eq!(span.start_line, 2);
        assert_eq!(tree.span(tree.root()).start_line, 1);
    }

    #[test]
    fn test_sexp_roundtrip_with_escapes() {
        let text = r#"(Literal "say \"hi\"\\")"#;
        let tree = Tree::from_sexp(text).unwrap();
        assert_eq!(tree.label(tree.root()), "say \"hi\"\\");
        assert_eq!(tree.to_sexp(), text);
    }

    #[test]
    fn test_from_sexp_errors() {
        assert!(matches!(
            Tree::from_sexp("(A (B)"),
            Err(DiffError::TreeSyntax { .. })
        ));
        assert!(matches!(
            Tree::from_sexp("(A) (B)"),
            Err(DiffError::TreeSyntax { .. })
        ));
        assert!(matches!(
            Tree::from_sexp("( )"),
            Err(DiffError::TreeSyntax { .. })
        ));
        assert!(matches!(
            Tree::from_sexp(r#"(A "open)"#),
            Err(DiffError::TreeSyntax { .. })
        ));
    }
}
