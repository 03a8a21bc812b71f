//! Flattened preorder view over one tree or a whole snapshot.
//!
//! Every node gets a dense index in document order, so "is `x` inside the
//! subtree of `a`" is the range test `a < x <= last_desc[a]` and two
//! isomorphic subtrees share the same preorder layout.

use std::collections::HashMap;
use xxhash_rust::xxh3::xxh3_64;

use crate::snapshot::{FileId, NodeRef, Snapshot};
use crate::tree::{NodeId, Tree};

/// Kind of the synthetic root wrapping all files of a snapshot.
pub const PROJECT_ROOT_KIND: &str = "<project>";

#[derive(Clone, Debug)]
pub struct ForestNode<'a> {
    pub kind: &'a str,
    pub label: &'a str,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Snapshot address, `None` for the synthetic root.
    pub origin: Option<NodeRef>,
    /// Leaves have height 1.
    pub height: usize,
    /// Number of nodes in the subtree, self included.
    pub size: usize,
    /// Structural hash over kind, label and child hashes.
    pub hash: u64,
    pub depth: usize,
    /// Index of the last node of this subtree.
    pub last_desc: usize,
    /// Whether the matcher may map this node.
    pub matchable: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Forest<'a> {
    nodes: Vec<ForestNode<'a>>,
    index: HashMap<NodeRef, usize>,
}

impl<'a> Forest<'a> {
    /// View of a single file tree. Its root is matchable.
    pub fn from_tree(file: FileId, tree: &'a Tree) -> Self {
        let mut forest = Forest::default();
        forest.push_tree(file, tree, None, true);
        forest.finish();
        forest
    }

    /// View of a whole snapshot below a synthetic root. Neither the synthetic
    /// root nor the file roots are matchable, so whole files never map.
    pub fn from_snapshot(snapshot: &'a Snapshot) -> Self {
        let mut forest = Forest::default();
        forest.nodes.push(ForestNode {
            kind: PROJECT_ROOT_KIND,
            label: "",
            parent: None,
            children: Vec::new(),
            origin: None,
            height: 1,
            size: 1,
            hash: 0,
            depth: 0,
            last_desc: 0,
            matchable: false,
        });
        for file in snapshot.file_ids() {
            forest.push_tree(file, snapshot.tree(file), Some(0), false);
        }
        forest.finish();
        forest
    }

    fn push_tree(&mut self, file: FileId, tree: &'a Tree, parent: Option<usize>, root_matchable: bool) {
        let base_depth = parent.map(|p| self.nodes[p].depth + 1).unwrap_or(0);
        let mut stack: Vec<(NodeId, Option<usize>, usize)> = vec![(tree.root(), parent, base_depth)];

        while let Some((id, parent, depth)) = stack.pop() {
            let index = self.nodes.len();
            let node = tree.node(id);
            let origin = NodeRef::new(file, id);
            self.nodes.push(ForestNode {
                kind: node.kind.as_str(),
                label: node.label.as_str(),
                parent,
                children: Vec::new(),
                origin: Some(origin),
                height: 1,
                size: 1,
                hash: 0,
                depth,
                last_desc: index,
                matchable: id != tree.root() || root_matchable,
            });
            self.index.insert(origin, index);
            if let Some(p) = parent {
                self.nodes[p].children.push(index);
            }
            for &child in tree.children(id).iter().rev() {
                stack.push((child, Some(index), depth + 1));
            }
        }
    }

    /// Fill in the bottom-up attributes. Children always have larger indices
    /// than their parent, so a reverse sweep sees every child first.
    fn finish(&mut self) {
        let mut buf = Vec::new();
        for i in (0..self.nodes.len()).rev() {
            let (height, size, last_desc, hash) = {
                let node = &self.nodes[i];
                let mut height = 1;
                let mut size = 1;
                let mut last_desc = i;
                buf.clear();
                buf.extend_from_slice(node.kind.as_bytes());
                buf.push(0);
                buf.extend_from_slice(node.label.as_bytes());
                buf.push(0);
                for &c in &node.children {
                    let child = &self.nodes[c];
                    height = height.max(child.height + 1);
                    size += child.size;
                    last_desc = last_desc.max(child.last_desc);
                    buf.extend_from_slice(&child.hash.to_le_bytes());
                }
                (height, size, last_desc, xxh3_64(&buf))
            };
            let node = &mut self.nodes[i];
            node.height = height;
            node.size = size;
            node.last_desc = last_desc;
            node.hash = hash;
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, i: usize) -> &ForestNode<'a> {
        &self.nodes[i]
    }

    pub fn nodes(&self) -> &[ForestNode<'a>] {
        &self.nodes
    }

    pub fn index_of(&self, node: NodeRef) -> Option<usize> {
        self.index.get(&node).copied()
    }

    pub fn origin(&self, i: usize) -> Option<NodeRef> {
        self.nodes[i].origin
    }

    pub fn parent(&self, i: usize) -> Option<usize> {
        self.nodes[i].parent
    }

    pub fn children(&self, i: usize) -> &[usize] {
        &self.nodes[i].children
    }

    pub fn is_leaf(&self, i: usize) -> bool {
        self.nodes[i].children.is_empty()
    }

    /// True when `x` lies strictly inside the subtree of `ancestor`.
    pub fn is_descendant(&self, ancestor: usize, x: usize) -> bool {
        ancestor < x && x <= self.nodes[ancestor].last_desc
    }

    /// Strict descendants of `i`, in preorder.
    pub fn descendants(&self, i: usize) -> std::ops::RangeInclusive<usize> {
        i + 1..=self.nodes[i].last_desc
    }

    /// Strict ancestors of `i`, nearest first.
    pub fn ancestors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.nodes[i].parent, move |&p| self.nodes[p].parent)
    }

    pub fn position_in_parent(&self, i: usize) -> Option<usize> {
        let parent = self.nodes[i].parent?;
        self.nodes[parent].children.iter().position(|&c| c == i)
    }

    /// Children first, then the parent.
    pub fn postorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        if self.nodes.is_empty() {
            return order;
        }
        let mut stack = vec![(0usize, false)];
        while let Some((i, expanded)) = stack.pop() {
            if expanded {
                order.push(i);
                continue;
            }
            stack.push((i, true));
            for &c in self.nodes[i].children.iter().rev() {
                stack.push((c, false));
            }
        }
        order
    }

    /// Whether two subtrees have the same shape, kinds and labels.
    pub fn isomorphic(&self, a: usize, other: &Forest<'_>, b: usize) -> bool {
        let (na, nb) = (&self.nodes[a], &other.nodes[b]);
        if na.hash != nb.hash || na.size != nb.size {
            return false;
        }
        (0..na.size).all(|k| {
            let (x, y) = (&self.nodes[a + k], &other.nodes[b + k]);
            x.kind == y.kind && x.label == y.label && x.children.len() == y.children.len()
        })
    }
}
