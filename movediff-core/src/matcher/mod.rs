//! Node Matcher: aligns the nodes of two forests.
//!
//! Matching runs in two phases over a [`Forest`] pair:
//!
//! - **Top-down** anchors the largest identical subtrees first.
//! - **Bottom-up** matches containers by the share of already matched
//!   descendants plus label similarity, then recovers leftovers below
//!   every new container pair.
//!
//! Every pair goes through [`Matcher::compatible`], which rejects kind
//! mismatches, double mappings and pairs that would invert an existing
//! ancestor relationship. Ties are broken on preorder index, so results
//! depend only on the input order.

pub mod bottom_up;
pub mod forest;
pub mod mapping;
pub mod recovery;
pub mod top_down;

pub use forest::{Forest, ForestNode, PROJECT_ROOT_KIND};
pub use mapping::ForestMapping;

use crate::config::MatcherConfig;
use crate::snapshot::FileId;
use crate::text::bigram_dice;
use crate::tree::{NodeId, Tree};

/// Matching state over one source/destination forest pair.
pub struct Matcher<'f, 'a> {
    pub(crate) src: &'f Forest<'a>,
    pub(crate) dst: &'f Forest<'a>,
    pub(crate) mapping: ForestMapping,
    pub(crate) config: &'f MatcherConfig,
}

impl<'f, 'a> Matcher<'f, 'a> {
    pub fn new(src: &'f Forest<'a>, dst: &'f Forest<'a>, config: &'f MatcherConfig) -> Self {
        let mapping = ForestMapping::new(src.len(), dst.len());
        Self::with_mapping(src, dst, mapping, config)
    }

    /// Continue from pairs found earlier, e.g. by a per-file pass.
    pub fn with_mapping(
        src: &'f Forest<'a>,
        dst: &'f Forest<'a>,
        mapping: ForestMapping,
        config: &'f MatcherConfig,
    ) -> Self {
        Self {
            src,
            dst,
            mapping,
            config,
        }
    }

    /// Both phases.
    pub fn run(&mut self) {
        self.top_down();
        self.bottom_up();
    }

    pub fn mapping(&self) -> &ForestMapping {
        &self.mapping
    }

    pub fn into_mapping(self) -> ForestMapping {
        self.mapping
    }

    /// Whether `(s, d)` may be added to the current mapping.
    pub fn compatible(&self, s: usize, d: usize) -> bool {
        let (a, b) = (self.src.node(s), self.dst.node(d));
        if !a.matchable || !b.matchable || a.kind != b.kind {
            return false;
        }
        if self.mapping.is_src_mapped(s) || self.mapping.is_dst_mapped(d) {
            return false;
        }
        // tree roots only pair with tree roots
        if a.parent.is_none() != b.parent.is_none() {
            return false;
        }
        let inverted_below_d = self
            .src
            .ancestors(s)
            .filter_map(|p| self.mapping.dst_of(p))
            .any(|q| self.dst.is_descendant(d, q));
        if inverted_below_d {
            return false;
        }
        !self
            .dst
            .ancestors(d)
            .filter_map(|q| self.mapping.src_of(q))
            .any(|p| self.src.is_descendant(s, p))
    }

    /// Add a single pair if it is compatible.
    pub(crate) fn link(&mut self, s: usize, d: usize) -> bool {
        self.compatible(s, d) && self.mapping.link(s, d)
    }

    fn src_subtree_unmapped(&self, s: usize) -> bool {
        (s..=self.src.node(s).last_desc).all(|x| !self.mapping.is_src_mapped(x))
    }

    fn dst_subtree_unmapped(&self, d: usize) -> bool {
        (d..=self.dst.node(d).last_desc).all(|y| !self.mapping.is_dst_mapped(y))
    }

    /// Map two isomorphic, fully unmapped subtrees node by node.
    pub(crate) fn map_subtree(&mut self, s: usize, d: usize) -> bool {
        if !self.src.isomorphic(s, self.dst, d)
            || !self.src_subtree_unmapped(s)
            || !self.dst_subtree_unmapped(d)
            || !self.compatible(s, d)
        {
            return false;
        }
        for k in 0..self.src.node(s).size {
            self.mapping.link(s + k, d + k);
        }
        true
    }

    /// Share of descendants of `s` whose partner lies below `d`.
    pub(crate) fn dice(&self, s: usize, d: usize) -> f64 {
        let total = (self.src.node(s).size - 1) + (self.dst.node(d).size - 1);
        if total == 0 {
            return 0.0;
        }
        let common = self
            .src
            .descendants(s)
            .filter(|&x| {
                self.mapping
                    .dst_of(x)
                    .is_some_and(|y| self.dst.is_descendant(d, y))
            })
            .count();
        2.0 * common as f64 / total as f64
    }

    pub(crate) fn label_similarity(&self, s: usize, d: usize) -> f64 {
        let (a, b) = (self.src.node(s).label, self.dst.node(d).label);
        if a == b {
            1.0
        } else if a.is_empty() || b.is_empty() {
            0.0
        } else {
            bigram_dice(a, b)
        }
    }
}

/// Match two standalone trees and return the node pairs in source order.
pub fn match_trees(src: &Tree, dst: &Tree, config: &MatcherConfig) -> Vec<(NodeId, NodeId)> {
    let src_forest = Forest::from_tree(FileId(0), src);
    let dst_forest = Forest::from_tree(FileId(0), dst);
    let mut matcher = Matcher::new(&src_forest, &dst_forest, config);
    matcher.run();
    matcher
        .mapping()
        .pairs()
        .filter_map(|(s, d)| Some((src_forest.origin(s)?.node, dst_forest.origin(d)?.node)))
        .collect()
}
