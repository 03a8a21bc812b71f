//! Project-wide mapping between the nodes of two snapshots.

use std::collections::BTreeMap;

use crate::error::{DiffError, Result};
use crate::snapshot::{NodeRef, Snapshot};

/// Matched `(source, destination)` node pairs, unique on both sides.
#[derive(Clone, Debug, Default)]
pub struct Mapping {
    forward: BTreeMap<NodeRef, NodeRef>,
    backward: BTreeMap<NodeRef, NodeRef>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn dst_of(&self, src: NodeRef) -> Option<NodeRef> {
        self.forward.get(&src).copied()
    }

    pub fn src_of(&self, dst: NodeRef) -> Option<NodeRef> {
        self.backward.get(&dst).copied()
    }

    pub fn contains(&self, src: NodeRef, dst: NodeRef) -> bool {
        self.dst_of(src) == Some(dst)
    }

    /// Pairs ordered by source address.
    pub fn pairs(&self) -> impl Iterator<Item = (NodeRef, NodeRef)> + '_ {
        self.forward.iter().map(|(&s, &d)| (s, d))
    }

    /// Add a pair. Matching either node twice or pairing different kinds is
    /// a matcher bug and fails with [`DiffError::InconsistentMapping`].
    pub fn link(&mut self, src: NodeRef, dst: NodeRef, source: &Snapshot, destination: &Snapshot) -> Result<()> {
        let context = || format!("{} -> {}", source.describe(src), destination.describe(dst));
        if let Some(previous) = self.dst_of(src) {
            if previous == dst {
                return Ok(());
            }
            return Err(DiffError::InconsistentMapping {
                reason: "source node mapped twice".to_string(),
                context: context(),
            });
        }
        if self.src_of(dst).is_some() {
            return Err(DiffError::InconsistentMapping {
                reason: "destination node mapped twice".to_string(),
                context: context(),
            });
        }
        if source.kind(src) != destination.kind(dst) {
            return Err(DiffError::InconsistentMapping {
                reason: format!(
                    "kind mismatch: {} vs {}",
                    source.kind(src),
                    destination.kind(dst)
                ),
                context: context(),
            });
        }
        self.forward.insert(src, dst);
        self.backward.insert(dst, src);
        Ok(())
    }

    /// Check that no pair inverts an ancestor relationship: if `a1` is an
    /// ancestor of `a2`, the partner of `a1` may not sit below the partner
    /// of `a2`.
    pub fn validate(&self, source: &Snapshot, destination: &Snapshot) -> Result<()> {
        for (a, b) in self.pairs() {
            let tree = source.tree(a.file);
            for ancestor in tree.ancestors(a.node) {
                let Some(q) = self.dst_of(NodeRef::new(a.file, ancestor)) else {
                    continue;
                };
                if q.file == b.file && destination.tree(b.file).is_ancestor(b.node, q.node) {
                    return Err(DiffError::InconsistentMapping {
                        reason: "ancestor order inverted".to_string(),
                        context: format!(
                            "{} -> {} under {} -> {}",
                            source.describe(a),
                            destination.describe(b),
                            source.describe(NodeRef::new(a.file, ancestor)),
                            destination.describe(q)
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::FileId;
    use crate::tree::NodeId;

    fn node(file: u32, id: u32) -> NodeRef {
        NodeRef::new(FileId(file), NodeId(id))
    }

    fn make_snapshots() -> (Snapshot, Snapshot) {
        let src = Snapshot::from_sexp_files(&[("a.java", "(Unit (Class \"A\" (Class \"B\")))")]).unwrap();
        let dst = Snapshot::from_sexp_files(&[("a.java", "(Unit (Class \"B\" (Class \"A\")))")]).unwrap();
        (src, dst)
    }

    #[test]
    fn test_link_rejects_double_mapping() {
        let (src, dst) = make_snapshots();
        let mut mapping = Mapping::new();
        mapping.link(node(0, 1), node(0, 1), &src, &dst).unwrap();
        // relinking the same pair is a no-op
        mapping.link(node(0, 1), node(0, 1), &src, &dst).unwrap();

        let err = mapping.link(node(0, 1), node(0, 2), &src, &dst).unwrap_err();
        assert!(err.to_string().contains("source node mapped twice"));
        let err = mapping.link(node(0, 2), node(0, 1), &src, &dst).unwrap_err();
        assert!(err.to_string().contains("destination node mapped twice"));
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_link_rejects_kind_mismatch() {
        let (src, dst) = make_snapshots();
        let mut mapping = Mapping::new();
        let err = mapping.link(node(0, 0), node(0, 1), &src, &dst).unwrap_err();
        assert!(matches!(err, DiffError::InconsistentMapping { .. }));
        assert!(err.to_string().contains("a.java:1"));
    }

    #[test]
    fn test_validate_detects_inversion() {
        let (src, dst) = make_snapshots();
        let mut mapping = Mapping::new();
        // class A -> class A, class B -> class B; B is nested in A before and
        // A is nested in B after
        mapping.link(node(0, 1), node(0, 2), &src, &dst).unwrap();
        mapping.link(node(0, 2), node(0, 1), &src, &dst).unwrap();
        assert!(mapping.validate(&src, &dst).is_err());

        let mut mapping = Mapping::new();
        mapping.link(node(0, 0), node(0, 0), &src, &dst).unwrap();
        mapping.link(node(0, 1), node(0, 2), &src, &dst).unwrap();
        assert!(mapping.validate(&src, &dst).is_ok());
    }
}
