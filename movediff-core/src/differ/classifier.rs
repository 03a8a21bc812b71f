//! Action Classifier: turns a finished project mapping into edit actions.
//!
//! Rules, per node:
//!
//! - unmatched source node: `Delete`
//! - unmatched destination node: `Insert`
//! - matched across file pairs and either not following its parent or out
//!   of the longest in-order run of its siblings: `MoveOut` on the source
//!   side plus `MoveIn` on the destination side
//! - matched with a different label: `Update`
//! - matched under a different parent, or out of the longest in-order run
//!   of its siblings: `Move`
//! - otherwise nothing
//!
//! Runs of moved siblings that travel together are reported as
//! `MultiMove` members sharing one group id.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::actions::Action;
use super::pairing::FilePair;
use crate::config::ClassifierConfig;
use crate::error::{DiffError, Result};
use crate::mapping::Mapping;
use crate::matcher::Forest;
use crate::snapshot::{NodeRef, Side, Snapshot};

/// Actions per file pair plus the project-wide cross-file list.
#[derive(Debug, Default)]
pub struct Classification {
    pub file_actions: Vec<Vec<Action>>,
    pub cross_file: Vec<Action>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Change {
    Update,
    Move,
    CrossFile,
}

#[derive(Clone, Copy, Debug)]
struct MovedPair {
    src: NodeRef,
    dst: NodeRef,
    src_parent: Option<NodeRef>,
    dst_parent: NodeRef,
    src_pos: usize,
    dst_pos: usize,
    cross: bool,
}

/// Indices of one longest strictly increasing subsequence of `seq`.
pub(crate) fn longest_increasing(seq: &[usize]) -> Vec<usize> {
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for i in 0..seq.len() {
        let pos = tails.partition_point(|&t| seq[t] < seq[i]);
        if pos > 0 {
            prev[i] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }
    let mut out = Vec::with_capacity(tails.len());
    let mut cur = tails.last().copied();
    while let Some(i) = cur {
        out.push(i);
        cur = prev[i];
    }
    out.reverse();
    out
}

pub struct Classifier<'c> {
    source: &'c Snapshot,
    destination: &'c Snapshot,
    pairs: &'c [FilePair],
    mapping: &'c Mapping,
    src_forest: &'c Forest<'c>,
    dst_forest: &'c Forest<'c>,
    config: &'c ClassifierConfig,
    src_pair: Vec<Option<usize>>,
    dst_pair: Vec<Option<usize>>,
}

impl<'c> Classifier<'c> {
    pub fn new(
        source: &'c Snapshot,
        destination: &'c Snapshot,
        pairs: &'c [FilePair],
        mapping: &'c Mapping,
        src_forest: &'c Forest<'c>,
        dst_forest: &'c Forest<'c>,
        config: &'c ClassifierConfig,
    ) -> Self {
        let mut src_pair = vec![None; source.len()];
        let mut dst_pair = vec![None; destination.len()];
        for (i, pair) in pairs.iter().enumerate() {
            if let Some(s) = pair.src {
                src_pair[s.index()] = Some(i);
            }
            if let Some(d) = pair.dst {
                dst_pair[d.index()] = Some(i);
            }
        }
        Self {
            source,
            destination,
            pairs,
            mapping,
            src_forest,
            dst_forest,
            config,
            src_pair,
            dst_pair,
        }
    }

    fn unclassifiable(snapshot: &Snapshot, node: NodeRef) -> DiffError {
        let span = snapshot.span(node);
        DiffError::Unclassifiable {
            file: snapshot.path(node.file).to_string(),
            start: span.start,
            end: span.end,
        }
    }

    fn src_pair_of(&self, node: NodeRef) -> Result<usize> {
        self.src_pair
            .get(node.file.index())
            .copied()
            .flatten()
            .ok_or_else(|| Self::unclassifiable(self.source, node))
    }

    fn dst_pair_of(&self, node: NodeRef) -> Result<usize> {
        self.dst_pair
            .get(node.file.index())
            .copied()
            .flatten()
            .ok_or_else(|| Self::unclassifiable(self.destination, node))
    }

    /// Source nodes sitting in the longest in-order run of children that
    /// stayed under the partner of their parent.
    fn aligned_children(&self) -> HashSet<NodeRef> {
        let mut aligned = HashSet::new();
        for (p, q) in self.mapping.pairs() {
            let kids: Vec<(NodeRef, usize)> = self
                .source
                .tree(p.file)
                .children(p.node)
                .iter()
                .filter_map(|&c| {
                    let c = NodeRef::new(p.file, c);
                    let d = self.mapping.dst_of(c)?;
                    if self.destination.parent(d) != Some(q) {
                        return None;
                    }
                    Some((c, self.destination.position_in_parent(d).unwrap_or(0)))
                })
                .collect();
            let positions: Vec<usize> = kids.iter().map(|k| k.1).collect();
            for i in longest_increasing(&positions) {
                aligned.insert(kids[i].0);
            }
        }
        aligned
    }

    fn subtree_changed(&self, src: NodeRef, dst: NodeRef) -> bool {
        let before = self.src_forest.index_of(src).map(|i| self.src_forest.node(i).hash);
        let after = self.dst_forest.index_of(dst).map(|i| self.dst_forest.node(i).hash);
        before != after
    }

    /// Group ids and `updated` flags of moved pairs that form a block.
    fn group_moves(&self, moved: &[MovedPair]) -> HashMap<NodeRef, (u32, bool)> {
        let mut groups = HashMap::new();
        if !self.config.group_moves || moved.is_empty() {
            return groups;
        }
        let mut buckets: BTreeMap<(NodeRef, NodeRef, bool), Vec<&MovedPair>> = BTreeMap::new();
        for m in moved {
            if let Some(src_parent) = m.src_parent {
                buckets.entry((src_parent, m.dst_parent, m.cross)).or_default().push(m);
            }
        }

        let min_size = self.config.min_group_size.max(1);
        let mut runs: Vec<Vec<&MovedPair>> = Vec::new();
        for (_, mut members) in buckets {
            members.sort_by_key(|m| m.src_pos);
            let mut run: Vec<&MovedPair> = Vec::new();
            for m in members {
                let contiguous = run.last().is_some_and(|last| {
                    m.src_pos == last.src_pos + 1 && m.dst_pos == last.dst_pos + 1
                });
                if !contiguous && !run.is_empty() {
                    runs.push(std::mem::take(&mut run));
                }
                run.push(m);
            }
            runs.push(run);
        }
        runs.retain(|run| run.len() >= min_size);
        runs.sort_by_key(|run| run.iter().map(|m| m.src).min());

        for (i, run) in runs.iter().enumerate() {
            let group_id = i as u32 + 1;
            let updated = run.iter().any(|m| self.subtree_changed(m.src, m.dst));
            for m in run {
                groups.insert(m.src, (group_id, updated));
            }
        }
        groups
    }

    pub fn classify(&self) -> Result<Classification> {
        let aligned = self.aligned_children();

        let mut changes: HashMap<NodeRef, Change> = HashMap::new();
        let mut moved: Vec<MovedPair> = Vec::new();
        for (a, b) in self.mapping.pairs() {
            let cross = self.src_pair_of(a)? != self.dst_pair_of(b)?;
            let (pa, pb) = (self.source.parent(a), self.destination.parent(b));
            let parent_consistent = match (pa, pb) {
                (None, None) => true,
                (Some(pa), Some(pb)) => self.mapping.contains(pa, pb),
                _ => false,
            };

            let out_of_place = !parent_consistent || (pa.is_some() && !aligned.contains(&a));
            let change = if cross && out_of_place {
                Change::CrossFile
            } else if self.source.label(a) != self.destination.label(b) {
                Change::Update
            } else if out_of_place {
                Change::Move
            } else {
                continue;
            };

            if change != Change::Update {
                let dst_parent = pb.ok_or_else(|| Self::unclassifiable(self.destination, b))?;
                moved.push(MovedPair {
                    src: a,
                    dst: b,
                    src_parent: pa,
                    dst_parent,
                    src_pos: self.source.position_in_parent(a).unwrap_or(0),
                    dst_pos: self.destination.position_in_parent(b).unwrap_or(0),
                    cross,
                });
            }
            changes.insert(a, change);
        }

        let groups = self.group_moves(&moved);
        let moved: HashMap<NodeRef, MovedPair> = moved.into_iter().map(|m| (m.src, m)).collect();

        let mut out = Classification {
            file_actions: vec![Vec::new(); self.pairs.len()],
            cross_file: Vec::new(),
        };

        for (i, pair) in self.pairs.iter().enumerate() {
            if let Some(file) = pair.src {
                for node in self.source.tree(file).preorder() {
                    let a = NodeRef::new(file, node);
                    let Some(b) = self.mapping.dst_of(a) else {
                        out.file_actions[i].push(Action::Delete { node: a });
                        continue;
                    };
                    let Some(&change) = changes.get(&a) else {
                        continue;
                    };
                    if change == Change::Update {
                        out.file_actions[i].push(Action::Update { src: a, dst: b });
                        continue;
                    }
                    let m = moved
                        .get(&a)
                        .ok_or_else(|| Self::unclassifiable(self.source, a))?;
                    let action = match (groups.get(&a), change) {
                        (Some(&(group_id, updated)), _) => Action::MultiMove {
                            node: a,
                            counterpart: b,
                            side: Side::Source,
                            new_parent: m.dst_parent,
                            position: m.dst_pos,
                            group_id,
                            updated,
                        },
                        (None, Change::CrossFile) => Action::MoveOut {
                            node: a,
                            dst: b,
                            new_parent: m.dst_parent,
                            position: m.dst_pos,
                            destination_file: self.destination.path(b.file).to_string(),
                        },
                        (None, _) => Action::Move {
                            node: a,
                            dst: b,
                            new_parent: m.dst_parent,
                            position: m.dst_pos,
                        },
                    };
                    if change == Change::CrossFile {
                        out.cross_file.push(action.clone());
                    }
                    out.file_actions[i].push(action);
                }
            }

            if let Some(file) = pair.dst {
                for node in self.destination.tree(file).preorder() {
                    let b = NodeRef::new(file, node);
                    let Some(a) = self.mapping.src_of(b) else {
                        out.file_actions[i].push(Action::Insert {
                            node: b,
                            parent: self.destination.parent(b),
                            position: self.destination.position_in_parent(b).unwrap_or(0),
                        });
                        continue;
                    };
                    if changes.get(&a) != Some(&Change::CrossFile) {
                        continue;
                    }
                    let m = moved
                        .get(&a)
                        .ok_or_else(|| Self::unclassifiable(self.destination, b))?;
                    let action = match groups.get(&a) {
                        Some(&(group_id, updated)) => Action::MultiMove {
                            node: b,
                            counterpart: a,
                            side: Side::Destination,
                            new_parent: m.dst_parent,
                            position: m.dst_pos,
                            group_id,
                            updated,
                        },
                        None => Action::MoveIn {
                            node: b,
                            src: a,
                            new_parent: m.dst_parent,
                            position: m.dst_pos,
                            source_file: self.source.path(a.file).to_string(),
                        },
                    };
                    out.cross_file.push(action.clone());
                    out.file_actions[i].push(action);
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_increasing() {
        assert_eq!(longest_increasing(&[]), Vec::<usize>::new());
        assert_eq!(longest_increasing(&[0, 1, 2]), vec![0, 1, 2]);
        // b and c stay, a moved to the end
        assert_eq!(longest_increasing(&[2, 0, 1]), vec![1, 2]);
        assert_eq!(longest_increasing(&[3, 1, 2, 0, 4]).len(), 3);
    }
}
