//! Greedy top-down phase: anchor identical subtrees, tallest first.

use std::collections::{BTreeMap, HashMap};

use super::forest::Forest;
use super::Matcher;

/// Candidate subtree roots bucketed by height.
#[derive(Default)]
struct HeightQueue {
    by_height: BTreeMap<usize, Vec<usize>>,
}

impl HeightQueue {
    fn peek_max(&self) -> Option<usize> {
        self.by_height.keys().next_back().copied()
    }

    fn pop_max(&mut self) -> Vec<usize> {
        let mut nodes = self
            .by_height
            .pop_last()
            .map(|(_, nodes)| nodes)
            .unwrap_or_default();
        nodes.sort_unstable();
        nodes
    }

    /// Queue `root`, or its children when it cannot take part in matching
    /// itself (not matchable or already mapped).
    fn push(&mut self, forest: &Forest<'_>, is_mapped: impl Fn(usize) -> bool, root: usize) {
        let mut stack = vec![root];
        while let Some(i) = stack.pop() {
            let node = forest.node(i);
            if node.matchable && !is_mapped(i) {
                self.by_height.entry(node.height).or_default().push(i);
            } else {
                stack.extend(node.children.iter().rev());
            }
        }
    }

    fn open(&mut self, forest: &Forest<'_>, is_mapped: impl Fn(usize) -> bool + Copy, i: usize) {
        for &c in forest.children(i) {
            self.push(forest, is_mapped, c);
        }
    }
}

fn relative_position(forest: &Forest<'_>, i: usize) -> f64 {
    match forest.parent(i) {
        Some(p) => {
            let siblings = forest.children(p).len().max(1);
            forest.position_in_parent(i).unwrap_or(0) as f64 / siblings as f64
        }
        None => 0.0,
    }
}

impl Matcher<'_, '_> {
    /// Map every subtree that has exactly one identical counterpart at the
    /// same height. Subtrees with several identical counterparts are settled
    /// afterwards, closest context first.
    pub fn top_down(&mut self) {
        if self.src.is_empty() || self.dst.is_empty() {
            return;
        }
        let (src, dst) = (self.src, self.dst);
        let mut src_queue = HeightQueue::default();
        let mut dst_queue = HeightQueue::default();
        src_queue.push(src, |s| self.mapping.is_src_mapped(s), 0);
        dst_queue.push(dst, |d| self.mapping.is_dst_mapped(d), 0);

        let mut ambiguous: Vec<(usize, usize)> = Vec::new();

        while let (Some(hs), Some(hd)) = (src_queue.peek_max(), dst_queue.peek_max()) {
            if hs.min(hd) < self.config.min_height {
                break;
            }
            if hs > hd {
                for s in src_queue.pop_max() {
                    let mapping = &self.mapping;
                    src_queue.open(src, |x| mapping.is_src_mapped(x), s);
                }
                continue;
            }
            if hd > hs {
                for d in dst_queue.pop_max() {
                    let mapping = &self.mapping;
                    dst_queue.open(dst, |y| mapping.is_dst_mapped(y), d);
                }
                continue;
            }

            // hash classes in order of first appearance
            let mut slots: HashMap<u64, usize> = HashMap::new();
            let mut classes: Vec<(Vec<usize>, Vec<usize>)> = Vec::new();
            for s in src_queue.pop_max() {
                let slot = *slots.entry(src.node(s).hash).or_insert_with(|| {
                    classes.push((Vec::new(), Vec::new()));
                    classes.len() - 1
                });
                classes[slot].0.push(s);
            }
            for d in dst_queue.pop_max() {
                let slot = *slots.entry(dst.node(d).hash).or_insert_with(|| {
                    classes.push((Vec::new(), Vec::new()));
                    classes.len() - 1
                });
                classes[slot].1.push(d);
            }

            for (srcs, dsts) in classes {
                let unique = srcs.len() == 1 && dsts.len() == 1;
                if unique && self.map_subtree(srcs[0], dsts[0]) {
                    continue;
                }
                if !unique && !srcs.is_empty() && !dsts.is_empty() {
                    for &s in &srcs {
                        ambiguous.extend(dsts.iter().map(|&d| (s, d)));
                    }
                    continue;
                }
                let mapping = &self.mapping;
                for s in srcs {
                    src_queue.open(src, |x| mapping.is_src_mapped(x), s);
                }
                for d in dsts {
                    dst_queue.open(dst, |y| mapping.is_dst_mapped(y), d);
                }
            }
        }

        self.resolve_ambiguous(ambiguous);
    }

    fn resolve_ambiguous(&mut self, candidates: Vec<(usize, usize)>) {
        if candidates.is_empty() {
            return;
        }
        let mut parent_dice: HashMap<(usize, usize), f64> = HashMap::new();
        let mut ranked: Vec<(f64, f64, usize, usize)> = candidates
            .into_iter()
            .map(|(s, d)| {
                let context = match (self.src.parent(s), self.dst.parent(d)) {
                    (Some(ps), Some(pd)) => *parent_dice
                        .entry((ps, pd))
                        .or_insert_with(|| self.dice(ps, pd)),
                    _ => 0.0,
                };
                let shift =
                    (relative_position(self.src, s) - relative_position(self.dst, d)).abs();
                (context, shift, s, d)
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then(a.1.total_cmp(&b.1))
                .then(a.2.cmp(&b.2))
                .then(a.3.cmp(&b.3))
        });

        for (_, _, s, d) in ranked {
            self.map_subtree(s, d);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::MatcherConfig;
    use crate::matcher::{Forest, Matcher};
    use crate::snapshot::FileId;
    use crate::tree::Tree;

    fn make_tree(text: &str) -> Tree {
        Tree::from_sexp(text).unwrap()
    }

    #[test]
    fn test_unique_subtree_is_anchored() {
        let src = make_tree("(Unit (Block (Stmt (Name \"a\")) (Stmt (Name \"b\"))))");
        let dst = make_tree("(Unit (Other) (Block (Stmt (Name \"b\")) (Stmt (Name \"a\"))))");
        let (sf, df) = (Forest::from_tree(FileId(0), &src), Forest::from_tree(FileId(0), &dst));
        let config = MatcherConfig::default();
        let mut matcher = Matcher::new(&sf, &df, &config);
        matcher.top_down();

        // src: 0 Unit, 1 Block, 2 Stmt a, 3 Name a, 4 Stmt b, 5 Name b
        // dst: 0 Unit, 1 Other, 2 Block, 3 Stmt b, 4 Name b, 5 Stmt a, 6 Name a
        assert_eq!(matcher.mapping().dst_of(2), Some(5));
        assert_eq!(matcher.mapping().dst_of(3), Some(6));
        assert_eq!(matcher.mapping().dst_of(4), Some(3));
        // containers are left to the bottom-up phase
        assert_eq!(matcher.mapping().dst_of(1), None);
        assert_eq!(matcher.mapping().len(), 4);
    }

    #[test]
    fn test_small_subtrees_are_ignored() {
        let src = make_tree("(Unit (Name \"a\"))");
        let dst = make_tree("(Other (Name \"a\"))");
        let (sf, df) = (Forest::from_tree(FileId(0), &src), Forest::from_tree(FileId(0), &dst));
        let config = MatcherConfig::default();
        let mut matcher = Matcher::new(&sf, &df, &config);
        matcher.top_down();

        assert!(matcher.mapping().is_empty());
    }

    #[test]
    fn test_swapped_methods_map_as_units() {
        let src = make_tree(
            "(Unit (Method \"f\" (Ret (Name \"x\")) (Call (Name \"f\"))) (Method \"g\" (Ret (Name \"x\")) (Call (Name \"g\"))))",
        );
        let dst = make_tree(
            "(Unit (Method \"g\" (Ret (Name \"x\")) (Call (Name \"g\"))) (Method \"f\" (Ret (Name \"x\")) (Call (Name \"f\"))))",
        );
        let (sf, df) = (Forest::from_tree(FileId(0), &src), Forest::from_tree(FileId(0), &dst));
        let config = MatcherConfig::default();
        let mut matcher = Matcher::new(&sf, &df, &config);
        matcher.top_down();

        // whole methods are unique and swap places
        assert_eq!(matcher.mapping().dst_of(1), Some(6));
        assert_eq!(matcher.mapping().dst_of(6), Some(1));
        assert_eq!(matcher.mapping().len(), 10);
    }

    #[test]
    fn test_ambiguous_prefers_matching_parent() {
        let src = make_tree(
            "(Unit (Method \"f\" (Call (Name \"f\")) (Ret (Name \"x\"))) (Method \"g\" (Ret (Name \"x\"))))",
        );
        let dst = make_tree(
            "(Unit (Method \"g2\" (Ret (Name \"x\"))) (Method \"f2\" (Call (Name \"f\")) (Ret (Name \"x\"))))",
        );
        let (sf, df) = (Forest::from_tree(FileId(0), &src), Forest::from_tree(FileId(0), &dst));
        let config = MatcherConfig::default();
        let mut matcher = Matcher::new(&sf, &df, &config);
        matcher.top_down();

        // Call f anchors the f methods, so the f return follows it
        // src: 0 Unit, 1 f, 2 Call, 3 Name, 4 Ret, 5 Name, 6 g, 7 Ret, 8 Name
        // dst: 0 Unit, 1 g2, 2 Ret, 3 Name, 4 f2, 5 Call, 6 Name, 7 Ret, 8 Name
        assert_eq!(matcher.mapping().dst_of(2), Some(5));
        assert_eq!(matcher.mapping().dst_of(4), Some(7));
        assert_eq!(matcher.mapping().dst_of(7), Some(2));
    }
}
