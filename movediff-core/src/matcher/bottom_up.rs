//! Bottom-up phase: match containers through their matched descendants.

use std::collections::HashSet;

use super::Matcher;

impl Matcher<'_, '_> {
    /// Visit unmatched inner source nodes (and a leaf root) in preorder, then again in
    /// postorder, matching each to its best scoring destination candidate
    /// and recovering the leftovers below every new pair.
    pub fn bottom_up(&mut self) {
        if self.src.is_empty() || self.dst.is_empty() {
            return;
        }
        for s in 0..self.src.len() {
            self.match_container(s);
        }
        for s in self.src.postorder() {
            self.match_container(s);
        }
    }

    fn match_container(&mut self, s: usize) {
        let src = self.src;
        let node = src.node(s);
        if self.mapping.is_src_mapped(s) || !node.matchable {
            return;
        }
        if node.children.is_empty() && node.parent.is_some() {
            return;
        }
        let chosen = self.best_candidate(s).or_else(|| {
            // tree roots always pair up when their kinds agree
            (node.parent.is_none() && self.compatible(s, 0)).then_some(0)
        });
        if let Some(d) = chosen {
            if self.link(s, d) {
                self.recover(s, d);
            }
        }
    }

    /// Unmatched, matchable, same-kind ancestors of the partners of the
    /// matched descendants of `s`, in preorder.
    fn candidates(&self, s: usize) -> Vec<usize> {
        let kind = self.src.node(s).kind;
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for x in self.src.descendants(s) {
            let Some(y) = self.mapping.dst_of(x) else {
                continue;
            };
            for c in self.dst.ancestors(y) {
                if !seen.insert(c) {
                    break;
                }
                let candidate = self.dst.node(c);
                if candidate.matchable && candidate.kind == kind && !self.mapping.is_dst_mapped(c) {
                    found.push(c);
                }
            }
        }
        found.sort_unstable();
        found
    }

    fn score(&self, s: usize, d: usize) -> f64 {
        let weight = self.config.label_weight.clamp(0.0, 1.0);
        (1.0 - weight) * self.dice(s, d) + weight * self.label_similarity(s, d)
    }

    /// Candidates sitting under the partner of the source parent come
    /// first; among those, or failing any, the highest score at or above
    /// the threshold wins, then document order.
    fn best_candidate(&self, s: usize) -> Option<usize> {
        let expected_parent = self.src.parent(s).and_then(|p| self.mapping.dst_of(p));
        let mut best: Option<(bool, f64, usize)> = None;
        for d in self.candidates(s) {
            let score = self.score(s, d);
            if score < self.config.similarity_threshold || !self.compatible(s, d) {
                continue;
            }
            let local = expected_parent.is_some() && self.dst.parent(d) == expected_parent;
            let better = match best {
                None => true,
                Some((best_local, best_score, _)) => {
                    (local && !best_local) || (local == best_local && score > best_score)
                }
            };
            if better {
                best = Some((local, score, d));
            }
        }
        best.map(|(_, _, d)| d)
    }
}
