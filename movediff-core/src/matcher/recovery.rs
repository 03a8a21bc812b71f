//! Last-chance recovery of unmatched children below a matched pair.

use std::collections::HashMap;

use super::Matcher;

/// Longest common subsequence of `a` and `b` under `eq`, as index pairs in
/// order. The choice among equally long subsequences depends only on the
/// input order.
pub(crate) fn lcs(a: &[usize], b: &[usize], eq: impl Fn(usize, usize) -> bool) -> Vec<(usize, usize)> {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return Vec::new();
    }
    // table[i][j]: LCS length of a[i..] and b[j..]
    let mut table = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if eq(a[i], b[j]) {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }
    let mut pairs = Vec::with_capacity(table[0][0] as usize);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if eq(a[i], b[j]) && table[i][j] == table[i + 1][j + 1] + 1 {
            pairs.push((a[i], b[j]));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}

impl Matcher<'_, '_> {
    /// Match leftover children below `(s, d)`, descending into every pair
    /// that gets linked on the way.
    pub(crate) fn recover(&mut self, s: usize, d: usize) {
        let mut stack = vec![(s, d)];
        while let Some((s, d)) = stack.pop() {
            let linked = self.recover_children(s, d);
            stack.extend(linked.into_iter().rev());
        }
    }

    fn free_src_children(&self, s: usize) -> Vec<usize> {
        self.src
            .children(s)
            .iter()
            .copied()
            .filter(|&c| self.src.node(c).matchable && !self.mapping.is_src_mapped(c))
            .collect()
    }

    fn free_dst_children(&self, d: usize) -> Vec<usize> {
        self.dst
            .children(d)
            .iter()
            .copied()
            .filter(|&c| self.dst.node(c).matchable && !self.mapping.is_dst_mapped(c))
            .collect()
    }

    fn free_children(&self, s: usize, d: usize) -> Option<(Vec<usize>, Vec<usize>)> {
        let (a, b) = (self.free_src_children(s), self.free_dst_children(d));
        let limit = self.config.max_recovery_size;
        if a.is_empty() || b.is_empty() || a.len() > limit || b.len() > limit {
            return None;
        }
        Some((a, b))
    }

    /// Four passes from strict to loose: identical subtrees, equal kind and
    /// label, kinds occurring once on each side, equal kind. Returns the
    /// single-node pairs linked, which may still have unmatched content.
    fn recover_children(&mut self, s: usize, d: usize) -> Vec<(usize, usize)> {
        let (src, dst) = (self.src, self.dst);
        let mut linked = Vec::new();

        let Some((a, b)) = self.free_children(s, d) else {
            return linked;
        };
        for (x, y) in lcs(&a, &b, |x, y| src.node(x).hash == dst.node(y).hash) {
            self.map_subtree(x, y);
        }

        let Some((a, b)) = self.free_children(s, d) else {
            return linked;
        };
        let same_text = |x: usize, y: usize| {
            let (p, q) = (src.node(x), dst.node(y));
            p.kind == q.kind && p.label == q.label
        };
        for (x, y) in lcs(&a, &b, same_text) {
            if self.link(x, y) {
                linked.push((x, y));
            }
        }

        let Some((a, b)) = self.free_children(s, d) else {
            return linked;
        };
        let mut histogram: HashMap<&str, (usize, usize, usize, usize)> = HashMap::new();
        for &x in &a {
            let entry = histogram.entry(src.node(x).kind).or_default();
            entry.0 += 1;
            entry.2 = x;
        }
        for &y in &b {
            let entry = histogram.entry(dst.node(y).kind).or_default();
            entry.1 += 1;
            entry.3 = y;
        }
        for &x in &a {
            if let Some(&(1, 1, _, y)) = histogram.get(src.node(x).kind) {
                if self.link(x, y) {
                    linked.push((x, y));
                }
            }
        }

        let Some((a, b)) = self.free_children(s, d) else {
            linked.sort_unstable();
            return linked;
        };
        for (x, y) in lcs(&a, &b, |x, y| src.node(x).kind == dst.node(y).kind) {
            if self.link(x, y) {
                linked.push((x, y));
            }
        }

        linked.sort_unstable();
        linked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatcherConfig;
    use crate::matcher::Forest;
    use crate::snapshot::FileId;
    use crate::tree::Tree;

    #[test]
    fn test_lcs_keeps_order() {
        let a = [1, 2, 3, 4];
        let b = [10, 30, 20, 40];
        let pairs = lcs(&a, &b, |x, y| x * 10 == y);
        assert_eq!(pairs, vec![(1, 10), (3, 30), (4, 40)]);
        assert!(lcs(&[], &b, |_, _| true).is_empty());
    }

    #[test]
    fn test_recovery_passes() {
        // src: 0 Root, 1 If "a", 2 While "w", 3 Ret, 4 Name "r", 5 Call "x"
        // dst: 0 Root, 1 Call "y", 2 Ret, 3 Name "r", 4 If "a", 5 While "v"
        let src = Tree::from_sexp(
            "(Root (If \"a\") (While \"w\") (Ret (Name \"r\")) (Call \"x\"))",
        )
        .unwrap();
        let dst = Tree::from_sexp(
            "(Root (Call \"y\") (Ret (Name \"r\")) (If \"a\") (While \"v\"))",
        )
        .unwrap();
        let (sf, df) = (Forest::from_tree(FileId(0), &src), Forest::from_tree(FileId(0), &dst));
        let config = MatcherConfig::default();
        let mut matcher = Matcher::new(&sf, &df, &config);
        assert!(matcher.link(0, 0));
        matcher.recover(0, 0);
        let mapping = matcher.mapping();

        // identical Ret subtree
        assert_eq!(mapping.dst_of(3), Some(2));
        assert_eq!(mapping.dst_of(4), Some(3));
        // same kind and label
        assert_eq!(mapping.dst_of(1), Some(4));
        // unique kinds
        assert_eq!(mapping.dst_of(2), Some(5));
        assert_eq!(mapping.dst_of(5), Some(1));
        assert_eq!(mapping.len(), 6);
    }

    #[test]
    fn test_recovery_respects_size_limit() {
        let src = Tree::from_sexp("(Root (A) (B))").unwrap();
        let dst = Tree::from_sexp("(Root (A) (B))").unwrap();
        let (sf, df) = (Forest::from_tree(FileId(0), &src), Forest::from_tree(FileId(0), &dst));
        let config = MatcherConfig {
            max_recovery_size: 1,
            ..MatcherConfig::default()
        };
        let mut matcher = Matcher::new(&sf, &df, &config);
        assert!(matcher.link(0, 0));
        matcher.recover(0, 0);

        assert_eq!(matcher.mapping().len(), 1);
    }
}
