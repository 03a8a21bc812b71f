//! Whole-file pairing between two snapshots.

use crate::config::{MatcherConfig, PairingConfig};
use crate::matcher::{Forest, Matcher};
use crate::snapshot::{FileId, Snapshot};

/// A source file, a destination file, or both.
#[derive(Clone, Debug, PartialEq)]
pub struct FilePair {
    pub src: Option<FileId>,
    pub dst: Option<FileId>,
    /// Structural similarity of the two files; 1.0 for same-path pairs.
    pub similarity: f64,
}

/// Share of nodes that the top-down phase anchors between two files.
pub fn file_similarity(src: &Forest<'_>, dst: &Forest<'_>, config: &MatcherConfig) -> f64 {
    let total = src.len() + dst.len();
    if total == 0 {
        return 0.0;
    }
    if src.node(0).hash == dst.node(0).hash {
        return 1.0;
    }
    let mut matcher = Matcher::new(src, dst, config);
    matcher.top_down();
    2.0 * matcher.mapping().len() as f64 / total as f64
}

/// Pair files by path, then pair the leftovers by content.
///
/// Files present at the same path in both snapshots always pair. Every
/// remaining source file is scored against every remaining destination
/// file of the same language, and pairs at or above `rename_threshold` are
/// taken greedily, best first. Files still left over are whole-file
/// additions or deletions. The result is ordered by path.
pub fn pair_files(
    source: &Snapshot,
    destination: &Snapshot,
    pairing: &PairingConfig,
    matcher: &MatcherConfig,
) -> Vec<FilePair> {
    let mut pairs = Vec::new();
    let mut src_left = Vec::new();
    let mut dst_taken = vec![false; destination.len()];

    for src in source.file_ids() {
        match destination.file_id(source.path(src)) {
            Some(dst) => {
                dst_taken[dst.index()] = true;
                pairs.push(FilePair {
                    src: Some(src),
                    dst: Some(dst),
                    similarity: 1.0,
                });
            }
            None => src_left.push(src),
        }
    }
    let dst_left: Vec<FileId> = destination
        .file_ids()
        .filter(|d| !dst_taken[d.index()])
        .collect();

    if !src_left.is_empty() && !dst_left.is_empty() {
        let src_forests: Vec<Forest<'_>> = src_left
            .iter()
            .map(|&f| Forest::from_tree(f, source.tree(f)))
            .collect();
        let dst_forests: Vec<Forest<'_>> = dst_left
            .iter()
            .map(|&f| Forest::from_tree(f, destination.tree(f)))
            .collect();

        let mut scored = Vec::new();
        for (i, &s) in src_left.iter().enumerate() {
            for (j, &d) in dst_left.iter().enumerate() {
                if source.file(s).language != destination.file(d).language {
                    continue;
                }
                let score = file_similarity(&src_forests[i], &dst_forests[j], matcher);
                if score >= pairing.rename_threshold {
                    scored.push((score, i, j));
                }
            }
        }
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

        let mut src_used = vec![false; src_left.len()];
        let mut dst_used = vec![false; dst_left.len()];
        for (score, i, j) in scored {
            if src_used[i] || dst_used[j] {
                continue;
            }
            src_used[i] = true;
            dst_used[j] = true;
            tracing::debug!(
                "Paired renamed file {} -> {} (similarity {:.2})",
                source.path(src_left[i]),
                destination.path(dst_left[j]),
                score
            );
            pairs.push(FilePair {
                src: Some(src_left[i]),
                dst: Some(dst_left[j]),
                similarity: score,
            });
        }
        src_left = src_left
            .into_iter()
            .zip(src_used)
            .filter_map(|(f, used)| (!used).then_some(f))
            .collect();
        for (j, used) in dst_used.into_iter().enumerate() {
            if used {
                dst_taken[dst_left[j].index()] = true;
            }
        }
    }

    pairs.extend(src_left.into_iter().map(|src| FilePair {
        src: Some(src),
        dst: None,
        similarity: 0.0,
    }));
    pairs.extend(
        destination
            .file_ids()
            .filter(|d| !dst_taken[d.index()])
            .map(|dst| FilePair {
                src: None,
                dst: Some(dst),
                similarity: 0.0,
            }),
    );

    let key = |p: &FilePair| match (p.src, p.dst) {
        (Some(s), _) => source.path(s).to_string(),
        (None, Some(d)) => destination.path(d).to_string(),
        (None, None) => String::new(),
    };
    pairs.sort_by_key(key);
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(source: &Snapshot, destination: &Snapshot, pairs: &[FilePair]) -> Vec<(Option<String>, Option<String>)> {
        pairs
            .iter()
            .map(|p| {
                (
                    p.src.map(|s| source.path(s).to_string()),
                    p.dst.map(|d| destination.path(d).to_string()),
                )
            })
            .collect()
    }

    const BODY: &str = "(Unit (Class \"C\" (Method \"m\" (Block (Stmt (Call \"a\")) (Stmt (Call \"b\"))))))";

    #[test]
    fn test_same_path_pairs_first() {
        let source = Snapshot::from_sexp_files(&[("a.java", BODY), ("gone.java", "(Unit)")]).unwrap();
        let destination = Snapshot::from_sexp_files(&[("a.java", "(Unit)"), ("new.java", "(Other)")]).unwrap();
        let pairs = pair_files(&source, &destination, &PairingConfig::default(), &MatcherConfig::default());

        assert_eq!(
            paths(&source, &destination, &pairs),
            vec![
                (Some("a.java".to_string()), Some("a.java".to_string())),
                (Some("gone.java".to_string()), None),
                (None, Some("new.java".to_string())),
            ]
        );
    }

    #[test]
    fn test_renamed_file_pairs_by_content() {
        let source = Snapshot::from_sexp_files(&[("old/C.java", BODY)]).unwrap();
        let destination = Snapshot::from_sexp_files(&[
            ("new/C.java", BODY),
            ("new/D.java", "(Unit (Class \"D\"))"),
        ])
        .unwrap();
        let pairs = pair_files(&source, &destination, &PairingConfig::default(), &MatcherConfig::default());

        assert_eq!(pairs.len(), 2);
        assert_eq!(
            paths(&source, &destination, &pairs)[1],
            (Some("old/C.java".to_string()), Some("new/C.java".to_string()))
        );
        assert_eq!(pairs[1].similarity, 1.0);
        assert_eq!(paths(&source, &destination, &pairs)[0].1.as_deref(), Some("new/D.java"));
    }

    #[test]
    fn test_dissimilar_files_do_not_pair() {
        let source = Snapshot::from_sexp_files(&[("a.java", BODY)]).unwrap();
        let destination = Snapshot::from_sexp_files(&[("b.java", "(Unit (Interface \"I\"))")]).unwrap();
        let pairs = pair_files(&source, &destination, &PairingConfig::default(), &MatcherConfig::default());

        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.src.is_none() || p.dst.is_none()));
    }
}
