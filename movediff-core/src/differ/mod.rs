//! Project differ: turns two snapshots into one edit script.
//!
//! # Phases
//!
//! 1. **Pairing**: files pair by path, leftovers pair by content
//! 2. **Per-file matching**: top-down then bottom-up inside every file pair
//! 3. **Cross-file matching**: both snapshots wrapped under a synthetic root
//!    and matched again, seeded with the per-file pairs, to find nodes that
//!    moved between files
//! 4. **Classification**: the finished mapping becomes actions
//!
//! A [`Deadline`] is checked between phases. Independent diffs run in
//! parallel with [`diff_many`].
//!
//! # Example
//!
//! ```
//! use movediff_core::{diff, Snapshot};
//!
//! let before = Snapshot::from_sexp_files(&[("A.java", "(Unit (Class \"A\"))")]).unwrap();
//! let after = Snapshot::from_sexp_files(&[("A.java", "(Unit (Class \"B\"))")]).unwrap();
//!
//! let result = diff(&before, &after).unwrap();
//! assert_eq!(result.summary.updates, 1);
//! ```

pub mod actions;
pub mod classifier;
pub mod deadline;
pub mod pairing;

pub use actions::{
    Action, ActionKind, Diagnostic, DiffSummary, FileDiff, FileStatus, ProjectDiff,
};
pub use classifier::{Classification, Classifier};
pub use deadline::Deadline;
pub use pairing::{file_similarity, pair_files, FilePair};

use rayon::prelude::*;
use std::time::Instant;

use crate::config::DiffConfig;
use crate::error::Result;
use crate::mapping::Mapping;
use crate::matcher::{Forest, ForestMapping, Matcher};
use crate::snapshot::{Side, Snapshot};

/// Diff two snapshots with default configuration.
pub fn diff(source: &Snapshot, destination: &Snapshot) -> Result<ProjectDiff> {
    diff_with_config(source, destination, &DiffConfig::default())
}

/// Diff two snapshots, honoring `config.limits.timeout_ms`.
pub fn diff_with_config(
    source: &Snapshot,
    destination: &Snapshot,
    config: &DiffConfig,
) -> Result<ProjectDiff> {
    let deadline = Deadline::from_timeout(config.timeout());
    diff_with_deadline(source, destination, config, &deadline)
}

/// Run independent diffs in parallel. Results keep the input order.
pub fn diff_many(jobs: &[(Snapshot, Snapshot)], config: &DiffConfig) -> Vec<Result<ProjectDiff>> {
    jobs.par_iter()
        .map(|(source, destination)| diff_with_config(source, destination, config))
        .collect()
}

/// Copy the pairs a forest matcher found into the project mapping.
fn absorb(
    mapping: &mut Mapping,
    found: &ForestMapping,
    src_forest: &Forest<'_>,
    dst_forest: &Forest<'_>,
    source: &Snapshot,
    destination: &Snapshot,
) -> Result<usize> {
    let mut added = 0;
    for (s, d) in found.pairs() {
        let (Some(a), Some(b)) = (src_forest.origin(s), dst_forest.origin(d)) else {
            continue;
        };
        if mapping.contains(a, b) {
            continue;
        }
        mapping.link(a, b, source, destination)?;
        added += 1;
    }
    Ok(added)
}

/// Diff two snapshots under an explicit deadline.
///
/// Cancellation discards all partial work and returns
/// [`DiffError::Cancelled`](crate::DiffError::Cancelled).
pub fn diff_with_deadline(
    source: &Snapshot,
    destination: &Snapshot,
    config: &DiffConfig,
    deadline: &Deadline,
) -> Result<ProjectDiff> {
    let start = Instant::now();

    let pairs = pair_files(source, destination, &config.pairing, &config.matcher);
    deadline.check("pairing")?;

    // Per-file matching
    let forests: Vec<(Forest<'_>, Forest<'_>)> = pairs
        .iter()
        .filter_map(|p| Some((p.src?, p.dst?)))
        .map(|(s, d)| {
            (
                Forest::from_tree(s, source.tree(s)),
                Forest::from_tree(d, destination.tree(d)),
            )
        })
        .collect();
    let mut matchers: Vec<Matcher<'_, '_>> = forests
        .iter()
        .map(|(s, d)| Matcher::new(s, d, &config.matcher))
        .collect();
    for matcher in &mut matchers {
        matcher.top_down();
    }
    deadline.check("top-down")?;
    for matcher in &mut matchers {
        matcher.bottom_up();
    }
    deadline.check("bottom-up")?;

    let mut mapping = Mapping::new();
    for (matcher, (src_forest, dst_forest)) in matchers.iter().zip(&forests) {
        absorb(
            &mut mapping,
            matcher.mapping(),
            src_forest,
            dst_forest,
            source,
            destination,
        )?;
    }
    tracing::debug!(
        "Per-file matching: {} pairs over {} file pairs",
        mapping.len(),
        forests.len()
    );
    drop(matchers);
    drop(forests);

    // Cross-file matching
    let src_forest = Forest::from_snapshot(source);
    let dst_forest = Forest::from_snapshot(destination);
    let mut seed = ForestMapping::new(src_forest.len(), dst_forest.len());
    for (a, b) in mapping.pairs() {
        if let (Some(s), Some(d)) = (src_forest.index_of(a), dst_forest.index_of(b)) {
            seed.link(s, d);
        }
    }
    let mut matcher = Matcher::with_mapping(&src_forest, &dst_forest, seed, &config.matcher);
    matcher.run();
    let moved = absorb(
        &mut mapping,
        matcher.mapping(),
        &src_forest,
        &dst_forest,
        source,
        destination,
    )?;
    mapping.validate(source, destination)?;
    tracing::debug!("Cross-file matching: {} new pairs", moved);
    deadline.check("cross-file matching")?;

    let classification = Classifier::new(
        source,
        destination,
        &pairs,
        &mapping,
        &src_forest,
        &dst_forest,
        &config.classifier,
    )
    .classify()?;
    deadline.check("classification")?;

    let mut result = ProjectDiff::default();
    for (pair, actions) in pairs.iter().zip(classification.file_actions) {
        let src_path = pair.src.map(|f| source.path(f).to_string());
        let dst_path = pair.dst.map(|f| destination.path(f).to_string());
        let status = match (&src_path, &dst_path) {
            (None, _) => FileStatus::Added,
            (_, None) => FileStatus::Deleted,
            (Some(s), Some(d)) if s != d => FileStatus::Renamed,
            _ if actions.is_empty() => FileStatus::Unchanged,
            _ => FileStatus::Modified,
        };
        result.files.push(FileDiff {
            src_path,
            dst_path,
            status,
            actions,
        });
    }
    result.cross_file = classification.cross_file;

    let diagnostics = |snapshot: &Snapshot, side: Side| -> Vec<Diagnostic> {
        snapshot
            .unresolved()
            .iter()
            .map(|u| Diagnostic {
                side,
                path: u.path.clone(),
                message: u.reason.clone(),
            })
            .collect()
    };
    result.diagnostics = diagnostics(source, Side::Source);
    result
        .diagnostics
        .extend(diagnostics(destination, Side::Destination));

    result.finalize(start.elapsed().as_secs_f64() * 1000.0);
    tracing::info!(
        "Diffed {} file pairs in {:.1}ms: {}",
        result.files.len(),
        result.duration_ms,
        result.summary.text()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiffError;

    #[test]
    fn test_identical_snapshots_have_no_actions() {
        let text = "(Unit (Class \"A\" (Method \"m\" (Block (Stmt (Call \"f\")) (Stmt (Call \"g\"))))))";
        let source = Snapshot::from_sexp_files(&[("A.java", text)]).unwrap();
        let result = diff(&source, &source.clone()).unwrap();

        assert!(!result.has_changes());
        assert_eq!(result.files[0].status, FileStatus::Unchanged);
        assert_eq!(result.summary.text(), "No changes");
    }

    #[test]
    fn test_added_and_deleted_files() {
        let source = Snapshot::from_sexp_files(&[("old.java", "(Unit (Class \"Old\"))")]).unwrap();
        let destination =
            Snapshot::from_sexp_files(&[("new.py", "(Module (FunctionDef \"run\"))")]).unwrap();
        let result = diff(&source, &destination).unwrap();

        assert_eq!(result.files.len(), 2);
        assert_eq!(result.file("new.py").unwrap().status, FileStatus::Added);
        assert_eq!(result.file("old.java").unwrap().status, FileStatus::Deleted);
        assert_eq!(result.summary.inserts, 2);
        assert_eq!(result.summary.deletes, 2);
    }

    #[test]
    fn test_unresolved_files_become_diagnostics() {
        let mut source = Snapshot::from_sexp_files(&[("A.java", "(Unit)")]).unwrap();
        source.add_unresolved("Broken.java", "syntax error at line 3");
        let destination = Snapshot::from_sexp_files(&[("A.java", "(Unit)")]).unwrap();

        let result = diff(&source, &destination).unwrap();
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].side, Side::Source);
        assert_eq!(result.diagnostics[0].path, "Broken.java");
        assert_eq!(result.summary.diagnostics, 1);
    }

    #[test]
    fn test_cancelled_diff_returns_no_result() {
        let source = Snapshot::from_sexp_files(&[("A.java", "(Unit)")]).unwrap();
        let deadline = Deadline::none();
        deadline.cancel();

        let err = diff_with_deadline(&source, &source, &DiffConfig::default(), &deadline).unwrap_err();
        assert!(matches!(err, DiffError::Cancelled { phase: "pairing" }));
    }

    #[test]
    fn test_diff_many_keeps_order() {
        let a = Snapshot::from_sexp_files(&[("A.java", "(Unit (Class \"A\"))")]).unwrap();
        let b = Snapshot::from_sexp_files(&[("A.java", "(Unit (Class \"B\"))")]).unwrap();
        let jobs = vec![(a.clone(), a.clone()), (a, b)];

        let results = diff_many(&jobs, &DiffConfig::default());
        assert_eq!(results.len(), 2);
        assert!(!results[0].as_ref().unwrap().has_changes());
        assert_eq!(results[1].as_ref().unwrap().summary.updates, 1);
    }
}
