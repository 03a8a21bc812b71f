//! JSON format exporter.

use serde::Serialize;

use crate::differ::{Action, Diagnostic, DiffSummary, FileStatus, ProjectDiff};
use crate::error::Result;
use crate::snapshot::{NodeRef, Side, Snapshot};

/// Export a project diff to JSON.
pub fn export_json(diff: &ProjectDiff, pretty: bool) -> Result<String> {
    let out = if pretty {
        serde_json::to_string_pretty(diff)?
    } else {
        serde_json::to_string(diff)?
    };
    Ok(out)
}

/// A node resolved against its snapshot.
#[derive(Debug, Serialize)]
struct NodeInfo<'a> {
    path: &'a str,
    kind: &'a str,
    label: &'a str,
    start_line: u32,
    end_line: u32,
}

#[derive(Debug, Serialize)]
struct AnnotatedAction<'a> {
    #[serde(flatten)]
    action: &'a Action,
    before: Option<NodeInfo<'a>>,
    after: Option<NodeInfo<'a>>,
}

#[derive(Debug, Serialize)]
struct AnnotatedFile<'a> {
    src_path: Option<&'a str>,
    dst_path: Option<&'a str>,
    status: FileStatus,
    actions: Vec<AnnotatedAction<'a>>,
}

#[derive(Debug, Serialize)]
struct AnnotatedDiff<'a> {
    summary: &'a DiffSummary,
    text: String,
    files: Vec<AnnotatedFile<'a>>,
    diagnostics: &'a [Diagnostic],
    duration_ms: f64,
}

fn node_info(snapshot: &Snapshot, node: NodeRef) -> NodeInfo<'_> {
    let span = snapshot.span(node);
    NodeInfo {
        path: snapshot.path(node.file),
        kind: snapshot.kind(node),
        label: snapshot.label(node),
        start_line: span.start_line,
        end_line: span.end_line,
    }
}

/// Source and destination nodes an action talks about.
fn endpoints(action: &Action) -> (Option<NodeRef>, Option<NodeRef>) {
    match action {
        Action::Insert { node, .. } => (None, Some(*node)),
        Action::Delete { node } => (Some(*node), None),
        Action::Update { src, dst } => (Some(*src), Some(*dst)),
        Action::Move { node, dst, .. } | Action::MoveOut { node, dst, .. } => {
            (Some(*node), Some(*dst))
        }
        Action::MoveIn { node, src, .. } => (Some(*src), Some(*node)),
        Action::MultiMove {
            node,
            counterpart,
            side,
            ..
        } => match side {
            Side::Source => (Some(*node), Some(*counterpart)),
            Side::Destination => (Some(*counterpart), Some(*node)),
        },
    }
}

/// Export a project diff with every node resolved to path, kind, label and
/// lines. `source` and `destination` must be the snapshots that were diffed.
pub fn export_annotated_json(
    diff: &ProjectDiff,
    source: &Snapshot,
    destination: &Snapshot,
    pretty: bool,
) -> Result<String> {
    let files = diff
        .files
        .iter()
        .map(|file| AnnotatedFile {
            src_path: file.src_path.as_deref(),
            dst_path: file.dst_path.as_deref(),
            status: file.status,
            actions: file
                .actions
                .iter()
                .map(|action| {
                    let (before, after) = endpoints(action);
                    AnnotatedAction {
                        action,
                        before: before.map(|n| node_info(source, n)),
                        after: after.map(|n| node_info(destination, n)),
                    }
                })
                .collect(),
        })
        .collect();

    let annotated = AnnotatedDiff {
        summary: &diff.summary,
        text: diff.summary.text(),
        files,
        diagnostics: &diff.diagnostics,
        duration_ms: diff.duration_ms,
    };
    let out = if pretty {
        serde_json::to_string_pretty(&annotated)?
    } else {
        serde_json::to_string(&annotated)?
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::diff;

    fn make_diff() -> (Snapshot, Snapshot, ProjectDiff) {
        let source = Snapshot::from_sexp_files(&[("A.java", "(Unit (Class \"A\"))")]).unwrap();
        let destination = Snapshot::from_sexp_files(&[("A.java", "(Unit (Class \"B\"))")]).unwrap();
        let result = diff(&source, &destination).unwrap();
        (source, destination, result)
    }

    #[test]
    fn test_export_json() {
        let (_, _, result) = make_diff();
        let output = export_json(&result, false).unwrap();
        assert!(output.contains("\"type\":\"update\""));
        assert!(!output.contains('\n'));

        let parsed: ProjectDiff = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.summary, result.summary);
    }

    #[test]
    fn test_export_json_pretty() {
        let (_, _, result) = make_diff();
        let output = export_json(&result, true).unwrap();
        assert!(output.contains('\n'));
    }

    #[test]
    fn test_export_annotated_json_resolves_nodes() {
        let (source, destination, result) = make_diff();
        let output = export_annotated_json(&result, &source, &destination, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        let action = &value["files"][0]["actions"][0];
        assert_eq!(action["type"], "update");
        assert_eq!(action["before"]["label"], "A");
        assert_eq!(action["after"]["label"], "B");
        assert_eq!(action["after"]["path"], "A.java");
        assert_eq!(value["text"], "files: 1 modified; nodes: 1 updated");
    }
}
