//! Edit actions and result structures for project diffs.

use serde::{Deserialize, Serialize};

use crate::snapshot::{NodeRef, Side};

/// Tag of an [`Action`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Insert,
    Delete,
    Update,
    Move,
    MoveIn,
    MoveOut,
    MultiMove,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Insert => "insert",
            ActionKind::Delete => "delete",
            ActionKind::Update => "update",
            ActionKind::Move => "move",
            ActionKind::MoveIn => "move_in",
            ActionKind::MoveOut => "move_out",
            ActionKind::MultiMove => "multi_move",
        }
    }
}

/// A single classified change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// `node` exists only in the destination.
    Insert {
        node: NodeRef,
        /// `None` when a whole file root is inserted.
        parent: Option<NodeRef>,
        position: usize,
    },
    /// `node` exists only in the source.
    Delete { node: NodeRef },
    /// Matched pair whose label differs. Inside one file pair this wins
    /// over `Move`, so a node that was renamed and reparented shows only
    /// as an update.
    Update { src: NodeRef, dst: NodeRef },
    /// Matched pair in the same file pair whose parent or position changed.
    /// `node` is the source node; `new_parent` and `position` are on the
    /// destination side.
    Move {
        node: NodeRef,
        dst: NodeRef,
        new_parent: NodeRef,
        position: usize,
    },
    /// Destination side of a cross-file move.
    MoveIn {
        node: NodeRef,
        src: NodeRef,
        new_parent: NodeRef,
        position: usize,
        source_file: String,
    },
    /// Source side of a cross-file move.
    MoveOut {
        node: NodeRef,
        dst: NodeRef,
        new_parent: NodeRef,
        position: usize,
        destination_file: String,
    },
    /// One member of a block of siblings moved together. All members of
    /// one block share `group_id`.
    MultiMove {
        node: NodeRef,
        counterpart: NodeRef,
        side: Side,
        new_parent: NodeRef,
        position: usize,
        group_id: u32,
        /// Whether any member's subtree content changed as well.
        updated: bool,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Insert { .. } => ActionKind::Insert,
            Action::Delete { .. } => ActionKind::Delete,
            Action::Update { .. } => ActionKind::Update,
            Action::Move { .. } => ActionKind::Move,
            Action::MoveIn { .. } => ActionKind::MoveIn,
            Action::MoveOut { .. } => ActionKind::MoveOut,
            Action::MultiMove { .. } => ActionKind::MultiMove,
        }
    }

    /// The node the action is reported on.
    pub fn node(&self) -> NodeRef {
        match self {
            Action::Insert { node, .. }
            | Action::Delete { node }
            | Action::Move { node, .. }
            | Action::MoveIn { node, .. }
            | Action::MoveOut { node, .. }
            | Action::MultiMove { node, .. } => *node,
            Action::Update { src, .. } => *src,
        }
    }

    /// Which snapshot [`Action::node`] belongs to.
    pub fn side(&self) -> Side {
        match self {
            Action::Insert { .. } | Action::MoveIn { .. } => Side::Destination,
            Action::MultiMove { side, .. } => *side,
            _ => Side::Source,
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(
            self.kind(),
            ActionKind::Move | ActionKind::MoveIn | ActionKind::MoveOut | ActionKind::MultiMove
        )
    }

    pub fn group_id(&self) -> Option<u32> {
        match self {
            Action::MultiMove { group_id, .. } => Some(*group_id),
            _ => None,
        }
    }
}

/// How a file pair changed as a whole.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Unchanged,
    Modified,
    Renamed,
    Added,
    Deleted,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Unchanged => "unchanged",
            FileStatus::Modified => "modified",
            FileStatus::Renamed => "renamed",
            FileStatus::Added => "added",
            FileStatus::Deleted => "deleted",
        }
    }
}

/// Actions of one `(source file, destination file)` pair.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileDiff {
    pub src_path: Option<String>,
    pub dst_path: Option<String>,
    pub status: FileStatus,
    /// Source-side actions in source document order, then destination-side
    /// actions in destination document order.
    pub actions: Vec<Action>,
}

impl FileDiff {
    /// Path used for ordering and lookup: the source path when present.
    pub fn path(&self) -> &str {
        self.src_path
            .as_deref()
            .or(self.dst_path.as_deref())
            .unwrap_or_default()
    }

    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind() == kind).count()
    }

    pub fn has_changes(&self) -> bool {
        self.status != FileStatus::Unchanged
    }
}

/// A file that could not take part in matching.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub side: Side,
    pub path: String,
    pub message: String,
}

/// Summary statistics for a project diff.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub files_added: u32,
    pub files_deleted: u32,
    pub files_renamed: u32,
    pub files_modified: u32,
    pub files_unchanged: u32,

    pub inserts: u32,
    pub deletes: u32,
    pub updates: u32,
    pub moves: u32,
    pub moves_in: u32,
    pub moves_out: u32,
    pub multi_moves: u32,
    pub move_groups: u32,

    pub diagnostics: u32,
}

impl DiffSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_file(&mut self, status: FileStatus) {
        match status {
            FileStatus::Added => self.files_added += 1,
            FileStatus::Deleted => self.files_deleted += 1,
            FileStatus::Renamed => self.files_renamed += 1,
            FileStatus::Modified => self.files_modified += 1,
            FileStatus::Unchanged => self.files_unchanged += 1,
        }
    }

    pub fn record(&mut self, action: &Action) {
        match action.kind() {
            ActionKind::Insert => self.inserts += 1,
            ActionKind::Delete => self.deletes += 1,
            ActionKind::Update => self.updates += 1,
            ActionKind::Move => self.moves += 1,
            ActionKind::MoveIn => self.moves_in += 1,
            ActionKind::MoveOut => self.moves_out += 1,
            ActionKind::MultiMove => self.multi_moves += 1,
        }
    }

    pub fn total_actions(&self) -> u32 {
        self.inserts
            + self.deletes
            + self.updates
            + self.moves
            + self.moves_in
            + self.moves_out
            + self.multi_moves
    }

    /// Generate human-readable summary string.
    pub fn text(&self) -> String {
        let mut parts = Vec::new();

        let files: Vec<String> = [
            (self.files_added, "added"),
            (self.files_deleted, "deleted"),
            (self.files_renamed, "renamed"),
            (self.files_modified, "modified"),
        ]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, what)| format!("{} {}", n, what))
        .collect();
        if !files.is_empty() {
            parts.push(format!("files: {}", files.join(", ")));
        }

        let actions: Vec<String> = [
            (self.inserts, "inserted"),
            (self.deletes, "deleted"),
            (self.updates, "updated"),
            (self.moves, "moved"),
            (self.moves_out, "moved out"),
            (self.moves_in, "moved in"),
            (self.multi_moves, "moved in groups"),
        ]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, what)| format!("{} {}", n, what))
        .collect();
        if !actions.is_empty() {
            parts.push(format!("nodes: {}", actions.join(", ")));
        }

        if self.diagnostics > 0 {
            parts.push(format!("{} unresolved files", self.diagnostics));
        }

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Complete result of a project diff.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProjectDiff {
    /// One entry per file pair, ordered by path.
    pub files: Vec<FileDiff>,

    /// Every `MoveIn`, `MoveOut` and cross-file `MultiMove`, in the order
    /// they appear in `files`.
    pub cross_file: Vec<Action>,

    /// Unresolvable files of either snapshot.
    pub diagnostics: Vec<Diagnostic>,

    pub summary: DiffSummary,

    /// Time taken in milliseconds.
    pub duration_ms: f64,
}

impl ProjectDiff {
    /// Compute the summary. Call after all files are added.
    pub fn finalize(&mut self, duration_ms: f64) {
        let mut summary = DiffSummary::new();
        let mut groups = std::collections::BTreeSet::new();
        for file in &self.files {
            summary.record_file(file.status);
            for action in &file.actions {
                summary.record(action);
                if let Some(id) = action.group_id() {
                    groups.insert(id);
                }
            }
        }
        summary.move_groups = groups.len() as u32;
        summary.diagnostics = self.diagnostics.len() as u32;
        self.summary = summary;
        self.duration_ms = duration_ms;
    }

    /// File pair whose source or destination path is `path`.
    pub fn file(&self, path: &str) -> Option<&FileDiff> {
        self.files.iter().find(|f| {
            f.src_path.as_deref() == Some(path) || f.dst_path.as_deref() == Some(path)
        })
    }

    /// Actions of the file pair containing `path`; empty if there is none.
    pub fn actions_for(&self, path: &str) -> &[Action] {
        self.file(path).map(|f| f.actions.as_slice()).unwrap_or_default()
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.files.iter().flat_map(|f| f.actions.iter())
    }

    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions().filter(|a| a.kind() == kind).count()
    }

    pub fn has_changes(&self) -> bool {
        self.files.iter().any(FileDiff::has_changes)
    }
}
