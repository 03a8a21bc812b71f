//! Project snapshots: every parsed file of one version of a project.
//!
//! Files are kept in path order and addressed by [`FileId`], which is the
//! file's position in that order. Ids are stable once a snapshot is fully
//! built; inserting a file shifts the ids of files sorting after it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::tree::{NodeId, Span, Tree};

/// Which version of the project a snapshot or node belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Source,
    Destination,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Destination => "destination",
        }
    }
}

/// Position of a file inside a [`Snapshot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Project-wide node address: `(file, node index)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef {
    pub file: FileId,
    pub node: NodeId,
}

impl NodeRef {
    pub fn new(file: FileId, node: NodeId) -> Self {
        Self { file, node }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file.0, self.node.0)
    }
}

/// One parsed file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub language: String,
    pub tree: Tree,
    /// xxh3 hash of the raw source text, when known.
    pub content_hash: Option<u64>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, language: impl Into<String>, tree: Tree) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            tree,
            content_hash: None,
        }
    }

    pub fn with_content_hash(mut self, hash: u64) -> Self {
        self.content_hash = Some(hash);
        self
    }
}

/// A file that has no valid tree (e.g. its parse failed upstream).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedFile {
    pub path: String,
    pub reason: String,
}

/// All trees of one project version, keyed by unique path.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    files: Vec<SourceFile>,
    unresolved: Vec<UnresolvedFile>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from `(path, s-expression)` fixtures. Language is
    /// taken from the path extension.
    pub fn from_sexp_files(files: &[(&str, &str)]) -> Result<Self> {
        let mut snapshot = Snapshot::new();
        for (path, text) in files {
            let language = path.rsplit('.').next().unwrap_or_default();
            snapshot.insert(SourceFile::new(*path, language, Tree::from_sexp(text)?));
        }
        Ok(snapshot)
    }

    /// Add a file, replacing any file or unresolved entry with the same path.
    pub fn insert(&mut self, file: SourceFile) -> Option<SourceFile> {
        self.unresolved.retain(|u| u.path != file.path);
        match self
            .files
            .binary_search_by(|f| f.path.as_str().cmp(file.path.as_str()))
        {
            Ok(i) => Some(std::mem::replace(&mut self.files[i], file)),
            Err(i) => {
                self.files.insert(i, file);
                None
            }
        }
    }

    /// Record a file that could not be parsed. It takes no part in matching.
    pub fn add_unresolved(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        let path = path.into();
        self.files.retain(|f| f.path != path);
        self.unresolved.retain(|u| u.path != path);
        self.unresolved.push(UnresolvedFile {
            path,
            reason: reason.into(),
        });
        self.unresolved.sort_by(|a, b| a.path.cmp(&b.path));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn unresolved(&self) -> &[UnresolvedFile] {
        &self.unresolved
    }

    pub fn file_ids(&self) -> impl Iterator<Item = FileId> {
        (0..self.files.len() as u32).map(FileId)
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.index()]
    }

    pub fn file_id(&self, path: &str) -> Option<FileId> {
        self.files
            .binary_search_by(|f| f.path.as_str().cmp(path))
            .ok()
            .map(|i| FileId(i as u32))
    }

    pub fn tree(&self, id: FileId) -> &Tree {
        &self.files[id.index()].tree
    }

    pub fn path(&self, id: FileId) -> &str {
        &self.files[id.index()].path
    }

    /// Address of the root node of a file.
    pub fn root_ref(&self, id: FileId) -> NodeRef {
        NodeRef::new(id, self.tree(id).root())
    }

    pub fn kind(&self, node: NodeRef) -> &str {
        self.tree(node.file).kind(node.node)
    }

    pub fn label(&self, node: NodeRef) -> &str {
        self.tree(node.file).label(node.node)
    }

    pub fn span(&self, node: NodeRef) -> Span {
        self.tree(node.file).span(node.node)
    }

    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.tree(node.file)
            .parent(node.node)
            .map(|p| NodeRef::new(node.file, p))
    }

    pub fn position_in_parent(&self, node: NodeRef) -> Option<usize> {
        self.tree(node.file).position_in_parent(node.node)
    }

    /// Every node of the snapshot, file by file in path order, each file in
    /// document order.
    pub fn node_refs(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.file_ids().flat_map(move |file| {
            self.tree(file)
                .preorder()
                .into_iter()
                .map(move |node| NodeRef::new(file, node))
        })
    }

    /// Total number of nodes over all files.
    pub fn node_count(&self) -> usize {
        self.files.iter().map(|f| f.tree.len()).sum()
    }

    /// Human-readable location used in error context.
    pub fn describe(&self, node: NodeRef) -> String {
        let span = self.span(node);
        format!(
            "{}:{} [{}..{}] {}",
            self.path(node.file),
            span.start_line,
            span.start,
            span.end,
            self.kind(node)
        )
    }
}
