//! movediff core: AST diffing with cross-file move detection.
//!
//! Two [`Snapshot`]s of a project (one tree per file) go in; a
//! [`ProjectDiff`] comes out, listing per file which nodes were inserted,
//! deleted, updated, moved inside the file, moved between files, or moved
//! together as a group.
//!
//! # Features
//!
//! - **GumTree-style matching**: top-down on structure hashes, bottom-up on
//!   container similarity, then a recovery pass over unmatched children
//! - **Cross-file moves**: `MoveOut` / `MoveIn` pairs when code migrates
//!   between files, including into newly added files
//! - **Multi-language input**: tree-sitter grammars for Python, TypeScript,
//!   JavaScript, Go, Java, Rust and C#, or hand-built [`Tree`]s
//! - **Entity matching**: types, methods and attributes paired with
//!   pluggable similarity indices and priorities
//! - **Parallel**: parsing and independent diffs run on rayon
//!
//! # Usage
//!
//! ```
//! use movediff_core::{diff, ActionKind, Snapshot};
//!
//! let before = Snapshot::from_sexp_files(&[
//!     ("A.java", "(Unit (Class \"A\" (Method \"foo\" (Block (Return (Num \"1\"))))))"),
//!     ("B.java", "(Unit (Class \"B\"))"),
//! ]).unwrap();
//! let after = Snapshot::from_sexp_files(&[
//!     ("A.java", "(Unit (Class \"A\"))"),
//!     ("B.java", "(Unit (Class \"B\" (Method \"foo\" (Block (Return (Num \"1\"))))))"),
//! ]).unwrap();
//!
//! let result = diff(&before, &after).unwrap();
//! assert_eq!(result.summary.moves_out, 1);
//! assert!(result.cross_file.iter().any(|a| a.kind() == ActionKind::MoveOut));
//! ```
//!
//! Entity matching works on the same snapshots:
//!
//! ```
//! use movediff_core::config::EntitiesConfig;
//! use movediff_core::entity::match_entities;
//! use movediff_core::Snapshot;
//!
//! let before = Snapshot::from_sexp_files(&[("A.java", "(Unit (Class \"A\"))")]).unwrap();
//! let after = Snapshot::from_sexp_files(&[("A.java", "(Unit (Class \"A\"))")]).unwrap();
//!
//! let matches = match_entities(&before, &after, &EntitiesConfig::default());
//! assert_eq!(matches.len(), 1);
//! ```

pub mod config;
pub mod differ;
pub mod entity;
pub mod error;
pub mod exporter;
pub mod mapping;
pub mod matcher;
pub mod parser;
pub mod scanner;
pub mod snapshot;
pub mod text;
pub mod tree;

pub use config::DiffConfig;
pub use differ::{
    diff, diff_many, diff_with_config, diff_with_deadline, Action, ActionKind, Deadline,
    Diagnostic, DiffSummary, FileDiff, FileStatus, ProjectDiff,
};
pub use entity::{match_entities, EntityMatch, EntityMatcher, EntityMatches, Relationship};
pub use error::{DiffError, Result};
pub use mapping::Mapping;
pub use snapshot::{FileId, NodeRef, Side, Snapshot, SourceFile};
pub use tree::{NodeId, Span, Tree};
