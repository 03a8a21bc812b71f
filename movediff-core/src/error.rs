//! Error types for movediff-core.

use thiserror::Error;

/// Result type alias for movediff-core operations.
pub type Result<T> = std::result::Result<T, DiffError>;

/// Errors that can occur while building trees or diffing snapshots.
///
/// Unresolvable files are not errors; they are reported as diagnostics on
/// the resulting `ProjectDiff`. Everything here either aborts a whole
/// `diff()` call or rejects malformed input up front.
#[derive(Error, Debug)]
pub enum DiffError {
    /// A mapping invariant was violated (node matched twice, kind mismatch,
    /// or an inverted ancestor relationship). Always a matcher bug.
    #[error("Inconsistent mapping: {reason} ({context})")]
    InconsistentMapping {
        /// What invariant broke.
        reason: String,
        /// File pair and node positions needed to reproduce.
        context: String,
    },

    /// A node could not be assigned to any file pair during classification.
    #[error("Cannot classify node at {file}:{start}..{end}")]
    Unclassifiable {
        /// File the node belongs to.
        file: String,
        /// Start byte of the node.
        start: usize,
        /// End byte of the node.
        end: usize,
    },

    /// The deadline or cancel flag tripped between two phases.
    #[error("Diff cancelled after {phase}")]
    Cancelled {
        /// Last phase that completed.
        phase: &'static str,
    },

    /// Malformed s-expression tree text.
    #[error("Tree syntax error at byte {offset}: {message}")]
    TreeSyntax {
        /// Byte offset of the problem.
        offset: usize,
        /// Description of the problem.
        message: String,
    },

    /// A source file could not be turned into a tree.
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// Path of the file.
        path: String,
        /// Description of the parse failure.
        message: String,
    },

    /// No grammar is available for the requested language.
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Invalid configuration file content.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// IO error while reading a snapshot from disk.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
