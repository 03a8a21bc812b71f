//! Source text to [`Tree`] conversion.
//!
//! The differ only needs trees; how they are produced sits behind the
//! [`TreeBuilder`] trait. [`TreeSitterBuilder`] covers every bundled
//! grammar, and [`parse_files_parallel`] builds many files at once with
//! rayon.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::snapshot::{Snapshot, SourceFile};
use crate::tree::Tree;

pub mod builder;
pub mod languages;

mod helpers;

pub use builder::TreeSitterBuilder;
pub use languages::{detect_language, normalize_language, SUPPORTED_LANGUAGES};

/// Anything that turns `(path, language, source)` into a tree.
pub trait TreeBuilder: Sync {
    fn build(&self, path: &str, language: &str, source: &str) -> Result<Tree>;
}

/// A file to parse. Reading it is left to the caller.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub source: String,
    pub language: String,
}

impl FileInfo {
    pub fn new(
        path: impl Into<String>,
        source: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            language: language.into(),
        }
    }
}

/// Outcome of parsing one [`FileInfo`].
#[derive(Debug)]
pub struct ParseResult {
    pub path: String,
    pub language: String,
    pub tree: Result<Tree>,
}

/// Parse source code for a specific language with the tree-sitter builder.
pub fn parse_source(source: &str, path: &str, language: &str) -> Result<Tree> {
    TreeSitterBuilder::new().build(path, language, source)
}

/// Parse multiple files in parallel using rayon.
///
/// Results keep the input order. The number of threads can be capped;
/// otherwise the global pool is used.
pub fn parse_files_parallel(
    builder: &dyn TreeBuilder,
    file_infos: &[FileInfo],
    num_threads: Option<usize>,
) -> Vec<ParseResult> {
    let pool = match num_threads {
        Some(n) if n > 0 => rayon::ThreadPoolBuilder::new().num_threads(n).build().ok(),
        _ => None,
    };

    let parse_fn = |info: &FileInfo| ParseResult {
        path: info.path.clone(),
        language: info.language.clone(),
        tree: builder.build(&info.path, &info.language, &info.source),
    };

    match pool {
        Some(pool) => pool.install(|| file_infos.par_iter().map(parse_fn).collect()),
        None => file_infos.par_iter().map(parse_fn).collect(),
    }
}

/// Collect parse results into a snapshot. Failures become unresolved files.
pub fn into_snapshot(results: Vec<ParseResult>) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for result in results {
        match result.tree {
            Ok(tree) => {
                snapshot.insert(SourceFile::new(result.path, result.language, tree));
            }
            Err(e) => {
                tracing::debug!("Unresolved {}: {}", result.path, e);
                snapshot.add_unresolved(result.path, e.to_string());
            }
        }
    }
    snapshot
}
