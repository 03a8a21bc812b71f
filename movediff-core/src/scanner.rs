//! Gitignore-aware directory scanning into a [`Snapshot`].
//!
//! Uses the `ignore` crate for traversal and rayon for reading and parsing.
//!
//! # Features
//!
//! - Native `.gitignore` support at all levels
//! - Custom `.movediffignore` file support
//! - Extra ignore patterns and a size limit from `[scanner]` config
//! - xxh3 content hash per file
//! - Files that fail to read or parse become unresolved entries

use ignore::WalkBuilder;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use xxhash_rust::xxh3::xxh3_64;

use crate::config::DiffConfig;
use crate::error::{DiffError, Result};
use crate::parser::{detect_language, TreeBuilder, TreeSitterBuilder};
use crate::snapshot::{Snapshot, SourceFile};

/// Per-directory ignore file honored next to `.gitignore`.
pub const IGNORE_FILE_NAME: &str = ".movediffignore";

/// Result of scanning a directory.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub snapshot: Snapshot,

    /// Files skipped for having no supported language.
    pub skipped_count: usize,

    /// Time taken for the scan in milliseconds.
    pub duration_ms: f64,
}

enum Outcome {
    Parsed(SourceFile),
    Unresolved { path: String, reason: String },
    Skipped,
}

/// Relative path with `/` separators, so snapshots of the same project on
/// different platforms pair by path.
fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn walk(root: &Path, config: &DiffConfig) -> Vec<PathBuf> {
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false) // Include hidden files, let gitignore handle it
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .max_filesize(config.max_file_size_bytes())
        .add_custom_ignore_filename(IGNORE_FILE_NAME);

    let mut overrides = ignore::overrides::OverrideBuilder::new(root);
    for pattern in config.ignore_patterns() {
        // The ! prefix turns an override glob into an exclusion
        if let Err(e) = overrides.add(&format!("!{}", pattern)) {
            tracing::warn!("Invalid ignore pattern '{}': {}", pattern, e);
        }
    }
    match overrides.build() {
        Ok(overrides) => {
            builder.overrides(overrides);
        }
        Err(e) => tracing::warn!("Ignoring scanner patterns: {}", e),
    }

    let mut files: Vec<PathBuf> = builder
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

fn scan_file(root: &Path, path: &Path, config: &DiffConfig, builder: &dyn TreeBuilder) -> Outcome {
    let Some(language) = detect_language(path) else {
        return Outcome::Skipped;
    };
    if !config.should_parse_language(language) {
        return Outcome::Skipped;
    }
    let rel_path = relative_path(root, path);

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            return Outcome::Unresolved {
                path: rel_path,
                reason: format!("Failed to read: {}", e),
            }
        }
    };
    let hash = xxh3_64(&bytes);
    let source = match String::from_utf8(bytes) {
        Ok(source) => source,
        Err(_) => {
            return Outcome::Unresolved {
                path: rel_path,
                reason: "File is not valid UTF-8".to_string(),
            }
        }
    };

    match builder.build(&rel_path, language, &source) {
        Ok(tree) => Outcome::Parsed(SourceFile::new(rel_path, language, tree).with_content_hash(hash)),
        Err(e) => Outcome::Unresolved {
            path: rel_path,
            reason: e.to_string(),
        },
    }
}

/// Scan a directory into a snapshot using the tree-sitter builder.
pub fn scan_snapshot(root: &Path, config: &DiffConfig) -> Result<ScanResult> {
    scan_snapshot_with(root, config, &TreeSitterBuilder::new())
}

/// Scan a directory into a snapshot with any [`TreeBuilder`].
pub fn scan_snapshot_with(
    root: &Path,
    config: &DiffConfig,
    builder: &dyn TreeBuilder,
) -> Result<ScanResult> {
    let start = Instant::now();
    if !root.is_dir() {
        return Err(DiffError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Not a directory: {}", root.display()),
        )));
    }

    let paths = walk(root, config);
    let outcomes: Vec<Outcome> = paths
        .par_iter()
        .map(|path| scan_file(root, path, config, builder))
        .collect();

    let mut result = ScanResult::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Parsed(file) => {
                result.snapshot.insert(file);
            }
            Outcome::Unresolved { path, reason } => {
                tracing::warn!("Unresolved file {}: {}", path, reason);
                result.snapshot.add_unresolved(path, reason);
            }
            Outcome::Skipped => result.skipped_count += 1,
        }
    }
    result.duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    tracing::info!(
        "Scanned {}: {} files, {} unresolved, {} skipped in {:.1}ms",
        root.display(),
        result.snapshot.len(),
        result.snapshot.unresolved().len(),
        result.skipped_count,
        result.duration_ms
    );
    Ok(result)
}
