//! Language identifiers and tree-sitter grammar lookup.

use std::path::Path;

use crate::error::{DiffError, Result};

/// Canonical identifiers of every language with a bundled grammar.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "python",
    "typescript",
    "tsx",
    "javascript",
    "go",
    "java",
    "rust",
    "csharp",
];

/// Map an identifier or alias to its canonical form.
pub fn normalize_language(language: &str) -> Option<&'static str> {
    match language.to_lowercase().as_str() {
        "python" | "py" => Some("python"),
        "typescript" | "ts" => Some("typescript"),
        "tsx" => Some("tsx"),
        "javascript" | "js" | "jsx" | "mjs" => Some("javascript"),
        "go" => Some("go"),
        "java" => Some("java"),
        "rust" | "rs" => Some("rust"),
        "csharp" | "cs" | "c#" => Some("csharp"),
        _ => None,
    }
}

/// Language detection from file extension.
pub fn detect_language(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    match ext.to_lowercase().as_str() {
        "py" | "pyw" | "pyi" => Some("python"),
        "js" | "mjs" | "cjs" | "jsx" => Some("javascript"),
        "ts" | "mts" | "cts" => Some("typescript"),
        "tsx" => Some("tsx"),
        "cs" => Some("csharp"),
        "go" => Some("go"),
        "rs" => Some("rust"),
        "java" => Some("java"),
        _ => None,
    }
}

pub fn is_supported(language: &str) -> bool {
    normalize_language(language).is_some()
}

/// Get the tree-sitter grammar for a language identifier.
pub fn tree_sitter_language(language: &str) -> Result<tree_sitter::Language> {
    match normalize_language(language) {
        Some("python") => Ok(tree_sitter_python::LANGUAGE.into()),
        Some("typescript") => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        Some("tsx") => Ok(tree_sitter_typescript::LANGUAGE_TSX.into()),
        Some("javascript") => Ok(tree_sitter_javascript::LANGUAGE.into()),
        Some("go") => Ok(tree_sitter_go::LANGUAGE.into()),
        Some("java") => Ok(tree_sitter_java::LANGUAGE.into()),
        Some("rust") => Ok(tree_sitter_rust::LANGUAGE.into()),
        Some("csharp") => Ok(tree_sitter_c_sharp::LANGUAGE.into()),
        _ => Err(DiffError::UnsupportedLanguage(language.to_string())),
    }
}
