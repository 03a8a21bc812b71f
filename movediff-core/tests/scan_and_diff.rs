//! End-to-end tests: scan real source directories, then diff them.
//!
//! Uses tempfile for isolated project directories.

use movediff_core::scanner::scan_snapshot;
use movediff_core::{diff, ActionKind, DiffConfig, FileStatus};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

fn write_project(dir: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = dir.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("Failed to create directory");
        }
        fs::write(full, content).expect("Failed to write source file");
    }
}

fn make_versions(before: &[(&str, &str)], after: &[(&str, &str)]) -> (TempDir, TempDir) {
    let (a, b) = (TempDir::new().unwrap(), TempDir::new().unwrap());
    write_project(a.path(), before);
    write_project(b.path(), after);
    (a, b)
}

// ============================================================================
// Java
// ============================================================================

#[test]
fn test_java_method_moved_to_other_class() {
    let (before, after) = make_versions(
        &[
            (
                "src/A.java",
                "class A {\n    void foo() {\n        x = 1;\n    }\n\n    void keep() {\n        y();\n    }\n}\n",
            ),
            ("src/B.java", "class B {\n    void bar() {\n        z();\n    }\n}\n"),
        ],
        &[
            ("src/A.java", "class A {\n    void keep() {\n        y();\n    }\n}\n"),
            (
                "src/B.java",
                "class B {\n    void bar() {\n        z();\n    }\n\n    void foo() {\n        x = 1;\n    }\n}\n",
            ),
        ],
    );
    let config = DiffConfig::default();
    let source = scan_snapshot(before.path(), &config).unwrap().snapshot;
    let destination = scan_snapshot(after.path(), &config).unwrap().snapshot;

    let result = diff(&source, &destination).unwrap();

    let a = result.file("src/A.java").unwrap();
    let b = result.file("src/B.java").unwrap();
    assert_eq!(a.count(ActionKind::MoveOut), 1);
    assert_eq!(b.count(ActionKind::MoveIn), 1);
    assert_eq!(result.summary.updates, 0);
    assert_eq!(result.summary.inserts, 0);
    assert_eq!(result.summary.deletes, 0);
}

#[test]
fn test_unchanged_project_has_no_actions() {
    let files = [
        ("app/main.py", "def main():\n    run(1, 2)\n\n\ndef run(a, b):\n    return a + b\n"),
        ("lib/util.go", "package util\n\nfunc Add(a int, b int) int {\n\treturn a + b\n}\n"),
    ];
    let (before, after) = make_versions(&files, &files);
    let config = DiffConfig::default();
    let source = scan_snapshot(before.path(), &config).unwrap().snapshot;
    let destination = scan_snapshot(after.path(), &config).unwrap().snapshot;

    let result = diff(&source, &destination).unwrap();
    assert_eq!(result.files.len(), 2);
    assert!(!result.has_changes());
}

#[test]
fn test_broken_file_becomes_diagnostic() {
    let (before, after) = make_versions(
        &[("m.py", "def f():\n    return 1\n")],
        &[
            ("m.py", "def f():\n    return 1\n"),
            ("bad.py", "def g(:\n    pass\n"),
        ],
    );
    let config = DiffConfig::default();
    let source = scan_snapshot(before.path(), &config).unwrap().snapshot;
    let destination = scan_snapshot(after.path(), &config).unwrap().snapshot;

    let result = diff(&source, &destination).unwrap();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].path, "bad.py");
    assert_eq!(result.file("m.py").unwrap().status, FileStatus::Unchanged);
}
