//! Deny-set filesystem scan, carried over verbatim from the reference
//! indexer's ignore lists so existing projects re-index identically.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const IGNORE_DIRS: &[&str] = &[
    ".git", ".svn", ".hg", "node_modules", "venv", ".venv", "env", ".env", "__pycache__",
    ".pytest_cache", ".mypy_cache", "vendor", "packages", "dist", "build", ".next", ".nuxt",
    "out", "target", "bin", "obj", ".idea", ".vscode", ".vs", ".tarang",
];

pub const IGNORE_PATTERNS: &[&str] = &[
    "*.pyc", "*.pyo", "*.so", "*.dylib", "*.egg-info", "*.egg", ".DS_Store", "Thumbs.db",
    "*.min.js", "*.min.css", "*.lock", "*.log", "package-lock.json", "yarn.lock",
    "pnpm-lock.yaml",
];

pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "py", "pyw", "js", "jsx", "ts", "tsx", "mjs", "cjs", "json", "yaml", "yml", "toml", "sql",
    "md", "txt",
];

fn matches_glob(name: &str, pattern: &str) -> bool {
    match pattern.strip_prefix('*') {
        Some(suffix) => name.ends_with(suffix),
        None => name == pattern,
    }
}

pub fn should_ignore_dir(name: &str) -> bool {
    IGNORE_DIRS.contains(&name)
}

pub fn should_ignore_file(name: &str) -> bool {
    IGNORE_PATTERNS.iter().any(|p| matches_glob(name, p))
}

pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Recursive walk from `root`: directories named in [`IGNORE_DIRS`] are
/// pruned (never descended into), files matching [`IGNORE_PATTERNS`] are
/// skipped, and only files with an extension in [`SUPPORTED_EXTENSIONS`]
/// are returned.
pub fn scan_project_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        !should_ignore_dir(&entry.file_name().to_string_lossy())
    });

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        if should_ignore_file(&entry.file_name().to_string_lossy()) {
            continue;
        }
        if is_supported_extension(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prunes_ignored_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("node_modules/dep.js"), "x").unwrap();
        std::fs::write(dir.path().join("main.py"), "x").unwrap();

        let files = scan_project_files(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.py"));
    }

    #[test]
    fn skips_lockfiles_and_compiled_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.pyc"), "x").unwrap();
        std::fs::write(dir.path().join("yarn.lock"), "x").unwrap();
        std::fs::write(dir.path().join("app.py"), "x").unwrap();

        let files = scan_project_files(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("app.py"));
    }
}
