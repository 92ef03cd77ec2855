//! The versioned, stable-schema manifest document: a map from repo-relative
//! path to content hash, mtime, and the chunk/symbol ids it owns.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const MANIFEST_VERSION: &str = "1.0";
pub const TARANG_VERSION: &str = "3.6.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub hash: String,
    pub mtime: i64,
    pub chunks: Vec<String>,
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub indexed_at: String,
    pub tarang_version: String,
    pub files: HashMap<String, FileEntry>,
}

impl Manifest {
    pub fn new(indexed_at: String) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            indexed_at,
            tarang_version: TARANG_VERSION.to_string(),
            files: HashMap::new(),
        }
    }

    pub fn is_current_version(&self) -> bool {
        self.version == MANIFEST_VERSION
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// A mismatched version is reported as an error rather than silently
    /// treated as valid; callers that want "absent means rebuild" semantics
    /// should match on `Error::VersionMismatch` themselves.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let manifest: Manifest = serde_json::from_str(&text)?;
        if !manifest.is_current_version() {
            return Err(Error::VersionMismatch {
                found: manifest.version,
                expected: MANIFEST_VERSION.to_string(),
            });
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let mut manifest = Manifest::new("2026-01-01T00:00:00Z".to_string());
        manifest.files.insert(
            "a.py".to_string(),
            FileEntry {
                hash: "abc123".to_string(),
                mtime: 0,
                chunks: vec!["a.py:f".to_string()],
                symbols: vec!["a.py:f".to_string()],
            },
        );
        manifest.save(&path).unwrap();
        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded.files.len(), 1);
        assert_eq!(loaded.files["a.py"].hash, "abc123");
    }
}
