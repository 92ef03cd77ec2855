//! Ties the Chunker, BM25 index, and Symbol Graph into a full or incremental
//! build, owning the on-disk `<project>/.tarang/index/` directory.

use crate::errors::Result;
use crate::fs_scan::scan_project_files;
use crate::manifest::{FileEntry, Manifest};
use bm25_index::Bm25Index;
use code_indexer::{Chunk, Chunker};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use symbol_graph::SymbolGraph;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub files_scanned: usize,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub files_updated: usize,
    pub chunks_created: usize,
    pub symbols_created: usize,
    pub edges_created: usize,
    pub duration_ms: u128,
    pub errors: Vec<String>,
}

/// The three artifacts loaded back out of a built index, handed to the
/// Retriever by the caller (kept out of this crate to avoid a dependency
/// cycle between `project-index` and `retriever`).
pub struct LoadedIndex {
    pub manifest: Manifest,
    pub bm25: Bm25Index,
    pub graph: SymbolGraph,
}

pub struct ProjectIndexer {
    root: PathBuf,
    index_dir: PathBuf,
    manifest_path: PathBuf,
    bm25_path: PathBuf,
    graph_path: PathBuf,
    chunker: Chunker,
}

impl ProjectIndexer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let index_dir = root.join(".tarang").join("index");
        Self {
            manifest_path: index_dir.join("manifest.json"),
            bm25_path: index_dir.join("bm25.blob"),
            graph_path: index_dir.join("graph.json"),
            index_dir,
            root,
            chunker: Chunker::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.manifest_path.is_file()
    }

    fn hash_file(path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }

    fn mtime(path: &Path) -> i64 {
        std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    fn rel_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Recomputes hashes for every manifest entry without touching the
    /// graph; any hash mismatch or now-missing file makes the index stale.
    pub fn is_stale(&self) -> Result<bool> {
        let manifest = match Manifest::load(&self.manifest_path) {
            Ok(m) => m,
            Err(_) => return Ok(true),
        };
        for (rel, entry) in &manifest.files {
            let path = self.root.join(rel);
            if !path.is_file() {
                return Ok(true);
            }
            if Self::hash_file(&path)? != entry.hash {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn persist_all(&self, manifest: &Manifest, bm25: &Bm25Index, graph: &SymbolGraph) -> Result<()> {
        std::fs::create_dir_all(&self.index_dir)?;

        // bm25 and graph write first; the manifest (the "index exists" flag
        // readers key off of) is renamed into place last, so a crash mid-write
        // never leaves a manifest pointing at a half-written index.
        let bm25_tmp = self.index_dir.join("bm25.blob.tmp");
        bm25.save(&bm25_tmp)?;
        std::fs::rename(&bm25_tmp, &self.bm25_path)?;

        let graph_tmp = self.index_dir.join("graph.json.tmp");
        graph.save(&graph_tmp)?;
        std::fs::rename(&graph_tmp, &self.graph_path)?;

        let manifest_tmp = self.index_dir.join("manifest.json.tmp");
        manifest.save(&manifest_tmp)?;
        std::fs::rename(&manifest_tmp, &self.manifest_path)?;
        Ok(())
    }

    pub fn build(&mut self) -> Result<IndexStats> {
        let start = std::time::Instant::now();
        std::fs::create_dir_all(&self.index_dir)?;

        let files = scan_project_files(&self.root);
        let mut manifest = Manifest::new(now_iso8601());
        let mut all_chunks: Vec<Chunk> = Vec::new();
        let mut graph = SymbolGraph::new();
        let mut stats = IndexStats {
            files_scanned: files.len(),
            ..Default::default()
        };

        for path in &files {
            let rel = self.rel_path(path);
            let (chunks, symbols) = match self.chunker.chunk_file(path, &self.root) {
                Ok(out) => out,
                Err(e) => {
                    tracing::warn!(file = %rel, error = %e, "chunking failed, skipping file");
                    stats.errors.push(format!("{rel}: {e}"));
                    stats.files_skipped += 1;
                    continue;
                }
            };
            if chunks.is_empty() {
                stats.files_skipped += 1;
                continue;
            }

            let chunk_ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
            let symbol_ids: Vec<String> = symbols.iter().map(|s| s.id.clone()).collect();
            for symbol in &symbols {
                graph.add_symbol(symbol);
            }
            stats.chunks_created += chunks.len();
            stats.symbols_created += symbols.len();
            all_chunks.extend(chunks);

            manifest.files.insert(
                rel,
                FileEntry {
                    hash: Self::hash_file(path)?,
                    mtime: Self::mtime(path),
                    chunks: chunk_ids,
                    symbols: symbol_ids,
                },
            );
            stats.files_indexed += 1;
        }

        let bm25 = Bm25Index::build(all_chunks);
        stats.edges_created = graph.stats().total_edges;

        self.persist_all(&manifest, &bm25, &graph)?;
        stats.duration_ms = start.elapsed().as_millis();
        Ok(stats)
    }

    /// Loads the existing manifest + BM25 + graph, diffs the current
    /// filesystem state against the manifest, re-chunks only changed files,
    /// and removes deleted ones. Falls back to a full [`build`] if the
    /// manifest or BM25 blob is missing, unreadable, or version-mismatched.
    pub fn update(&mut self) -> Result<IndexStats> {
        let start = std::time::Instant::now();
        let mut manifest = match Manifest::load(&self.manifest_path) {
            Ok(m) => m,
            Err(_) => return self.build(),
        };
        let mut bm25 = match Bm25Index::load(&self.bm25_path) {
            Ok(b) => b,
            Err(_) => return self.build(),
        };
        let mut graph = SymbolGraph::load(&self.graph_path).unwrap_or_default();

        let mut stats = IndexStats::default();
        let current_files = scan_project_files(&self.root);
        let current_rel: HashSet<String> = current_files.iter().map(|p| self.rel_path(p)).collect();
        stats.files_scanned = current_files.len();

        let deleted: Vec<String> = manifest
            .files
            .keys()
            .filter(|rel| !current_rel.contains(*rel))
            .cloned()
            .collect();
        for rel in deleted {
            if let Some(entry) = manifest.files.remove(&rel) {
                graph.remove_file(&rel);
                bm25.remove_chunks(&entry.chunks);
                stats.files_updated += 1;
            }
        }

        for path in &current_files {
            let rel = self.rel_path(path);
            let hash = Self::hash_file(path)?;
            let changed = manifest.files.get(&rel).map(|e| e.hash != hash).unwrap_or(true);
            if !changed {
                continue;
            }

            if let Some(old) = manifest.files.remove(&rel) {
                bm25.remove_chunks(&old.chunks);
                graph.remove_file(&rel);
            }

            let (chunks, symbols) = match self.chunker.chunk_file(path, &self.root) {
                Ok(out) => out,
                Err(e) => {
                    tracing::warn!(file = %rel, error = %e, "chunking failed during update, skipping file");
                    stats.errors.push(format!("{rel}: {e}"));
                    continue;
                }
            };
            if chunks.is_empty() {
                continue;
            }

            let chunk_ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
            let symbol_ids: Vec<String> = symbols.iter().map(|s| s.id.clone()).collect();
            for symbol in &symbols {
                graph.add_symbol(symbol);
            }
            stats.chunks_created += chunks.len();
            stats.symbols_created += symbols.len();
            bm25.add_chunks(chunks);

            manifest.files.insert(
                rel,
                FileEntry {
                    hash,
                    mtime: Self::mtime(path),
                    chunks: chunk_ids,
                    symbols: symbol_ids,
                },
            );
            stats.files_updated += 1;
        }

        manifest.indexed_at = now_iso8601();
        stats.edges_created = graph.stats().total_edges;
        self.persist_all(&manifest, &bm25, &graph)?;
        stats.duration_ms = start.elapsed().as_millis();
        Ok(stats)
    }

    pub fn load(&self) -> Result<LoadedIndex> {
        Ok(LoadedIndex {
            manifest: Manifest::load(&self.manifest_path)?,
            bm25: Bm25Index::load(&self.bm25_path)?,
            graph: SymbolGraph::load(&self.graph_path).unwrap_or_default(),
        })
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let loaded = self.load()?;
        Ok(IndexStats {
            files_scanned: loaded.manifest.files.len(),
            files_indexed: loaded.manifest.files.len(),
            chunks_created: loaded.bm25.stats().total_chunks,
            symbols_created: loaded.graph.stats().total_symbols,
            edges_created: loaded.graph.stats().total_edges,
            ..Default::default()
        })
    }
}

fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_is_stale_detects_edit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "def f(): return 1\n").unwrap();

        let mut indexer = ProjectIndexer::new(dir.path());
        let stats = indexer.build().unwrap();
        assert_eq!(stats.files_indexed, 1);
        assert!(!indexer.is_stale().unwrap());

        std::fs::write(dir.path().join("a.py"), "def f(): return 2\n").unwrap();
        assert!(indexer.is_stale().unwrap());
    }

    #[test]
    fn update_after_delete_drops_manifest_entry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "def f(): return 1\n").unwrap();

        let mut indexer = ProjectIndexer::new(dir.path());
        indexer.build().unwrap();

        std::fs::remove_file(dir.path().join("a.py")).unwrap();
        let stats = indexer.update().unwrap();
        assert_eq!(stats.files_updated, 1);

        let loaded = indexer.load().unwrap();
        assert!(!loaded.manifest.files.contains_key("a.py"));
    }

    #[test]
    fn update_on_unchanged_body_keeps_chunk_count_but_changes_hash() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "def f(): return 1\n").unwrap();

        let mut indexer = ProjectIndexer::new(dir.path());
        indexer.build().unwrap();
        let before = indexer.load().unwrap();
        let before_hash = before.manifest.files["a.py"].hash.clone();
        let before_total = before.bm25.stats().total_chunks;

        std::fs::write(dir.path().join("a.py"), "def f(): return 2\n").unwrap();
        indexer.update().unwrap();

        let after = indexer.load().unwrap();
        assert_ne!(after.manifest.files["a.py"].hash, before_hash);
        assert_eq!(after.bm25.stats().total_chunks, before_total);
    }
}
