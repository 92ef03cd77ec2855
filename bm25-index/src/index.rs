//! Hand-rolled Okapi BM25 over code chunks.
//!
//! `add_chunks`/`remove_chunks` do not attempt true incremental scoring —
//! they mutate the stored corpus and re-fit document frequencies and the
//! average document length from scratch, matching the reference's
//! rebuild-on-mutate contract.

use crate::errors::{Error, Result};
use code_indexer::Chunk;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

const DEFAULT_K1: f64 = 1.5;
const DEFAULT_B: f64 = 0.75;
const PERSIST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bm25Stats {
    pub total_chunks: usize,
    pub total_files: usize,
    pub chunk_types: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct Persisted {
    version: u32,
    k1: f64,
    b: f64,
    chunks: Vec<Chunk>,
}

/// Okapi BM25 index. Chunks are kept in insertion order so that zero-score
/// (and therefore filtered-out) ties have a stable, deterministic ordering
/// wherever that order leaks through (e.g. `get_chunks_for_file`).
pub struct Bm25Index {
    k1: f64,
    b: f64,
    chunks: Vec<Chunk>,
    id_position: HashMap<String, usize>,
    doc_freq: HashMap<String, usize>,
    avg_doc_len: f64,
}

impl Default for Bm25Index {
    fn default() -> Self {
        Self::new()
    }
}

impl Bm25Index {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_K1, DEFAULT_B)
    }

    pub fn with_params(k1: f64, b: f64) -> Self {
        Self {
            k1,
            b,
            chunks: Vec::new(),
            id_position: HashMap::new(),
            doc_freq: HashMap::new(),
            avg_doc_len: 0.0,
        }
    }

    pub fn build(chunks: Vec<Chunk>) -> Self {
        let mut index = Self::new();
        index.chunks = chunks;
        index.fit();
        index
    }

    fn fit(&mut self) {
        self.id_position.clear();
        self.doc_freq.clear();
        for (i, chunk) in self.chunks.iter().enumerate() {
            self.id_position.insert(chunk.id.clone(), i);
            let mut seen = HashSet::new();
            for term in &chunk.tokens {
                if seen.insert(term.as_str()) {
                    *self.doc_freq.entry(term.clone()).or_insert(0) += 1;
                }
            }
        }
        let total_len: usize = self.chunks.iter().map(|c| c.tokens.len()).sum();
        self.avg_doc_len = if self.chunks.is_empty() {
            0.0
        } else {
            total_len as f64 / self.chunks.len() as f64
        };
    }

    /// Replaces any existing chunk with the same id, appends the rest, then
    /// re-fits the whole index.
    pub fn add_chunks(&mut self, new_chunks: Vec<Chunk>) {
        for chunk in new_chunks {
            match self.id_position.get(&chunk.id) {
                Some(&pos) => self.chunks[pos] = chunk,
                None => self.chunks.push(chunk),
            }
        }
        self.fit();
    }

    /// Drops chunks by id, then re-fits.
    pub fn remove_chunks(&mut self, ids: &[String]) {
        let ids: HashSet<&str> = ids.iter().map(|s| s.as_str()).collect();
        self.chunks.retain(|c| !ids.contains(c.id.as_str()));
        self.fit();
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.chunks.len() as f64;
        let df = *self.doc_freq.get(term).unwrap_or(&0) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn score_chunk(&self, chunk: &Chunk, query_terms: &[String]) -> f64 {
        let doc_len = chunk.tokens.len() as f64;
        let mut tf: HashMap<&str, usize> = HashMap::new();
        for term in &chunk.tokens {
            *tf.entry(term.as_str()).or_insert(0) += 1;
        }
        let mut score = 0.0;
        for term in query_terms {
            let f = *tf.get(term.as_str()).unwrap_or(&0) as f64;
            if f == 0.0 {
                continue;
            }
            let idf = self.idf(term);
            let denom = f + self.k1 * (1.0 - self.b + self.b * doc_len / self.avg_doc_len.max(1e-9));
            score += idf * (f * (self.k1 + 1.0)) / denom;
        }
        score
    }

    /// Tokenizes the query with the shared tokenizer; an empty term list
    /// (e.g. an all-stop-word query) returns `[]` without scoring anything.
    /// Only strictly positive scores are kept, sorted descending, ties
    /// broken by stable corpus order.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        let terms = code_indexer::tokenizer::tokenize(query);
        if terms.is_empty() {
            return vec![];
        }
        let mut scored: Vec<(usize, f64)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, c)| (i, self.score_chunk(c, &terms)))
            .filter(|(_, s)| *s > 0.0)
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(top_k);
        scored
            .into_iter()
            .map(|(i, s)| SearchResult {
                chunk_id: self.chunks[i].id.clone(),
                score: s,
            })
            .collect()
    }

    pub fn get_chunk(&self, id: &str) -> Option<&Chunk> {
        self.id_position.get(id).map(|&i| &self.chunks[i])
    }

    pub fn get_chunks_for_file(&self, file: &str) -> Vec<&Chunk> {
        self.chunks.iter().filter(|c| c.file == file).collect()
    }

    pub fn stats(&self) -> Bm25Stats {
        let total_files = self.chunks.iter().map(|c| c.file.as_str()).collect::<HashSet<_>>().len();
        let mut chunk_types: HashMap<String, usize> = HashMap::new();
        for chunk in &self.chunks {
            *chunk_types.entry(chunk.kind.as_str().to_string()).or_insert(0) += 1;
        }
        Bm25Stats {
            total_chunks: self.chunks.len(),
            total_files,
            chunk_types,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let persisted = Persisted {
            version: PERSIST_VERSION,
            k1: self.k1,
            b: self.b,
            chunks: self.chunks.clone(),
        };
        let bytes = bincode::serialize(&persisted)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let persisted: Persisted = bincode::deserialize(&bytes)?;
        if persisted.version != PERSIST_VERSION {
            return Err(Error::VersionMismatch {
                found: persisted.version,
                expected: PERSIST_VERSION,
            });
        }
        let mut index = Self::with_params(persisted.k1, persisted.b);
        index.chunks = persisted.chunks;
        index.fit();
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_indexer::ChunkKind;

    fn chunk(id: &str, file: &str, content: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            file: file.to_string(),
            kind: ChunkKind::Function,
            name: id.to_string(),
            signature: format!("def {id}()"),
            content: content.to_string(),
            line_start: 1,
            line_end: 1,
            tokens: code_indexer::tokenizer::tokenize(content),
            parent: None,
        }
    }

    #[test]
    fn search_ranks_by_term_overlap() {
        let chunks = vec![
            chunk("a.py:f", "a.py", "def f(): return 1"),
            chunk("a.py:A.m", "a.py", "def m(self): return f()"),
            chunk("a.py:A", "a.py", "class A:\n    def m(self): ...\n"),
        ];
        let index = Bm25Index::build(chunks);
        let results = index.search("f", 10);
        let ids: Vec<_> = results.iter().map(|r| r.chunk_id.as_str()).collect();
        assert!(ids.contains(&"a.py:f"));
        assert!(ids.contains(&"a.py:A.m"));
        assert!(!ids.contains(&"a.py:A"));
    }

    #[test]
    fn empty_query_returns_empty() {
        let index = Bm25Index::build(vec![chunk("x", "x.py", "return value")]);
        assert!(index.search("the a an", 10).is_empty());
    }

    #[test]
    fn add_chunks_replaces_existing_id() {
        let mut index = Bm25Index::build(vec![chunk("x", "x.py", "original content")]);
        index.add_chunks(vec![chunk("x", "x.py", "replaced payload words")]);
        assert_eq!(index.stats().total_chunks, 1);
        assert!(index.get_chunk("x").unwrap().content.contains("replaced"));
    }

    #[test]
    fn remove_chunks_drops_by_id() {
        let mut index = Bm25Index::build(vec![
            chunk("a", "f.py", "alpha"),
            chunk("b", "f.py", "beta"),
        ]);
        index.remove_chunks(&["a".to_string()]);
        assert_eq!(index.stats().total_chunks, 1);
        assert!(index.get_chunk("a").is_none());
    }

    #[test]
    fn save_and_load_round_trip_scores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bm25.blob");
        let index = Bm25Index::build(vec![
            chunk("a", "f.py", "search keyword matching logic"),
            chunk("b", "f.py", "unrelated payload text"),
        ]);
        index.save(&path).unwrap();
        let loaded = Bm25Index::load(&path).unwrap();
        assert_eq!(index.search("keyword", 10).len(), loaded.search("keyword", 10).len());
    }
}
