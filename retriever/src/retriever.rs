//! Fuses BM25 lexical recall with one level of symbol-graph structural
//! context: full code for direct hits, signatures-only for their neighbors.

use bm25_index::Bm25Index;
use code_indexer::Chunk;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use symbol_graph::SymbolGraph;

/// How many BM25 hits to pull before filtering by exact name in
/// `retrieve_symbol` — generous enough that an exact match ranked outside
/// the top few by term overlap is still found.
const SYMBOL_SEARCH_POOL: usize = 20;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalStats {
    pub bm25_hits: usize,
    pub expanded_symbols: usize,
    pub total_chunks: usize,
    pub total_signatures: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandedSymbol {
    pub id: String,
    pub name: String,
    pub signature: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunks: Vec<Chunk>,
    pub signatures: Vec<ExpandedSymbol>,
    pub graph_context: HashMap<String, HashMap<String, Vec<String>>>,
    pub stats: RetrievalStats,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn total_lines(&self) -> usize {
        self.chunks
            .iter()
            .map(|c| c.line_end.saturating_sub(c.line_start) + 1)
            .sum()
    }

    pub fn to_context_dict(&self) -> Value {
        json!({
            "chunks": self.chunks,
            "signatures": self.signatures,
            "graph_context": self.graph_context,
            "stats": self.stats,
        })
    }
}

pub struct Retriever {
    bm25: Bm25Index,
    graph: SymbolGraph,
}

impl Retriever {
    pub fn new(bm25: Bm25Index, graph: SymbolGraph) -> Self {
        Self { bm25, graph }
    }

    fn expand(&self, seed_ids: &[String], hops: usize, max_signatures: usize) -> Vec<ExpandedSymbol> {
        let seed_set: HashSet<&str> = seed_ids.iter().map(|s| s.as_str()).collect();
        let mut discovered = Vec::new();
        let mut discovered_ids = HashSet::new();

        'outer: for id in seed_ids {
            for neighbor_id in self.graph.get_neighbors(id, hops, None) {
                if seed_set.contains(neighbor_id.as_str()) || discovered_ids.contains(&neighbor_id) {
                    continue;
                }
                let Some(node) = self.graph.get_node(&neighbor_id) else {
                    continue;
                };
                discovered.push(ExpandedSymbol {
                    id: neighbor_id.clone(),
                    name: node.name.clone(),
                    signature: node.signature.clone(),
                });
                discovered_ids.insert(neighbor_id);
                if discovered.len() >= max_signatures {
                    break 'outer;
                }
            }
        }
        discovered
    }

    fn build_result(
        &self,
        chunks: Vec<Chunk>,
        bm25_hits: usize,
        hops: usize,
        max_signatures: usize,
    ) -> RetrievalResult {
        if chunks.is_empty() {
            return RetrievalResult::default();
        }

        let seed_ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
        let signatures = if hops >= 1 {
            self.expand(&seed_ids, hops, max_signatures)
        } else {
            Vec::new()
        };

        let mut context_ids = seed_ids;
        context_ids.extend(signatures.iter().map(|s| s.id.clone()));
        let graph_context = self.graph.get_graph_context(&context_ids);

        RetrievalResult {
            stats: RetrievalStats {
                bm25_hits,
                expanded_symbols: signatures.len(),
                total_chunks: chunks.len(),
                total_signatures: signatures.len(),
            },
            chunks,
            signatures,
            graph_context,
        }
    }

    /// BM25 top-k, expanded `hops` levels through the graph. Empty BM25
    /// results short-circuit to an empty result with zeroed stats.
    pub fn retrieve(&self, query: &str, hops: usize, max_chunks: usize, max_signatures: usize) -> RetrievalResult {
        let hits = self.bm25.search(query, max_chunks);
        let chunks: Vec<Chunk> = hits
            .iter()
            .filter_map(|h| self.bm25.get_chunk(&h.chunk_id))
            .cloned()
            .collect();
        self.build_result(chunks, hits.len(), hops, max_signatures)
    }

    pub fn retrieve_for_file(&self, path: &str, hops: usize, max_signatures: usize) -> RetrievalResult {
        let chunks: Vec<Chunk> = self.bm25.get_chunks_for_file(path).into_iter().cloned().collect();
        let count = chunks.len();
        self.build_result(chunks, count, hops, max_signatures)
    }

    /// Exact (case-insensitive) name match among a pool of BM25 hits for
    /// `name`; falls back to the top 3 hits if nothing matches exactly.
    pub fn retrieve_symbol(&self, name: &str, hops: usize, max_signatures: usize) -> RetrievalResult {
        let hits = self.bm25.search(name, SYMBOL_SEARCH_POOL);
        let lower = name.to_lowercase();
        let mut chunks: Vec<Chunk> = hits
            .iter()
            .filter_map(|h| self.bm25.get_chunk(&h.chunk_id))
            .filter(|c| c.name.to_lowercase() == lower)
            .cloned()
            .collect();
        if chunks.is_empty() {
            chunks = hits
                .iter()
                .take(3)
                .filter_map(|h| self.bm25.get_chunk(&h.chunk_id))
                .cloned()
                .collect();
        }
        let count = chunks.len();
        self.build_result(chunks, count, hops, max_signatures)
    }

    pub fn get_callers(&self, id: &str) -> Vec<String> {
        self.graph.get_callers(id)
    }

    pub fn get_callees(&self, id: &str) -> Vec<String> {
        self.graph.get_callees(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_indexer::ChunkKind;
    use symbol_graph::SymbolGraph as Graph;

    fn chunk(id: &str, name: &str, content: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            file: "a.py".to_string(),
            kind: ChunkKind::Function,
            name: name.to_string(),
            signature: format!("def {name}()"),
            content: content.to_string(),
            line_start: 1,
            line_end: 1,
            tokens: code_indexer::tokenizer::tokenize(content),
            parent: None,
        }
    }

    fn symbol(id: &str, name: &str, calls: Vec<&str>) -> code_indexer::SymbolInfo {
        code_indexer::SymbolInfo {
            id: id.to_string(),
            name: name.to_string(),
            kind: "function".to_string(),
            file: "a.py".to_string(),
            line: 1,
            signature: format!("def {name}()"),
            calls: calls.into_iter().map(String::from).collect(),
            ..Default::default()
        }
    }

    fn build() -> Retriever {
        let chunks = vec![
            chunk("a.py:helper", "helper", "def helper(): return 1"),
            chunk("a.py:fetch", "fetchData", "def fetchData(): return helper()"),
        ];
        let bm25 = Bm25Index::build(chunks);
        let mut graph = Graph::new();
        graph.add_symbol(&symbol("a.py:helper", "helper", vec![]));
        graph.add_symbol(&symbol("a.py:fetch", "fetchData", vec!["helper"]));
        Retriever::new(bm25, graph)
    }

    #[test]
    fn retrieve_expands_one_hop_neighbors() {
        let retriever = build();
        let result = retriever.retrieve("fetchData", 1, 10, 10);
        assert!(!result.is_empty());
        let ids: Vec<_> = result.signatures.iter().map(|s| s.id.as_str()).collect();
        assert!(ids.contains(&"a.py:helper"));
    }

    #[test]
    fn retrieve_with_no_hits_is_empty() {
        let retriever = build();
        let result = retriever.retrieve("the a an", 1, 10, 10);
        assert!(result.is_empty());
        assert_eq!(result.stats.bm25_hits, 0);
    }

    #[test]
    fn retrieve_symbol_falls_back_to_top_hits_when_no_exact_match() {
        let retriever = build();
        let result = retriever.retrieve_symbol("fetch", 0, 5);
        assert!(!result.is_empty());
        assert_ne!(result.chunks[0].name.to_lowercase(), "fetch");
    }
}
