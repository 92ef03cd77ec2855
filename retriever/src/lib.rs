//! Fuses the BM25 index and symbol graph into ranked, context-expanded
//! retrieval results.

pub mod retriever;

pub use retriever::{ExpandedSymbol, RetrievalResult, RetrievalStats, Retriever};
