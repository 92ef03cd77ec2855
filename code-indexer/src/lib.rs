//! Language-aware AST chunker and BM25 tokenizer.
//!
//! Splits source files into semantic [`Chunk`]s (functions, classes,
//! methods, SQL objects, or whole-module fallbacks) and their companion
//! [`SymbolInfo`] records, which the symbol graph consumes to build call
//! and inheritance edges.

pub mod chunker;
pub mod errors;
pub mod tokenizer;
pub mod types;

pub use chunker::{Chunker, MAX_CHUNK_LINES, MAX_FILE_SIZE};
pub use errors::{Error, Result};
pub use types::{Chunk, ChunkKind, SymbolInfo};
