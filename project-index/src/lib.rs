//! Filesystem scanning, the manifest document, and full/incremental
//! indexing over the Chunker, BM25 index, and Symbol Graph.

pub mod errors;
pub mod fs_scan;
pub mod indexer;
pub mod manifest;

pub use errors::{Error, Result};
pub use indexer::{IndexStats, LoadedIndex, ProjectIndexer};
pub use manifest::{FileEntry, Manifest};
