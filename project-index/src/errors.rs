use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("bm25 index error: {0}")]
    Bm25(#[from] bm25_index::Error),

    #[error("symbol graph error: {0}")]
    Graph(#[from] symbol_graph::Error),

    #[error("chunker error: {0}")]
    Chunker(#[from] code_indexer::Error),

    #[error("unsupported manifest version: found {found}, expected {expected}")]
    VersionMismatch { found: String, expected: String },

    #[error("no index found at {0}")]
    NotIndexed(std::path::PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
