use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("path '{0}' escapes the project root")]
    PathEscape(String),

    #[error("file too large: {0}")]
    FileTooLarge(String),

    #[error("no search term provided")]
    EmptySearch,

    #[error("search and replace are identical; no-op edit rejected")]
    Stagnation,

    #[error("search text not found in file; re-read the file and try again")]
    SearchNotFound,

    #[error("project is not indexed")]
    NotIndexed,

    #[error("retrieval failed: {0}")]
    Retrieval(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

pub type Result<T> = std::result::Result<T, Error>;
