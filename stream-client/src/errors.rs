use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("stream unauthorized; re-authenticate and retry")]
    Unauthorized,

    #[error("stream open failed with status {status}: {body}")]
    OpenFailed { status: u16, body: String },

    #[error("stream disconnected: {0}")]
    Disconnected(String),

    #[error("callback post failed: {0}")]
    CallbackFailed(String),

    #[error("tool execution error: {0}")]
    Tool(#[from] tool_executor::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
