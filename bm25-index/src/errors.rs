use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bincode encode error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("unsupported index version: found {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
