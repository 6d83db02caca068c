use crate::fsutil::FileOpenError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open output: {0}")]
    Open(#[from] FileOpenError),
    #[error("failed to write record: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to flush output: {0}")]
    Flush(#[source] std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialize(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
