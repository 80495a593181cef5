use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Empty query")]
    EmptyQuery,

    #[error("Invalid hit payload: {0}")]
    InvalidHit(String),

    #[error("Executable is not present in the allowlist: {0}")]
    CommandNotAllowed(String),

    #[error("Search command exited with status {status}: {stderr}")]
    CommandFailed { status: i32, stderr: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
