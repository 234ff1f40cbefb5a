//! Error types for token persistence

/// Errors from token store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("token file parse error: {0}")]
    Parse(String),

    #[error("unsupported store backend: {0}")]
    UnknownBackend(String),
}

/// Result alias for token store operations.
pub type Result<T> = std::result::Result<T, Error>;
