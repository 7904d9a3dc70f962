use thiserror::Error;

/// Errors raised by cache store backends.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The database rejected the operation or could not be reached.
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    /// A stored document could not be converted to or from a [`super::CacheEntry`].
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backend is unavailable (used by test doubles and connection checks).
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for cache store operations.
pub type CacheResult<T> = Result<T, CacheError>;
