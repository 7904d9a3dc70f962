//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Store backend name is not recognised.
    #[error("unknown store backend '{value}': expected 'mongo' or 'memory'")]
    InvalidStoreBackend { value: String },

    /// Key strategy name is not recognised.
    #[error("unknown key strategy '{value}': expected 'failover' or 'round-robin'")]
    InvalidKeyStrategy { value: String },

    /// MongoDB connection string does not use a MongoDB scheme.
    #[error("invalid MongoDB URI '{value}': must start with mongodb:// or mongodb+srv://")]
    InvalidMongoUri { value: String },

    /// An upstream base URL could not be parsed.
    #[error("invalid URL in {name} '{value}': {source}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    /// The admin script command prefix is empty.
    #[error("admin script command must not be empty")]
    EmptyScriptCommand,

    /// Specified path does not exist on the filesystem.
    #[error("path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

