use thiserror::Error;

/// Errors raised while calling an upstream service.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// A configured base URL (or a URL built from it) is malformed.
    #[error("invalid upstream URL '{value}': {source}")]
    InvalidUrl {
        /// The offending value.
        value: String,
        /// Underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// Upstream answered with a non-success status.
    #[error("upstream returned {status} for {url}")]
    Status {
        /// HTTP status returned.
        status: reqwest::StatusCode,
        /// Requested URL.
        url: String,
    },

    /// Connection, TLS or body transfer failure.
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The body could not be decoded as the expected format.
    #[error("failed to decode upstream response from {url}: {reason}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Decoder message.
        reason: String,
    },
}

/// Result alias for upstream calls.
pub type UpstreamResult<T> = Result<T, UpstreamError>;
