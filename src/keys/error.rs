use thiserror::Error;

/// Classified provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    /// Rate limit or quota exhausted (429, `RESOURCE_EXHAUSTED`).
    RateLimited,
    /// Credential rejected (401, 403, invalid key).
    Unauthorized,
    /// Connection, DNS or timeout failure.
    Network,
    /// The request itself was rejected.
    Invalid,
    /// Anything else.
    Other,
}

impl ProviderErrorKind {
    /// Stable label stored in `recentErrors[].errorType`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::RateLimited => "RateLimited",
            ProviderErrorKind::Unauthorized => "Unauthorized",
            ProviderErrorKind::Network => "Network",
            ProviderErrorKind::Invalid => "Invalid",
            ProviderErrorKind::Other => "Other",
        }
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a [`super::TextStreamProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    /// Classification.
    pub kind: ProviderErrorKind,
    /// Provider message.
    pub message: String,
}

impl ProviderError {
    /// Creates an error of an explicit kind.
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classifies a raw provider message.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        let kind = if has(&["429", "quota", "resource exhausted", "resource_exhausted", "rate limit"]) {
            ProviderErrorKind::RateLimited
        } else if has(&[
            "401",
            "403",
            "permission",
            "api key not valid",
            "api_key_invalid",
            "unauthenticated",
        ]) {
            ProviderErrorKind::Unauthorized
        } else if has(&["fetch failed", "connection", "timed out", "timeout", "dns"]) {
            ProviderErrorKind::Network
        } else if has(&["400", "invalid argument", "invalid_argument"]) {
            ProviderErrorKind::Invalid
        } else {
            ProviderErrorKind::Other
        };

        Self { kind, message }
    }

    /// Returns `true` if another credential may succeed where this one failed.
    pub fn retriable(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::RateLimited
                | ProviderErrorKind::Unauthorized
                | ProviderErrorKind::Network
        )
    }
}

/// Errors raised by a [`super::KeyStatusStore`].
#[derive(Debug, Error)]
pub enum KeyStatusError {
    /// The database rejected the operation or could not be reached.
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    /// A stored document could not be converted.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backend is unavailable.
    #[error("key status store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by [`super::KeyRotator::stream_generate`].
#[derive(Debug, Error)]
pub enum KeyRotationError {
    /// The environment's key pool is empty.
    #[error("no API keys configured for environment '{env_type}'")]
    NoKeysConfigured {
        /// Active environment type.
        env_type: String,
    },

    /// Every configured key is degraded and cooling down.
    #[error("all {configured} API keys are cooling down")]
    NoKeysAvailable {
        /// Number of configured keys.
        configured: usize,
    },

    /// Every available key was tried and failed with a retriable error.
    #[error("all {attempted} API keys failed; last error: {last_error}")]
    AllKeysExhausted {
        /// Number of keys tried.
        attempted: usize,
        /// Error from the last key tried.
        last_error: ProviderError,
    },

    /// A non-retriable error stopped the request.
    #[error("request aborted on key {identifier}: {source}")]
    Aborted {
        /// Key that produced the error.
        identifier: String,
        /// Provider error.
        #[source]
        source: ProviderError,
    },
}
