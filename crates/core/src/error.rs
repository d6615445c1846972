//! Unified error types for url-metadata.
//!
//! Collaborator-level causes (timeouts, HTTP status, network failures) are
//! classified as transient or permanent so the orchestrator can decide
//! whether to retry. `Fetch` is what callers of `MetadataCache::get` see once
//! retries are exhausted.

use std::path::PathBuf;

use crate::config::ConfigError;

/// Result alias used throughout the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for url-metadata.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// URL could not be parsed or has an unsupported scheme.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Request timed out.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Remote answered with a non-success status.
    #[error("HTTP_ERROR: {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Connection-level failure (DNS, TLS, reset).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Remote service asked us to slow down (HTTP 429).
    #[error("RATE_LIMITED: {0}")]
    RateLimited(String),

    /// Content extraction failed.
    #[error("EXTRACT_FAILED: {0}")]
    ExtractFailed(String),

    /// The subtitle source does not cover this site family.
    #[error("NOT_SUPPORTED: {0}")]
    NotSupported(String),

    /// All attempts of an external call failed.
    #[error("FETCH_ERROR: {url}: {cause}")]
    Fetch { url: String, cause: Box<Error> },

    /// A populated shard holds a file that cannot be parsed.
    #[error("CACHE_CORRUPTION: {}: {reason}", path.display())]
    CacheCorruption { path: PathBuf, reason: String },

    /// Filesystem operation failed.
    #[error("CACHE_ERROR: {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Wrap an `io::Error` with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Timeouts, connection failures, rate limiting, 429 and 5xx responses
    /// are transient. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::FetchTimeout(_) | Error::Network(_) | Error::RateLimited(_) => true,
            Error::HttpStatus { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}
