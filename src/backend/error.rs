//! Backend client errors.

use axum::http::Method;
use thiserror::Error;

/// Errors returned by a [`BackendClient`](crate::backend::BackendClient).
///
/// HTTP error statuses are not errors; they come back as responses.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A mutating method was attempted on a read-only backend. No call was made.
    #[error("READONLY_VIOLATION: cannot {method} on read-only backend {backend}")]
    ReadOnlyViolation { backend: String, method: Method },

    /// The backend could not be reached after exhausting transport retries.
    #[error("TRANSPORT_ERROR: {backend} failed after {attempts} attempt(s): {source}")]
    Transport {
        backend: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// The rewritten request URL is not valid.
    #[error("invalid upstream url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build client for {backend}: {source}")]
    Build {
        backend: String,
        #[source]
        source: reqwest::Error,
    },

    /// The basic auth credential is not a valid header value.
    #[error("invalid auth credential: {0}")]
    InvalidCredential(String),

    /// Client certificate could not be loaded.
    #[error("TLS setup failed: {0}")]
    Tls(String),
}

impl BackendError {
    /// True for the read-only guard.
    pub fn is_read_only_violation(&self) -> bool {
        matches!(self, BackendError::ReadOnlyViolation { .. })
    }

    /// True when the backend was unreachable.
    pub fn is_transport(&self) -> bool {
        matches!(self, BackendError::Transport { .. })
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
