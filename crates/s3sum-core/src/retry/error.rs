//! Object-store error type used for retry classification.

use thiserror::Error;

/// Error returned by a single object-store call.
///
/// Transports map their native failures into these variants so the retry
/// policy can decide without knowing the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The object does not exist. Never retried.
    #[error("not found: {key}")]
    NotFound { key: String },
    /// Provider asked us to slow down (429, 503, `SlowDown`).
    #[error("throttled: {0}")]
    Throttled(String),
    /// Connect, read or operation timeout.
    #[error("timed out: {0}")]
    Timeout(String),
    /// Network-level failure (reset, refused, DNS, truncated response).
    #[error("connection failure: {0}")]
    Connection(String),
    /// 5xx from the provider.
    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },
    /// Auth failures, malformed requests and other non-retryable errors.
    #[error("{0}")]
    Fatal(String),
}

impl StoreError {
    pub fn not_found(key: impl Into<String>) -> Self {
        StoreError::NotFound { key: key.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
