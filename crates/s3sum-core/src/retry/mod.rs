//! Retry and backoff policy for object-store calls.
//!
//! This module encapsulates error classification (timeouts, throttling,
//! connection failures, server errors) and exponential backoff decisions so
//! that every store operation shares one consistent policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_error_code, classify_http_status};
pub use error::StoreError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
