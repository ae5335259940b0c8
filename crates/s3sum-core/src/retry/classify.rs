//! Classify HTTP statuses, S3 error codes and store errors into retry policy error kinds.

use crate::retry::error::StoreError;
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u16) -> ErrorKind {
    match code {
        404 => ErrorKind::NotFound,
        429 | 503 => ErrorKind::Throttled,
        408 => ErrorKind::Timeout,
        500..=599 => ErrorKind::Server(code),
        _ => ErrorKind::Other,
    }
}

/// Classify an S3 error code (`<Code>` element of an error response).
/// Returns `None` for codes that carry no retry signal of their own.
pub fn classify_error_code(code: &str) -> Option<ErrorKind> {
    match code {
        "SlowDown" | "Throttling" | "ThrottlingException" | "TooManyRequests"
        | "RequestLimitExceeded" => Some(ErrorKind::Throttled),
        "RequestTimeout" | "RequestTimeoutException" => Some(ErrorKind::Timeout),
        "InternalError" => Some(ErrorKind::Server(500)),
        "ServiceUnavailable" => Some(ErrorKind::Throttled),
        "NoSuchKey" | "NotFound" => Some(ErrorKind::NotFound),
        "AccessDenied" | "NoSuchBucket" | "InvalidAccessKeyId" | "SignatureDoesNotMatch"
        | "InvalidRequest" | "InvalidArgument" => Some(ErrorKind::Other),
        _ => None,
    }
}

/// Classify a store error into an ErrorKind.
pub fn classify(e: &StoreError) -> ErrorKind {
    match e {
        StoreError::NotFound { .. } => ErrorKind::NotFound,
        StoreError::Throttled(_) => ErrorKind::Throttled,
        StoreError::Timeout(_) => ErrorKind::Timeout,
        StoreError::Connection(_) => ErrorKind::Connection,
        StoreError::Server { status, .. } => ErrorKind::Server(*status),
        StoreError::Fatal(_) => ErrorKind::Other,
    }
}
