//! Retry loop: run an async store call until success or policy says stop.

use std::future::Future;

use super::classify;
use super::error::StoreError;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs `f` until it succeeds or the retry policy says to stop.
/// On retryable failure, sleeps for the backoff duration then tries again.
/// `f` receives the 1-based attempt number. `op` labels the debug log lines.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    op: &str,
    mut f: F,
) -> Result<T, StoreError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(
                            op,
                            attempt,
                            delay_ms = d.as_millis() as u64,
                            error = %e,
                            "retrying after transient failure"
                        );
                        tokio::time::sleep(d).await;
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn succeeds_on_fifth_attempt() {
        let calls = AtomicU32::new(0);
        let res = run_with_retry(&fast_policy(), "test", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 5 {
                    Err(StoreError::Throttled("slow down".into()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(res, Ok(5));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn gives_up_after_five_attempts() {
        let calls = AtomicU32::new(0);
        let res: Result<(), _> = run_with_retry(&fast_policy(), "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Timeout("read".into())) }
        })
        .await;
        assert_eq!(res, Err(StoreError::Timeout("read".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn fatal_is_not_retried() {
        let calls = AtomicU32::new(0);
        let res: Result<(), _> = run_with_retry(&fast_policy(), "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Fatal("access denied".into())) }
        })
        .await;
        assert!(matches!(res, Err(StoreError::Fatal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let calls = AtomicU32::new(0);
        let res: Result<(), _> = run_with_retry(&fast_policy(), "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::not_found("a.dat")) }
        })
        .await;
        assert!(res.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
