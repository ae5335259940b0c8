use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::RetryConfig;

/// High-level classification of an error for retry purposes.
///
/// Transports map HTTP status codes, provider error codes or IO failures
/// into these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read/overall).
    Timeout,
    /// Provider asked us to slow down (e.g. 429, 503, `SlowDown`).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// 5xx that is retryable but not strictly throttling.
    Server(u16),
    /// Object absent. Drives skip-vs-process branching, never retried.
    NotFound,
    /// Any other error (auth, malformed request). Not retried.
    Other,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::Throttled | ErrorKind::Connection | ErrorKind::Server(_)
        )
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with caps.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay (multiplier) for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
        }
    }
}

impl TryFrom<&RetryConfig> for RetryPolicy {
    type Error = anyhow::Error;

    fn try_from(cfg: &RetryConfig) -> Result<Self> {
        if cfg.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        let base_delay = match Duration::try_from_secs_f64(cfg.base_delay_secs) {
            Ok(d) => d,
            Err(_) => bail!(
                "retry.base_delay_secs must be a non-negative number of seconds, got {}",
                cfg.base_delay_secs
            ),
        };
        Ok(Self {
            max_attempts: cfg.max_attempts,
            base_delay,
            max_delay: Duration::from_secs(cfg.max_delay_secs),
        })
    }
}

impl RetryPolicy {
    /// Compute the next backoff delay for a given attempt and error kind.
    ///
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when we should stop retrying.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts || !kind.is_retryable() {
            return RetryDecision::NoRetry;
        }
        // base * 2^(attempt-1), capped.
        let exp = 1u32 << attempt.saturating_sub(1).min(16);
        let raw = self.base_delay.saturating_mul(exp);
        RetryDecision::RetryAfter(raw.min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delay(p: &RetryPolicy, attempt: u32) -> Duration {
        match p.decide(attempt, ErrorKind::Timeout) {
            RetryDecision::RetryAfter(d) => d,
            RetryDecision::NoRetry => panic!("expected retry at attempt {}", attempt),
        }
    }

    #[test]
    fn no_retry_for_other_or_not_found() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(1, ErrorKind::Other), RetryDecision::NoRetry);
        assert_eq!(p.decide(1, ErrorKind::NotFound), RetryDecision::NoRetry);
    }

    #[test]
    fn default_backoff_doubles_from_one_second() {
        let p = RetryPolicy::default();
        assert_eq!(delay(&p, 1), Duration::from_secs(1));
        assert_eq!(delay(&p, 2), Duration::from_secs(2));
        assert_eq!(delay(&p, 3), Duration::from_secs(4));
        assert_eq!(delay(&p, 4), Duration::from_secs(8));
    }

    #[test]
    fn backoff_is_capped() {
        let mut p = RetryPolicy::default();
        // Allow many attempts so we can observe capping behaviour.
        p.max_attempts = 40;
        assert_eq!(delay(&p, 5), Duration::from_secs(16));
        assert_eq!(delay(&p, 6), Duration::from_secs(16));
        assert_eq!(delay(&p, 35), Duration::from_secs(16));
    }

    #[test]
    fn respects_max_attempts() {
        let mut p = RetryPolicy::default();
        p.max_attempts = 3;
        assert!(matches!(
            p.decide(1, ErrorKind::Throttled),
            RetryDecision::RetryAfter(_)
        ));
        assert!(matches!(
            p.decide(2, ErrorKind::Server(503)),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(p.decide(3, ErrorKind::Throttled), RetryDecision::NoRetry);
    }

    #[test]
    fn from_config() {
        let cfg = RetryConfig {
            max_attempts: 3,
            base_delay_secs: 0.5,
            max_delay_secs: 4,
        };
        let p = RetryPolicy::try_from(&cfg).unwrap();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.base_delay, Duration::from_millis(500));
        assert_eq!(p.max_delay, Duration::from_secs(4));
    }

    #[test]
    fn from_config_rejects_unrepresentable_delays() {
        for base_delay_secs in [1e30, f64::INFINITY, f64::NAN, -1.0] {
            let cfg = RetryConfig {
                base_delay_secs,
                ..RetryConfig::default()
            };
            assert!(RetryPolicy::try_from(&cfg).is_err(), "{}", base_delay_secs);
        }
        let cfg = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        assert!(RetryPolicy::try_from(&cfg).is_err());
    }
}
