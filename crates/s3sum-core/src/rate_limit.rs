//! Process-wide pacing of outbound store calls.
//!
//! One `RateLimiter` is built per run and shared (`Arc`) by every component
//! that talks to the store. Permits are spaced at least `1 / rate` apart
//! across all callers (GCRA with a burst of one).

use anyhow::{bail, Result};
use governor::{DefaultDirectRateLimiter, Quota};
use std::time::Duration;

pub struct RateLimiter {
    limiter: DefaultDirectRateLimiter,
    interval: Duration,
}

impl RateLimiter {
    /// Limiter allowing `calls_per_sec` acquisitions per second (fractional rates allowed).
    pub fn per_second(calls_per_sec: f64) -> Result<Self> {
        if !(calls_per_sec.is_finite() && calls_per_sec > 0.0) {
            bail!("rate limit must be positive, got {}", calls_per_sec);
        }
        let Ok(interval) = Duration::try_from_secs_f64(1.0 / calls_per_sec) else {
            bail!("rate limit {} is too small", calls_per_sec);
        };
        Self::with_interval(interval)
    }

    /// Limiter granting at most one permit per `interval`.
    pub fn with_interval(interval: Duration) -> Result<Self> {
        let Some(quota) = Quota::with_period(interval) else {
            bail!("rate limit interval must be non-zero");
        };
        Ok(Self {
            limiter: DefaultDirectRateLimiter::direct(quota),
            interval,
        })
    }

    /// Minimum spacing between two permits.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next store call may be issued.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("interval", &self.interval)
            .finish()
    }
}
