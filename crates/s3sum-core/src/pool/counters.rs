//! Run-wide completion counters (bytes hashed, tasks done, rate).
//!
//! Workers bump atomics; the CLI polls `snapshot()` to render progress.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::processor::TaskOutcome;

#[derive(Debug)]
pub struct RunCounters {
    started: Instant,
    succeeded: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    /// Shared with `FileProcessor::with_progress`.
    bytes_hashed: Arc<AtomicU64>,
}

impl Default for RunCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl RunCounters {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            succeeded: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            bytes_hashed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Counter to hand to the processor for per-chunk progress.
    pub fn bytes_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.bytes_hashed)
    }

    pub fn record(&self, outcome: &TaskOutcome) {
        let slot = match outcome {
            TaskOutcome::Succeeded { .. } => &self.succeeded,
            TaskOutcome::Skipped => &self.skipped,
            TaskOutcome::Failed { .. } => &self.failed,
        };
        slot.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunSummary {
        RunSummary {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes_hashed: self.bytes_hashed.load(Ordering::Relaxed),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        }
    }
}

/// Snapshot of run progress (CLI-friendly).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub succeeded: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes_hashed: u64,
    pub elapsed_secs: f64,
}

impl RunSummary {
    /// Tasks that reached a terminal state.
    pub fn finished(&self) -> u64 {
        self.succeeded + self.skipped + self.failed
    }

    /// Hash throughput in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_hashed as f64 / self.elapsed_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_each_outcome() {
        let counters = RunCounters::new();
        counters.record(&TaskOutcome::Skipped);
        counters.record(&TaskOutcome::Succeeded {
            digest: "d".into(),
        });
        counters.record(&TaskOutcome::Succeeded {
            digest: "e".into(),
        });
        counters.record(&TaskOutcome::Failed {
            reason: "r".into(),
        });
        counters.bytes_counter().fetch_add(2048, Ordering::Relaxed);
        let s = counters.snapshot();
        assert_eq!((s.succeeded, s.skipped, s.failed), (2, 1, 1));
        assert_eq!(s.finished(), 4);
        assert_eq!(s.bytes_hashed, 2048);
    }

    #[test]
    fn rate_is_zero_without_elapsed_time() {
        let s = RunSummary {
            bytes_hashed: 100,
            ..RunSummary::default()
        };
        assert_eq!(s.bytes_per_sec(), 0.0);
        let s = RunSummary {
            bytes_hashed: 100,
            elapsed_secs: 2.0,
            ..RunSummary::default()
        };
        assert_eq!(s.bytes_per_sec(), 50.0);
    }
}
