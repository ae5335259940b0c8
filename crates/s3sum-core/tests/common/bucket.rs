//! Helpers for driving full runs against an in-process bucket.

use s3sum_core::checksum::ChecksumAlgorithm;
use s3sum_core::pool::{checksum_bucket, PoolReport, RunCounters, RunOptions};
use s3sum_core::retry::RetryPolicy;
use s3sum_core::store::MemoryStore;
use std::sync::Arc;
use std::time::Duration;

/// Options with fast retries and a generous rate so tests stay quick.
pub fn fast_options(prefix: &str) -> RunOptions {
    RunOptions {
        prefix: prefix.to_string(),
        workers: 4,
        rate_limit: 5_000.0,
        skip_extensions: vec![
            ".pfk".into(),
            ".pek".into(),
            ".cfa".into(),
            ".mpegindex".into(),
        ],
        algorithm: ChecksumAlgorithm::Md5,
        retry: RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        },
    }
}

pub async fn run(store: &Arc<MemoryStore>, opts: &RunOptions) -> PoolReport {
    checksum_bucket(store.clone(), opts, Arc::new(RunCounters::new()))
        .await
        .expect("run completes")
}

/// Deterministic test body of `len` bytes.
pub fn body(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}
