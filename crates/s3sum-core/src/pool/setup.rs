//! Wire one run together: rate limiter, retrying store, listing, processor, pool.

use anyhow::Result;
use std::sync::Arc;

use super::counters::RunCounters;
use super::run::{run_pool, PoolReport};
use crate::checksum::ChecksumAlgorithm;
use crate::config::S3sumConfig;
use crate::enumerator::{KeyListing, SkipSet};
use crate::processor::FileProcessor;
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;
use crate::store::{ObjectStore, RetryingStore};

/// Settings for one run, resolved from config and CLI flags.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub prefix: String,
    pub workers: usize,
    /// Store calls per second.
    pub rate_limit: f64,
    pub skip_extensions: Vec<String>,
    pub algorithm: ChecksumAlgorithm,
    pub retry: RetryPolicy,
}

impl RunOptions {
    pub fn from_config(cfg: &S3sumConfig, prefix: impl Into<String>) -> Result<Self> {
        Ok(Self {
            prefix: prefix.into(),
            workers: cfg.effective_workers(),
            rate_limit: cfg.rate_limit,
            skip_extensions: cfg.skip_extensions.clone(),
            algorithm: cfg.algorithm,
            retry: RetryPolicy::try_from(&cfg.retry_config())?,
        })
    }

    /// Configured skip extensions plus the record suffix, so records are
    /// never checksummed themselves.
    pub fn skip_set(&self) -> SkipSet {
        let mut skip = SkipSet::new(&self.skip_extensions);
        skip.insert(&self.algorithm.suffix());
        skip
    }
}

/// Checksum every object under `opts.prefix` in `transport`.
///
/// All calls (listing included) go through one shared `RateLimiter` and the
/// retry policy. Returns once every listed key reached a terminal state.
pub async fn checksum_bucket(
    transport: Arc<dyn ObjectStore>,
    opts: &RunOptions,
    counters: Arc<RunCounters>,
) -> Result<PoolReport> {
    let limiter = Arc::new(RateLimiter::per_second(opts.rate_limit)?);
    let store: Arc<dyn ObjectStore> = Arc::new(RetryingStore::new(transport, limiter, opts.retry));

    let listing = KeyListing::new(Arc::clone(&store), opts.prefix.clone(), opts.skip_set());
    let processor = Arc::new(
        FileProcessor::new(store, opts.algorithm).with_progress(counters.bytes_counter()),
    );

    tracing::info!(
        prefix = %opts.prefix,
        workers = opts.workers,
        rate_limit = opts.rate_limit,
        algorithm = opts.algorithm.extension(),
        "starting checksum run"
    );
    let report = run_pool(listing, processor, opts.workers, counters).await?;
    tracing::info!(
        listed = report.listing.listed,
        filtered = report.listing.filtered,
        succeeded = report.summary.succeeded,
        skipped = report.summary.skipped,
        failed = report.summary.failed,
        "checksum run finished"
    );
    Ok(report)
}
