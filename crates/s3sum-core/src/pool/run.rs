//! Drive N workers until the listing is drained.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use super::counters::{RunCounters, RunSummary};
use crate::enumerator::{KeyListing, ListingStats};
use crate::processor::FileProcessor;

/// Final report of a pool run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolReport {
    pub summary: RunSummary,
    pub listing: ListingStats,
}

/// Process every key of `listing` with up to `workers` concurrent tasks.
///
/// Per-key failures are counted, never returned. A listing failure stops the
/// feeder; keys already queued are still processed, then the listing error is
/// returned. `counters` may be polled by the caller while this runs.
pub async fn run_pool(
    mut listing: KeyListing,
    processor: Arc<FileProcessor>,
    workers: usize,
    counters: Arc<RunCounters>,
) -> Result<PoolReport> {
    let workers = workers.max(1);
    let (tx, rx) = mpsc::channel::<String>(workers * 2);
    let rx = Arc::new(Mutex::new(rx));
    let prefix = listing.prefix().to_string();

    let feeder = tokio::spawn(async move {
        let res = loop {
            match listing.next_key().await {
                Ok(Some(key)) => {
                    if tx.send(key).await.is_err() {
                        break Ok(());
                    }
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        (res, listing.stats())
    });

    let mut join_set = tokio::task::JoinSet::new();
    for worker in 0..workers {
        let rx = Arc::clone(&rx);
        let processor = Arc::clone(&processor);
        let counters = Arc::clone(&counters);
        join_set.spawn(async move {
            loop {
                // Lock only for the receive; processing runs unlocked.
                let next = rx.lock().await.recv().await;
                let Some(key) = next else {
                    break;
                };
                let outcome = processor.process(&key).await;
                counters.record(&outcome);
            }
            tracing::debug!(worker, "worker drained");
        });
    }

    while let Some(res) = join_set.join_next().await {
        if let Err(e) = res {
            tracing::error!("worker task ended abnormally: {}", e);
        }
    }

    let (listed, stats) = feeder.await.context("listing task join")?;
    if let Err(e) = listed {
        tracing::error!(prefix = %prefix, error = %e, "listing failed");
        return Err(anyhow::Error::new(e).context(format!("list objects under {:?}", prefix)));
    }

    Ok(PoolReport {
        summary: counters.snapshot(),
        listing: stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::ChecksumAlgorithm;
    use crate::enumerator::SkipSet;
    use crate::retry::StoreError;
    use crate::store::{MemoryStore, StoreOp};

    fn pool_inputs(store: &Arc<MemoryStore>) -> (KeyListing, Arc<FileProcessor>) {
        let listing = KeyListing::new(store.clone(), "", SkipSet::new([".md5"]));
        let processor = Arc::new(FileProcessor::new(store.clone(), ChecksumAlgorithm::Md5));
        (listing, processor)
    }

    #[tokio::test]
    async fn every_key_is_processed_exactly_once() {
        let store = Arc::new(MemoryStore::with_page_size(7));
        for i in 0..50 {
            store.insert(format!("obj/{:03}.dat", i), format!("body {}", i));
        }
        let (listing, processor) = pool_inputs(&store);
        let counters = Arc::new(RunCounters::new());

        let report = run_pool(listing, processor, 8, Arc::clone(&counters))
            .await
            .unwrap();
        assert_eq!(report.summary.succeeded, 50);
        assert_eq!(report.summary.finished(), 50);
        assert_eq!(report.listing.listed, 50);
        assert_eq!(store.calls(StoreOp::Get), 50);
        assert_eq!(store.calls(StoreOp::Put), 50);
        assert_eq!(store.keys().len(), 100);
    }

    #[tokio::test]
    async fn failures_do_not_stop_siblings() {
        let store = Arc::new(MemoryStore::new());
        for key in ["a", "b", "c", "d"] {
            store.insert(key, "x");
        }
        store.fail_next(StoreOp::Get, 2, StoreError::Fatal("denied".into()));
        let (listing, processor) = pool_inputs(&store);

        let report = run_pool(listing, processor, 2, Arc::new(RunCounters::new()))
            .await
            .unwrap();
        assert_eq!(report.summary.failed, 2);
        assert_eq!(report.summary.succeeded, 2);
    }

    #[tokio::test]
    async fn listing_failure_fails_the_run_before_any_task() {
        let store = Arc::new(MemoryStore::new());
        store.insert("a", "x");
        store.fail_next(StoreOp::List, 1, StoreError::Fatal("no such bucket".into()));
        let (listing, processor) = pool_inputs(&store);

        let res = run_pool(listing, processor, 4, Arc::new(RunCounters::new())).await;
        assert!(res.is_err());
        assert_eq!(store.calls(StoreOp::Head), 0);
    }

    #[tokio::test]
    async fn empty_listing_finishes_cleanly() {
        let store = Arc::new(MemoryStore::new());
        let (listing, processor) = pool_inputs(&store);
        let report = run_pool(listing, processor, 3, Arc::new(RunCounters::new()))
            .await
            .unwrap();
        assert_eq!(report.summary.finished(), 0);
        assert_eq!(report.listing.pages, 1);
    }
}
