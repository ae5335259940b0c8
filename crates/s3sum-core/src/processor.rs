//! Per-key unit of work: skip if a checksum record exists, otherwise
//! get + hash + put the record. Failures end the task and never escape it.

use anyhow::{Context, Result};
use bytes::Bytes;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use crate::checksum::{self, ChecksumAlgorithm, ChecksumRecord};
use crate::store::{HeadOutcome, ObjectStore};

/// Terminal state of one processing task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// A checksum record already existed; nothing was fetched or written.
    Skipped,
    /// The record was written. Carries the digest.
    Succeeded { digest: String },
    /// The task stopped at some step; carries the formatted error chain.
    Failed { reason: String },
}

pub struct FileProcessor {
    store: Arc<dyn ObjectStore>,
    algorithm: ChecksumAlgorithm,
    bytes_hashed: Option<Arc<AtomicU64>>,
}

impl FileProcessor {
    pub fn new(store: Arc<dyn ObjectStore>, algorithm: ChecksumAlgorithm) -> Self {
        Self {
            store,
            algorithm,
            bytes_hashed: None,
        }
    }

    /// Add every hashed chunk's length to `counter`.
    pub fn with_progress(mut self, counter: Arc<AtomicU64>) -> Self {
        self.bytes_hashed = Some(counter);
        self
    }

    /// Process one key. Every error is logged here and turned into `Failed`.
    pub async fn process(&self, key: &str) -> TaskOutcome {
        match self.try_process(key).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let reason = format!("{:#}", e);
                tracing::warn!(key, error = %reason, "failed to process object");
                TaskOutcome::Failed { reason }
            }
        }
    }

    async fn try_process(&self, key: &str) -> Result<TaskOutcome> {
        let record_key = checksum::record_key(key, self.algorithm);

        // An unknown head result must not lead to a blind overwrite.
        match self
            .store
            .head(&record_key)
            .await
            .with_context(|| format!("head {}", record_key))?
        {
            HeadOutcome::Exists => {
                tracing::info!(key, "checksum record already exists, skipping");
                return Ok(TaskOutcome::Skipped);
            }
            HeadOutcome::NotFound => {}
        }

        let body = self
            .store
            .get(key)
            .await
            .with_context(|| format!("get {}", key))?;
        let size = body.content_length;
        let digest = checksum::hash_reader(
            self.algorithm,
            body.reader,
            size,
            self.bytes_hashed.as_deref(),
        )
        .await
        .with_context(|| format!("hash {}", key))?;

        let record = ChecksumRecord::new(digest.clone(), key);
        self.store
            .put(&record_key, Bytes::from(record.to_body()))
            .await
            .with_context(|| format!("put {}", record_key))?;
        tracing::info!(key, record = %record_key, size, "uploaded checksum record");
        Ok(TaskOutcome::Succeeded { digest })
    }
}
