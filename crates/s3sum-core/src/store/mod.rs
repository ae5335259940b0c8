//! Object-store capability: list, head, get, put.
//!
//! `ObjectStore` is the seam between the pipeline and a transport. `S3Store`
//! talks to an S3-compatible endpoint, `MemoryStore` keeps objects in process,
//! and `RetryingStore` wraps either one with pacing and retries.

pub mod memory;
mod retrying;
mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use std::pin::Pin;
use tokio::io::AsyncRead;

use crate::retry::StoreError;

pub use memory::{MemoryStore, StoreOp};
pub use retrying::RetryingStore;
pub use s3::S3Store;

/// Streaming object body.
pub type BodyReader = Pin<Box<dyn AsyncRead + Send>>;

/// Result of a head request. Absence is an outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadOutcome {
    Exists,
    NotFound,
}

/// A fetched object: body stream plus the length the store advertised.
pub struct ObjectBody {
    pub reader: BodyReader,
    pub content_length: u64,
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBody")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// One page of a listing, in store-defined order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Token for the next page; None when this is the last page.
    pub next_token: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of keys under `prefix`, continuing from `token`.
    async fn list_page(&self, prefix: &str, token: Option<String>) -> Result<ListPage, StoreError>;

    async fn head(&self, key: &str) -> Result<HeadOutcome, StoreError>;

    async fn get(&self, key: &str) -> Result<ObjectBody, StoreError>;

    async fn put(&self, key: &str, body: Bytes) -> Result<(), StoreError>;
}
