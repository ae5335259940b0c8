//! In-process object store.
//!
//! Keys live in a `BTreeMap`, so listings come back sorted and paginate by
//! "last key seen". Every call is counted per operation, and a number of
//! upcoming calls per operation can be made to fail with a chosen error.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{HeadOutcome, ListPage, ObjectBody, ObjectStore};
use crate::retry::StoreError;

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Head,
    Get,
    Put,
}

impl StoreOp {
    fn index(self) -> usize {
        match self {
            StoreOp::List => 0,
            StoreOp::Head => 1,
            StoreOp::Get => 2,
            StoreOp::Put => 3,
        }
    }
}

#[derive(Debug)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Bytes>>,
    page_size: usize,
    calls: [AtomicUsize; 4],
    faults: Mutex<HashMap<StoreOp, (u32, StoreError)>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Store whose listings return at most `page_size` keys per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            page_size: page_size.max(1),
            calls: Default::default(),
            faults: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, key: impl Into<String>, body: impl Into<Bytes>) {
        self.objects.lock().unwrap().insert(key.into(), body.into());
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Number of calls made so far for `op` (failed ones included).
    pub fn calls(&self, op: StoreOp) -> usize {
        self.calls[op.index()].load(Ordering::SeqCst)
    }

    /// Make the next `count` calls of `op` fail with `error`.
    pub fn fail_next(&self, op: StoreOp, count: u32, error: StoreError) {
        let mut faults = self.faults.lock().unwrap();
        if count == 0 {
            faults.remove(&op);
        } else {
            faults.insert(op, (count, error));
        }
    }

    /// Count the call, then return the injected error if one is pending.
    fn enter(&self, op: StoreOp) -> Result<(), StoreError> {
        self.calls[op.index()].fetch_add(1, Ordering::SeqCst);
        let mut faults = self.faults.lock().unwrap();
        if let Some((remaining, error)) = faults.get_mut(&op) {
            let error = error.clone();
            *remaining -= 1;
            if *remaining == 0 {
                faults.remove(&op);
            }
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(&self, prefix: &str, token: Option<String>) -> Result<ListPage, StoreError> {
        self.enter(StoreOp::List)?;
        let objects = self.objects.lock().unwrap();
        let lower = match &token {
            Some(t) => Bound::Excluded(t.clone()),
            None => Bound::Included(prefix.to_string()),
        };
        let mut keys: Vec<String> = objects
            .range((lower, Bound::Unbounded))
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(prefix))
            .take(self.page_size + 1)
            .cloned()
            .collect();
        let next_token = if keys.len() > self.page_size {
            keys.truncate(self.page_size);
            keys.last().cloned()
        } else {
            None
        };
        Ok(ListPage { keys, next_token })
    }

    async fn head(&self, key: &str) -> Result<HeadOutcome, StoreError> {
        self.enter(StoreOp::Head)?;
        if self.objects.lock().unwrap().contains_key(key) {
            Ok(HeadOutcome::Exists)
        } else {
            Ok(HeadOutcome::NotFound)
        }
    }

    async fn get(&self, key: &str) -> Result<ObjectBody, StoreError> {
        self.enter(StoreOp::Get)?;
        let body = self
            .object(key)
            .ok_or_else(|| StoreError::not_found(key))?;
        Ok(ObjectBody {
            content_length: body.len() as u64,
            reader: Box::pin(Cursor::new(body)),
        })
    }

    async fn put(&self, key: &str, body: Bytes) -> Result<(), StoreError> {
        self.enter(StoreOp::Put)?;
        self.insert(key, body);
        Ok(())
    }
}
