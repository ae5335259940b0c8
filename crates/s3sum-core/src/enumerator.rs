//! Lazy, page-by-page listing of the keys to checksum.
//!
//! `KeyListing` fetches one listing page at a time and yields its keys,
//! dropping any key whose lowercased suffix is in the `SkipSet`. It is a
//! single pass; restarting means listing again.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::retry::StoreError;
use crate::store::ObjectStore;

/// Key suffixes (matched case-insensitively) that are never yielded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipSet {
    suffixes: Vec<String>,
}

impl SkipSet {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for s in suffixes {
            set.insert(s.as_ref());
        }
        set
    }

    /// Add a suffix. A missing leading dot is added (`md5` -> `.md5`).
    pub fn insert(&mut self, suffix: &str) {
        let suffix = suffix.trim().to_lowercase();
        if suffix.is_empty() {
            return;
        }
        let suffix = if suffix.starts_with('.') {
            suffix
        } else {
            format!(".{}", suffix)
        };
        if !self.suffixes.contains(&suffix) {
            self.suffixes.push(suffix);
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        let lower = key.to_lowercase();
        self.suffixes.iter().any(|s| lower.ends_with(s.as_str()))
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }
}

/// Counters for one listing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingStats {
    pub pages: u64,
    /// Keys yielded to the caller.
    pub listed: u64,
    /// Keys dropped by the skip set.
    pub filtered: u64,
}

pub struct KeyListing {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    skip: SkipSet,
    buffer: VecDeque<String>,
    token: Option<String>,
    exhausted: bool,
    stats: ListingStats,
}

impl KeyListing {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>, skip: SkipSet) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            skip,
            buffer: VecDeque::new(),
            token: None,
            exhausted: false,
            stats: ListingStats::default(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn stats(&self) -> ListingStats {
        self.stats
    }

    /// Next key to process, fetching the next page when the buffer runs dry.
    /// Returns `Ok(None)` once the listing is exhausted.
    pub async fn next_key(&mut self) -> Result<Option<String>, StoreError> {
        loop {
            if let Some(key) = self.buffer.pop_front() {
                self.stats.listed += 1;
                return Ok(Some(key));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }

    async fn fetch_page(&mut self) -> Result<(), StoreError> {
        let page = self
            .store
            .list_page(&self.prefix, self.token.take())
            .await?;
        self.stats.pages += 1;
        for key in page.keys {
            if self.skip.matches(&key) {
                tracing::debug!(key = %key, "skipping excluded extension");
                self.stats.filtered += 1;
            } else {
                self.buffer.push_back(key);
            }
        }
        // A token that does not advance would loop forever.
        match page.next_token {
            Some(t) if !t.is_empty() => self.token = Some(t),
            _ => self.exhausted = true,
        }
        tracing::debug!(
            page = self.stats.pages,
            buffered = self.buffer.len(),
            last_page = self.exhausted,
            "listed page"
        );
        Ok(())
    }
}
