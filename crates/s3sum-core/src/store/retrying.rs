//! Store decorator: every attempt of every call waits on the shared rate
//! limiter, transient failures are retried with exponential backoff.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use super::{HeadOutcome, ListPage, ObjectBody, ObjectStore};
use crate::rate_limit::RateLimiter;
use crate::retry::{run_with_retry, RetryPolicy, StoreError};

pub struct RetryingStore {
    inner: Arc<dyn ObjectStore>,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
}

impl RetryingStore {
    pub fn new(inner: Arc<dyn ObjectStore>, limiter: Arc<RateLimiter>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            limiter,
            policy,
        }
    }
}

#[async_trait]
impl ObjectStore for RetryingStore {
    async fn list_page(&self, prefix: &str, token: Option<String>) -> Result<ListPage, StoreError> {
        run_with_retry(&self.policy, "list", |_| {
            let token = token.clone();
            async move {
                self.limiter.acquire().await;
                self.inner.list_page(prefix, token).await
            }
        })
        .await
    }

    async fn head(&self, key: &str) -> Result<HeadOutcome, StoreError> {
        run_with_retry(&self.policy, "head", |_| async move {
            self.limiter.acquire().await;
            self.inner.head(key).await
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<ObjectBody, StoreError> {
        run_with_retry(&self.policy, "get", |_| async move {
            self.limiter.acquire().await;
            self.inner.get(key).await
        })
        .await
    }

    async fn put(&self, key: &str, body: Bytes) -> Result<(), StoreError> {
        run_with_retry(&self.policy, "put", |_| {
            let body = body.clone();
            async move {
                self.limiter.acquire().await;
                self.inner.put(key, body).await
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreOp};
    use std::time::Duration;

    fn wrap(inner: Arc<MemoryStore>) -> RetryingStore {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let limiter = Arc::new(RateLimiter::per_second(10_000.0).unwrap());
        RetryingStore::new(inner, limiter, policy)
    }

    #[tokio::test]
    async fn get_succeeds_after_four_transient_failures() {
        let inner = Arc::new(MemoryStore::new());
        inner.insert("a.dat", "payload");
        inner.fail_next(StoreOp::Get, 4, StoreError::Throttled("slow down".into()));
        let store = wrap(Arc::clone(&inner));

        let body = store.get("a.dat").await.unwrap();
        assert_eq!(body.content_length, 7);
        assert_eq!(inner.calls(StoreOp::Get), 5);
    }

    #[tokio::test]
    async fn put_gives_up_after_five_attempts() {
        let inner = Arc::new(MemoryStore::new());
        inner.fail_next(
            StoreOp::Put,
            5,
            StoreError::Server {
                status: 500,
                message: "internal".into(),
            },
        );
        let store = wrap(Arc::clone(&inner));

        let err = store.put("a.dat.md5", Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Server { status: 500, .. }));
        assert_eq!(inner.calls(StoreOp::Put), 5);
        assert!(inner.object("a.dat.md5").is_none());
    }

    #[tokio::test]
    async fn head_not_found_is_an_outcome_and_fatal_is_immediate() {
        let inner = Arc::new(MemoryStore::new());
        let store = wrap(Arc::clone(&inner));
        assert_eq!(store.head("missing").await.unwrap(), HeadOutcome::NotFound);
        assert_eq!(inner.calls(StoreOp::Head), 1);

        inner.fail_next(StoreOp::Head, 1, StoreError::Fatal("access denied".into()));
        assert!(matches!(store.head("missing").await, Err(StoreError::Fatal(_))));
        assert_eq!(inner.calls(StoreOp::Head), 2);
    }

    #[tokio::test]
    async fn list_pages_are_retried() {
        let inner = Arc::new(MemoryStore::new());
        inner.insert("a", "1");
        inner.fail_next(StoreOp::List, 2, StoreError::Connection("reset".into()));
        let store = wrap(Arc::clone(&inner));
        let page = store.list_page("", None).await.unwrap();
        assert_eq!(page.keys, vec!["a".to_string()]);
        assert_eq!(inner.calls(StoreOp::List), 3);
    }
}
