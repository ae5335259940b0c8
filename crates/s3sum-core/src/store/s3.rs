//! S3-compatible transport built on the AWS SDK.
//!
//! The SDK's own retry layer is disabled: attempts are counted and paced by
//! `RetryingStore`, so one call here is exactly one request on the wire.

use anyhow::Result;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::retry::RetryConfig as SdkRetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::time::Duration;

use super::{HeadOutcome, ListPage, ObjectBody, ObjectStore};
use crate::config::StoreConfig;
use crate::retry::{classify_error_code, classify_http_status, ErrorKind, StoreError};

const FALLBACK_REGION: &str = "us-east-1";

#[derive(Clone, Debug)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client for `cfg`. The bucket must already be validated.
    pub async fn connect(cfg: &StoreConfig) -> Result<Self> {
        let bucket = cfg
            .bucket
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no bucket configured"))?;

        let region = RegionProviderChain::first_try(cfg.region.clone().map(Region::new))
            .or_default_provider()
            .or_else(Region::new(FALLBACK_REGION));
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
        if let (Some(access_key), Some(secret_key)) = (&cfg.access_key, &cfg.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "s3sum-config",
            ));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .retry_config(SdkRetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(cfg.timeout_secs))
                    .build(),
            )
            .force_path_style(cfg.force_path_style);
        if let Some(endpoint) = &cfg.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        tracing::debug!(bucket = %bucket, endpoint = ?cfg.endpoint, "s3 client configured");
        Ok(Self::from_client(Client::from_conf(builder.build()), bucket))
    }

    pub fn from_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(&self, prefix: &str, token: Option<String>) -> Result<ListPage, StoreError> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .set_continuation_token(token)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &self.bucket))?;
        let keys = resp
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect();
        let next_token = if resp.is_truncated().unwrap_or(false) {
            resp.next_continuation_token().map(str::to_string)
        } else {
            None
        };
        Ok(ListPage { keys, next_token })
    }

    async fn head(&self, key: &str) -> Result<HeadOutcome, StoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(HeadOutcome::Exists),
            Err(e) => match map_sdk_error(e, key) {
                StoreError::NotFound { .. } => Ok(HeadOutcome::NotFound),
                other => Err(other),
            },
        }
    }

    async fn get(&self, key: &str) -> Result<ObjectBody, StoreError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;
        let content_length = resp
            .content_length()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| StoreError::Fatal(format!("{}: response has no content length", key)))?;
        Ok(ObjectBody {
            reader: Box::pin(resp.body.into_async_read()),
            content_length,
        })
    }

    async fn put(&self, key: &str, body: Bytes) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("text/plain")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;
        Ok(())
    }
}

/// Map an SDK failure onto the store error taxonomy.
fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, key: &str) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::TimeoutError(_) => StoreError::Timeout(message),
        SdkError::DispatchFailure(f) if f.is_timeout() => StoreError::Timeout(message),
        SdkError::DispatchFailure(f) if f.is_user() => StoreError::Fatal(message),
        SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StoreError::Connection(message)
        }
        SdkError::ServiceError(ctx) => {
            let status = ctx.raw().status().as_u16();
            let kind = ctx
                .err()
                .code()
                .and_then(classify_error_code)
                .unwrap_or_else(|| classify_http_status(status));
            error_for_kind(kind, key, message)
        }
        _ => StoreError::Fatal(message),
    }
}

fn error_for_kind(kind: ErrorKind, key: &str, message: String) -> StoreError {
    match kind {
        ErrorKind::NotFound => StoreError::not_found(key),
        ErrorKind::Throttled => StoreError::Throttled(message),
        ErrorKind::Timeout => StoreError::Timeout(message),
        ErrorKind::Connection => StoreError::Connection(message),
        ErrorKind::Server(status) => StoreError::Server { status, message },
        ErrorKind::Other => StoreError::Fatal(message),
    }
}
