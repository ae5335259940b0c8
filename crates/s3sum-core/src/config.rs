use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::checksum::ChecksumAlgorithm;
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;

/// Sidecar/index extensions that are never checksummed.
pub const DEFAULT_SKIP_EXTENSIONS: &[&str] = &[".pfk", ".pek", ".cfa", ".mpegindex"];

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per store call (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff.
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 1.0,
            max_delay_secs: 16,
        }
    }
}

/// Connection settings for the S3-compatible endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Bucket to scan. Required before a run starts.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Custom endpoint URL (Wasabi, MinIO, ...). None = AWS.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Explicit credentials; when absent the AWS default provider chain is used.
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Path-style addressing (required by MinIO and some gateways).
    #[serde(default)]
    pub force_path_style: bool,
    /// Per-operation timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    300
}

/// Global configuration loaded from `~/.config/s3sum/config.toml`.
/// Missing keys take their default values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3sumConfig {
    #[serde(default)]
    pub store: StoreConfig,
    /// Number of concurrent workers (None = available parallelism).
    #[serde(default)]
    pub workers: Option<usize>,
    /// Steady rate of outbound store calls, in calls per second.
    pub rate_limit: f64,
    /// Key suffixes that are never listed for processing (matched lowercase).
    pub skip_extensions: Vec<String>,
    /// Digest used for checksum records.
    #[serde(default)]
    pub algorithm: ChecksumAlgorithm,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for S3sumConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                timeout_secs: default_timeout_secs(),
                ..StoreConfig::default()
            },
            workers: None,
            rate_limit: 16.0,
            skip_extensions: DEFAULT_SKIP_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            algorithm: ChecksumAlgorithm::default(),
            retry: None,
        }
    }
}

impl S3sumConfig {
    /// Worker count to use: configured value, else available parallelism.
    pub fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    /// Apply environment variables on top of the file values. `S3SUM_*` names
    /// win; the `WASABI_*` names of older deployments are read as fallbacks.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |slot: &mut Option<String>, names: &[&str]| {
            if let Some(v) = names
                .iter()
                .find_map(|name| lookup(name).filter(|v| !v.is_empty()))
            {
                *slot = Some(v);
            }
        };
        set(&mut self.store.bucket, &["S3SUM_BUCKET", "WASABI_BUCKET_NAME"]);
        set(&mut self.store.endpoint, &["S3SUM_ENDPOINT", "WASABI_ENDPOINT_URL"]);
        set(&mut self.store.region, &["S3SUM_REGION"]);
        set(&mut self.store.access_key, &["S3SUM_ACCESS_KEY", "WASABI_ACCESS_KEY"]);
        set(&mut self.store.secret_key, &["S3SUM_SECRET_KEY", "WASABI_SECRET_KEY"]);
    }

    /// Reject settings that would make a run meaningless. Called before listing starts.
    pub fn validate(&self) -> Result<()> {
        match self.store.bucket.as_deref() {
            None | Some("") => bail!("no bucket configured (set store.bucket, S3SUM_BUCKET or --bucket)"),
            Some(_) => {}
        }
        RateLimiter::per_second(self.rate_limit).context("invalid rate_limit")?;
        if self.workers == Some(0) {
            bail!("workers must be at least 1");
        }
        RetryPolicy::try_from(&self.retry_config())?;
        if self.store.timeout_secs == 0 {
            bail!("store.timeout_secs must be at least 1");
        }
        if self.store.access_key.is_some() != self.store.secret_key.is_some() {
            bail!("access_key and secret_key must be set together");
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("s3sum")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<S3sumConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = S3sumConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<S3sumConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: S3sumConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
