//! Streaming checksum computation and the checksum record format.
//!
//! Object bodies are hashed in fixed 1 MiB chunks so peak memory stays
//! bounded regardless of object size. A record is stored as a sibling object
//! `<key>.<ext>` whose body is `"<hex digest>  <key>\n"` (the `md5sum` layout).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncRead, AsyncReadExt};

pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Digest used for checksum records. MD5 is the default for compatibility
/// with existing `.md5` sidecars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl ChecksumAlgorithm {
    /// Extension of the record object, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ChecksumAlgorithm::Md5 => "md5",
            ChecksumAlgorithm::Sha256 => "sha256",
        }
    }

    /// Suffix appended to an object key to form its record key.
    pub fn suffix(self) -> String {
        format!(".{}", self.extension())
    }

    /// Length of the hex-encoded digest.
    pub fn hex_len(self) -> usize {
        match self {
            ChecksumAlgorithm::Md5 => 32,
            ChecksumAlgorithm::Sha256 => 64,
        }
    }
}

impl std::str::FromStr for ChecksumAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(ChecksumAlgorithm::Md5),
            "sha256" => Ok(ChecksumAlgorithm::Sha256),
            other => bail!("unknown checksum algorithm {:?} (expected md5 or sha256)", other),
        }
    }
}

/// Key of the checksum record for `key`.
pub fn record_key(key: &str, algorithm: ChecksumAlgorithm) -> String {
    format!("{}.{}", key, algorithm.extension())
}

/// One checksum record: digest of an object plus the key it was computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumRecord {
    pub digest: String,
    pub key: String,
}

impl ChecksumRecord {
    pub fn new(digest: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            key: key.into(),
        }
    }

    /// Record body: `"<hex digest>  <key>\n"`.
    pub fn to_body(&self) -> String {
        format!("{}  {}\n", self.digest, self.key)
    }

    /// Parse a record body. Returns None unless it is a single
    /// `<hex>  <key>` line with a lowercase hex digest.
    pub fn parse(body: &str) -> Option<Self> {
        let line = body.strip_suffix('\n').unwrap_or(body);
        let (digest, key) = line.split_once("  ")?;
        if digest.is_empty()
            || key.is_empty()
            || !digest
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return None;
        }
        Some(Self::new(digest, key))
    }
}

/// Hash `reader` to EOF with the given algorithm and return the lowercase hex digest.
///
/// `expected_len` is the content length advertised by the store; reading a
/// different number of bytes is an error so a truncated body never yields a
/// record. Each chunk's length is added to `progress` when given.
pub async fn hash_reader<R>(
    algorithm: ChecksumAlgorithm,
    reader: R,
    expected_len: u64,
    progress: Option<&AtomicU64>,
) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let (digest, read) = match algorithm {
        ChecksumAlgorithm::Md5 => digest_reader::<md5::Md5, _>(reader, progress).await?,
        ChecksumAlgorithm::Sha256 => digest_reader::<sha2::Sha256, _>(reader, progress).await?,
    };
    if read != expected_len {
        bail!(
            "body length mismatch: expected {} bytes, read {}",
            expected_len,
            read
        );
    }
    Ok(digest)
}

async fn digest_reader<D, R>(mut reader: R, progress: Option<&AtomicU64>) -> Result<(String, u64)>
where
    D: Digest,
    R: AsyncRead + Unpin,
{
    let mut hasher = D::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await.context("read object body")?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
        if let Some(counter) = progress {
            counter.fetch_add(n as u64, Ordering::Relaxed);
        }
    }
    Ok((hex::encode(hasher.finalize()), total))
}

/// Hash a local file, e.g. to compare against a record fetched from the bucket.
pub async fn hash_path(algorithm: ChecksumAlgorithm, path: &Path) -> Result<String> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("open {}", path.display()))?;
    let len = file
        .metadata()
        .await
        .with_context(|| format!("stat {}", path.display()))?
        .len();
    hash_reader(algorithm, file, len, None)
        .await
        .with_context(|| format!("hash {}", path.display()))
}
