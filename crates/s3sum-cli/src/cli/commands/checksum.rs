//! Checksum command: digest of a local file, printed in record format.

use anyhow::Result;
use s3sum_core::checksum::{self, ChecksumAlgorithm, ChecksumRecord};
use std::path::Path;

/// Compute and print the checksum of the given file.
pub async fn run_checksum(path: &Path, algorithm: ChecksumAlgorithm) -> Result<()> {
    let digest = checksum::hash_path(algorithm, path).await?;
    print!(
        "{}",
        ChecksumRecord::new(digest, path.display().to_string()).to_body()
    );
    Ok(())
}
