//! `s3sum run` – checksum every object under a prefix.

use anyhow::Result;
use s3sum_core::config::S3sumConfig;
use s3sum_core::pool::{checksum_bucket, RunCounters, RunOptions, RunSummary};
use s3sum_core::store::S3Store;
use std::sync::Arc;
use std::time::Duration;

const PROGRESS_INTERVAL_MS: u64 = 500;

/// Flags of the `run` subcommand that override the config file.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub prefix: String,
    pub bucket: Option<String>,
    pub threads: Option<usize>,
    pub rate_limit: Option<f64>,
}

impl RunArgs {
    /// Flags win over file and environment.
    pub fn apply(&self, cfg: &mut S3sumConfig) {
        if let Some(bucket) = &self.bucket {
            cfg.store.bucket = Some(bucket.clone());
        }
        if let Some(threads) = self.threads {
            cfg.workers = Some(threads);
        }
        if let Some(rate) = self.rate_limit {
            cfg.rate_limit = rate;
        }
    }
}

fn format_progress(s: &RunSummary) -> String {
    format!(
        "  {} done ({} new, {} skipped, {} failed)  {:.1} MiB hashed  {:.2} MiB/s",
        s.finished(),
        s.succeeded,
        s.skipped,
        s.failed,
        s.bytes_hashed as f64 / 1_048_576.0,
        s.bytes_per_sec() / 1_048_576.0
    )
}

pub async fn run_checksums(mut cfg: S3sumConfig, args: RunArgs) -> Result<()> {
    args.apply(&mut cfg);
    cfg.validate()?;

    let store = Arc::new(S3Store::connect(&cfg.store).await?);
    let opts = RunOptions::from_config(&cfg, args.prefix.clone())?;
    println!(
        "Checksumming bucket {} with prefix '{}' ({} workers)...",
        store.bucket(),
        opts.prefix,
        opts.workers
    );

    let counters = Arc::new(RunCounters::new());
    let progress_counters = Arc::clone(&counters);
    let progress_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(PROGRESS_INTERVAL_MS));
        let mut last = (0u64, 0u64);
        loop {
            ticker.tick().await;
            let stats = progress_counters.snapshot();
            let now = (stats.finished(), stats.bytes_hashed);
            if now != last {
                println!("{}", format_progress(&stats));
                last = now;
            }
        }
    });

    let result = checksum_bucket(store, &opts, Arc::clone(&counters)).await;
    progress_handle.abort();

    let report = result?;
    let s = report.summary;
    println!(
        "Processed {} object(s): {} checksummed, {} skipped, {} failed ({} excluded by extension) in {:.1}s.",
        report.listing.listed,
        s.succeeded,
        s.skipped,
        s.failed,
        report.listing.filtered,
        s.elapsed_secs
    );
    if s.failed > 0 {
        println!("Failed objects are listed in the log; re-run to retry them.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let mut cfg = S3sumConfig::default();
        cfg.store.bucket = Some("from-file".into());
        let args = RunArgs {
            prefix: "p/".into(),
            bucket: Some("from-flag".into()),
            threads: Some(3),
            rate_limit: Some(2.5),
        };
        args.apply(&mut cfg);
        assert_eq!(cfg.store.bucket.as_deref(), Some("from-flag"));
        assert_eq!(cfg.workers, Some(3));
        assert_eq!(cfg.rate_limit, 2.5);
    }

    #[test]
    fn absent_flags_keep_config() {
        let mut cfg = S3sumConfig::default();
        cfg.store.bucket = Some("from-file".into());
        RunArgs::default().apply(&mut cfg);
        assert_eq!(cfg.store.bucket.as_deref(), Some("from-file"));
        assert_eq!(cfg.workers, None);
        assert_eq!(cfg.rate_limit, 16.0);
    }

    #[test]
    fn progress_line_mentions_counts() {
        let line = format_progress(&RunSummary {
            succeeded: 3,
            skipped: 2,
            failed: 1,
            bytes_hashed: 2 * 1_048_576,
            elapsed_secs: 1.0,
        });
        assert!(line.contains("6 done"));
        assert!(line.contains("3 new"));
        assert!(line.contains("2.0 MiB hashed"));
        assert!(line.contains("2.00 MiB/s"));
    }
}
