//! CLI for s3sum.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use s3sum_core::checksum::ChecksumAlgorithm;
use s3sum_core::config::{self, S3sumConfig};
use s3sum_core::logging;
use std::path::PathBuf;

use commands::{run_checksum, run_checksums, RunArgs};

/// Top-level CLI for s3sum.
#[derive(Debug, Parser)]
#[command(name = "s3sum")]
#[command(about = "s3sum: write checksum records for every object in an S3 bucket", long_about = None)]
pub struct Cli {
    /// Enable debug output.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log to stderr instead of the state-dir log file.
    #[arg(long, global = true)]
    pub log_stderr: bool,

    /// Use this config file instead of ~/.config/s3sum/config.toml.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Compute and upload a checksum record for every object under a prefix.
    Run {
        /// Path within the bucket (default: whole bucket).
        #[arg(long, default_value = "")]
        prefix: String,
        /// Bucket to scan (overrides config and S3SUM_BUCKET).
        #[arg(long)]
        bucket: Option<String>,
        /// Number of parallel workers (default: number of CPU cores).
        #[arg(long, value_name = "N")]
        threads: Option<usize>,
        /// Store calls per second across all workers.
        #[arg(long, value_name = "CALLS")]
        rate_limit: Option<f64>,
    },

    /// Compute the checksum of a local file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
        /// Digest to use: md5 or sha256.
        #[arg(long, default_value = "md5")]
        algorithm: ChecksumAlgorithm,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    pub fn init_logging(&self) {
        if self.log_stderr {
            logging::init_logging_stderr(self.debug);
        } else if logging::init_logging(self.debug).is_err() {
            logging::init_logging_stderr(self.debug);
        }
    }

    fn load_config(&self) -> Result<S3sumConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub async fn run(self) -> Result<()> {
        match &self.command {
            CliCommand::Run {
                prefix,
                bucket,
                threads,
                rate_limit,
            } => {
                let cfg = self.load_config()?;
                tracing::debug!("loaded config: {:?}", cfg.store.bucket);
                let args = RunArgs {
                    prefix: prefix.clone(),
                    bucket: bucket.clone(),
                    threads: *threads,
                    rate_limit: *rate_limit,
                };
                run_checksums(cfg, args).await?;
            }
            CliCommand::Checksum { path, algorithm } => run_checksum(path, *algorithm).await?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
