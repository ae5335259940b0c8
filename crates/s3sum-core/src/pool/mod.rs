//! Bounded worker pool over a lazily listed key sequence.
//!
//! A feeder task drives `KeyListing` into a bounded channel; `workers` tasks
//! share the receiving end, so each key reaches exactly one worker.
//! Completion is observable through shared `RunCounters`.

mod counters;
mod run;
mod setup;

pub use counters::{RunCounters, RunSummary};
pub use run::{run_pool, PoolReport};
pub use setup::{checksum_bucket, RunOptions};
