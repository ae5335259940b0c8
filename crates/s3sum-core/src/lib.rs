pub mod config;
pub mod logging;

pub mod checksum;
pub mod enumerator;
pub mod pool;
pub mod processor;
pub mod rate_limit;
pub mod retry;
pub mod store;
