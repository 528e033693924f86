//! Normalized per-destination configuration
//!
//! Immutable for the lifetime of a flush coordinator; only the live
//! connection owned by the destination's writer ever mutates.

use std::time::Duration;

/// One configured target storage endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationConfig {
    /// Logical name, unique per worker
    pub name: String,

    /// Candidate server addresses, tried in random order on reconnect
    pub servers: Vec<String>,

    /// Target database
    pub database: String,

    /// Username for authentication
    pub username: String,

    /// Optional password
    pub password: Option<String>,

    /// Batch size at which a flush is forced
    pub maximum_batch_size: usize,

    /// Wait time at which a flush is forced
    pub maximum_wait_time: Duration,

    /// Busy timeout for async inserts; defaults to `maximum_wait_time`
    pub async_insert_busy_timeout: Option<Duration>,

    /// Maximum write attempts per flush; 0 means unbounded
    pub max_retries: u32,
}

impl DestinationConfig {
    /// Effective async-insert busy timeout
    pub fn busy_timeout(&self) -> Duration {
        self.async_insert_busy_timeout
            .unwrap_or(self.maximum_wait_time)
    }
}
