//! Raw outlet configuration (serde view)
//!
//! Parsed by `config_loader` and normalized into [`DestinationConfig`]s.
//! The first destination is the primary: its thresholds govern flush timing
//! for the whole coordinator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DestinationConfig;

/// Default maximum batch size
pub const DEFAULT_MAXIMUM_BATCH_SIZE: usize = 50_000;
/// Default maximum wait time in milliseconds
pub const DEFAULT_MAXIMUM_WAIT_TIME_MS: u64 = 5_000;
/// Default divisor applied to the batch size for the async-insert threshold
/// and the underloaded signal
pub const DEFAULT_MINIMUM_BATCH_SIZE_DIVIDER: usize = 10;

/// Top-level outlet configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutletConfig {
    /// Divisor K: batches at or below `maximum_batch_size / K` are
    /// considered small (async insert, underloaded signal)
    #[serde(default = "default_divider")]
    pub minimum_batch_size_divider: usize,

    /// Outlet-wide batch tuning, used by destinations without an override
    #[serde(default)]
    pub batch: BatchTuning,

    /// Configured destinations; the first one is the primary
    pub destinations: Vec<DestinationSpec>,
}

/// Size/time flush thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BatchTuning {
    /// Batch size at which a flush is forced
    pub maximum_batch_size: usize,
    /// Wait time (milliseconds) at which a flush is forced
    pub maximum_wait_time_ms: u64,
    /// Busy timeout (milliseconds) for async inserts; defaults to the
    /// maximum wait time when unset
    pub async_insert_busy_timeout_ms: Option<u64>,
}

impl Default for BatchTuning {
    fn default() -> Self {
        Self {
            maximum_batch_size: DEFAULT_MAXIMUM_BATCH_SIZE,
            maximum_wait_time_ms: DEFAULT_MAXIMUM_WAIT_TIME_MS,
            async_insert_busy_timeout_ms: None,
        }
    }
}

/// One destination entry as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DestinationSpec {
    /// Logical name, unique and non-empty
    pub name: String,

    /// Candidate server addresses
    pub servers: Vec<String>,

    /// Target database
    #[serde(default = "default_database")]
    pub database: String,

    /// Username for authentication
    #[serde(default = "default_username")]
    pub username: String,

    /// Optional password
    #[serde(default)]
    pub password: Option<String>,

    /// Maximum write attempts per flush; 0 means unbounded
    #[serde(default)]
    pub max_retries: u32,

    /// Per-destination batch tuning override
    #[serde(default)]
    pub batch: Option<BatchTuning>,
}

fn default_divider() -> usize {
    DEFAULT_MINIMUM_BATCH_SIZE_DIVIDER
}

fn default_database() -> String {
    "default".to_string()
}

fn default_username() -> String {
    "default".to_string()
}

impl OutletConfig {
    /// Batch tuning effective for one destination (override or outlet-wide)
    pub fn tuning_for<'a>(&'a self, spec: &'a DestinationSpec) -> &'a BatchTuning {
        spec.batch.as_ref().unwrap_or(&self.batch)
    }

    /// Produce the normalized destination list
    ///
    /// The returned order matches the configuration order, so index 0 is
    /// the primary destination.
    pub fn normalize(&self) -> Vec<DestinationConfig> {
        self.destinations
            .iter()
            .map(|spec| {
                let tuning = self.tuning_for(spec);
                DestinationConfig {
                    name: spec.name.clone(),
                    servers: spec.servers.clone(),
                    database: spec.database.clone(),
                    username: spec.username.clone(),
                    password: spec.password.clone(),
                    maximum_batch_size: tuning.maximum_batch_size,
                    maximum_wait_time: Duration::from_millis(tuning.maximum_wait_time_ms),
                    async_insert_busy_timeout: tuning
                        .async_insert_busy_timeout_ms
                        .map(Duration::from_millis),
                    max_retries: spec.max_retries,
                }
            })
            .collect()
    }
}
