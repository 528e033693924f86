//! # Outlet
//!
//! Batched multi-destination write path.
//!
//! Records accumulate in a [`contracts::BatchBuffer`]; a [`Worker`] decides
//! when to flush based on the primary destination's size/time thresholds,
//! serializes the batch once, and fans it out to every
//! [`DestinationWriter`] in parallel. Each writer manages its own
//! connection with failover across a server set and retries with
//! exponential backoff. The worker returns a [`contracts::WorkerStatus`]
//! load signal after each evaluation so an external pool sizer can scale
//! the number of concurrent workers.
//!
//! # Example
//!
//! ```ignore
//! use contracts::RowBatch;
//! use outlet::{DestinationWriter, HttpConnector, Worker};
//! use tokio_util::sync::CancellationToken;
//!
//! let writers = destinations
//!     .iter()
//!     .map(|d| Ok(DestinationWriter::new(d.clone(), divider, HttpConnector::new(d)?)))
//!     .collect::<Result<Vec<_>, _>>()?;
//! let mut worker = Worker::new(RowBatch::new("flows"), writers, divider, CancellationToken::new())?;
//!
//! loop {
//!     let status = worker.evaluate_and_flush().await;
//!     pool_sizer.observe(status);
//! }
//! ```

mod clickhouse;
mod error;
mod metrics;
mod retry;
pub mod testing;
mod worker;
mod writer;

pub use clickhouse::{HttpConnection, HttpConnector};
pub use error::{WriteError, WritePhase};
pub use metrics::{WriterMetrics, WriterSnapshot};
pub use retry::{RetryLimit, RetryPolicy, INITIAL_INTERVAL, MAXIMUM_INTERVAL};
pub use worker::Worker;
pub use writer::DestinationWriter;
