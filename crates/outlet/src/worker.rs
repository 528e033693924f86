//! Flush coordinator - threshold evaluation and fan-out to destinations
//!
//! One worker owns one batch buffer and one writer per destination. The
//! caller serializes `evaluate_and_flush`/`force_flush` calls; parallelism
//! exists only within a flush, one task per destination. A failing
//! destination never cancels its siblings, and the buffer is cleared
//! unconditionally once every destination has settled.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use contracts::{BatchBuffer, Connector, OutletError, WorkerStatus};

use crate::metrics::WriterSnapshot;
use crate::writer::DestinationWriter;

/// Coordinator for one buffer and a set of destination writers
pub struct Worker<B, C>
where
    B: BatchBuffer,
    C: Connector + Send + 'static,
{
    buffer: B,
    writers: Vec<DestinationWriter<C>>,
    /// Size threshold, taken from the primary destination
    maximum_batch_size: usize,
    /// Time threshold, taken from the primary destination
    maximum_wait_time: Duration,
    /// Divisor K for the underloaded signal
    divider: usize,
    last_flush: Option<Instant>,
    cancel: CancellationToken,
}

impl<B, C> Worker<B, C>
where
    B: BatchBuffer,
    C: Connector + Send + 'static,
{
    /// Create a worker
    ///
    /// The first writer is the primary: its thresholds govern flush timing
    /// for the whole worker.
    ///
    /// # Errors
    /// Fails when no writers are configured or the divider is zero.
    pub fn new(
        buffer: B,
        writers: Vec<DestinationWriter<C>>,
        divider: usize,
        cancel: CancellationToken,
    ) -> Result<Self, OutletError> {
        let primary = writers.first().ok_or_else(|| {
            OutletError::config_validation("destinations", "at least one destination is required")
        })?;
        if divider == 0 {
            return Err(OutletError::config_validation(
                "minimum_batch_size_divider",
                "minimum_batch_size_divider must be > 0",
            ));
        }

        let maximum_batch_size = primary.config().maximum_batch_size;
        let maximum_wait_time = primary.config().maximum_wait_time;
        info!(
            destinations = writers.len(),
            primary = primary.name(),
            maximum_batch_size,
            maximum_wait_time_ms = maximum_wait_time.as_millis() as u64,
            "worker created"
        );

        Ok(Self {
            buffer,
            writers,
            maximum_batch_size,
            maximum_wait_time,
            divider,
            last_flush: None,
            cancel,
        })
    }

    /// Mutable access to the batch buffer, for the upstream producer
    pub fn buffer_mut(&mut self) -> &mut B {
        &mut self.buffer
    }

    /// Metric snapshots for all destinations
    pub fn metrics(&self) -> Vec<(String, WriterSnapshot)> {
        self.writers
            .iter()
            .map(|w| (w.name().to_string(), w.metrics().snapshot()))
            .collect()
    }

    /// Finalize the buffer and flush when a threshold is crossed
    ///
    /// Returns the load signal for the pool sizer: `Overloaded` when the
    /// size threshold triggered, `Underloaded` when a time-triggered flush
    /// carried a small batch, `Normal` otherwise. When neither threshold is
    /// crossed no I/O happens and the buffer is left untouched.
    #[instrument(name = "worker_evaluate_and_flush", skip(self))]
    pub async fn evaluate_and_flush(&mut self) -> WorkerStatus {
        self.buffer.finalize();
        let batch_size = self.buffer.row_count();
        let wait_time = self.last_flush.map(|t| t.elapsed());

        let size_triggered = batch_size >= self.maximum_batch_size;
        let time_triggered = wait_time.is_none_or(|w| w >= self.maximum_wait_time);
        if !size_triggered && !time_triggered {
            return WorkerStatus::Normal;
        }

        if let Some(wait) = wait_time {
            observability::record_wait_time(wait.as_secs_f64());
        }

        self.flush().await;
        self.last_flush = Some(Instant::now());

        if size_triggered {
            observability::record_flush_overloaded();
            WorkerStatus::Overloaded
        } else if batch_size <= self.maximum_batch_size / self.divider {
            observability::record_flush_underloaded();
            WorkerStatus::Underloaded
        } else {
            WorkerStatus::Normal
        }
    }

    /// Flush whatever the buffer holds, for shutdown and drain
    ///
    /// No-op on an empty buffer. Returns no load signal.
    #[instrument(name = "worker_force_flush", skip(self))]
    pub async fn force_flush(&mut self) {
        self.buffer.finalize();
        if self.buffer.row_count() == 0 {
            return;
        }
        self.flush().await;
        self.last_flush = Some(Instant::now());
    }

    /// Serialize the buffer once and fan out to every destination
    ///
    /// Waits for every destination task to settle, success or not. Terminal
    /// per-destination errors are logged, never propagated. The buffer is
    /// cleared afterward even when every destination failed.
    async fn flush(&mut self) {
        if self.buffer.row_count() == 0 {
            return;
        }

        let payload = Arc::new(self.buffer.serialize());
        debug!(
            rows = payload.rows,
            bytes = payload.body.len(),
            destinations = self.writers.len(),
            "flushing batch"
        );

        let writers = mem::take(&mut self.writers);
        let names: Vec<String> = writers.iter().map(|w| w.name().to_string()).collect();
        let mut slots: Vec<Option<DestinationWriter<C>>> =
            writers.iter().map(|_| None).collect();

        let mut tasks = JoinSet::new();
        for (idx, mut writer) in writers.into_iter().enumerate() {
            let payload = Arc::clone(&payload);
            let cancel = self.cancel.clone();
            tasks.spawn(async move {
                let result = writer.write_with_retry(&payload, &cancel).await;
                (idx, writer, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, writer, result)) => {
                    if let Err(err) = result {
                        warn!(
                            destination = writer.name(),
                            error = %err,
                            "destination flush failed"
                        );
                    }
                    slots[idx] = Some(writer);
                }
                Err(err) => {
                    error!(error = %err, "destination task aborted");
                }
            }
        }

        // A slot left empty means its task aborted before handing the
        // writer back; the destination drops out of this worker
        for (idx, slot) in slots.iter().enumerate() {
            if slot.is_none() {
                error!(
                    destination = %names[idx],
                    "destination writer lost after task abort, removing from worker"
                );
            }
        }

        self.writers = slots.into_iter().flatten().collect();
        self.buffer.clear();
    }
}
