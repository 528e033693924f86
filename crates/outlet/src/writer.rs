//! Destination writer - connection management and write-with-retry
//!
//! One writer owns at most one live connection to one server of its
//! destination. The connection is discarded on any I/O failure so the next
//! attempt reconnects fresh. Flushes of one writer are never concurrent.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use contracts::{Connection, Connector, DestinationConfig, InsertMode, InsertPayload};

use crate::error::{WriteError, WritePhase};
use crate::metrics::WriterMetrics;
use crate::retry::{RetryLimit, RetryPolicy};

/// Writer for one configured destination
pub struct DestinationWriter<C: Connector> {
    config: DestinationConfig,
    divider: usize,
    connector: C,
    conn: Option<C::Conn>,
    policy: RetryPolicy,
    limit: RetryLimit,
    metrics: Arc<WriterMetrics>,
}

impl<C: Connector> DestinationWriter<C> {
    /// Create a writer with the default backoff schedule
    pub fn new(config: DestinationConfig, divider: usize, connector: C) -> Self {
        let limit = RetryLimit::from_max_retries(config.max_retries);
        Self {
            divider,
            connector,
            conn: None,
            policy: RetryPolicy::default(),
            limit,
            metrics: Arc::new(WriterMetrics::new()),
            config,
        }
    }

    /// Destination name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Destination configuration
    pub fn config(&self) -> &DestinationConfig {
        &self.config
    }

    /// Shared handle to this writer's counters
    pub fn metrics(&self) -> Arc<WriterMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Insert mode for the given batch size
    ///
    /// Batches at or below `maximum_batch_size / divider` use the async,
    /// wait-for-ack mode to amortize per-insert overhead.
    fn insert_mode(&self, rows: usize) -> InsertMode {
        if rows <= self.config.maximum_batch_size / self.divider {
            InsertMode::Async {
                busy_timeout: self.config.busy_timeout(),
            }
        } else {
            InsertMode::Sync
        }
    }

    /// Deliver one payload, retrying with exponential backoff
    ///
    /// Transient connect/send failures are retried until the attempt ceiling
    /// is hit (`RetryExhausted`) or the token is cancelled (`Cancelled`).
    /// A destination with `max_retries = 0` retries indefinitely; only
    /// cancellation ends a stalled call.
    pub async fn write_with_retry(
        &mut self,
        payload: &InsertPayload,
        cancel: &CancellationToken,
    ) -> Result<(), WriteError> {
        let mode = self.insert_mode(payload.rows);
        let mut attempts: u32 = 0;

        loop {
            if self.limit.exceeded(attempts) {
                self.metrics.inc_retries_exceeded_count();
                observability::record_retries_exceeded(&self.config.name);
                warn!(
                    destination = %self.config.name,
                    attempts,
                    rows = payload.rows,
                    "retry budget exhausted, dropping batch"
                );
                return Err(WriteError::RetryExhausted {
                    destination: self.config.name.clone(),
                    attempts,
                });
            }

            if attempts > 0 {
                let delay = self.policy.backoff(attempts - 1);
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(WriteError::Cancelled {
                            destination: self.config.name.clone(),
                        });
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            attempts += 1;
            self.metrics.inc_attempt_count();

            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(WriteError::Cancelled {
                        destination: self.config.name.clone(),
                    });
                }
                res = self.try_write(payload, mode, attempts) => res,
            };

            match result {
                Ok(elapsed) => {
                    self.metrics.inc_write_count();
                    observability::record_insert_time(&self.config.name, elapsed.as_secs_f64());
                    observability::record_batch_rows(&self.config.name, payload.rows);
                    debug!(
                        destination = %self.config.name,
                        rows = payload.rows,
                        elapsed_ms = elapsed.as_millis() as u64,
                        attempt = attempts,
                        "batch written"
                    );
                    return Ok(());
                }
                Err(err) => {
                    match err.phase() {
                        Some(WritePhase::Connect) => self.metrics.inc_connect_error_count(),
                        Some(WritePhase::Send) => self.metrics.inc_send_error_count(),
                        None => {}
                    }
                    if let Some(phase) = err.phase() {
                        observability::record_write_error(&self.config.name, phase.as_str());
                    }
                    warn!(
                        destination = %self.config.name,
                        attempt = attempts,
                        error = %err,
                        "write attempt failed"
                    );
                }
            }
        }
    }

    /// Execute one write attempt, returning the insert duration
    async fn try_write(
        &mut self,
        payload: &InsertPayload,
        mode: InsertMode,
        attempt: u32,
    ) -> Result<std::time::Duration, WriteError> {
        self.ensure_connected(attempt).await?;
        let Some(conn) = self.conn.as_mut() else {
            return Err(WriteError::Connect {
                destination: self.config.name.clone(),
                attempt,
                message: "no live connection".to_string(),
            });
        };

        let start = Instant::now();
        if let Err(err) = conn.insert(payload, mode).await {
            // Connection state is unknown after a failed insert
            self.conn = None;
            return Err(WriteError::Send {
                destination: self.config.name.clone(),
                attempt,
                message: err.to_string(),
            });
        }
        Ok(start.elapsed())
    }

    /// Ensure a healthy live connection exists
    ///
    /// An existing connection is probed and reused when healthy. Otherwise
    /// the candidate servers are tried in a fresh random permutation; the
    /// first one that dials and probes successfully becomes the live
    /// connection. All candidates failing yields the last observed error.
    async fn ensure_connected(&mut self, attempt: u32) -> Result<(), WriteError> {
        if let Some(conn) = self.conn.as_mut() {
            match conn.ping().await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    debug!(
                        destination = %self.config.name,
                        error = %err,
                        "live connection unhealthy, reconnecting"
                    );
                    self.conn = None;
                }
            }
        }

        let order = {
            let mut order: Vec<usize> = (0..self.config.servers.len()).collect();
            order.shuffle(&mut rand::rng());
            order
        };

        let mut last_error = "no servers configured".to_string();
        for idx in order {
            let server = &self.config.servers[idx];
            match self.connector.dial(server).await {
                Ok(mut conn) => match conn.ping().await {
                    Ok(()) => {
                        debug!(
                            destination = %self.config.name,
                            server = %server,
                            "connected"
                        );
                        self.conn = Some(conn);
                        return Ok(());
                    }
                    Err(err) => last_error = err.to_string(),
                },
                Err(err) => last_error = err.to_string(),
            }
        }

        Err(WriteError::Connect {
            destination: self.config.name.clone(),
            attempt,
            message: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockConnector;
    use bytes::Bytes;
    use std::time::Duration;

    fn config(name: &str, servers: &[&str], max_retries: u32) -> DestinationConfig {
        DestinationConfig {
            name: name.to_string(),
            servers: servers.iter().map(|s| s.to_string()).collect(),
            database: "flows".to_string(),
            username: "default".to_string(),
            password: None,
            maximum_batch_size: 100,
            maximum_wait_time: Duration::from_secs(5),
            async_insert_busy_timeout: None,
            max_retries,
        }
    }

    fn payload(rows: usize) -> InsertPayload {
        InsertPayload {
            table: "flows".to_string(),
            body: Bytes::from_static(b"{\"a\":1}\n"),
            rows,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_succeeds_first_attempt() {
        let connector = MockConnector::new();
        let mut writer = DestinationWriter::new(config("main", &["a:9000"], 0), 10, connector.clone());
        let cancel = CancellationToken::new();

        let result = writer.write_with_retry(&payload(5), &cancel).await;
        assert!(result.is_ok());
        assert_eq!(connector.insert_count(), 1);
        assert_eq!(writer.metrics().write_count(), 1);
        assert_eq!(writer.metrics().attempt_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausted_after_ceiling() {
        let connector = MockConnector::new();
        connector.fail_inserts();
        let mut writer = DestinationWriter::new(config("azure", &["a:9000"], 3), 10, connector.clone());
        let cancel = CancellationToken::new();

        let result = writer.write_with_retry(&payload(5), &cancel).await;
        match result {
            Err(WriteError::RetryExhausted {
                destination,
                attempts,
            }) => {
                assert_eq!(destination, "azure");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
        assert_eq!(connector.insert_count(), 3);
        assert_eq!(writer.metrics().send_error_count(), 3);
        assert_eq!(writer.metrics().retries_exceeded_count(), 1);
        assert_eq!(writer.metrics().write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_retry_means_single_attempt() {
        let connector = MockConnector::new();
        connector.fail_inserts();
        let mut writer = DestinationWriter::new(config("main", &["a:9000"], 1), 10, connector.clone());
        let cancel = CancellationToken::new();

        let result = writer.write_with_retry(&payload(5), &cancel).await;
        assert!(matches!(
            result,
            Err(WriteError::RetryExhausted { attempts: 1, .. })
        ));
        assert_eq!(connector.insert_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failover_to_healthy_server_and_reuse() {
        let connector = MockConnector::new();
        connector.fail_dial("a:9000");
        connector.fail_dial("b:9000");
        let mut writer = DestinationWriter::new(
            config("main", &["a:9000", "b:9000", "c:9000"], 0),
            10,
            connector.clone(),
        );
        let cancel = CancellationToken::new();

        writer.write_with_retry(&payload(5), &cancel).await.unwrap();
        let dials_after_first = connector.dial_count();
        assert!(dials_after_first >= 1);

        // Healthy connection is reused, no new dial
        writer.write_with_retry(&payload(5), &cancel).await.unwrap();
        assert_eq!(connector.dial_count(), dials_after_first);
        assert_eq!(connector.insert_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_triggers_reconnect() {
        let connector = MockConnector::new();
        let mut writer = DestinationWriter::new(config("main", &["a:9000"], 0), 10, connector.clone());
        let cancel = CancellationToken::new();

        writer.write_with_retry(&payload(5), &cancel).await.unwrap();
        assert_eq!(connector.dial_count(), 1);

        // Unhealthy probe discards the connection and redials
        connector.fail_ping_once("a:9000");
        writer.write_with_retry(&payload(5), &cancel).await.unwrap();
        assert_eq!(connector.dial_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_servers_down_yields_connect_errors() {
        let connector = MockConnector::new();
        connector.fail_dial("a:9000");
        connector.fail_dial("b:9000");
        let mut writer = DestinationWriter::new(
            config("main", &["a:9000", "b:9000"], 2),
            10,
            connector.clone(),
        );
        let cancel = CancellationToken::new();

        let result = writer.write_with_retry(&payload(5), &cancel).await;
        assert!(matches!(result, Err(WriteError::RetryExhausted { .. })));
        assert_eq!(writer.metrics().connect_error_count(), 2);
        assert_eq!(connector.insert_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_retry_ends_in_cancellation() {
        let connector = MockConnector::new();
        connector.fail_inserts();
        let mut writer = DestinationWriter::new(config("main", &["a:9000"], 0), 10, connector.clone());
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            cancel_clone.cancel();
        });

        let result = writer.write_with_retry(&payload(5), &cancel).await;
        assert!(matches!(result, Err(WriteError::Cancelled { .. })));
        // Kept retrying until cancelled, never gave up on its own
        assert!(connector.insert_count() > 1);
        assert_eq!(writer.metrics().retries_exceeded_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_mode_selection() {
        let connector = MockConnector::new();
        // maximum_batch_size 100, divider 10: threshold is 10 rows
        let mut writer = DestinationWriter::new(config("main", &["a:9000"], 0), 10, connector.clone());
        let cancel = CancellationToken::new();

        writer.write_with_retry(&payload(10), &cancel).await.unwrap();
        writer.write_with_retry(&payload(11), &cancel).await.unwrap();

        let modes = connector.modes();
        assert_eq!(modes.len(), 2);
        assert!(matches!(modes[0], InsertMode::Async { .. }));
        assert_eq!(modes[1], InsertMode::Sync);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_mode_uses_busy_timeout_fallback() {
        let connector = MockConnector::new();
        let mut writer = DestinationWriter::new(config("main", &["a:9000"], 0), 10, connector.clone());
        let cancel = CancellationToken::new();

        writer.write_with_retry(&payload(1), &cancel).await.unwrap();
        // No explicit busy timeout configured: falls back to the wait time
        assert_eq!(
            connector.modes()[0],
            InsertMode::Async {
                busy_timeout: Duration::from_secs(5)
            }
        );
    }
}
