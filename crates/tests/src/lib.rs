//! # Integration Tests
//!
//! End-to-end tests across the workspace crates.
//!
//! Covers:
//! - configuration file to running worker
//! - fan-out delivery and partial failure
//! - load signal behavior over a full scenario

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::WorkerStatus::Normal;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{BatchBuffer, RowBatch, WorkerStatus};
    use outlet::testing::MockConnector;
    use outlet::{DestinationWriter, Worker};
    use tokio_util::sync::CancellationToken;

    const DUAL_WRITE_TOML: &str = r#"
minimum_batch_size_divider = 10

[batch]
maximum_batch_size = 100
maximum_wait_time_ms = 5000

[[destinations]]
name = "main"
servers = ["clickhouse-1:8123", "clickhouse-2:8123"]
database = "flows"
username = "default"

[[destinations]]
name = "azure"
servers = ["azure:8123"]
database = "flows"
username = "writer"
password = "secret"
max_retries = 1
"#;

    /// Build a worker from configuration, one mock transport per destination
    fn worker_from_config(
        toml: &str,
    ) -> (Worker<RowBatch, MockConnector>, Vec<MockConnector>) {
        let config = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let divider = config.minimum_batch_size_divider;

        let mut connectors = Vec::new();
        let writers = config
            .normalize()
            .into_iter()
            .map(|dest| {
                let connector = MockConnector::new();
                connectors.push(connector.clone());
                DestinationWriter::new(dest, divider, connector)
            })
            .collect();

        let worker = Worker::new(
            RowBatch::new("flows_raw"),
            writers,
            divider,
            CancellationToken::new(),
        )
        .unwrap();
        (worker, connectors)
    }

    fn fill(worker: &mut Worker<RowBatch, MockConnector>, rows: usize) {
        for i in 0..rows {
            worker
                .buffer_mut()
                .append_row(format!("{{\"seq\":{i}}}").as_bytes());
        }
    }

    /// Full scenario: 10 records, size threshold 100, wait 5s, 6s of
    /// silence. The next evaluation flushes, both destinations receive the
    /// same 10-record payload, and the signal is Underloaded.
    #[tokio::test(start_paused = true)]
    async fn test_e2e_underloaded_dual_write() {
        let (mut worker, connectors) = worker_from_config(DUAL_WRITE_TOML);
        worker.evaluate_and_flush().await;

        fill(&mut worker, 10);
        tokio::time::advance(Duration::from_secs(6)).await;

        let status = worker.evaluate_and_flush().await;
        assert_eq!(status, WorkerStatus::Underloaded);

        let main_payloads = connectors[0].payloads();
        let azure_payloads = connectors[1].payloads();
        assert_eq!(main_payloads.len(), 1);
        assert_eq!(azure_payloads.len(), 1);
        assert_eq!(main_payloads[0].rows, 10);
        assert_eq!(main_payloads[0], azure_payloads[0]);
        assert_eq!(worker.buffer_mut().row_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_e2e_overloaded_on_size_threshold() {
        let (mut worker, connectors) = worker_from_config(DUAL_WRITE_TOML);
        worker.evaluate_and_flush().await;

        fill(&mut worker, 100);
        let status = worker.evaluate_and_flush().await;
        assert_eq!(status, WorkerStatus::Overloaded);
        assert_eq!(connectors[0].insert_count(), 1);
        assert_eq!(connectors[1].insert_count(), 1);
    }

    /// One destination down with a bounded retry budget must not affect
    /// delivery to the other, and the flush must still clear the buffer.
    #[tokio::test(start_paused = true)]
    async fn test_e2e_partial_failure_is_tolerated() {
        let (mut worker, connectors) = worker_from_config(DUAL_WRITE_TOML);
        worker.evaluate_and_flush().await;
        connectors[1].fail_inserts();

        fill(&mut worker, 100);
        let status = worker.evaluate_and_flush().await;
        assert_eq!(status, WorkerStatus::Overloaded);

        let metrics: HashMap<_, _> = worker.metrics().into_iter().collect();
        assert_eq!(metrics["main"].write_count, 1);
        assert_eq!(metrics["azure"].write_count, 0);
        assert_eq!(metrics["azure"].attempt_count, 1);
        assert_eq!(metrics["azure"].retries_exceeded_count, 1);
        assert_eq!(worker.buffer_mut().row_count(), 0);

        // The next flush reaches the recovered destination again
        connectors[1].recover_inserts();
        fill(&mut worker, 100);
        worker.evaluate_and_flush().await;
        let metrics: HashMap<_, _> = worker.metrics().into_iter().collect();
        assert_eq!(metrics["azure"].write_count, 1);
    }

    /// Server failover: the primary's first server is down, delivery still
    /// succeeds via the second.
    #[tokio::test(start_paused = true)]
    async fn test_e2e_failover_within_destination() {
        let (mut worker, connectors) = worker_from_config(DUAL_WRITE_TOML);
        worker.evaluate_and_flush().await;
        connectors[0].fail_dial("clickhouse-1:8123");

        fill(&mut worker, 100);
        let status = worker.evaluate_and_flush().await;
        assert_eq!(status, WorkerStatus::Overloaded);
        assert_eq!(connectors[0].insert_count(), 1);
    }

    /// Small batches select the async insert mode, large ones stay sync;
    /// the payload bytes are the same either way.
    #[tokio::test(start_paused = true)]
    async fn test_e2e_insert_mode_per_destination() {
        let (mut worker, connectors) = worker_from_config(DUAL_WRITE_TOML);
        worker.evaluate_and_flush().await;

        fill(&mut worker, 10);
        tokio::time::advance(Duration::from_secs(6)).await;
        worker.evaluate_and_flush().await;

        fill(&mut worker, 100);
        worker.evaluate_and_flush().await;

        let modes = connectors[0].modes();
        assert_eq!(modes.len(), 2);
        assert!(matches!(modes[0], contracts::InsertMode::Async { .. }));
        assert_eq!(modes[1], contracts::InsertMode::Sync);
    }

    /// Cancellation drains the flush promptly even with an unbounded,
    /// perpetually failing destination.
    #[tokio::test(start_paused = true)]
    async fn test_e2e_cancellation_unblocks_unbounded_retry() {
        let toml = r#"
[batch]
maximum_batch_size = 100
maximum_wait_time_ms = 5000

[[destinations]]
name = "main"
servers = ["clickhouse:8123"]
database = "flows"
"#;
        let config = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let connector = MockConnector::new();
        connector.fail_inserts();
        let writers = config
            .normalize()
            .into_iter()
            .map(|dest| DestinationWriter::new(dest, 10, connector.clone()))
            .collect();

        let cancel = CancellationToken::new();
        let mut worker = Worker::new(
            RowBatch::new("flows_raw"),
            writers,
            10,
            cancel.clone(),
        )
        .unwrap();

        fill(&mut worker, 100);
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            cancel_clone.cancel();
        });

        let status = worker.evaluate_and_flush().await;
        assert_eq!(status, WorkerStatus::Overloaded);
        assert!(connector.insert_count() > 1);
        assert_eq!(worker.buffer_mut().row_count(), 0);

        let metrics: HashMap<_, _> = worker.metrics().into_iter().collect();
        assert_eq!(metrics["main"].retries_exceeded_count, 0);
    }
}
