//! Write-path metric recorders
//!
//! Fire-and-forget: recording goes through the global `metrics` recorder
//! and never affects write correctness. All names carry the `outlet_`
//! prefix.

use metrics::{counter, histogram};

/// Record the number of rows delivered to a destination
pub fn record_batch_rows(destination: &str, rows: usize) {
    histogram!("outlet_batch_rows", "destination" => destination.to_string()).record(rows as f64);
}

/// Record how long the coordinator waited before flushing, in seconds
pub fn record_wait_time(seconds: f64) {
    histogram!("outlet_wait_time_seconds").record(seconds);
}

/// Record one insert duration, in seconds
pub fn record_insert_time(destination: &str, seconds: f64) {
    histogram!("outlet_insert_time_seconds", "destination" => destination.to_string())
        .record(seconds);
}

/// Count a flush triggered by the size threshold
pub fn record_flush_overloaded() {
    counter!("outlet_flushes_overloaded_total").increment(1);
}

/// Count a time-triggered flush that carried a small batch
pub fn record_flush_underloaded() {
    counter!("outlet_flushes_underloaded_total").increment(1);
}

/// Count one failed write attempt, keyed by destination and phase
///
/// `phase` is `"connect"` or `"send"`.
pub fn record_write_error(destination: &str, phase: &str) {
    counter!(
        "outlet_errors_total",
        "destination" => destination.to_string(),
        "error" => phase.to_string()
    )
    .increment(1);
}

/// Count one batch dropped after retry exhaustion
pub fn record_retries_exceeded(destination: &str) {
    counter!(
        "outlet_retries_exceeded_total",
        "destination" => destination.to_string()
    )
    .increment(1);
}
