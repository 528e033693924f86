//! Per-writer counters for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single destination writer
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Total write attempts executed
    attempt_count: AtomicU64,
    /// Total successful writes
    write_count: AtomicU64,
    /// Total connect-phase failures
    connect_error_count: AtomicU64,
    /// Total send-phase failures
    send_error_count: AtomicU64,
    /// Total batches dropped after retry exhaustion
    retries_exceeded_count: AtomicU64,
}

impl WriterMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total attempt count
    pub fn attempt_count(&self) -> u64 {
        self.attempt_count.load(Ordering::Relaxed)
    }

    /// Increment attempt count
    pub fn inc_attempt_count(&self) {
        self.attempt_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total write count
    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Increment write count
    pub fn inc_write_count(&self) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get connect error count
    pub fn connect_error_count(&self) -> u64 {
        self.connect_error_count.load(Ordering::Relaxed)
    }

    /// Increment connect error count
    pub fn inc_connect_error_count(&self) {
        self.connect_error_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get send error count
    pub fn send_error_count(&self) -> u64 {
        self.send_error_count.load(Ordering::Relaxed)
    }

    /// Increment send error count
    pub fn inc_send_error_count(&self) {
        self.send_error_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get retries exceeded count
    pub fn retries_exceeded_count(&self) -> u64 {
        self.retries_exceeded_count.load(Ordering::Relaxed)
    }

    /// Increment retries exceeded count
    pub fn inc_retries_exceeded_count(&self) {
        self.retries_exceeded_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> WriterSnapshot {
        WriterSnapshot {
            attempt_count: self.attempt_count(),
            write_count: self.write_count(),
            connect_error_count: self.connect_error_count(),
            send_error_count: self.send_error_count(),
            retries_exceeded_count: self.retries_exceeded_count(),
        }
    }
}

/// Snapshot of writer metrics (for reporting)
#[derive(Debug, Clone, Copy)]
pub struct WriterSnapshot {
    pub attempt_count: u64,
    pub write_count: u64,
    pub connect_error_count: u64,
    pub send_error_count: u64,
    pub retries_exceeded_count: u64,
}
