//! Retry policy: exponential backoff schedule plus an attempt ceiling
//!
//! The two knobs are independent: the backoff schedule decides how long to
//! sleep between attempts, the limit decides when to give up. The schedule
//! has no elapsed-time ceiling; only the attempt count can end a retry loop.

use std::time::Duration;

/// Initial backoff interval
pub const INITIAL_INTERVAL: Duration = Duration::from_millis(20);
/// Backoff interval cap
pub const MAXIMUM_INTERVAL: Duration = Duration::from_secs(30);

/// Exponential backoff schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Delay after the first failure
    pub initial_interval: Duration,
    /// Upper bound on any single delay
    pub maximum_interval: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: INITIAL_INTERVAL,
            maximum_interval: MAXIMUM_INTERVAL,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the given number of failed attempts (0-based)
    pub fn backoff(&self, failures: u32) -> Duration {
        // Any exponent past 64 is far above the cap already; clamping keeps
        // the cast to i32 lossless
        let exponent = failures.min(64) as i32;
        let cap = self.maximum_interval.as_secs_f64();
        let delay = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(cap))
    }
}

/// Attempt ceiling for one write call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
    /// Retry until success or cancellation
    Unbounded,
    /// Give up permanently after this many attempts
    Bounded(u32),
}

impl RetryLimit {
    /// Map the configured `max_retries` value (0 = unbounded)
    pub fn from_max_retries(max_retries: u32) -> Self {
        if max_retries == 0 {
            Self::Unbounded
        } else {
            Self::Bounded(max_retries)
        }
    }

    /// Whether the given number of executed attempts has used up the budget
    pub fn exceeded(&self, attempts: u32) -> bool {
        match self {
            Self::Unbounded => false,
            Self::Bounded(max) => attempts >= *max,
        }
    }
}
