//! Write-path error types

use thiserror::Error;

/// Failure phase of a write attempt, used for error metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePhase {
    /// Dial or liveness probe failed
    Connect,
    /// Insert failed after a successful connection
    Send,
}

impl WritePhase {
    /// Metric label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Send => "send",
        }
    }
}

/// Errors surfaced by a destination writer
///
/// `Connect` and `Send` are transient: the writer retries them internally
/// and they only appear in logs and metrics. `RetryExhausted` and
/// `Cancelled` are terminal for one write call.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Could not establish a live connection to any server
    #[error("connect to '{destination}' failed on attempt {attempt}: {message}")]
    Connect {
        destination: String,
        attempt: u32,
        message: String,
    },

    /// Insert failed; the connection has been discarded
    #[error("send to '{destination}' failed on attempt {attempt}: {message}")]
    Send {
        destination: String,
        attempt: u32,
        message: String,
    },

    /// Attempt count passed the destination's non-zero ceiling
    #[error("retries exhausted for '{destination}' after {attempts} attempts")]
    RetryExhausted { destination: String, attempts: u32 },

    /// Execution scope ended while connecting or retrying
    #[error("write to '{destination}' cancelled")]
    Cancelled { destination: String },
}

impl WriteError {
    /// Destination this error belongs to
    pub fn destination(&self) -> &str {
        match self {
            Self::Connect { destination, .. }
            | Self::Send { destination, .. }
            | Self::RetryExhausted { destination, .. }
            | Self::Cancelled { destination } => destination,
        }
    }

    /// Failure phase, for transient errors only
    pub fn phase(&self) -> Option<WritePhase> {
        match self {
            Self::Connect { .. } => Some(WritePhase::Connect),
            Self::Send { .. } => Some(WritePhase::Send),
            Self::RetryExhausted { .. } | Self::Cancelled { .. } => None,
        }
    }
}
