//! Transport traits - the write path's view of a storage backend
//!
//! A `Connector` dials one server; a `Connection` is a live handle that can
//! be probed and written to. A connection is exclusively owned by one
//! destination writer and discarded on any I/O failure.

use std::time::Duration;

use crate::{InsertPayload, OutletError};

/// Insert behavior selected per batch
///
/// Small batches use the asynchronous, wait-for-ack mode to amortize
/// per-insert overhead; everything else uses the default synchronous mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Default synchronous insert
    Sync,
    /// Async insert, acknowledged once flushed server-side
    Async {
        /// Upper bound on server-side buffering before the insert is flushed
        busy_timeout: Duration,
    },
}

/// Live handle to one server of a destination
#[trait_variant::make(Connection: Send)]
pub trait LocalConnection {
    /// Liveness probe
    ///
    /// # Errors
    /// Returns a transport error if the server is unreachable or unhealthy.
    async fn ping(&mut self) -> Result<(), OutletError>;

    /// Execute one write attempt
    ///
    /// # Errors
    /// Returns a transport error on failure; the caller must discard the
    /// connection and reconnect before the next attempt.
    async fn insert(
        &mut self,
        payload: &InsertPayload,
        mode: InsertMode,
    ) -> Result<(), OutletError>;
}

/// Factory for connections to a destination's servers
#[trait_variant::make(Connector: Send)]
pub trait LocalConnector {
    /// Connection type produced by this connector
    type Conn: Connection + Send + 'static;

    /// Open a connection to a single server address
    ///
    /// # Errors
    /// Returns a transport error if the server cannot be reached.
    async fn dial(&self, server: &str) -> Result<Self::Conn, OutletError>;
}
