//! Scriptable in-memory transport for tests
//!
//! Records every dial/ping/insert and lets tests inject failures per server
//! or for all inserts. Shared by the unit tests here and the end-to-end
//! tests in the `tests` crate.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use contracts::{Connection, Connector, InsertMode, InsertPayload, OutletError};

#[derive(Debug, Default)]
struct MockState {
    fail_dial: Mutex<HashSet<String>>,
    fail_ping: Mutex<HashMap<String, u32>>,
    fail_inserts: AtomicBool,
    panic_inserts: AtomicBool,
    dial_count: AtomicU64,
    ping_count: AtomicU64,
    insert_count: AtomicU64,
    payloads: Mutex<Vec<InsertPayload>>,
    modes: Mutex<Vec<InsertMode>>,
}

/// Connector whose behavior is scripted by the test
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every dial to this server fail
    pub fn fail_dial(&self, server: &str) {
        self.state
            .fail_dial
            .lock()
            .unwrap()
            .insert(server.to_string());
    }

    /// Make the next liveness probe against this server fail
    pub fn fail_ping_once(&self, server: &str) {
        *self
            .state
            .fail_ping
            .lock()
            .unwrap()
            .entry(server.to_string())
            .or_insert(0) += 1;
    }

    /// Make every insert fail
    pub fn fail_inserts(&self) {
        self.state.fail_inserts.store(true, Ordering::Relaxed);
    }

    /// Let inserts succeed again
    pub fn recover_inserts(&self) {
        self.state.fail_inserts.store(false, Ordering::Relaxed);
    }

    /// Make every insert panic, simulating a crashing destination task
    pub fn panic_inserts(&self) {
        self.state.panic_inserts.store(true, Ordering::Relaxed);
    }

    pub fn dial_count(&self) -> u64 {
        self.state.dial_count.load(Ordering::Relaxed)
    }

    pub fn ping_count(&self) -> u64 {
        self.state.ping_count.load(Ordering::Relaxed)
    }

    pub fn insert_count(&self) -> u64 {
        self.state.insert_count.load(Ordering::Relaxed)
    }

    /// Payloads received by successful and failed inserts, in order
    pub fn payloads(&self) -> Vec<InsertPayload> {
        self.state.payloads.lock().unwrap().clone()
    }

    /// Insert modes received, in order
    pub fn modes(&self) -> Vec<InsertMode> {
        self.state.modes.lock().unwrap().clone()
    }
}

/// Connection handle produced by [`MockConnector`]
#[derive(Debug)]
pub struct MockConnection {
    server: String,
    state: Arc<MockState>,
}

impl Connection for MockConnection {
    async fn ping(&mut self) -> Result<(), OutletError> {
        self.state.ping_count.fetch_add(1, Ordering::Relaxed);
        let mut fail_ping = self.state.fail_ping.lock().unwrap();
        if let Some(remaining) = fail_ping.get_mut(&self.server) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(OutletError::transport(format!(
                    "ping to {} failed",
                    self.server
                )));
            }
        }
        Ok(())
    }

    async fn insert(
        &mut self,
        payload: &InsertPayload,
        mode: InsertMode,
    ) -> Result<(), OutletError> {
        self.state.insert_count.fetch_add(1, Ordering::Relaxed);
        self.state.payloads.lock().unwrap().push(payload.clone());
        self.state.modes.lock().unwrap().push(mode);
        if self.state.panic_inserts.load(Ordering::Relaxed) {
            panic!("insert on {} panicked", self.server);
        }
        if self.state.fail_inserts.load(Ordering::Relaxed) {
            return Err(OutletError::transport(format!(
                "insert on {} failed",
                self.server
            )));
        }
        Ok(())
    }
}

impl Connector for MockConnector {
    type Conn = MockConnection;

    async fn dial(&self, server: &str) -> Result<Self::Conn, OutletError> {
        self.state.dial_count.fetch_add(1, Ordering::Relaxed);
        if self.state.fail_dial.lock().unwrap().contains(server) {
            return Err(OutletError::transport(format!(
                "dial to {server} refused"
            )));
        }
        Ok(MockConnection {
            server: server.to_string(),
            state: Arc::clone(&self.state),
        })
    }
}
