//! BatchBuffer trait and the row-oriented implementation
//!
//! The buffer is exclusively owned by its flush coordinator: it is never
//! read or mutated by destination tasks. Only the already-serialized
//! [`InsertPayload`] is shared, and that form is immutable.

use bytes::{BufMut, Bytes, BytesMut};

/// Serialized batch handed to every destination within one flush.
///
/// The body is opaque to the write path; cloning is cheap because the
/// underlying bytes are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPayload {
    /// Target table/stream name (derived from schema identity by configuration)
    pub table: String,
    /// Wire-format batch content
    pub body: Bytes,
    /// Number of records in the batch
    pub rows: usize,
}

/// Accumulator of records owned by the flush coordinator
///
/// Lifecycle: created once per coordinator, reused indefinitely across
/// flushes (clear-and-refill, never reallocated). `clear` is called only
/// after all destinations have settled.
pub trait BatchBuffer {
    /// Finish any pending record under construction
    fn finalize(&mut self);

    /// Number of records accumulated since the last clear
    fn row_count(&self) -> usize;

    /// Serialize the current content into an immutable payload
    fn serialize(&self) -> InsertPayload;

    /// Reset the buffer to empty, keeping its allocation
    fn clear(&mut self);
}

/// Newline-delimited row buffer (e.g. JSONEachRow for ClickHouse)
#[derive(Debug)]
pub struct RowBatch {
    table: String,
    buf: BytesMut,
    rows: usize,
}

impl RowBatch {
    /// Create an empty batch targeting the given table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            buf: BytesMut::new(),
            rows: 0,
        }
    }

    /// Append one serialized record
    pub fn append_row(&mut self, row: &[u8]) {
        self.buf.put_slice(row);
        if !row.ends_with(b"\n") {
            self.buf.put_u8(b'\n');
        }
        self.rows += 1;
    }

    /// Target table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Whether the batch holds no records
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

impl BatchBuffer for RowBatch {
    fn finalize(&mut self) {
        // Rows are complete as appended
    }

    fn row_count(&self) -> usize {
        self.rows
    }

    fn serialize(&self) -> InsertPayload {
        InsertPayload {
            table: self.table.clone(),
            body: Bytes::copy_from_slice(&self.buf),
            rows: self.rows,
        }
    }

    fn clear(&mut self) {
        self.buf.clear();
        self.rows = 0;
    }
}
