//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Delivery Model
//! - Records accumulate in a single-owner batch buffer
//! - A flush serializes the buffer once and hands the same payload to every
//!   configured destination independently

mod batch;
mod config;
mod destination;
mod error;
mod status;
mod transport;

pub use batch::*;
pub use config::*;
pub use destination::*;
pub use error::*;
pub use status::*;
pub use transport::*;
