//! WorkerStatus - load signal returned by the flush coordinator
//!
//! An external pool sizer interprets repeated signals into scale-up or
//! scale-down decisions; the coordinator itself never scales anything.

/// Load signal computed from the primary destination's batch size at flush time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    /// The worker is operating in the correct range of efficiency
    Normal,
    /// The worker has too much work and more workers would help
    Overloaded,
    /// The worker does not have enough work
    Underloaded,
}
