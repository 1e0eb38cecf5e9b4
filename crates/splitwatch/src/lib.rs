//! Top-level facade crate for splitwatch.
//!
//! Re-exports the core tracker and the axum gateway so users can depend on a
//! single crate.

pub mod core {
    pub use splitwatch_core::*;
}

pub mod gateway {
    pub use splitwatch_gateway::*;
}

pub use splitwatch_core::{Metric, SnapshotOptions, Tracker};
pub use splitwatch_gateway::{with_server_timing, ServerTimingOptions, Timing, WriteHeaders};
