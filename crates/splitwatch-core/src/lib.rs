//! splitwatch core: per-request timing tracker and `Server-Timing` rendering.
//!
//! This crate holds the timing store, the tracker handle handed to request
//! code, the header serializer, and the error/diagnostic surface shared with
//! the gateway. It intentionally carries no transport or runtime dependencies
//! so it can be reused outside of axum.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Instrumentation must never take down the instrumented request, so misuse
//! surfaces as `TimingError` values routed to a `DiagnosticSink`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod clock;
pub mod diagnostics;
pub mod error;
pub mod header;
pub mod metric;
pub mod store;
pub mod tracker;

/// Shared result type.
pub use error::{DiagnosticKind, Result, TimingError};
pub use metric::Metric;
pub use store::{SnapshotOptions, TimingStore};
pub use tracker::{Tracker, TrackerOptions};
