//! splitwatch gateway library entry.
//!
//! This crate wires the core tracker into axum: the `Server-Timing`
//! middleware, the typed request context, the response lifecycle that
//! drives header emission, and the YAML config used by the demo binary.
//! It is consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod context;
pub mod lifecycle;
pub mod middleware;
pub mod router;

pub use context::{Timing, TimingScopes};
pub use middleware::{server_timing, with_server_timing, ServerTimingOptions, WriteHeaders};
