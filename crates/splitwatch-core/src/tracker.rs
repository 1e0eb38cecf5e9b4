//! Per-request tracker handle.
//!
//! `Tracker` is what request code sees. It wraps one `TimingStore` behind an
//! `Arc<Mutex<_>>` so the handle can sit in request extensions and be cloned
//! into handlers; every clone observes the same store. Calls never fail:
//! misuse is reported to the diagnostics sink and ignored.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::clock::{Clock, SystemClock};
use crate::diagnostics::{default_sink, DiagnosticSink};
use crate::error::Result;
use crate::metric::{Meta, Metric};
use crate::store::{SnapshotOptions, TimingStore};

/// Construction options for `Tracker`.
#[derive(Clone)]
pub struct TrackerOptions {
    pub clock: Arc<dyn Clock>,
    pub diagnostics: Arc<dyn DiagnosticSink>,
    /// Merged into every metric started on this tracker.
    pub meta: Meta,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            diagnostics: default_sink(),
            meta: Meta::new(),
        }
    }
}

impl fmt::Debug for TrackerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerOptions")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct Tracker {
    store: Arc<Mutex<TimingStore>>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::with_options(TrackerOptions::default())
    }

    pub fn with_options(opts: TrackerOptions) -> Self {
        Self {
            store: Arc::new(Mutex::new(TimingStore::with_meta(opts.clock, opts.meta))),
            diagnostics: opts.diagnostics,
        }
    }

    // A poisoned store still holds consistent metrics (every mutation is a
    // single insert or field write), so keep using it.
    fn store(&self) -> MutexGuard<'_, TimingStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // The store guard must be dropped before reporting: a sink may call back
    // into this tracker.
    fn report(&self, result: Result<()>) {
        if let Err(err) = result {
            self.diagnostics.report(&err);
        }
    }

    /// Start timing `name`. Restarting an existing name replaces it.
    pub fn start(&self, name: &str, description: Option<&str>) {
        let result = self.store().start(name, description, None);
        self.report(result);
    }

    /// Like `start`, with metadata that overrides the tracker-wide metadata.
    pub fn start_with_meta(&self, name: &str, description: Option<&str>, meta: Meta) {
        let result = self.store().start(name, description, Some(meta));
        self.report(result);
    }

    /// Stop timing `name`.
    pub fn end(&self, name: &str) {
        let result = self.store().end(name);
        self.report(result);
    }

    pub fn snapshot(&self, opts: SnapshotOptions) -> Vec<Metric> {
        self.store().snapshot(opts)
    }

    /// Snapshot that completes every open metric.
    pub fn finalize(&self) -> Vec<Metric> {
        self.snapshot(SnapshotOptions::finalize())
    }

    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker").field("store", &*self.store()).finish()
    }
}
