//! Side channel for non-fatal misuse reports.
//!
//! Tracker and middleware never return instrumentation errors to request
//! code. They hand them to a `DiagnosticSink` instead; the default sink logs
//! through `tracing`, tests swap in `RecordingSink` to assert on them.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{DiagnosticKind, TimingError};

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, err: &TimingError);
}

/// Logs every report as a `tracing` warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, err: &TimingError) {
        tracing::warn!(kind = err.kind().as_str(), error = %err, "server timing diagnostic");
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<TimingError>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<TimingError> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn kinds(&self) -> Vec<DiagnosticKind> {
        self.reports().iter().map(TimingError::kind).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, err: &TimingError) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(err.clone());
    }
}

/// Default sink shared by trackers that were not given one.
pub fn default_sink() -> Arc<dyn DiagnosticSink> {
    Arc::new(TracingSink)
}
