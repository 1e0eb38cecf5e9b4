//! One named timing measurement.

use std::time::Instant;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::clock::elapsed_millis;

/// Free-form metadata attached to a metric.
pub type Meta = Map<String, Value>;

/// Metric names must be non-empty once surrounding whitespace is removed.
pub fn is_valid_label(name: &str) -> bool {
    !name.trim().is_empty()
}

/// A named measurement tracked during one request.
///
/// The start instant is private: it only feeds duration computation. Copies
/// handed out by snapshots can be inspected and serialized freely without
/// touching the store they came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip)]
    start: Instant,
    duration: Option<f64>,
    complete: bool,
    #[serde(skip_serializing_if = "Map::is_empty")]
    meta: Meta,
}

impl Metric {
    /// Open a metric at `start`. An empty description counts as none.
    pub(crate) fn open(name: &str, description: Option<&str>, start: Instant, meta: Meta) -> Self {
        Self {
            name: name.to_string(),
            description: description.filter(|d| !d.is_empty()).map(str::to_string),
            start,
            duration: None,
            complete: false,
            meta,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Duration in milliseconds (3 decimal places), if computed.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub(crate) fn elapsed_at(&self, now: Instant) -> f64 {
        elapsed_millis(self.start, now)
    }

    /// Fix the duration as of `now` and mark the metric complete.
    pub(crate) fn complete_at(&mut self, now: Instant) {
        self.duration = Some(self.elapsed_at(now));
        self.complete = true;
    }

    /// Copy with a live duration as of `now`; the original is untouched.
    pub(crate) fn measured_at(&self, now: Instant) -> Self {
        let mut copy = self.clone();
        copy.duration = Some(self.elapsed_at(now));
        copy
    }
}

/// Merge global metadata with per-metric metadata; per-metric keys win.
pub(crate) fn merge_meta(global: &Meta, local: Option<Meta>) -> Meta {
    let mut merged = global.clone();
    if let Some(local) = local {
        merged.extend(local);
    }
    merged
}
