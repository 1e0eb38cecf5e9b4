//! Timing store: name -> metric, one per request.
//!
//! The store is strict: invalid input comes back as `TimingError`. The
//! best-effort behavior (report and carry on) lives one level up in
//! `Tracker`.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, TimingError};
use crate::metric::{is_valid_label, merge_meta, Meta, Metric};

/// Options for `TimingStore::snapshot`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotOptions {
    /// Persist live durations and mark open metrics complete.
    pub end: bool,
}

impl SnapshotOptions {
    pub fn finalize() -> Self {
        Self { end: true }
    }
}

pub struct TimingStore {
    clock: Arc<dyn Clock>,
    global_meta: Meta,
    metrics: IndexMap<String, Metric>,
}

impl TimingStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_meta(clock, Meta::new())
    }

    /// Store whose metrics all inherit `global_meta`.
    pub fn with_meta(clock: Arc<dyn Clock>, global_meta: Meta) -> Self {
        Self {
            clock,
            global_meta,
            metrics: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    /// Open a metric under `name`, replacing any metric already there.
    /// A replaced metric keeps its position in snapshot order.
    pub fn start(&mut self, name: &str, description: Option<&str>, meta: Option<Meta>) -> Result<()> {
        if !is_valid_label(name) {
            return Err(TimingError::InvalidName(name.to_string()));
        }
        let meta = merge_meta(&self.global_meta, meta);
        let metric = Metric::open(name, description, self.clock.now(), meta);
        self.metrics.insert(name.to_string(), metric);
        Ok(())
    }

    /// Complete the metric under `name`. Ending twice recomputes from the
    /// original start.
    pub fn end(&mut self, name: &str) -> Result<()> {
        if !is_valid_label(name) {
            return Err(TimingError::InvalidName(name.to_string()));
        }
        let now = self.clock.now();
        let metric = self
            .metrics
            .get_mut(name)
            .ok_or_else(|| TimingError::UnknownMetric(name.to_string()))?;
        metric.complete_at(now);
        Ok(())
    }

    /// Copies of all metrics in insertion order.
    ///
    /// Open metrics carry a duration measured now. With `end` set, that
    /// duration is also written back and the metric completed, so later
    /// snapshots return the same value.
    pub fn snapshot(&mut self, opts: SnapshotOptions) -> Vec<Metric> {
        let now = self.clock.now();
        self.metrics
            .values_mut()
            .map(|metric| {
                if metric.is_complete() {
                    metric.clone()
                } else if opts.end {
                    metric.complete_at(now);
                    metric.clone()
                } else {
                    metric.measured_at(now)
                }
            })
            .collect()
    }
}

impl Default for TimingStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl fmt::Debug for TimingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimingStore")
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn store() -> (Arc<ManualClock>, TimingStore) {
        let clock = Arc::new(ManualClock::new());
        let store = TimingStore::new(clock.clone());
        (clock, store)
    }

    #[test]
    fn start_then_end_completes() {
        let (clock, mut s) = store();
        s.start("db", Some("query users"), None).unwrap();
        clock.advance(Duration::from_micros(12_345));
        s.end("db").unwrap();

        let m = s.get("db").unwrap();
        assert!(m.is_complete());
        assert_eq!(m.duration(), Some(12.345));
        assert_eq!(m.description(), Some("query users"));
    }

    #[test]
    fn zero_elapsed_is_still_complete() {
        let (_clock, mut s) = store();
        s.start("db", None, None).unwrap();
        s.end("db").unwrap();
        let m = s.get("db").unwrap();
        assert!(m.is_complete());
        assert_eq!(m.duration(), Some(0.0));
    }

    #[test]
    fn invalid_names_are_rejected() {
        let (_clock, mut s) = store();
        for name in ["", "   ", "\t"] {
            assert_eq!(s.start(name, None, None), Err(TimingError::InvalidName(name.into())));
            assert_eq!(s.end(name), Err(TimingError::InvalidName(name.into())));
        }
        assert!(s.is_empty());
    }

    #[test]
    fn end_unknown_is_lookup_error() {
        let (_clock, mut s) = store();
        s.start("db", None, None).unwrap();
        assert_eq!(s.end("cache"), Err(TimingError::UnknownMetric("cache".into())));
        assert_eq!(s.len(), 1);
        assert!(!s.get("db").unwrap().is_complete());
    }

    #[test]
    fn end_twice_recomputes_from_start() {
        let (clock, mut s) = store();
        s.start("db", None, None).unwrap();
        clock.advance(Duration::from_millis(2));
        s.end("db").unwrap();
        clock.advance(Duration::from_millis(3));
        s.end("db").unwrap();
        assert_eq!(s.get("db").unwrap().duration(), Some(5.0));
    }

    #[test]
    fn restart_replaces_in_place() {
        let (clock, mut s) = store();
        s.start("a", Some("first"), None).unwrap();
        s.start("b", None, None).unwrap();
        clock.advance(Duration::from_millis(4));
        s.start("a", Some("second"), None).unwrap();
        clock.advance(Duration::from_millis(1));

        let snap = s.snapshot(SnapshotOptions::finalize());
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].name(), "a");
        assert_eq!(snap[0].description(), Some("second"));
        assert_eq!(snap[0].duration(), Some(1.0));
        assert_eq!(snap[1].name(), "b");
        assert_eq!(snap[1].duration(), Some(5.0));
    }

    #[test]
    fn empty_snapshot() {
        let (_clock, mut s) = store();
        assert!(s.snapshot(SnapshotOptions::default()).is_empty());
        assert!(s.snapshot(SnapshotOptions::finalize()).is_empty());
    }

    #[test]
    fn live_snapshot_does_not_complete() {
        let (clock, mut s) = store();
        s.start("render", None, None).unwrap();
        clock.advance(Duration::from_millis(2));

        let snap = s.snapshot(SnapshotOptions::default());
        assert_eq!(snap[0].duration(), Some(2.0));
        assert!(!snap[0].is_complete());

        let stored = s.get("render").unwrap();
        assert!(!stored.is_complete());
        assert_eq!(stored.duration(), None);

        clock.advance(Duration::from_millis(3));
        let snap = s.snapshot(SnapshotOptions::finalize());
        assert!(snap[0].is_complete());
        assert_eq!(snap[0].duration(), Some(5.0));
    }

    #[test]
    fn finalizing_snapshot_is_stable() {
        let (clock, mut s) = store();
        s.start("render", None, None).unwrap();
        clock.advance(Duration::from_millis(2));
        let first = s.snapshot(SnapshotOptions::finalize());

        clock.advance(Duration::from_millis(10));
        let second = s.snapshot(SnapshotOptions::finalize());
        let live = s.snapshot(SnapshotOptions::default());

        assert_eq!(first[0].duration(), Some(2.0));
        assert_eq!(second[0].duration(), Some(2.0));
        assert_eq!(live[0].duration(), Some(2.0));
        assert!(s.get("render").unwrap().is_complete());
    }

    #[test]
    fn completed_metrics_are_not_remeasured() {
        let (clock, mut s) = store();
        s.start("a", None, None).unwrap();
        s.start("b", None, None).unwrap();
        clock.advance(Duration::from_millis(1));
        s.end("a").unwrap();
        clock.advance(Duration::from_millis(4));

        let snap = s.snapshot(SnapshotOptions::finalize());
        let names: Vec<_> = snap.iter().map(Metric::name).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(snap[0].duration(), Some(1.0));
        assert_eq!(snap[1].duration(), Some(5.0));
        assert!(snap.iter().all(Metric::is_complete));
    }

    #[test]
    fn snapshot_copies_are_detached() {
        let (clock, mut s) = store();
        s.start("a", None, None).unwrap();
        let snap = s.snapshot(SnapshotOptions::default());
        drop(snap);
        clock.advance(Duration::from_millis(1));
        assert_eq!(s.get("a").unwrap().duration(), None);
    }
}
