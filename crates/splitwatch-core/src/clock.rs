//! Monotonic clock abstraction.
//!
//! The store never calls `Instant::now()` directly; it asks a `Clock`. The
//! system clock is used in production, `ManualClock` in tests where durations
//! must be exact.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Source of monotonic time points.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// `Instant::now()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += by;
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }
}

/// Milliseconds between two instants, rounded to the nearest microsecond.
/// Saturates at zero if `to` precedes `from`.
pub fn elapsed_millis(from: Instant, to: Instant) -> f64 {
    let nanos = to.saturating_duration_since(from).as_nanos();
    let micros = (nanos + 500) / 1_000;
    micros as f64 / 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_only_on_demand() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        assert_eq!(clock.now(), t0);

        clock.advance(Duration::from_millis(7));
        assert_eq!(clock.now().duration_since(t0), Duration::from_millis(7));
    }

    #[test]
    fn elapsed_millis_keeps_three_decimals() {
        let t0 = Instant::now();
        assert_eq!(elapsed_millis(t0, t0 + Duration::from_micros(12_345)), 12.345);
        assert_eq!(elapsed_millis(t0, t0 + Duration::from_nanos(1_499)), 0.001);
        assert_eq!(elapsed_millis(t0, t0 + Duration::from_nanos(1_500)), 0.002);
        assert_eq!(elapsed_millis(t0, t0 + Duration::from_secs(6)), 6000.0);
    }

    #[test]
    fn elapsed_millis_saturates() {
        let t0 = Instant::now();
        let later = t0 + Duration::from_millis(3);
        assert_eq!(elapsed_millis(later, t0), 0.0);
    }
}
