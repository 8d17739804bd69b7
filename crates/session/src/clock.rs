//! Clock sources.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use chrono::{DateTime, Utc};
use smed_core::Time;

/// Supplies wall-clock timestamps to the run timer.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> Time;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Time {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a test can keep a handle while the
/// session owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Time) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: chrono::Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    /// Move the clock forward by a number of milliseconds.
    pub fn advance_ms(&self, ms: i64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }

    /// Jump to an absolute instant.
    pub fn set(&self, at: Time) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::default())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Time {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::default();
        let handle = clock.clone();
        let start = clock.now();
        handle.advance(chrono::Duration::seconds(90));
        assert_eq!((clock.now() - start).num_milliseconds(), 90_000);
        handle.advance_ms(500);
        assert_eq!((clock.now() - start).num_milliseconds(), 90_500);
    }

    #[test]
    fn test_manual_clock_set_jumps_both_ways() {
        let clock = ManualClock::default();
        let later = clock.now() + chrono::Duration::minutes(10);
        clock.set(later);
        assert_eq!(clock.now(), later);

        let earlier = later - chrono::Duration::minutes(30);
        clock.clone().set(earlier);
        assert_eq!(clock.now(), earlier);
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let a = SystemClock.now();
        let b = SystemClock.now();
        assert!(b >= a);
    }
}
