//! Injectable time source.
//!
//! Every time-sensitive component (lock staleness, retry backoff, the
//! dispatcher's due-job query) takes an `Arc<dyn Clock>` constructor
//! dependency instead of calling `Utc::now()` directly, so tests can move
//! time deterministically with [`ManualClock`].

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::DateTime;

use crate::types::Timestamp;

/// A source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock. The production implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now()
    }
}

/// A clock that only moves when told to. Intended for tests.
///
/// Stores the current instant as milliseconds since the Unix epoch, so
/// `advance`/`set` are atomic and the clock is freely shareable across
/// tasks.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now_ms: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Move the clock forward (or backward, with a negative duration).
    pub fn advance(&self, by: chrono::Duration) {
        self.now_ms
            .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    /// Set the clock to an absolute instant.
    pub fn set(&self, to: Timestamp) {
        self.now_ms.store(to.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        DateTime::from_timestamp_millis(self.now_ms.load(Ordering::SeqCst))
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn manual_clock_starts_where_told() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), start + Duration::seconds(90));
    }

    #[test]
    fn manual_clock_set_overrides() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
