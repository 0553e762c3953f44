//! Wall-clock access and unique note timestamps.
//!
//! # Responsibility
//! - Abstract "current time" behind [`Clock`] so callers can inject time.
//! - Issue strictly increasing millisecond timestamps for new notes.
//!
//! # Invariants
//! - Every value returned by one [`UniqueTimestamps`] instance is strictly
//!   greater than every value it returned before, across threads, until the
//!   source saturates at `MAX_TIMESTAMP_MS`.
//! - Issued values always lie in `MIN_TIMESTAMP_MS..=MAX_TIMESTAMP_MS`, so
//!   every generated note externalizes and parses back unchanged.
//! - `observe` ignores values further ahead of the clock than
//!   `MAX_OBSERVED_LEAD_MS`; a far-future import cannot pin the counter.

use crate::model::note_format::{MAX_TIMESTAMP_MS, MIN_TIMESTAMP_MS};
use log::{debug, trace, warn};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// How far ahead of the clock an observed timestamp may be and still move
/// the counter. Issued values only run ahead of the clock during bursts.
pub const MAX_OBSERVED_LEAD_MS: i64 = 24 * 60 * 60 * 1000;

/// Source of the current time in Unix epoch milliseconds.
pub trait Clock {
    fn now_epoch_ms(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_epoch_ms(&self) -> i64 {
        (**self).now_epoch_ms()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_epoch_ms(&self) -> i64 {
        (**self).now_epoch_ms()
    }
}

/// Process wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
            // Host clock set before 1970.
            Err(err) => -i64::try_from(err.duration().as_millis()).unwrap_or(i64::MAX),
        }
    }
}

/// Manually driven clock for tests and deterministic replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_epoch_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Issues unique, strictly increasing note timestamps.
///
/// When the clock has moved past the last issued value, the clock reading is
/// used. Otherwise the last issued value is bumped by one millisecond, so a
/// burst of notes created inside the same millisecond (or while the host
/// clock steps backwards) still gets distinct timestamps.
#[derive(Debug)]
pub struct UniqueTimestamps<C: Clock> {
    clock: C,
    last_issued_ms: AtomicI64,
}

impl<C: Clock> UniqueTimestamps<C> {
    /// Creates a source that has not issued anything yet.
    pub fn new(clock: C) -> Self {
        Self::with_last_issued(clock, i64::MIN)
    }

    /// Creates a source that behaves as if `last_issued_ms` was already issued.
    ///
    /// Used to resume after restart so new values never collide with
    /// persisted ones.
    pub fn with_last_issued(clock: C, last_issued_ms: i64) -> Self {
        Self {
            clock,
            last_issued_ms: AtomicI64::new(last_issued_ms),
        }
    }

    /// Returns the next unique timestamp in epoch milliseconds.
    ///
    /// Values are kept inside the externalizable range. Once the counter
    /// reaches `MAX_TIMESTAMP_MS` it keeps returning that value.
    pub fn next_unique_ms(&self) -> i64 {
        let now = self
            .clock
            .now_epoch_ms()
            .clamp(MIN_TIMESTAMP_MS, MAX_TIMESTAMP_MS);
        let mut last = self.last_issued_ms.load(Ordering::Acquire);
        loop {
            let next = if now > last {
                now
            } else {
                last.saturating_add(1).min(MAX_TIMESTAMP_MS)
            };
            match self.last_issued_ms.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    if next == last {
                        warn!(
                            "event=timestamp_saturated module=clock status=error issued_ms={}",
                            next
                        );
                    } else if next != now {
                        trace!(
                            "event=timestamp_bump module=clock status=ok clock_ms={} issued_ms={}",
                            now,
                            next
                        );
                    }
                    return next;
                }
                Err(current) => last = current,
            }
        }
    }

    /// Returns the most recently issued value, or `None` before the first one.
    pub fn last_issued_ms(&self) -> Option<i64> {
        match self.last_issued_ms.load(Ordering::Acquire) {
            i64::MIN => None,
            value => Some(value),
        }
    }

    /// Moves the counter forward so later values exceed `seen_ms`.
    ///
    /// Never moves the counter backwards. Returns `false` and leaves the
    /// counter untouched when `seen_ms` is more than `MAX_OBSERVED_LEAD_MS`
    /// ahead of the clock.
    pub fn observe(&self, seen_ms: i64) -> bool {
        let horizon = self.observe_horizon_ms();
        if seen_ms > horizon {
            debug!(
                "event=timestamp_observe module=clock status=skipped seen_ms={} horizon_ms={}",
                seen_ms, horizon
            );
            return false;
        }
        self.last_issued_ms.fetch_max(seen_ms, Ordering::AcqRel);
        true
    }

    /// Greatest value `observe` currently accepts.
    pub fn observe_horizon_ms(&self) -> i64 {
        self.clock
            .now_epoch_ms()
            .saturating_add(MAX_OBSERVED_LEAD_MS)
            .min(MAX_TIMESTAMP_MS)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl Default for UniqueTimestamps<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, ManualClock, SystemClock, UniqueTimestamps, MAX_OBSERVED_LEAD_MS};
    use crate::model::note_format::{MAX_TIMESTAMP_MS, MIN_TIMESTAMP_MS};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn uses_clock_value_when_it_moved_forward() {
        let clock = ManualClock::new(1_000);
        let source = UniqueTimestamps::new(&clock);

        assert_eq!(source.next_unique_ms(), 1_000);
        clock.set(1_500);
        assert_eq!(source.next_unique_ms(), 1_500);
    }

    #[test]
    fn bumps_by_one_ms_when_clock_did_not_advance() {
        let clock = ManualClock::new(1_000);
        let source = UniqueTimestamps::new(&clock);

        assert_eq!(source.next_unique_ms(), 1_000);
        assert_eq!(source.next_unique_ms(), 1_001);
        assert_eq!(source.next_unique_ms(), 1_002);

        clock.set(1_001);
        assert_eq!(source.next_unique_ms(), 1_003);
        clock.set(1_010);
        assert_eq!(source.next_unique_ms(), 1_010);
    }

    #[test]
    fn backwards_clock_step_keeps_values_increasing() {
        let clock = ManualClock::new(5_000);
        let source = UniqueTimestamps::new(&clock);
        assert_eq!(source.next_unique_ms(), 5_000);

        clock.set(4_000);
        assert_eq!(source.next_unique_ms(), 5_001);
    }

    #[test]
    fn seeded_source_continues_after_last_issued() {
        let source = UniqueTimestamps::with_last_issued(ManualClock::new(100), 900);
        assert_eq!(source.last_issued_ms(), Some(900));
        assert_eq!(source.next_unique_ms(), 901);
    }

    #[test]
    fn observe_never_moves_backwards() {
        let source = UniqueTimestamps::new(ManualClock::new(0));
        assert_eq!(source.last_issued_ms(), None);
        assert!(source.observe(50));
        assert!(source.observe(10));
        assert_eq!(source.last_issued_ms(), Some(50));
        assert_eq!(source.next_unique_ms(), 51);
    }

    #[test]
    fn observe_skips_values_far_ahead_of_the_clock() {
        let source = UniqueTimestamps::new(ManualClock::new(1_000));
        assert!(!source.observe(MAX_TIMESTAMP_MS));
        assert!(!source.observe(1_000 + MAX_OBSERVED_LEAD_MS + 1));
        assert_eq!(source.last_issued_ms(), None);

        assert!(source.observe(1_000 + MAX_OBSERVED_LEAD_MS));
        assert_eq!(source.next_unique_ms(), 1_001 + MAX_OBSERVED_LEAD_MS);
    }

    #[test]
    fn issuing_saturates_at_upper_bound() {
        let source =
            UniqueTimestamps::with_last_issued(ManualClock::new(0), MAX_TIMESTAMP_MS - 1);
        assert_eq!(source.next_unique_ms(), MAX_TIMESTAMP_MS);
        assert_eq!(source.next_unique_ms(), MAX_TIMESTAMP_MS);
        assert_eq!(source.last_issued_ms(), Some(MAX_TIMESTAMP_MS));
    }

    #[test]
    fn clock_outside_format_range_is_clamped() {
        let late = UniqueTimestamps::new(ManualClock::new(i64::MAX));
        assert_eq!(late.next_unique_ms(), MAX_TIMESTAMP_MS);

        let early = UniqueTimestamps::new(ManualClock::new(i64::MIN + 1));
        assert_eq!(early.next_unique_ms(), MIN_TIMESTAMP_MS);
        assert_eq!(early.next_unique_ms(), MIN_TIMESTAMP_MS + 1);
    }

    #[test]
    fn concurrent_callers_never_share_a_value() {
        let source = Arc::new(UniqueTimestamps::new(ManualClock::new(42)));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let source = Arc::clone(&source);
                thread::spawn(move || {
                    (0..250)
                        .map(|_| source.next_unique_ms())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "duplicate timestamp {value}");
            }
        }
        assert_eq!(seen.len(), 1_000);
        assert_eq!(source.last_issued_ms(), Some(42 + 999));
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_epoch_ms() > 1_577_836_800_000);
    }
}
