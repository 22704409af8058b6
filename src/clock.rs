//! Time source for server-assigned timestamps.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Source of the current time, injected into the [`Ledger`](crate::Ledger).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Used by tests and benches.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Smallest step used to keep per-client timestamps strictly increasing.
pub fn tick() -> Duration {
    Duration::microseconds(1)
}

/// `now`, or one tick after `last` when the clock has not moved past it.
pub fn strictly_after(now: DateTime<Utc>, last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match last {
        Some(last) if now <= last => last + tick(),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, minute, 0).unwrap()
    }

    #[test]
    fn strictly_after_keeps_a_later_now() {
        assert_eq!(strictly_after(at(5), Some(at(3))), at(5));
        assert_eq!(strictly_after(at(5), None), at(5));
    }

    #[test]
    fn strictly_after_bumps_a_stale_now() {
        assert_eq!(strictly_after(at(5), Some(at(5))), at(5) + tick());
        assert_eq!(strictly_after(at(1), Some(at(5))), at(5) + tick());
    }

    #[test]
    fn manual_clock_moves_on_demand() {
        let clock = ManualClock::new(at(0));
        assert_eq!(clock.now(), at(0));
        clock.advance(Duration::minutes(2));
        assert_eq!(clock.now(), at(2));
        clock.set(at(7));
        assert_eq!(clock.now(), at(7));
    }
}
