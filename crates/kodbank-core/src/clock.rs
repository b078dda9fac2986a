//! Time source abstraction.
//!
//! Every expiry decision (session lifetime, access token validity) reads the
//! current time through [`Clock`], so tests can move time forward without
//! sleeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current Unix time in seconds.
pub trait Clock: Send + Sync {
    /// Current Unix timestamp in seconds.
    fn now_unix(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn now_unix(&self) -> i64 {
        (**self).now_unix()
    }
}

/// Unix timestamp `ttl` after `now`, saturating at `i64::MAX`.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use kodbank_core::clock::expires_after;
///
/// assert_eq!(expires_after(1_000, Duration::from_secs(60)), 1_060);
/// assert_eq!(expires_after(1_000, Duration::from_secs(u64::MAX)), i64::MAX);
/// ```
#[inline]
pub fn expires_after(now: i64, ttl: Duration) -> i64 {
    now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    #[allow(clippy::cast_possible_wrap)]
    fn now_unix(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use kodbank_core::{Clock, ManualClock};
///
/// let clock = ManualClock::new(1_000);
/// clock.advance(Duration::from_secs(60));
/// assert_eq!(clock.now_unix(), 1_060);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `now` (Unix seconds).
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    /// Create a clock frozen at the current wall-clock time.
    pub fn starting_now() -> Self {
        Self::new(SystemClock.now_unix())
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(expires_after(now, by))
            });
    }

    /// Set the clock to an absolute timestamp.
    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now_unix(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now_unix() > 1_577_836_800);
    }

    #[test]
    fn test_manual_clock_advance_and_set() {
        let clock = ManualClock::new(10);
        assert_eq!(clock.now_unix(), 10);

        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now_unix(), 15);

        clock.set(100);
        assert_eq!(clock.now_unix(), 100);
    }

    #[test]
    fn test_expires_after_saturates() {
        assert_eq!(expires_after(100, Duration::from_secs(20)), 120);
        assert_eq!(expires_after(100, Duration::from_secs(i64::MAX as u64)), i64::MAX);
        assert_eq!(expires_after(100, Duration::from_secs(u64::MAX)), i64::MAX);
        assert_eq!(expires_after(-5, Duration::ZERO), -5);
    }

    #[test]
    fn test_manual_clock_advance_saturates() {
        let clock = ManualClock::new(10);
        clock.advance(Duration::from_secs(u64::MAX));
        assert_eq!(clock.now_unix(), i64::MAX);
    }

    #[test]
    fn test_arc_clock_forwards() {
        let clock = Arc::new(ManualClock::new(42));
        let shared: Arc<dyn Clock> = clock.clone();
        clock.advance(Duration::from_secs(1));
        assert_eq!(shared.now_unix(), 43);
    }
}
