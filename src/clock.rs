//! Approximate clock service.
//!
//! Expiry checks on the sharded engine's hot path would otherwise issue a
//! system time call per operation. [`Clock`] amortizes that cost: a background
//! sampler reads true wall-clock time once per second and interpolates with
//! fixed 100ms increments in between, while [`Clock::now`] is a single atomic
//! load.
//!
//! # Staleness Contract
//!
//! `now()` is lock-free, O(1), and at most ~100ms stale under a healthy
//! sampler. If the sampler stalls (or failed to spawn), `now()` keeps
//! returning the last published value, so expiry checks drift **late, never
//! early**. Exact expiry is explicitly not guaranteed anywhere in this crate.
//!
//! # Ownership
//!
//! A `Clock` is a cheap clonable handle. The sampler thread holds only a weak
//! reference and exits on its next tick once every handle is dropped, so a
//! store owning a private clock leaks no thread past the store's lifetime.
//! [`Clock::manual`] builds a thread-less clock for deterministic tests,
//! advanced explicitly with [`Clock::advance`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Interpolation tick; also the staleness bound.
const TICK: Duration = Duration::from_millis(100);

/// Interpolation ticks between true wall-clock samples (one full second).
const TICKS_PER_SAMPLE: u32 = 10;

/// A shared approximate nanosecond timestamp.
///
/// See the [module docs](self) for the staleness contract.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tiercache::Clock;
///
/// let clock = Clock::manual(1);
/// assert_eq!(clock.now(), 1);
/// clock.advance(Duration::from_millis(10));
/// assert_eq!(clock.now(), 10_000_001);
/// ```
#[derive(Clone, Debug)]
pub struct Clock {
    inner: Arc<ClockInner>,
}

#[derive(Debug)]
struct ClockInner {
    nanos: AtomicU64,
}

impl Clock {
    /// Creates a clock driven by a background sampler thread.
    ///
    /// The first value is a true wall-clock read taken synchronously, so the
    /// clock is usable immediately. If the sampler thread cannot be spawned
    /// the clock stays frozen at that first sample; per the staleness
    /// contract this only delays expiry.
    #[must_use]
    pub fn system() -> Self {
        let inner = Arc::new(ClockInner {
            nanos: AtomicU64::new(unix_nanos()),
        });
        let weak = Arc::downgrade(&inner);
        let spawned = thread::Builder::new()
            .name("tiercache-clock".into())
            .spawn(move || sampler_loop(&weak));
        if spawned.is_err() {
            log::warn!("clock sampler thread failed to spawn; timestamps will not advance");
        }
        Clock { inner }
    }

    /// Creates a manually driven clock starting at `start_nanos`.
    ///
    /// No sampler thread is spawned; time moves only through
    /// [`advance`](Clock::advance). Intended for tests that need
    /// deterministic expiry.
    #[must_use]
    pub fn manual(start_nanos: u64) -> Self {
        Clock {
            inner: Arc::new(ClockInner {
                nanos: AtomicU64::new(start_nanos),
            }),
        }
    }

    /// Current approximate timestamp, in nanoseconds.
    #[inline]
    #[must_use]
    pub fn now(&self) -> u64 {
        self.inner.nanos.load(Ordering::Relaxed)
    }

    /// Advances the clock by `delta`.
    ///
    /// Meant for manual clocks; on a system clock the next true-time sample
    /// overwrites the adjustment.
    pub fn advance(&self, delta: Duration) {
        self.inner
            .nanos
            .fetch_add(duration_nanos(delta), Ordering::Relaxed);
    }
}

/// Nine interpolation ticks, then a true sample; repeats until every strong
/// handle is gone.
fn sampler_loop(weak: &Weak<ClockInner>) {
    let increment = duration_nanos(TICK);
    loop {
        for _ in 0..TICKS_PER_SAMPLE - 1 {
            thread::sleep(TICK);
            let Some(inner) = weak.upgrade() else { return };
            inner.nanos.fetch_add(increment, Ordering::Relaxed);
        }
        thread::sleep(TICK);
        let Some(inner) = weak.upgrade() else { return };
        inner.nanos.store(unix_nanos(), Ordering::Relaxed);
    }
}

fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since_epoch| duration_nanos(since_epoch))
}

/// Saturating nanosecond conversion; `u64` nanoseconds cover ~584 years.
pub(crate) fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_only_on_demand() {
        let clock = Clock::manual(5);
        assert_eq!(clock.now(), 5);
        assert_eq!(clock.now(), 5);
        clock.advance(Duration::from_nanos(37));
        assert_eq!(clock.now(), 42);
    }

    #[test]
    fn clones_share_time() {
        let clock = Clock::manual(0);
        let other = clock.clone();
        clock.advance(Duration::from_secs(1));
        assert_eq!(other.now(), 1_000_000_000);
    }

    #[test]
    fn system_clock_starts_at_wall_time() {
        let clock = Clock::system();
        // 2020-01-01T00:00:00Z in Unix nanoseconds; any sane host is past it.
        assert!(clock.now() > 1_577_836_800_000_000_000);
    }

    #[test]
    fn duration_conversion_saturates() {
        assert_eq!(duration_nanos(Duration::from_nanos(7)), 7);
        assert_eq!(duration_nanos(Duration::MAX), u64::MAX);
    }
}
