//! Hit/miss accounting for the cache facade.
//!
//! [`CacheMetrics`] is a lock-free recorder updated on every facade read;
//! [`CacheStats`] is the point-in-time snapshot handed to callers. Counters
//! use relaxed atomics: they order nothing, they only count.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Atomic hit/miss recorder.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheMetrics {
    /// Creates a recorder with both counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a read that found a live entry.
    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a read that found nothing.
    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of hits recorded so far.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of misses recorded so far.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Fraction of reads that hit, in `[0.0, 1.0]`; `0.0` before any read.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let requests = hits + self.misses();
        if requests > 0 {
            hits as f64 / requests as f64
        } else {
            0.0
        }
    }

    /// Resets both counters to zero.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time view of a facade's counters and lifecycle flags.
///
/// Produced by [`Cache::stats`](crate::Cache::stats). The fields are sampled
/// one after another, not under a common lock, so a snapshot taken during
/// concurrent traffic can be internally skewed by a few operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Reads that found a live entry.
    pub hits: u64,
    /// Reads that found nothing (including reads before initialization).
    pub misses: u64,
    /// `hits / (hits + misses)`; `0.0` before any read.
    pub hit_rate: f64,
    /// Best-effort live entry count; zero before initialization and after
    /// close.
    pub len: usize,
    /// Whether the underlying engine has been built yet.
    pub initialized: bool,
    /// Whether the facade has been closed.
    pub closed: bool,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} hit_rate={:.3} len={} initialized={} closed={}",
            self.hits, self.misses, self.hit_rate, self.len, self.initialized, self.closed
        )
    }
}
