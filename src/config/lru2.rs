//! Configuration for the sharded two-tier engine.

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::store::EvictionCallback;

/// Default bucket (shard) request.
pub const DEFAULT_BUCKETS: u32 = 16;

/// Default tier-1 (probation) capacity per shard.
pub const DEFAULT_CAP_PER_BUCKET: u32 = 1024;

/// Default tier-2 (protected) capacity per shard.
pub const DEFAULT_TIER2_CAP: u32 = 1024;

/// Default expiry-sweep interval.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for [`Lru2Store`](crate::Lru2Store).
///
/// Fields are public and a zero value means "use the default"; construction
/// normalizes rather than rejects, so building a store never fails. The
/// bucket count is rounded up to a power of two by the store.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tiercache::config::Lru2Config;
///
/// let config: Lru2Config<String> = Lru2Config::default()
///     .buckets(4)
///     .cap_per_bucket(256)
///     .cleanup_interval(Duration::from_secs(30))
///     .on_evicted(|key, _value| println!("evicted {key}"));
/// assert_eq!(config.buckets, 4);
/// ```
pub struct Lru2Config<V> {
    /// Requested shard count; rounded up to a power of two, 0 = default.
    pub buckets: u32,
    /// Tier-1 capacity per shard; 0 = default.
    pub cap_per_bucket: u32,
    /// Tier-2 capacity per shard; 0 = default.
    pub tier2_cap: u32,
    /// Expiry-sweep interval; zero = default.
    pub cleanup_interval: Duration,
    /// Invoked under the shard lock whenever an entry is evicted, expired,
    /// deleted, or cleared. Must not re-enter the store.
    pub on_evicted: Option<EvictionCallback<V>>,
}

impl<V> Lru2Config<V> {
    /// Sets the requested shard count.
    #[must_use]
    pub fn buckets(mut self, buckets: u32) -> Self {
        self.buckets = buckets;
        self
    }

    /// Sets the per-shard tier-1 capacity.
    #[must_use]
    pub fn cap_per_bucket(mut self, cap: u32) -> Self {
        self.cap_per_bucket = cap;
        self
    }

    /// Sets the per-shard tier-2 capacity.
    #[must_use]
    pub fn tier2_cap(mut self, cap: u32) -> Self {
        self.tier2_cap = cap;
        self
    }

    /// Sets the expiry-sweep interval.
    #[must_use]
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Installs an eviction callback.
    ///
    /// See [`EvictionCallback`] for the reentrancy contract.
    #[must_use]
    pub fn on_evicted<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &V) + Send + Sync + 'static,
    {
        self.on_evicted = Some(Arc::new(callback));
        self
    }

    /// Replaces every zero field with its documented default.
    #[must_use]
    pub(crate) fn normalized(mut self) -> Self {
        if self.buckets == 0 {
            self.buckets = DEFAULT_BUCKETS;
        }
        if self.cap_per_bucket == 0 {
            self.cap_per_bucket = DEFAULT_CAP_PER_BUCKET;
        }
        if self.tier2_cap == 0 {
            self.tier2_cap = DEFAULT_TIER2_CAP;
        }
        if self.cleanup_interval.is_zero() {
            self.cleanup_interval = DEFAULT_CLEANUP_INTERVAL;
        }
        self
    }
}

impl<V> Default for Lru2Config<V> {
    fn default() -> Self {
        Lru2Config {
            buckets: DEFAULT_BUCKETS,
            cap_per_bucket: DEFAULT_CAP_PER_BUCKET,
            tier2_cap: DEFAULT_TIER2_CAP,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            on_evicted: None,
        }
    }
}

impl<V> Clone for Lru2Config<V> {
    fn clone(&self) -> Self {
        Lru2Config {
            buckets: self.buckets,
            cap_per_bucket: self.cap_per_bucket,
            tier2_cap: self.tier2_cap,
            cleanup_interval: self.cleanup_interval,
            on_evicted: self.on_evicted.clone(),
        }
    }
}

impl<V> fmt::Debug for Lru2Config<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lru2Config")
            .field("buckets", &self.buckets)
            .field("cap_per_bucket", &self.cap_per_bucket)
            .field("tier2_cap", &self.tier2_cap)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("on_evicted", &self.on_evicted.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config: Lru2Config<i32> = Lru2Config::default();
        assert_eq!(config.buckets, 16);
        assert_eq!(config.cap_per_bucket, 1024);
        assert_eq!(config.tier2_cap, 1024);
        assert_eq!(config.cleanup_interval, Duration::from_secs(60));
        assert!(config.on_evicted.is_none());
    }

    #[test]
    fn zero_fields_normalize_to_defaults() {
        let config: Lru2Config<i32> = Lru2Config {
            buckets: 0,
            cap_per_bucket: 0,
            tier2_cap: 0,
            cleanup_interval: Duration::ZERO,
            on_evicted: None,
        }
        .normalized();
        assert_eq!(config.buckets, DEFAULT_BUCKETS);
        assert_eq!(config.cap_per_bucket, DEFAULT_CAP_PER_BUCKET);
        assert_eq!(config.tier2_cap, DEFAULT_TIER2_CAP);
        assert_eq!(config.cleanup_interval, DEFAULT_CLEANUP_INTERVAL);
    }

    #[test]
    fn explicit_fields_survive_normalization() {
        let config: Lru2Config<i32> = Lru2Config::default()
            .buckets(3)
            .cap_per_bucket(7)
            .tier2_cap(5)
            .cleanup_interval(Duration::from_millis(250))
            .normalized();
        assert_eq!(config.buckets, 3);
        assert_eq!(config.cap_per_bucket, 7);
        assert_eq!(config.tier2_cap, 5);
        assert_eq!(config.cleanup_interval, Duration::from_millis(250));
    }
}
