//! Cache configuration.
//!
//! Each engine has a dedicated config struct with public fields, and
//! [`StoreConfig`] unifies both behind the [`CacheKind`] selector for the
//! [`new_store`](crate::new_store) factory and the [`Cache`](crate::Cache)
//! facade.
//!
//! # Normalization
//!
//! Construction never fails: numeric fields left at zero fall back to the
//! documented defaults when a store is built (the one exception is the
//! byte budget, where 0 means "unbounded" — see [`LruConfig`]). The
//! requested bucket count is rounded up to a power of two.
//!
//! | Config | Engine | Defaults |
//! |--------|--------|----------|
//! | [`LruConfig`] | [`LruStore`](crate::LruStore) | 8 MiB budget, 1 min sweep |
//! | [`Lru2Config`] | [`Lru2Store`](crate::Lru2Store) | 16 buckets, 1024 + 1024 caps, 1 min sweep |
//! | [`StoreConfig`] | either | LRU-2 kind, 8 MiB, 16 buckets, 512 + 256 caps, 1 min sweep |
//!
//! # Examples
//!
//! ```
//! use tiercache::config::StoreConfig;
//! use tiercache::{new_store, CacheKind};
//!
//! let config = StoreConfig::default()
//!     .kind(CacheKind::Lru2)
//!     .buckets(8)
//!     .on_evicted(|key, _: &String| eprintln!("dropped {key}"));
//! let store = new_store(config);
//! store.set("greeting", "hello".to_string()).unwrap();
//! store.close();
//! ```

pub mod lru;
pub mod lru2;

pub use lru::LruConfig;
pub use lru2::Lru2Config;

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::store::{CacheKind, EvictionCallback};

/// Default tier-1 capacity per shard when building through [`StoreConfig`].
pub const DEFAULT_FACADE_CAP_PER_BUCKET: u32 = 512;

/// Default tier-2 capacity per shard when building through [`StoreConfig`].
pub const DEFAULT_FACADE_TIER2_CAP: u32 = 256;

/// Unified configuration covering both engines.
///
/// Only the fields relevant to the selected [`kind`](StoreConfig::kind) are
/// consumed; the rest are ignored. The facade-level capacity defaults are
/// smaller than the engine-level ones: a facade is typically one cache among
/// several in a process, while a directly constructed [`Lru2Config`] gets
/// the full engine defaults.
pub struct StoreConfig<V> {
    /// Engine selector.
    pub kind: CacheKind,
    /// Byte budget (LRU engine only); 0 = unbounded.
    pub max_bytes: u64,
    /// Requested shard count (LRU-2 engine only); 0 = default.
    pub buckets: u32,
    /// Tier-1 capacity per shard (LRU-2 engine only); 0 = default.
    pub cap_per_bucket: u32,
    /// Tier-2 capacity per shard (LRU-2 engine only); 0 = default.
    pub tier2_cap: u32,
    /// Expiry-sweep interval (both engines); zero = default.
    pub cleanup_interval: Duration,
    /// Eviction callback (both engines). Runs under the store lock; must not
    /// re-enter the store.
    pub on_evicted: Option<EvictionCallback<V>>,
}

impl<V> StoreConfig<V> {
    /// Selects the engine.
    #[must_use]
    pub fn kind(mut self, kind: CacheKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the byte budget for the LRU engine. Zero disables it.
    #[must_use]
    pub fn max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Sets the requested shard count for the LRU-2 engine.
    #[must_use]
    pub fn buckets(mut self, buckets: u32) -> Self {
        self.buckets = buckets;
        self
    }

    /// Sets the per-shard tier-1 capacity for the LRU-2 engine.
    #[must_use]
    pub fn cap_per_bucket(mut self, cap: u32) -> Self {
        self.cap_per_bucket = cap;
        self
    }

    /// Sets the per-shard tier-2 capacity for the LRU-2 engine.
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

    /// Projects the fields the byte-budget engine consumes.
    #[must_use]
    pub fn into_lru(self) -> LruConfig<V> {
        LruConfig {
            max_bytes: self.max_bytes,
            cleanup_interval: self.cleanup_interval,
            on_evicted: self.on_evicted,
        }
    }

    /// Projects the fields the sharded engine consumes.
    #[must_use]
    pub fn into_lru2(self) -> Lru2Config<V> {
        Lru2Config {
            buckets: self.buckets,
            cap_per_bucket: self.cap_per_bucket,
            tier2_cap: self.tier2_cap,
            cleanup_interval: self.cleanup_interval,
            on_evicted: self.on_evicted,
        }
    }
}

impl<V> Default for StoreConfig<V> {
    fn default() -> Self {
        StoreConfig {
            kind: CacheKind::Lru2,
            max_bytes: lru::DEFAULT_MAX_BYTES,
            buckets: lru2::DEFAULT_BUCKETS,
            cap_per_bucket: DEFAULT_FACADE_CAP_PER_BUCKET,
            tier2_cap: DEFAULT_FACADE_TIER2_CAP,
            cleanup_interval: lru2::DEFAULT_CLEANUP_INTERVAL,
            on_evicted: None,
        }
    }
}

impl<V> Clone for StoreConfig<V> {
    fn clone(&self) -> Self {
        StoreConfig {
            kind: self.kind,
            max_bytes: self.max_bytes,
            buckets: self.buckets,
            cap_per_bucket: self.cap_per_bucket,
            tier2_cap: self.tier2_cap,
            cleanup_interval: self.cleanup_interval,
            on_evicted: self.on_evicted.clone(),
        }
    }
}

impl<V> fmt::Debug for StoreConfig<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("kind", &self.kind)
            .field("max_bytes", &self.max_bytes)
            .field("buckets", &self.buckets)
            .field("cap_per_bucket", &self.cap_per_bucket)
            .field("tier2_cap", &self.tier2_cap)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("on_evicted", &self.on_evicted.is_some())
            .finish()
    }
}
