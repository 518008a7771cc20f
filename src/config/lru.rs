//! Configuration for the single-tier byte-budget engine.
//!
//! # Sizing
//!
//! The budget counts `key length + value size` per entry, as reported by the
//! [`Measured`](crate::Measured) impl of the value type. Entry bookkeeping
//! (map slots, list nodes, expiry records) is not counted, so real memory use
//! runs roughly 100 bytes per entry above `max_bytes`.

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::store::EvictionCallback;

/// Default byte budget (8 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 8 * 1024 * 1024;

/// Default expiry-sweep interval.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for [`LruStore`](crate::LruStore).
///
/// Unlike the other numeric options in this crate, `max_bytes == 0` is not
/// "use the default": it disables the byte budget entirely, leaving the
/// store bounded only by expiry. [`Default`] supplies [`DEFAULT_MAX_BYTES`].
///
/// # Examples
///
/// ```
/// use tiercache::config::LruConfig;
///
/// let config: LruConfig<Vec<u8>> = LruConfig::default().max_bytes(64 * 1024);
/// assert_eq!(config.max_bytes, 64 * 1024);
/// ```
pub struct LruConfig<V> {
    /// Byte budget for `key length + value size` accounting; 0 = unbounded.
    pub max_bytes: u64,
    /// Expiry-sweep interval; zero = default.
    pub cleanup_interval: Duration,
    /// Invoked under the store's write lock whenever an entry is evicted,
    /// expired, deleted, or cleared. Must not re-enter the store.
    pub on_evicted: Option<EvictionCallback<V>>,
}

impl<V> LruConfig<V> {
    /// Sets the byte budget. Zero disables budget eviction.
    #[must_use]
    pub fn max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
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
    /// See [`EvictionCallback`](crate::EvictionCallback) for the reentrancy
    /// contract.
    #[must_use]
    pub fn on_evicted<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &V) + Send + Sync + 'static,
    {
        self.on_evicted = Some(Arc::new(callback));
        self
    }

    /// Replaces a zero sweep interval with the default. The byte budget is
    /// deliberately left alone (0 = unbounded).
    #[must_use]
    pub(crate) fn normalized(mut self) -> Self {
        if self.cleanup_interval.is_zero() {
            self.cleanup_interval = DEFAULT_CLEANUP_INTERVAL;
        }
        self
    }
}

impl<V> Default for LruConfig<V> {
    fn default() -> Self {
        LruConfig {
            max_bytes: DEFAULT_MAX_BYTES,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            on_evicted: None,
        }
    }
}

impl<V> Clone for LruConfig<V> {
    fn clone(&self) -> Self {
        LruConfig {
            max_bytes: self.max_bytes,
            cleanup_interval: self.cleanup_interval,
            on_evicted: self.on_evicted.clone(),
        }
    }
}

impl<V> fmt::Debug for LruConfig<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruConfig")
            .field("max_bytes", &self.max_bytes)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("on_evicted", &self.on_evicted.is_some())
            .finish()
    }
}
