//! Storage contract shared by every cache engine.
//!
//! This module defines the seam between the engines and their callers: the
//! [`Store`] trait (the uniform operation set), the [`Measured`] value-size
//! contract used by the byte-budget engine, the [`EvictionCallback`] alias,
//! the engine selector [`CacheKind`], and the [`new_store`] factory that
//! builds a boxed engine from a [`StoreConfig`](crate::config::StoreConfig).
//!
//! # Operation Set
//!
//! | Operation | Semantics |
//! |-----------|-----------|
//! | `get` | Lookup; `None` covers both absent and expired keys |
//! | `set` | Insert or update, never expires |
//! | `set_with_ttl` | Insert or update with a relative deadline; zero = never |
//! | `delete` | Remove; `true` if an entry was present |
//! | `clear` | Remove everything, firing the eviction callback per key |
//! | `len` | Best-effort live entry count |
//! | `close` | Idempotent shutdown of background tasks |
//!
//! Not-found and expired are ordinary outcomes, not errors. The `set` family
//! returns a [`Result`] so fallible backends can slot in behind the same
//! trait, but the engines in this crate are infallible and always return
//! `Ok(())`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::cache::ByteView;
use crate::config::StoreConfig;
use crate::lru::LruStore;
use crate::lru2::Lru2Store;

/// A value's self-reported size in bytes.
///
/// Only the byte-budget engine ([`LruStore`]) consults this, to account
/// `used_bytes` against `max_bytes`. The sharded engine
/// ([`Lru2Store`]) bounds entry counts instead and never calls it.
///
/// # Examples
///
/// ```
/// use tiercache::Measured;
///
/// assert_eq!("hello".to_string().size(), 5);
/// assert_eq!(vec![0u8; 32].size(), 32);
/// ```
pub trait Measured {
    /// Returns the size of this value in bytes.
    fn size(&self) -> usize;
}

impl Measured for String {
    #[inline]
    fn size(&self) -> usize {
        self.len()
    }
}

impl Measured for &str {
    #[inline]
    fn size(&self) -> usize {
        self.len()
    }
}

impl Measured for Vec<u8> {
    #[inline]
    fn size(&self) -> usize {
        self.len()
    }
}

impl Measured for &[u8] {
    #[inline]
    fn size(&self) -> usize {
        self.len()
    }
}

impl Measured for Box<[u8]> {
    #[inline]
    fn size(&self) -> usize {
        self.len()
    }
}

impl<T: Measured> Measured for Arc<T> {
    #[inline]
    fn size(&self) -> usize {
        (**self).size()
    }
}

/// Callback invoked when an entry leaves a store involuntarily (capacity
/// eviction, expiry sweep, delete, clear).
///
/// # Caller Contract
///
/// The callback runs **synchronously on the mutating thread while the
/// shard/store lock is held**. It must be fast and must not call back into
/// the same store: a reentrant callback deadlocks, a slow one serializes the
/// shard. This is a hard caller obligation; the engines perform no
/// reentrancy detection.
pub type EvictionCallback<V> = Arc<dyn Fn(&str, &V) + Send + Sync>;

/// Error reserved by the [`Store::set`] family.
///
/// The engines in this crate are infallible and never produce one; the type
/// exists so the contract can absorb fallible backends without changing
/// signatures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// A backend-specific constraint rejected the write.
    #[error("store rejected write: {0}")]
    Rejected(String),
}

/// Uniform storage contract implemented by both engines.
///
/// All methods take `&self`; engines synchronize internally (per-shard
/// mutexes for [`Lru2Store`], a store-wide reader/writer lock for
/// [`LruStore`]), so a store can be shared across threads behind an
/// [`Arc`] or the [`Cache`](crate::Cache) facade.
///
/// Callers must not issue new operations after [`close`](Store::close);
/// engines treat such calls as no-ops or misses rather than errors.
pub trait Store<V>: Send + Sync {
    /// Looks up `key`, returning its value if present and unexpired.
    ///
    /// Observing an expired entry returns `None` and internally deletes it,
    /// firing the eviction callback.
    fn get(&self, key: &str) -> Option<V>;

    /// Inserts or updates `key` with no expiration.
    fn set(&self, key: &str, value: V) -> Result<(), StoreError>;

    /// Inserts or updates `key` with a relative time-to-live.
    ///
    /// A zero `ttl` means the entry never expires.
    fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) -> Result<(), StoreError>;

    /// Removes `key`, returning `true` if an entry was present.
    fn delete(&self, key: &str) -> bool;

    /// Removes every entry, firing the eviction callback once per key.
    fn clear(&self);

    /// Best-effort count of live entries.
    ///
    /// Sharded engines acquire shard locks one at a time, so concurrent
    /// mutation can be under- or over-counted; see the crate-level
    /// concurrency notes.
    fn len(&self) -> usize;

    /// Returns `true` if the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops background tasks (expiry sweeper). Idempotent.
    ///
    /// An in-flight sweep is allowed to finish; no new ticks occur after
    /// `close` returns.
    fn close(&self);
}

/// Selects which engine a [`StoreConfig`] builds.
///
/// Parseable from the strings `"lru"` and `"lru2"`:
///
/// ```
/// use tiercache::CacheKind;
///
/// assert_eq!("lru2".parse::<CacheKind>(), Ok(CacheKind::Lru2));
/// assert!("arc".parse::<CacheKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Single-tier byte-budgeted LRU ([`LruStore`]).
    Lru,
    /// Sharded two-tier LRU-2 ([`Lru2Store`]).
    Lru2,
}

impl CacheKind {
    /// The canonical configuration string for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKind::Lru => "lru",
            CacheKind::Lru2 => "lru2",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`CacheKind`] from an unrecognized string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown cache kind {0:?} (expected \"lru\" or \"lru2\")")]
pub struct UnknownCacheKind(pub String);

impl FromStr for CacheKind {
    type Err = UnknownCacheKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lru" => Ok(CacheKind::Lru),
            "lru2" => Ok(CacheKind::Lru2),
            other => Err(UnknownCacheKind(other.to_owned())),
        }
    }
}

/// Builds the engine selected by `config.kind` behind the [`Store`] trait.
///
/// Construction is infallible: out-of-range options are normalized to the
/// documented defaults rather than rejected.
///
/// # Examples
///
/// ```
/// use tiercache::config::StoreConfig;
/// use tiercache::{new_store, CacheKind};
///
/// let config = StoreConfig::default().kind(CacheKind::Lru2);
/// let store = new_store::<String>(config);
/// store.set("k", "v".to_string()).unwrap();
/// assert_eq!(store.get("k"), Some("v".to_string()));
/// store.close();
/// ```
#[must_use]
pub fn new_store<V>(config: StoreConfig<V>) -> Box<dyn Store<V>>
where
    V: Measured + Clone + Send + Sync + 'static,
{
    match config.kind {
        CacheKind::Lru => Box::new(LruStore::new(config.into_lru())),
        CacheKind::Lru2 => Box::new(Lru2Store::new(config.into_lru2())),
    }
}

/// Convenience impl so facades can store raw bytes without a wrapper type.
impl Measured for ByteView {
    #[inline]
    fn size(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measured_sizes() {
        assert_eq!("abc".size(), 3);
        assert_eq!(String::from("abcd").size(), 4);
        assert_eq!(vec![1u8, 2, 3].size(), 3);
        assert_eq!((&[0u8; 8][..]).size(), 8);
        assert_eq!(Arc::new(String::from("xy")).size(), 2);
    }

    #[test]
    fn cache_kind_round_trip() {
        assert_eq!(CacheKind::Lru.to_string(), "lru");
        assert_eq!(CacheKind::Lru2.to_string(), "lru2");
        assert_eq!("lru".parse::<CacheKind>(), Ok(CacheKind::Lru));
        assert_eq!("lru2".parse::<CacheKind>(), Ok(CacheKind::Lru2));
        let err = "fifo".parse::<CacheKind>().unwrap_err();
        assert_eq!(err, UnknownCacheKind("fifo".to_owned()));
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::Rejected("quota".to_owned());
        assert_eq!(err.to_string(), "store rejected write: quota");
    }
}
