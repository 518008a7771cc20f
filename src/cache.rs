//! Engine facade and byte-blob value type.
//!
//! [`Cache`] wraps an engine chosen by a [`StoreConfig`] behind lazy
//! initialization, hit/miss accounting and a closed flag. The engine is
//! built on the first write; reads before that are counted misses. After
//! [`close`](Cache::close), every operation is a no-op or a miss — never an
//! error. [`ByteView`] is the ready-made value type for callers caching raw
//! bytes: an immutable, cheaply clonable blob that already implements the
//! size contract.

use core::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::config::StoreConfig;
use crate::metrics::{CacheMetrics, CacheStats};
use crate::store::{new_store, Measured, Store};

/// An immutable, cheaply clonable view of a byte string.
///
/// Clones share one allocation (`Arc<[u8]>`); equality compares contents.
/// `ByteView` implements [`Measured`](crate::Measured), so it can be stored
/// in either engine without a wrapper.
///
/// # Examples
///
/// ```
/// use tiercache::ByteView;
///
/// let view = ByteView::from("hello");
/// assert_eq!(view.len(), 5);
/// assert_eq!(view.as_bytes(), b"hello");
/// assert_eq!(view, ByteView::from(b"hello".to_vec()));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ByteView {
    bytes: Arc<[u8]>,
}

impl ByteView {
    /// Length of the viewed bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrows the viewed bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies the viewed bytes into a fresh vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(bytes: Vec<u8>) -> Self {
        ByteView {
            bytes: Arc::from(bytes),
        }
    }
}

impl From<&[u8]> for ByteView {
    fn from(bytes: &[u8]) -> Self {
        ByteView {
            bytes: Arc::from(bytes),
        }
    }
}

impl From<String> for ByteView {
    fn from(text: String) -> Self {
        ByteView::from(text.into_bytes())
    }
}

impl From<&str> for ByteView {
    fn from(text: &str) -> Self {
        ByteView::from(text.as_bytes())
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteView")
            .field("len", &self.len())
            .finish()
    }
}

impl fmt::Display for ByteView {
    /// Renders the bytes as UTF-8, replacing invalid sequences.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

/// Lazily initialized cache facade over a configured engine.
///
/// The underlying store is built on the first write; reads, deletes and
/// `len` before that point are counted misses or no-ops. [`stats`](Cache::stats)
/// exposes the hit/miss counters, and [`close`](Cache::close) shuts the
/// engine down idempotently — operations after it return misses, `false` or
/// zero rather than erroring.
///
/// # Examples
///
/// ```
/// use tiercache::config::StoreConfig;
/// use tiercache::{ByteView, Cache};
///
/// let cache: Cache<ByteView> = Cache::new(StoreConfig::default());
/// assert_eq!(cache.get("motd"), None); // counted miss, engine not built yet
/// cache.set("motd", ByteView::from("hello"));
/// assert_eq!(cache.get("motd"), Some(ByteView::from("hello")));
///
/// let stats = cache.stats();
/// assert_eq!((stats.hits, stats.misses), (1, 1));
/// cache.close();
/// ```
pub struct Cache<V> {
    config: StoreConfig<V>,
    store: RwLock<Option<Box<dyn Store<V>>>>,
    metrics: CacheMetrics,
    initialized: AtomicBool,
    closed: AtomicBool,
}

impl<V> Cache<V>
where
    V: Measured + Clone + Send + Sync + 'static,
{
    /// Creates a facade that will build its engine from `config` on the
    /// first write.
    #[must_use]
    pub fn new(config: StoreConfig<V>) -> Self {
        Cache {
            config,
            store: RwLock::new(None),
            metrics: CacheMetrics::new(),
            initialized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Looks up `key`, recording a hit or a miss.
    ///
    /// Reads against an uninitialized facade are counted misses; reads
    /// against a closed one return `None` without touching the counters.
    pub fn get(&self, key: &str) -> Option<V> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        if !self.initialized.load(Ordering::Acquire) {
            self.metrics.record_miss();
            return None;
        }
        let guard = self.store.read();
        let store = guard.as_ref()?;
        match store.get(key) {
            Some(value) => {
                self.metrics.record_hit();
                Some(value)
            }
            None => {
                self.metrics.record_miss();
                None
            }
        }
    }

    /// Inserts or updates `key` with no expiration, building the engine
    /// first if needed.
    pub fn set(&self, key: &str, value: V) {
        self.set_with_ttl(key, value, Duration::ZERO);
    }

    /// Inserts or updates `key`, building the engine first if needed; a zero
    /// `ttl` means the entry never expires.
    ///
    /// Writes to a closed facade are dropped with a warning.
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        if self.closed.load(Ordering::Acquire) {
            log::warn!("write to closed cache dropped: key={key}");
            return;
        }
        self.ensure_initialized();
        let guard = self.store.read();
        if let Some(store) = guard.as_ref() {
            if let Err(err) = store.set_with_ttl(key, value, ttl) {
                log::warn!("cache write failed: key={key} err={err}");
            }
        }
    }

    /// Removes `key`, returning `true` if an entry was present.
    pub fn delete(&self, key: &str) -> bool {
        if self.closed.load(Ordering::Acquire) || !self.initialized.load(Ordering::Acquire) {
            return false;
        }
        let guard = self.store.read();
        guard.as_ref().is_some_and(|store| store.delete(key))
    }

    /// Removes every entry and resets the hit/miss counters to zero.
    pub fn clear(&self) {
        if self.closed.load(Ordering::Acquire) || !self.initialized.load(Ordering::Acquire) {
            return;
        }
        let guard = self.store.read();
        if let Some(store) = guard.as_ref() {
            store.clear();
        }
        self.metrics.reset();
    }

    /// Builds the engine exactly once: a lock-free flag check backed by a
    /// write-locked re-check.
    fn ensure_initialized(&self) {
        if self.initialized.load(Ordering::Acquire) {
            return;
        }
        let mut guard = self.store.write();
        // A close that raced the flag check above must win: never rebuild
        // an engine into a closed facade.
        if guard.is_none() && !self.closed.load(Ordering::Acquire) {
            *guard = Some(new_store(self.config.clone()));
            self.initialized.store(true, Ordering::Release);
            log::debug!("cache initialized: kind={}", self.config.kind);
        }
    }
}

impl<V> Cache<V> {
    /// Best-effort live entry count; zero before initialization and after
    /// close.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.closed.load(Ordering::Acquire) || !self.initialized.load(Ordering::Acquire) {
            return 0;
        }
        self.store.read().as_ref().map_or(0, |store| store.len())
    }

    /// Returns `true` if the facade currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of counters and lifecycle flags.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.metrics.hits(),
            misses: self.metrics.misses(),
            hit_rate: self.metrics.hit_rate(),
            len: self.len(),
            initialized: self.initialized.load(Ordering::Acquire),
            closed: self.closed.load(Ordering::Acquire),
        }
    }

    /// Closes the facade and the engine under it. Idempotent.
    ///
    /// Only the first call acts: it stops the engine's background sweeper,
    /// drops the engine and logs the final counters. Later calls (and all
    /// other operations) become no-ops.
    pub fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        if let Some(store) = self.store.write().take() {
            store.close();
        }
        self.initialized.store(false, Ordering::Release);
        log::debug!(
            "cache closed: hits={} misses={}",
            self.metrics.hits(),
            self.metrics.misses()
        );
    }
}

impl<V> fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("kind", &self.config.kind)
            .field("initialized", &self.initialized.load(Ordering::Acquire))
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CacheKind;
    use std::thread;

    #[test]
    fn initializes_on_first_write() {
        let cache: Cache<String> = Cache::new(StoreConfig::default());
        assert!(!cache.stats().initialized);

        assert_eq!(cache.get("k"), None);
        assert!(!cache.stats().initialized);

        cache.set("k", String::from("v"));
        assert!(cache.stats().initialized);
        assert_eq!(cache.get("k"), Some(String::from("v")));
        cache.close();
    }

    #[test]
    fn ttl_write_also_initializes() {
        let cache: Cache<String> = Cache::new(StoreConfig::default());
        cache.set_with_ttl("k", String::from("v"), Duration::ZERO);
        assert!(cache.stats().initialized);
        assert_eq!(cache.get("k"), Some(String::from("v")));
        cache.close();
    }

    #[test]
    fn counts_reads_including_pre_init_misses() {
        let cache: Cache<String> = Cache::new(StoreConfig::default());
        assert_eq!(cache.get("early"), None);
        cache.set("k", String::from("v"));
        assert_eq!(cache.get("k"), Some(String::from("v")));
        assert_eq!(cache.get("other"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hit_rate, 1.0 / 3.0);
        assert_eq!(stats.len, 1);
        cache.close();
    }

    #[test]
    fn expired_entries_disappear() {
        // The byte-budget engine reads the monotonic clock directly, so a
        // short real sleep is deterministic here.
        let cache: Cache<String> = Cache::new(StoreConfig::default().kind(CacheKind::Lru));
        cache.set_with_ttl("k", String::from("v"), Duration::from_millis(5));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
        cache.close();
    }

    #[test]
    fn clear_resets_counters_to_zero() {
        let cache: Cache<String> = Cache::new(StoreConfig::default());
        cache.set("k", String::from("v"));
        assert_eq!(cache.get("k"), Some(String::from("v")));
        assert_eq!(cache.get("miss"), None);

        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.len, 0);
        cache.close();
    }

    #[test]
    fn closed_cache_refuses_everything() {
        let cache: Cache<String> = Cache::new(StoreConfig::default());
        cache.set("k", String::from("v"));
        assert_eq!(cache.get("k"), Some(String::from("v")));
        let before = cache.stats();

        cache.close();
        cache.close(); // idempotent

        assert_eq!(cache.get("k"), None);
        assert!(!cache.delete("k"));
        assert_eq!(cache.len(), 0);
        cache.set("j", String::from("dropped"));
        assert_eq!(cache.len(), 0);

        let after = cache.stats();
        // Post-close reads do not touch the counters.
        assert_eq!(after.hits, before.hits);
        assert_eq!(after.misses, before.misses);
        assert!(after.closed);
        assert!(!after.initialized);
    }

    #[test]
    fn byteview_conversions_share_contents() {
        let from_str = ByteView::from("abc");
        let from_vec = ByteView::from(vec![b'a', b'b', b'c']);
        let from_slice = ByteView::from(&b"abc"[..]);
        let from_string = ByteView::from(String::from("abc"));

        assert_eq!(from_str, from_vec);
        assert_eq!(from_vec, from_slice);
        assert_eq!(from_slice, from_string);
        assert_eq!(from_str.len(), 3);
        assert!(!from_str.is_empty());
        assert_eq!(from_str.as_bytes(), b"abc");
        assert_eq!(from_str.to_vec(), b"abc".to_vec());
        assert_eq!(from_str.to_string(), "abc");

        let clone = from_str.clone();
        assert_eq!(clone, from_str);
    }

    #[test]
    fn byteview_debug_hides_contents() {
        let view = ByteView::from("secret");
        assert_eq!(format!("{view:?}"), "ByteView { len: 6 }");
    }
}
