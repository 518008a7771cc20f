//! Byte-budgeted single-tier LRU cache engine.
//!
//! A simpler alternative to the sharded two-tier engine: one doubly linked
//! list plus a key index for the whole store, bounded by accounted bytes
//! (key length + value size) instead of entry count.
//!
//! # Algorithm
//!
//! Entries sit in a recency-ordered list (head = most recent). A write
//! inserts or updates at the head, adjusts the byte account, then evicts:
//! first every entry whose deadline has passed, then least-recently-used
//! entries from the back until the account fits the budget again. A budget
//! of zero disables byte-based eviction entirely.
//!
//! # Locking
//!
//! One reader/writer lock guards the whole store. `get` runs in two phases:
//! a read-locked existence and expiry check that clones the value, then a
//! separately write-locked recency bump. Between the phases a concurrent
//! delete can win the race; the bump then finds nothing to move and the call
//! still returns the value it already cloned. Readers stay concurrent on the
//! hot path and only the short bump is serialized.
//!
//! # Expiry
//!
//! Deadlines live in a side map keyed like the main index and are measured
//! against the monotonic clock. Expired entries are purged by whichever
//! comes first: the read that discovers them or the periodic background
//! sweep.

use core::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use crate::config::LruConfig;
use crate::list::{Entry, List};
use crate::store::{EvictionCallback, Measured, Store, StoreError};

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// List payload. The key rides in the node so evictions popped off the back
/// can fix the key and expiry maps without a reverse lookup.
struct LruEntry<V> {
    key: String,
    value: V,
}

impl<V: Measured> LruEntry<V> {
    /// Bytes this entry counts against the budget.
    #[inline]
    fn charged_bytes(&self) -> u64 {
        (self.key.len() + self.value.size()) as u64
    }
}

/// Mutable store state, all of it behind one lock.
struct LruState<V> {
    list: List<LruEntry<V>>,
    items: HashMap<String, *mut Entry<LruEntry<V>>>,
    expires: HashMap<String, Instant>,
    max_bytes: u64,
    used_bytes: u64,
}

// SAFETY: LruState owns all data; the raw pointers in `items` point only to
// nodes owned by `list`, so sending the state moves its pointees with it.
unsafe impl<V: Send> Send for LruState<V> {}

// SAFETY: every list mutation requires `&mut self`; concurrent shared
// references can only read, and reads through the pointers hand out `&V`,
// hence the `Sync` bound on `V`.
unsafe impl<V: Send + Sync> Sync for LruState<V> {}

impl<V: Measured> LruState<V> {
    /// Unlinks `key`'s node and fixes the maps and the byte account.
    fn remove_entry(&mut self, key: &str) -> Option<LruEntry<V>> {
        let node = self.items.remove(key)?;
        // SAFETY: node comes from our map, so it is still linked in `list`
        let entry = unsafe { self.list.remove(node) }?;
        self.expires.remove(key);
        self.used_bytes = self.used_bytes.saturating_sub(entry.charged_bytes());
        Some(entry)
    }

    /// Unlinks the least recently used node and fixes the maps and the byte
    /// account.
    fn pop_back_entry(&mut self) -> Option<LruEntry<V>> {
        let entry = self.list.pop_back()?;
        self.items.remove(&entry.key);
        self.expires.remove(&entry.key);
        self.used_bytes = self.used_bytes.saturating_sub(entry.charged_bytes());
        Some(entry)
    }
}

struct LruInner<V> {
    state: RwLock<LruState<V>>,
    on_evicted: Option<EvictionCallback<V>>,
}

/// Single-tier LRU cache bounded by a byte budget.
///
/// Values report their size through [`Measured`]; each entry charges
/// `key length + value size` bytes against the configured budget, and writes
/// evict from the least recently used end until the account fits. All methods
/// take `&self` and synchronize on one internal reader/writer lock, so the
/// store can be shared across threads directly or behind an [`Arc`].
///
/// # Examples
///
/// ```
/// use tiercache::config::LruConfig;
/// use tiercache::LruStore;
///
/// let store = LruStore::new(LruConfig::default().max_bytes(1024));
/// store.set("user:1", String::from("alice")).unwrap();
/// assert_eq!(store.get("user:1"), Some(String::from("alice")));
/// assert!(store.used_bytes() > 0);
/// store.close();
/// ```
pub struct LruStore<V> {
    inner: Arc<LruInner<V>>,
    /// Dropping the sender stops the sweeper; `take` makes `close`
    /// idempotent.
    sweeper: Mutex<Option<Sender<()>>>,
}

impl<V> LruStore<V>
where
    V: Measured + Clone + Send + Sync + 'static,
{
    /// Builds a store from `config`.
    ///
    /// A zero cleanup interval normalizes to the default; a zero byte budget
    /// is kept and means "unbounded". Construction never fails. A background
    /// sweeper thread starts immediately.
    #[must_use]
    pub fn new(config: LruConfig<V>) -> Self {
        let config = config.normalized();
        let inner = Arc::new(LruInner {
            state: RwLock::new(LruState {
                list: List::new(),
                items: HashMap::new(),
                expires: HashMap::new(),
                max_bytes: config.max_bytes,
                used_bytes: 0,
            }),
            on_evicted: config.on_evicted,
        });
        let sweeper = spawn_sweeper(Arc::clone(&inner), config.cleanup_interval);
        LruStore {
            inner,
            sweeper: Mutex::new(sweeper),
        }
    }

    /// Looks up `key` and bumps it to most recently used.
    ///
    /// An expired entry is purged on the spot (firing the eviction callback)
    /// and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let value = {
            let state = self.inner.state.read();
            let node = state.items.get(key).copied()?;
            if let Some(deadline) = state.expires.get(key) {
                if *deadline <= Instant::now() {
                    drop(state);
                    self.delete(key);
                    return None;
                }
            }
            // SAFETY: node comes from our map and the read lock pins the list
            unsafe { state.list.get_value(node) }?.value.clone()
        };

        let mut state = self.inner.state.write();
        // Re-resolve the node: the key may have been deleted (or deleted and
        // re-inserted) between the two lock phases.
        if let Some(&node) = state.items.get(key) {
            // SAFETY: node comes from our map and the write lock is held
            unsafe { state.list.move_to_front(node) };
        }
        Some(value)
    }

    /// Inserts or updates `key` with no expiration.
    ///
    /// The error slot is reserved for fallible backends and never populated
    /// here.
    pub fn set(&self, key: &str, value: V) -> Result<(), StoreError> {
        self.set_with_ttl(key, value, Duration::ZERO)
    }

    /// Inserts or updates `key`; a zero `ttl` means the entry never expires,
    /// and a `ttl` too large for the clock clamps to never expiring.
    ///
    /// Runs eviction after the write, so the eviction callback may fire
    /// (under the write lock) before this call returns.
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) -> Result<(), StoreError> {
        let mut state = self.inner.state.write();
        match deadline_for(ttl) {
            Some(deadline) => {
                state.expires.insert(key.to_owned(), deadline);
            }
            None => {
                state.expires.remove(key);
            }
        }

        if let Some(&node) = state.items.get(key) {
            let new_size = value.size() as u64;
            // SAFETY: node comes from our map and the write lock is held
            if let Some(entry) = unsafe { state.list.get_value_mut(node) } {
                let old_size = entry.value.size() as u64;
                entry.value = value;
                state.used_bytes = state
                    .used_bytes
                    .saturating_sub(old_size)
                    .saturating_add(new_size);
                // SAFETY: node is still linked
                unsafe { state.list.move_to_front(node) };
            }
        } else {
            let entry = LruEntry {
                key: key.to_owned(),
                value,
            };
            let charge = entry.charged_bytes();
            let node = state.list.push_front(entry);
            state.items.insert(key.to_owned(), node);
            state.used_bytes = state.used_bytes.saturating_add(charge);
        }

        evict_locked(&mut state, self.inner.on_evicted.as_deref());
        Ok(())
    }

    /// Removes `key`, firing the eviction callback if it was present.
    pub fn delete(&self, key: &str) -> bool {
        let mut state = self.inner.state.write();
        match state.remove_entry(key) {
            Some(entry) => {
                if let Some(callback) = &self.inner.on_evicted {
                    callback(&entry.key, &entry.value);
                }
                true
            }
            None => false,
        }
    }

    /// Removes every entry, firing the eviction callback once per key, and
    /// resets the byte account.
    pub fn clear(&self) {
        let mut state = self.inner.state.write();
        while let Some(entry) = state.pop_back_entry() {
            if let Some(callback) = &self.inner.on_evicted {
                callback(&entry.key, &entry.value);
            }
        }
        state.expires.clear();
        state.used_bytes = 0;
    }

    /// Looks up `key` together with its remaining time to live.
    ///
    /// A zero duration means the entry never expires. Bumps recency like
    /// [`get`](LruStore::get), but under one write-locked phase.
    pub fn get_with_expiration(&self, key: &str) -> Option<(V, Duration)> {
        let mut state = self.inner.state.write();
        let node = state.items.get(key).copied()?;
        let remaining = match state.expires.get(key) {
            Some(deadline) => {
                let now = Instant::now();
                if *deadline <= now {
                    return None;
                }
                deadline.duration_since(now)
            }
            None => Duration::ZERO,
        };
        // SAFETY: node comes from our map and the write lock is held
        let value = unsafe { state.list.get_value(node) }?.value.clone();
        // SAFETY: node is still linked
        unsafe { state.list.move_to_front(node) };
        Some((value, remaining))
    }

    /// Rewrites (non-zero `ttl`) or clears (zero `ttl`) a present key's
    /// expiry without touching its value.
    ///
    /// Returns `false` if the key is absent.
    pub fn update_expiration(&self, key: &str, ttl: Duration) -> bool {
        let mut state = self.inner.state.write();
        if !state.items.contains_key(key) {
            return false;
        }
        match deadline_for(ttl) {
            Some(deadline) => {
                state.expires.insert(key.to_owned(), deadline);
            }
            None => {
                state.expires.remove(key);
            }
        }
        true
    }

    /// Replaces the byte budget, evicting immediately if the new budget is
    /// tighter than the current account. Zero disables the budget.
    pub fn set_max_bytes(&self, max_bytes: u64) {
        let mut state = self.inner.state.write();
        state.max_bytes = max_bytes;
        if max_bytes > 0 {
            evict_locked(&mut state, self.inner.on_evicted.as_deref());
        }
    }
}

impl<V> LruStore<V> {
    /// Number of entries, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.read().items.len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently charged against the budget.
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.inner.state.read().used_bytes
    }

    /// The configured byte budget; zero means unbounded.
    #[must_use]
    pub fn max_bytes(&self) -> u64 {
        self.inner.state.read().max_bytes
    }

    /// Stops the background sweeper. Idempotent.
    ///
    /// An in-flight sweep finishes normally; no new ticks occur afterwards.
    /// The store itself keeps serving.
    pub fn close(&self) {
        self.sweeper.lock().take();
    }
}

impl<V> Store<V> for LruStore<V>
where
    V: Measured + Clone + Send + Sync + 'static,
{
    fn get(&self, key: &str) -> Option<V> {
        LruStore::get(self, key)
    }

    fn set(&self, key: &str, value: V) -> Result<(), StoreError> {
        LruStore::set(self, key, value)
    }

    fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) -> Result<(), StoreError> {
        LruStore::set_with_ttl(self, key, value, ttl)
    }

    fn delete(&self, key: &str) -> bool {
        LruStore::delete(self, key)
    }

    fn clear(&self) {
        LruStore::clear(self);
    }

    fn len(&self) -> usize {
        LruStore::len(self)
    }

    fn close(&self) {
        LruStore::close(self);
    }
}

impl<V> fmt::Debug for LruStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("LruStore")
            .field("entries", &state.items.len())
            .field("used_bytes", &state.used_bytes)
            .field("max_bytes", &state.max_bytes)
            .finish()
    }
}

/// Deadline for a TTL. `None` means the entry never expires: a zero TTL by
/// contract, and a TTL reaching past the monotonic clock's range because no
/// storable deadline exists for it. Mirrors the sharded engine's saturating
/// deadline arithmetic.
fn deadline_for(ttl: Duration) -> Option<Instant> {
    if ttl.is_zero() {
        None
    } else {
        Instant::now().checked_add(ttl)
    }
}

/// Purges expired entries, then pops from the LRU end while the account
/// exceeds a non-zero budget. Returns the number of entries removed. Caller
/// holds the write lock.
fn evict_locked<V: Measured>(
    state: &mut LruState<V>,
    on_evicted: Option<&(dyn Fn(&str, &V) + Send + Sync)>,
) -> usize {
    let now = Instant::now();
    let dead: Vec<String> = state
        .expires
        .iter()
        .filter(|(_, deadline)| **deadline <= now)
        .map(|(key, _)| key.clone())
        .collect();
    let mut removed = 0;
    for key in &dead {
        if let Some(entry) = state.remove_entry(key) {
            if let Some(callback) = on_evicted {
                callback(&entry.key, &entry.value);
            }
            removed += 1;
        }
    }

    while state.max_bytes > 0 && state.used_bytes > state.max_bytes {
        let Some(entry) = state.pop_back_entry() else {
            break;
        };
        if let Some(callback) = on_evicted {
            callback(&entry.key, &entry.value);
        }
        removed += 1;
    }
    removed
}

fn spawn_sweeper<V>(inner: Arc<LruInner<V>>, interval: Duration) -> Option<Sender<()>>
where
    V: Measured + Send + Sync + 'static,
{
    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("tiercache-lru-sweeper".into())
        .spawn(move || sweeper_loop(&inner, &shutdown_rx, interval));
    match spawned {
        Ok(_) => Some(shutdown_tx),
        Err(_) => {
            log::warn!("lru sweeper failed to spawn; expired entries purge on access only");
            None
        }
    }
}

/// Ticks on `recv_timeout` until every sender is gone (close or store drop).
fn sweeper_loop<V: Measured>(inner: &LruInner<V>, shutdown: &Receiver<()>, interval: Duration) {
    loop {
        match shutdown.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let mut state = inner.state.write();
                let swept = evict_locked(&mut state, inner.on_evicted.as_deref());
                drop(state);
                if swept > 0 {
                    log::debug!("lru sweep purged {swept} entries");
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback(evicted: &Arc<Mutex<Vec<String>>>) -> LruConfig<String> {
        let evicted = Arc::clone(evicted);
        LruConfig::default().on_evicted(move |key, _value: &String| {
            evicted.lock().push(key.to_owned());
        })
    }

    #[test]
    fn set_get_roundtrip() {
        let store = LruStore::new(LruConfig::default());
        assert_eq!(store.get("missing"), None);
        store.set("k", String::from("v")).unwrap();
        assert_eq!(store.get("k"), Some(String::from("v")));
        assert_eq!(store.len(), 1);
        store.close();
    }

    #[test]
    fn byte_accounting_tracks_updates() {
        let store = LruStore::new(LruConfig::default());
        store.set("k", String::from("11")).unwrap();
        assert_eq!(store.used_bytes(), 3); // 1 key byte + 2 value bytes
        store.set("k", String::from("1111")).unwrap();
        assert_eq!(store.used_bytes(), 5);
        assert_eq!(store.len(), 1);
        store.delete("k");
        assert_eq!(store.used_bytes(), 0);
        store.close();
    }

    #[test]
    fn budget_evicts_least_recently_used() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let store = LruStore::new(counting_callback(&evicted).max_bytes(9));
        store.set("a", String::from("11")).unwrap();
        store.set("b", String::from("11")).unwrap();
        store.set("c", String::from("11")).unwrap();
        assert_eq!(store.used_bytes(), 9);

        // Touch `a` so `b` becomes the eviction candidate.
        assert_eq!(store.get("a"), Some(String::from("11")));
        store.set("d", String::from("11")).unwrap();

        assert_eq!(*evicted.lock(), vec![String::from("b")]);
        assert_eq!(store.get("b"), None);
        assert_eq!(store.get("a"), Some(String::from("11")));
        assert_eq!(store.used_bytes(), 9);
        assert_eq!(store.len(), 3);
        store.close();
    }

    #[test]
    fn zero_budget_is_unbounded() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let store = LruStore::new(counting_callback(&evicted).max_bytes(0));
        for i in 0..100 {
            store.set(&format!("key-{i}"), String::from("value")).unwrap();
        }
        assert_eq!(store.len(), 100);
        assert!(evicted.lock().is_empty());
        store.close();
    }

    #[test]
    fn expired_get_purges_entry() {
        let store = LruStore::new(LruConfig::default());
        store
            .set_with_ttl("k", String::from("v"), Duration::from_millis(5))
            .unwrap();
        assert_eq!(store.get("k"), Some(String::from("v")));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(store.get("k"), None);
        assert_eq!(store.len(), 0);
        store.close();
    }

    #[test]
    fn get_with_expiration_reports_remaining_ttl() {
        let store = LruStore::new(LruConfig::default());
        store.set("forever", String::from("v")).unwrap();
        store
            .set_with_ttl("brief", String::from("v"), Duration::from_secs(60))
            .unwrap();

        let (_, remaining) = store.get_with_expiration("forever").unwrap();
        assert_eq!(remaining, Duration::ZERO);

        let (_, remaining) = store.get_with_expiration("brief").unwrap();
        assert!(remaining > Duration::ZERO);
        assert!(remaining <= Duration::from_secs(60));

        assert_eq!(store.get_with_expiration("missing"), None);
        store.close();
    }

    #[test]
    fn update_expiration_rewrites_and_clears() {
        let store = LruStore::new(LruConfig::default());
        assert!(!store.update_expiration("missing", Duration::from_secs(1)));

        store.set("k", String::from("v")).unwrap();
        assert!(store.update_expiration("k", Duration::from_millis(5)));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(store.get("k"), None);

        store
            .set_with_ttl("j", String::from("v"), Duration::from_millis(5))
            .unwrap();
        assert!(store.update_expiration("j", Duration::ZERO));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(store.get("j"), Some(String::from("v")));
        store.close();
    }

    #[test]
    fn delete_reports_presence_and_fires_callback() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let store = LruStore::new(counting_callback(&evicted));
        store.set("k", String::from("v")).unwrap();
        assert!(store.delete("k"));
        assert!(!store.delete("k"));
        assert_eq!(*evicted.lock(), vec![String::from("k")]);
        store.close();
    }

    #[test]
    fn clear_resets_everything() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let store = LruStore::new(counting_callback(&evicted));
        store.set("a", String::from("1")).unwrap();
        store
            .set_with_ttl("b", String::from("2"), Duration::from_secs(60))
            .unwrap();
        store.clear();
        assert_eq!(store.len(), 0);
        assert_eq!(store.used_bytes(), 0);
        let mut seen = evicted.lock().clone();
        seen.sort();
        assert_eq!(seen, vec![String::from("a"), String::from("b")]);
        store.close();
    }

    #[test]
    fn tightening_budget_evicts_immediately() {
        let store = LruStore::new(LruConfig::default());
        store.set("a", String::from("11")).unwrap();
        store.set("b", String::from("11")).unwrap();
        assert_eq!(store.used_bytes(), 6);
        assert_eq!(store.max_bytes(), 8 * 1024 * 1024);

        store.set_max_bytes(3);
        assert_eq!(store.max_bytes(), 3);
        assert_eq!(store.used_bytes(), 3);
        assert_eq!(store.get("a"), None);
        assert_eq!(store.get("b"), Some(String::from("11")));
        store.close();
    }

    #[test]
    fn eviction_uses_atomic_counter_callback() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let store = LruStore::new(LruConfig::default().max_bytes(6).on_evicted(
            move |_key, _value: &String| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        ));
        for i in 0..10 {
            store.set(&format!("{i}"), String::from("11")).unwrap();
        }
        // Budget fits two entries of three bytes; eight were displaced.
        assert_eq!(store.len(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 8);
        store.close();
    }
}
