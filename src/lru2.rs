//! Sharded two-tier ("LRU-2") cache engine.
//!
//! The key space is striped across independently locked shards; each shard
//! owns two fixed-capacity [`SlotCache`] tiers:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       Lru2Store (N shards)                     │
//! │                                                                │
//! │   shard = bkdr_hash(key) & (N - 1)          N = 2^k            │
//! │                                                                │
//! │  ┌─ Shard 0 ────────[Mutex]─┐  ┌─ Shard 1 ────────[Mutex]─┐   │
//! │  │ tier 1: probation        │  │ tier 1: probation        │ … │
//! │  │ tier 2: protected        │  │ tier 2: protected        │   │
//! │  └──────────────────────────┘  └──────────────────────────┘   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Promotion Protocol
//!
//! Writes always land in tier 1 (probation), even when the key currently
//! lives in tier 2 — a protected entry is superseded by the fresher
//! probationary write, and both tiers may transiently hold the same key.
//! A read first probes tier 1 *destructively*: on a live, unexpired hit the
//! entry moves to tier 2 (promotion). Misses fall through to a
//! non-destructive tier-2 probe that only bumps recency. A key must therefore
//! be read at least once while on probation to earn a protected slot: one
//! burst of single-touch churn can only recycle probationary slots,
//! approximating LRU-2 admission without per-key access history.
//!
//! Expired entries discovered on read are purged from both tiers on the
//! spot; a background sweeper additionally walks every shard on a fixed
//! interval so keys that are never touched again still get reclaimed.
//!
//! # Locking
//!
//! One `parking_lot::Mutex` per shard, held for the full operation. A
//! reader/writer lock would buy nothing here: `get` mutates recency links on
//! every hit, so even reads need exclusive access. Aggregate operations
//! (`len`, `clear`) take shard locks one at a time and are therefore not
//! atomic snapshots — an accepted trade-off that keeps steady-state
//! operations non-blocking across shards.

use core::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::clock::{duration_nanos, Clock};
use crate::config::Lru2Config;
use crate::slot::SlotCache;
use crate::store::{EvictionCallback, Store, StoreError};

/// Largest supported shard request; anything above clamps down.
const MAX_BUCKETS: u32 = 1 << 16;

/// BKDR string hash: each byte folded in as `hash * 131 + byte`, wrapping in
/// 32-bit signed space. Deterministic and unseeded — not DoS-resistant,
/// which an in-process cache does not need.
fn bkdr_hash(key: &str) -> i32 {
    let mut hash: i32 = 0;
    for &byte in key.as_bytes() {
        hash = hash.wrapping_mul(131).wrapping_add(i32::from(byte));
    }
    hash
}

/// Power-of-two mask for a requested bucket count, clamped to
/// `[1, MAX_BUCKETS]` so a zero request can never produce a zero-shard
/// store.
fn shard_mask(buckets: u32) -> u32 {
    buckets.clamp(1, MAX_BUCKETS).next_power_of_two() - 1
}

/// One lock's worth of state: a probationary and a protected tier.
struct Shard<V> {
    probation: SlotCache<V>,
    protected: SlotCache<V>,
}

struct Lru2Inner<V> {
    shards: Box<[Mutex<Shard<V>>]>,
    mask: i32,
    clock: Clock,
    on_evicted: Option<EvictionCallback<V>>,
}

impl<V> Lru2Inner<V> {
    #[inline]
    fn shard_for(&self, key: &str) -> &Mutex<Shard<V>> {
        // mask is non-negative, so the AND clears the sign bit.
        let index = (bkdr_hash(key) & self.mask) as usize;
        &self.shards[index]
    }
}

/// Sharded two-tier LRU cache with per-entry expiry.
///
/// Entry counts are bounded per shard and tier (`buckets × (tier-1 cap +
/// tier-2 cap)` overall); values are opaque to this engine, which never
/// consults their byte size. All methods take `&self` and synchronize on the
/// owning shard's mutex, so the store can be shared across threads directly
/// or behind an [`Arc`].
///
/// # Examples
///
/// ```
/// use tiercache::config::Lru2Config;
/// use tiercache::Lru2Store;
///
/// let store = Lru2Store::new(Lru2Config::default());
/// store.set("session:1", vec![1u8, 2, 3]).unwrap();
/// assert_eq!(store.get("session:1"), Some(vec![1u8, 2, 3]));
/// store.close();
/// ```
pub struct Lru2Store<V> {
    inner: Arc<Lru2Inner<V>>,
    /// Dropping the sender stops the sweeper; `take` makes `close`
    /// idempotent.
    sweeper: Mutex<Option<Sender<()>>>,
}

impl<V> Lru2Store<V>
where
    V: Clone + Send + 'static,
{
    /// Builds a store from `config` with a private system clock.
    ///
    /// Zero config fields normalize to the documented defaults; construction
    /// never fails. A background sweeper thread starts immediately.
    #[must_use]
    pub fn new(config: Lru2Config<V>) -> Self {
        Self::with_clock(config, Clock::system())
    }

    /// Builds a store reading time from an injected [`Clock`].
    ///
    /// Expiry decisions (on read and in the sweeper) compare stored
    /// deadlines against `clock.now()`; handing in a manual clock makes
    /// them deterministic in tests.
    #[must_use]
    pub fn with_clock(config: Lru2Config<V>, clock: Clock) -> Self {
        let config = config.normalized();
        let mask = shard_mask(config.buckets);
        let shards: Box<[Mutex<Shard<V>>]> = (0..=mask)
            .map(|_| {
                Mutex::new(Shard {
                    probation: SlotCache::new(config.cap_per_bucket),
                    protected: SlotCache::new(config.tier2_cap),
                })
            })
            .collect();
        let inner = Arc::new(Lru2Inner {
            shards,
            mask: mask as i32,
            clock,
            on_evicted: config.on_evicted,
        });
        let sweeper = spawn_sweeper(Arc::clone(&inner), config.cleanup_interval);
        Lru2Store {
            inner,
            sweeper: Mutex::new(sweeper),
        }
    }

    /// Looks up `key`, applying the promotion protocol.
    ///
    /// A tier-1 hit is destructive: the entry leaves probation and, if
    /// unexpired, is reinserted into tier 2 (possibly displacing that tier's
    /// LRU entry, which fires the eviction callback). A tier-2 hit only
    /// bumps recency. An expired hit in either tier purges the key from both
    /// tiers, fires the callback once with the expired value, and reports a
    /// miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.inner.clock.now();
        let mut shard = self.inner.shard_for(key).lock();

        if let Some((value, expires_at)) = shard.probation.remove(key) {
            if expired(expires_at, now) {
                shard.protected.remove(key);
                if let Some(callback) = &self.inner.on_evicted {
                    callback(key, &value);
                }
                return None;
            }
            // Promote, preserving the original deadline.
            let (_, displaced) = shard.protected.put(key, value.clone(), expires_at);
            if let (Some((dk, dv)), Some(callback)) = (&displaced, &self.inner.on_evicted) {
                callback(dk, dv);
            }
            return Some(value);
        }

        let hit = shard
            .protected
            .get(key)
            .map(|(value, expires_at)| (value.clone(), expires_at));
        if let Some((value, expires_at)) = hit {
            if expired(expires_at, now) {
                delete_locked(&mut shard, key, self.inner.on_evicted.as_deref());
                return None;
            }
            return Some(value);
        }
        None
    }

    /// Inserts or updates `key` with no expiration.
    ///
    /// The write always lands in tier 1, even when the key currently
    /// resides in tier 2; see the module docs. The error slot is reserved
    /// for fallible backends and never populated here.
    pub fn set(&self, key: &str, value: V) -> Result<(), StoreError> {
        self.set_with_ttl(key, value, Duration::ZERO)
    }

    /// Inserts or updates `key`; a zero `ttl` means the entry never expires.
    ///
    /// Displacing tier 1's LRU entry fires the eviction callback under the
    /// shard lock.
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = if ttl.is_zero() {
            0
        } else {
            self.inner.clock.now().saturating_add(duration_nanos(ttl))
        };
        let mut shard = self.inner.shard_for(key).lock();
        let (_, displaced) = shard.probation.put(key, value, expires_at);
        if let (Some((dk, dv)), Some(callback)) = (&displaced, &self.inner.on_evicted) {
            callback(dk, dv);
        }
        Ok(())
    }

    /// Removes `key` from both tiers.
    ///
    /// Returns `true` if either tier held a live entry. The eviction
    /// callback fires at most once per call, with the tier-1 value when both
    /// tiers held the key (the tier-1 copy is the most recent write).
    pub fn delete(&self, key: &str) -> bool {
        let mut shard = self.inner.shard_for(key).lock();
        delete_locked(&mut shard, key, self.inner.on_evicted.as_deref())
    }

    /// Removes every entry, firing the eviction callback once per key.
    ///
    /// Keys are collected shard by shard (tier-1 keys first, tier-2 keys
    /// de-duplicated against them) and then deleted through the normal
    /// per-key path, so callbacks fire uniformly. Not an atomic snapshot:
    /// entries written concurrently mid-scan may survive.
    pub fn clear(&self) {
        let mut keys = Vec::new();
        for shard in self.inner.shards.iter() {
            let guard = shard.lock();
            let start = keys.len();
            guard.probation.walk(|key, _, _| {
                keys.push(key.to_owned());
                true
            });
            guard.protected.walk(|key, _, _| {
                if !keys[start..].iter().any(|collected| collected == key) {
                    keys.push(key.to_owned());
                }
                true
            });
        }
        for key in &keys {
            self.delete(key);
        }
    }
}

impl<V> Lru2Store<V> {
    /// Counts live entries across every shard and tier.
    ///
    /// O(total slots); shard locks are taken one at a time, so concurrent
    /// writers can skew the count. A key caught mid-promotion in both tiers
    /// counts twice.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .shards
            .iter()
            .map(|shard| {
                let guard = shard.lock();
                guard.probation.live_len() + guard.protected.live_len()
            })
            .sum()
    }

    /// Returns `true` if no shard holds a live entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of shards (the requested bucket count rounded up to a power
    /// of two).
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.inner.shards.len()
    }

    /// Stops the background sweeper. Idempotent.
    ///
    /// An in-flight sweep finishes normally; no new ticks occur afterwards.
    /// The store itself keeps serving (post-close reads behave like any
    /// other read), matching the contract that post-close use is a no-op
    /// concern for the caller, not an error.
    pub fn close(&self) {
        self.sweeper.lock().take();
    }
}

impl<V> Store<V> for Lru2Store<V>
where
    V: Clone + Send + 'static,
{
    fn get(&self, key: &str) -> Option<V> {
        Lru2Store::get(self, key)
    }

    fn set(&self, key: &str, value: V) -> Result<(), StoreError> {
        Lru2Store::set(self, key, value)
    }

    fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) -> Result<(), StoreError> {
        Lru2Store::set_with_ttl(self, key, value, ttl)
    }

    fn delete(&self, key: &str) -> bool {
        Lru2Store::delete(self, key)
    }

    fn clear(&self) {
        Lru2Store::clear(self);
    }

    fn len(&self) -> usize {
        Lru2Store::len(self)
    }

    fn close(&self) {
        Lru2Store::close(self);
    }
}

impl<V> fmt::Debug for Lru2Store<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lru2Store")
            .field("shards", &self.inner.shards.len())
            .field("entries", &self.len())
            .finish()
    }
}

#[inline]
fn expired(expires_at: u64, now: u64) -> bool {
    expires_at != 0 && expires_at <= now
}

/// Removes `key` from both tiers of an already-locked shard.
fn delete_locked<V: Clone>(
    shard: &mut Shard<V>,
    key: &str,
    on_evicted: Option<&(dyn Fn(&str, &V) + Send + Sync)>,
) -> bool {
    let probation = shard.probation.remove(key);
    let protected = shard.protected.remove(key);
    let removed = probation.or(protected);
    if let (Some((value, _)), Some(callback)) = (&removed, on_evicted) {
        callback(key, value);
    }
    removed.is_some()
}

fn spawn_sweeper<V>(inner: Arc<Lru2Inner<V>>, interval: Duration) -> Option<Sender<()>>
where
    V: Clone + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("tiercache-lru2-sweeper".into())
        .spawn(move || sweeper_loop(&inner, &shutdown_rx, interval));
    match spawned {
        Ok(_) => Some(shutdown_tx),
        Err(_) => {
            log::warn!("lru2 sweeper failed to spawn; expired entries purge on access only");
            None
        }
    }
}

/// Ticks on `recv_timeout` until every sender is gone (close or store drop).
fn sweeper_loop<V: Clone>(inner: &Lru2Inner<V>, shutdown: &Receiver<()>, interval: Duration) {
    loop {
        match shutdown.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => sweep_expired(inner),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// One full pass: per shard, collect expired keys from both tiers
/// (de-duplicated) under the shard lock, then delete them through the shared
/// path so callbacks fire exactly once per key.
fn sweep_expired<V: Clone>(inner: &Lru2Inner<V>) {
    let now = inner.clock.now();
    let mut swept = 0usize;
    for shard in inner.shards.iter() {
        let mut guard = shard.lock();
        let mut dead: Vec<String> = Vec::new();
        guard.probation.walk(|key, _, expires_at| {
            if expired(expires_at, now) {
                dead.push(key.to_owned());
            }
            true
        });
        guard.protected.walk(|key, _, expires_at| {
            if expired(expires_at, now) && !dead.iter().any(|collected| collected == key) {
                dead.push(key.to_owned());
            }
            true
        });
        for key in &dead {
            delete_locked(&mut guard, key, inner.on_evicted.as_deref());
        }
        swept += dead.len();
    }
    if swept > 0 {
        log::debug!("lru2 sweep purged {swept} expired entries");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bkdr_hash_is_deterministic() {
        assert_eq!(bkdr_hash(""), 0);
        assert_eq!(bkdr_hash("a"), 97);
        assert_eq!(bkdr_hash("ab"), 97 * 131 + 98);
        assert_eq!(bkdr_hash("user:1234"), bkdr_hash("user:1234"));
        assert_ne!(bkdr_hash("user:1234"), bkdr_hash("user:1235"));
    }

    #[test]
    fn bkdr_hash_wraps_instead_of_overflowing() {
        let long: String = "k".repeat(4096);
        let _ = bkdr_hash(&long);
    }

    #[test]
    fn shard_mask_rounds_up_to_power_of_two() {
        assert_eq!(shard_mask(0), 0);
        assert_eq!(shard_mask(1), 0);
        assert_eq!(shard_mask(2), 1);
        assert_eq!(shard_mask(3), 3);
        assert_eq!(shard_mask(16), 15);
        assert_eq!(shard_mask(17), 31);
        assert_eq!(shard_mask(u32::MAX), MAX_BUCKETS - 1);
    }

    #[test]
    fn routing_stays_in_range() {
        let store: Lru2Store<i32> = Lru2Store::new(Lru2Config::default().buckets(5));
        assert_eq!(store.shard_count(), 8);
        for key in ["", "a", "ქართული", "user:9999", "\u{0}weird"] {
            let index = (bkdr_hash(key) & store.inner.mask) as usize;
            assert!(index < store.shard_count());
        }
        store.close();
    }

    #[test]
    fn promotion_smoke() {
        let clock = Clock::manual(1);
        let store = Lru2Store::with_clock(
            Lru2Config::default().buckets(1).cap_per_bucket(2).tier2_cap(2),
            clock,
        );
        store.set("a", 1).unwrap();
        store.set("b", 2).unwrap();
        assert_eq!(store.get("a"), Some(1)); // a leaves probation for tier 2
        store.set("c", 3).unwrap();
        store.set("d", 4).unwrap(); // b displaced from probation
        assert_eq!(store.get("b"), None);
        assert_eq!(store.get("a"), Some(1)); // still protected
        store.close();
    }

    #[test]
    fn expiry_uses_injected_clock() {
        let clock = Clock::manual(1);
        let store = Lru2Store::with_clock(Lru2Config::default().buckets(1), clock.clone());
        store
            .set_with_ttl("k", 7, Duration::from_millis(10))
            .unwrap();
        assert_eq!(store.get("k"), Some(7));
        clock.advance(Duration::from_millis(11));
        assert_eq!(store.get("k"), None);
        assert_eq!(store.len(), 0);
        store.close();
    }
}
