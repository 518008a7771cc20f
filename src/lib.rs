#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! This section provides quick code examples and API references for the two
//! store engines and the facade that wraps them.
//!
//! ## Choosing an Engine
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Which Store Should I Use?                         │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Do you want lazy construction, hit/miss statistics, and engine        │
//! │  selection by configuration?                                            │
//! │                                                                         │
//! │       Yes ──▶ ┌───────────┐                                             │
//! │               │   Cache   │  facade over either engine                  │
//! │               └───────────┘                                             │
//! │       No: what bounds the cache?                                        │
//! │                                                                         │
//! │  ┌──────────────────────┐      ┌───────────┐                            │
//! │  │ A memory budget in   │─────▶│ LruStore  │  single tier, evicts       │
//! │  │ bytes                │      └───────────┘  oldest past the budget    │
//! │  └──────────────────────┘                                               │
//! │  ┌──────────────────────┐      ┌───────────┐                            │
//! │  │ Entry slots, heavy   │─────▶│ Lru2Store │  sharded, two tiers,       │
//! │  │ concurrent churn     │      └───────────┘  scan resistant            │
//! │  └──────────────────────┘                                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Reference
//!
//! | Type | Description | Best Use Case |
//! |------|-------------|---------------|
//! | [`Cache`] | Lazily initialized facade with hit/miss accounting | Application-level cache with stats |
//! | [`LruStore`] | Single-tier LRU bounded by a byte budget | Memory-capped caching of sized values |
//! | [`Lru2Store`] | Sharded two-tier LRU-2 over fixed slot arenas | High-churn concurrent workloads |
//! | [`Store`] | Object-safe trait both engines implement | Engine-agnostic call sites |
//! | [`StoreConfig`] | Engine-neutral configuration | Runtime engine selection via [`new_store`] |
//! | [`Clock`] | Shared approximate timestamp | Cheap expiry checks; manual time in tests |
//! | [`ByteView`] | Cheaply clonable immutable byte buffer | Caching raw payloads |
//!
//! ## Concurrency
//!
//! | Engine | Locking | Readers | Writers |
//! |--------|---------|---------|---------|
//! | `LruStore` | One `RwLock` over the store | Concurrent lookup, short exclusive recency bump | Serialized |
//! | `Lru2Store` | One `Mutex` per shard | Parallel across shards | Parallel across shards |
//!
//! ## Operation Costs
//!
//! | Operation | `LruStore` | `Lru2Store` |
//! |-----------|------------|-------------|
//! | `get` / `set` / `delete` | O(1) | O(1) |
//! | `len` | O(1) | O(total slots) |
//! | `clear` | O(entries) | O(total slots) |
//!
//! ## Expiry
//!
//! Every write path takes a TTL; `Duration::ZERO` means the entry never
//! expires. Expired entries are dropped lazily when a read finds them and in
//! bulk by a background sweeper thread each store owns. Exact-time expiry is
//! not guaranteed: `Lru2Store` timestamps against an approximate [`Clock`]
//! (roughly 100ms granularity) and `LruStore` against `Instant` checked at
//! read and sweep time.
//!
//! ## Code Examples
//!
//! ### The `Cache` facade
//!
//! Builds its engine on first write, counts hits and misses, and turns into
//! a no-op after [`Cache::close`]. The default configuration is a sharded
//! LRU-2 store.
//!
//! ```rust
//! use tiercache::{Cache, StoreConfig};
//!
//! let cache: Cache<Vec<u8>> = Cache::new(StoreConfig::default());
//! cache.set("alpha", b"payload".to_vec());
//! assert_eq!(cache.get("alpha"), Some(b"payload".to_vec()));
//! assert_eq!(cache.stats().hits, 1);
//! cache.close();
//! ```
//!
//! ### LRU with a byte budget
//!
//! One recency list for the whole store. Each entry is charged
//! `key length + value size` against the budget and the least recently used
//! entries are evicted once the budget is exceeded.
//!
//! ```rust
//! use tiercache::config::LruConfig;
//! use tiercache::LruStore;
//!
//! let store = LruStore::new(LruConfig::default().max_bytes(8));
//! store.set("a", vec![1u8, 2, 3]).unwrap(); // 1 + 3 = 4 bytes
//! store.set("b", vec![4u8, 5, 6]).unwrap(); // 8 bytes: exactly at budget
//! store.set("c", vec![7u8, 8, 9]).unwrap(); // over budget: "a" evicted
//! assert!(store.get("a").is_none());
//! assert_eq!(store.get("c"), Some(vec![7, 8, 9]));
//! ```
//!
//! ### Sharded LRU-2
//!
//! Keys hash to shards; each shard holds a probation tier and a protected
//! tier of fixed capacity. A first hit promotes the entry out of probation,
//! so one-shot scans cannot displace the working set in tier 2.
//!
//! ```rust
//! use tiercache::config::Lru2Config;
//! use tiercache::Lru2Store;
//!
//! let config = Lru2Config::default().buckets(1).cap_per_bucket(2).tier2_cap(2);
//! let store = Lru2Store::new(config);
//! store.set("a", 1).unwrap();
//! store.set("b", 2).unwrap();
//! assert_eq!(store.get("a"), Some(1)); // hit promotes "a" to the protected tier
//! store.set("c", 3).unwrap();          // tier 1 now holds "b" and "c"
//! assert_eq!(store.len(), 3);
//! ```
//!
//! ### Selecting an engine at runtime
//!
//! [`StoreConfig`] carries the union of both engines' options plus a
//! [`CacheKind`], which also parses from the strings `"lru"` and `"lru2"`.
//!
//! ```rust
//! use tiercache::{new_store, CacheKind, StoreConfig};
//!
//! let kind: CacheKind = "lru".parse().unwrap();
//! let config = StoreConfig::default().kind(kind).max_bytes(1024);
//! let store = new_store::<String>(config);
//! store.set("greeting", "hello".to_owned()).unwrap();
//! assert_eq!(store.get("greeting"), Some("hello".to_owned()));
//! store.close();
//! ```
//!
//! ### Deterministic expiry in tests
//!
//! A manual [`Clock`] spawns no sampler thread and moves only through
//! [`Clock::advance`], so TTL behavior can be tested without sleeping.
//!
//! ```rust
//! use std::time::Duration;
//! use tiercache::config::Lru2Config;
//! use tiercache::{Clock, Lru2Store};
//!
//! let clock = Clock::manual(1);
//! let store = Lru2Store::with_clock(Lru2Config::default(), clock.clone());
//! store.set_with_ttl("token", 7, Duration::from_secs(30)).unwrap();
//! assert_eq!(store.get("token"), Some(7));
//!
//! clock.advance(Duration::from_secs(31));
//! assert_eq!(store.get("token"), None);
//! ```
//!
//! ## Modules
//!
//! - [`cache`]: lazily initialized facade and the [`ByteView`] value type
//! - [`clock`]: shared approximate timestamp service
//! - [`config`]: configuration structures for both engines and the facade
//! - [`lru`]: single-tier byte-budgeted LRU store
//! - [`lru2`]: sharded two-tier LRU-2 store
//! - [`metrics`]: hit/miss counters and the stats snapshot
//! - [`store`]: the `Store` trait, value sizing, and the engine factory

/// The store contract shared by both engines.
///
/// Provides the object-safe [`Store`] trait, the [`Measured`] value-sizing
/// trait, the [`CacheKind`] engine selector, and [`new_store`], which builds
/// either engine behind a trait object.
pub mod store;

/// Approximate clock service.
///
/// A background sampler publishes a nanosecond timestamp that readers load
/// atomically, keeping expiry checks off the system-call path. Manual clocks
/// support deterministic tests.
pub mod clock;

/// Doubly linked list with in-place editing capabilities.
///
/// **Note**: internal infrastructure for [`lru`]. It exposes unsafe raw
/// pointer operations that require careful invariant maintenance; use the
/// store types instead.
pub(crate) mod list;

/// Fixed-capacity slot arena with an intrusive recency list.
///
/// Internal infrastructure for [`lru2`]: each shard tier is one `SlotCache`.
/// Index-based links keep it free of raw pointers.
pub(crate) mod slot;

/// Cache configuration structures.
///
/// Provides per-engine configuration ([`LruConfig`], [`Lru2Config`]) and the
/// engine-neutral [`StoreConfig`] used by the factory and the facade.
pub mod config;

/// Single-tier byte-budgeted LRU store.
///
/// One recency list under a reader/writer lock. Entries are charged by key
/// and value size against a byte budget; exceeding it evicts from the cold
/// end of the list.
pub mod lru;

/// Sharded two-tier LRU-2 store.
///
/// Keys hash across independently locked shards, each holding a probation
/// tier and a protected tier. First-hit promotion gives the protected tier
/// scan resistance.
pub mod lru2;

/// Cache metrics.
///
/// Atomic hit/miss counters and the [`CacheStats`] snapshot reported by the
/// facade.
pub mod metrics;

/// Lazily initialized cache facade.
///
/// Wraps either engine behind [`StoreConfig`], constructs it on first write,
/// counts hits and misses, and shuts down idempotently.
pub mod cache;

// Re-export the facade and both engines
pub use cache::{ByteView, Cache};
pub use lru::LruStore;
pub use lru2::Lru2Store;

// Re-export the store contract
pub use store::{new_store, CacheKind, EvictionCallback, Measured, Store, StoreError, UnknownCacheKind};

// Re-export configuration and support types
pub use clock::Clock;
pub use config::{Lru2Config, LruConfig, StoreConfig};
pub use metrics::{CacheMetrics, CacheStats};
