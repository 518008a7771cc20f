//! Intrusive slot cache: the fixed-capacity building block of the sharded
//! two-tier engine.
//!
//! One [`SlotCache`] is a single recency tier. It packs three structures that
//! together form an arena-backed doubly linked list:
//!
//! ```text
//! slots:  [ Slot1 ][ Slot2 ][ Slot3 ] ...          entry arena, 1-based ids
//! links:  [ S ][ L1 ][ L2 ][ L3 ] ...              (prev, next) per slot
//!           │
//!           └─ sentinel at index 0: prev = tail id, next = head id
//! index:  key ──▶ slot id                          hash map
//! ```
//!
//! Links hold `u32` slot ids instead of pointers, so recency bumps are two
//! array writes with no pointer chasing, and the whole tier is plain safe
//! code. The arena is reserved once at construction and never grows: when
//! every slot is used, an insert recycles the current tail (LRU) slot in
//! place, returning the displaced pair so the engine can fire its eviction
//! callback.
//!
//! # Tombstones
//!
//! `remove` does not free anything. It clears the slot's `live` flag and
//! moves it to the tail, making it the next recycling candidate; the key stays
//! in the index until the slot is reused. Every read path treats a
//! tombstoned slot as absent. Liveness is a dedicated flag so that a live
//! never-expiring entry (`expires_at == 0`) is never mistaken for a deleted
//! one.
//!
//! # Operations
//!
//! | Operation | Cost | Notes |
//! |-----------|------|-------|
//! | `put` | O(1) | insert, update, or recycle-evict |
//! | `get` | O(1) | recency bump, no expiry check |
//! | `remove` | O(1) | tombstone + move to tail |
//! | `walk` | O(used slots) | recency order, live entries only |
//!
//! Expiry is deliberately not interpreted here: `expires_at` is stored and
//! handed back, and the engine decides against its clock.

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;
#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

use core::fmt;
use core::mem;

/// Sentinel id; `links[0]` stores `(tail, head)` and never holds data.
const SENTINEL: u32 = 0;

/// One `(prev, next)` pair of the arena list.
#[derive(Debug, Clone, Copy, Default)]
struct Link {
    prev: u32,
    next: u32,
}

/// Arena entry. `expires_at == 0` means "never expires"; deletion is tracked
/// by `live`, never by the expiry field.
struct Slot<V> {
    key: String,
    value: V,
    expires_at: u64,
    live: bool,
}

/// Whether a `put` created a logical entry or overwrote a live one.
///
/// Resurrecting a tombstoned slot counts as `Inserted`: the previous entry
/// for that key was already deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PutOutcome {
    Inserted,
    Updated,
}

/// A single fixed-capacity recency tier.
///
/// Internal infrastructure: the invariants (1-based ids, sentinel
/// consistency, index/arena bijection) are maintained across this module
/// only, so the type stays crate-private. Engines compose two of these per
/// shard.
pub(crate) struct SlotCache<V> {
    cap: u32,
    /// `cap + 1` links; `links[0]` is the sentinel.
    links: Vec<Link>,
    /// Used slots; `slots[i]` is slot id `i + 1`. Never reallocates.
    slots: Vec<Slot<V>>,
    /// key → slot id. Tombstoned slots keep their mapping until recycled.
    index: HashMap<String, u32>,
}

impl<V> SlotCache<V> {
    /// Creates a tier with room for `cap` entries, clamped to at least 1.
    ///
    /// All arena storage is reserved up front; no later allocation resizes
    /// it.
    pub(crate) fn new(cap: u32) -> Self {
        let cap = cap.max(1);
        SlotCache {
            cap,
            links: vec![Link::default(); cap as usize + 1],
            slots: Vec::with_capacity(cap as usize),
            index: HashMap::with_capacity(cap as usize),
        }
    }

    /// Inserts or updates `key`, bumping it to the head.
    ///
    /// Once the arena is full, the tail slot is recycled in place. The
    /// displaced `(key, value)` pair is returned only if that slot was live;
    /// recycling a tombstone displaces nothing observable.
    pub(crate) fn put(
        &mut self,
        key: &str,
        value: V,
        expires_at: u64,
    ) -> (PutOutcome, Option<(String, V)>) {
        if let Some(&id) = self.index.get(key) {
            let slot = &mut self.slots[id as usize - 1];
            let outcome = if slot.live {
                PutOutcome::Updated
            } else {
                PutOutcome::Inserted
            };
            slot.value = value;
            slot.expires_at = expires_at;
            slot.live = true;
            self.move_to_front(id);
            return (outcome, None);
        }

        if (self.slots.len() as u32) < self.cap {
            // Fresh claim: the arena still has an unused slot.
            self.slots.push(Slot {
                key: key.to_owned(),
                value,
                expires_at,
                live: true,
            });
            let id = self.slots.len() as u32;
            self.attach_front(id);
            self.index.insert(key.to_owned(), id);
            return (PutOutcome::Inserted, None);
        }

        // Full: overwrite the current tail slot.
        let id = self.links[SENTINEL as usize].prev;
        debug_assert_ne!(id, SENTINEL, "a full tier always has a tail");
        let slot = &mut self.slots[id as usize - 1];
        let was_live = slot.live;
        let old_key = mem::replace(&mut slot.key, key.to_owned());
        let old_value = mem::replace(&mut slot.value, value);
        slot.expires_at = expires_at;
        slot.live = true;
        self.index.remove(&old_key);
        self.index.insert(key.to_owned(), id);
        self.move_to_front(id);
        let evicted = was_live.then_some((old_key, old_value));
        (PutOutcome::Inserted, evicted)
    }

    /// Looks up `key`, bumping it to the head on a hit.
    ///
    /// Returns the value and its stored expiry; expiry is not interpreted
    /// here. Tombstoned slots report not-found without a recency bump, so a
    /// deleted entry keeps its place at the tail.
    pub(crate) fn get(&mut self, key: &str) -> Option<(&V, u64)> {
        let id = *self.index.get(key)?;
        if !self.slots[id as usize - 1].live {
            return None;
        }
        self.move_to_front(id);
        let slot = &self.slots[id as usize - 1];
        Some((&slot.value, slot.expires_at))
    }

    /// Tombstones `key`, returning its value and prior expiry.
    ///
    /// The slot moves to the tail (next recycling candidate) but keeps its
    /// storage and index entry until a future insert reuses it. Absent and
    /// already-tombstoned keys report `None`.
    pub(crate) fn remove(&mut self, key: &str) -> Option<(V, u64)>
    where
        V: Clone,
    {
        let id = *self.index.get(key)?;
        let slot = &mut self.slots[id as usize - 1];
        if !slot.live {
            return None;
        }
        slot.live = false;
        let value = slot.value.clone();
        let prior = slot.expires_at;
        self.move_to_back(id);
        Some((value, prior))
    }

    /// Visits live entries from most- to least-recently-used.
    ///
    /// Stops early when `visit` returns `false`. Tombstones are skipped but
    /// still traversed, so the cost is O(used slots).
    pub(crate) fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&str, &V, u64) -> bool,
    {
        let mut id = self.links[SENTINEL as usize].next;
        while id != SENTINEL {
            let slot = &self.slots[id as usize - 1];
            if slot.live && !visit(&slot.key, &slot.value, slot.expires_at) {
                return;
            }
            id = self.links[id as usize].next;
        }
    }

    /// Number of live entries; O(used slots).
    pub(crate) fn live_len(&self) -> usize {
        let mut count = 0;
        self.walk(|_, _, _| {
            count += 1;
            true
        });
        count
    }

    /// Unlinks `id` from its current position.
    ///
    /// The sentinel participates as an ordinary circular-list node
    /// (`prev` = tail, `next` = head), so the head/tail edge cases need no
    /// branches.
    fn detach(&mut self, id: u32) {
        let Link { prev, next } = self.links[id as usize];
        self.links[prev as usize].next = next;
        self.links[next as usize].prev = prev;
    }

    /// Links a currently-unlinked `id` as the new head.
    fn attach_front(&mut self, id: u32) {
        let head = self.links[SENTINEL as usize].next;
        self.links[id as usize] = Link { prev: SENTINEL, next: head };
        self.links[head as usize].prev = id;
        self.links[SENTINEL as usize].next = id;
    }

    /// Links a currently-unlinked `id` as the new tail.
    fn attach_back(&mut self, id: u32) {
        let tail = self.links[SENTINEL as usize].prev;
        self.links[id as usize] = Link { prev: tail, next: SENTINEL };
        self.links[tail as usize].next = id;
        self.links[SENTINEL as usize].prev = id;
    }

    /// Repositions `id` at the head. Sentinel and already-at-head are no-ops.
    fn move_to_front(&mut self, id: u32) {
        if id == SENTINEL || self.links[SENTINEL as usize].next == id {
            return;
        }
        self.detach(id);
        self.attach_front(id);
    }

    /// Repositions `id` at the tail. Sentinel and already-at-tail are no-ops.
    fn move_to_back(&mut self, id: u32) {
        if id == SENTINEL || self.links[SENTINEL as usize].prev == id {
            return;
        }
        self.detach(id);
        self.attach_back(id);
    }
}

impl<V> fmt::Debug for SlotCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotCache")
            .field("capacity", &self.cap)
            .field("used_slots", &self.slots.len())
            .field("live", &self.live_len())
            .finish()
    }
}
