//! # Frecency Heap
//!
//! Key → size index ordered by a blended frequency/recency score. The entry
//! with the lowest score is evicted first.
//!
//! ## Score
//!
//! ```text
//!   score = last_hit_unix_nanos × (1 + hits × hit_weight)
//!
//!   hit_weight = 0.0  → pure LRU by last access
//!   hit_weight > 0.0  → each hit multiplies the recency term
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   ┌───────────────────────────────────────────────────────────────────────┐
//!   │                          FrecencyHeap<C>                              │
//!   │                                                                       │
//!   │   Mutex<IndexedMinHeap<String, FrecencyScore, Meta>>                  │
//!   │                                                                       │
//!   │            ("b", 1.7e18, {size: 40, hits: 1})   ← remove_oldest       │
//!   │             /                          \                              │
//!   │   ("a", 9.1e19, {hits: 50})    ("c", 3.4e18, {hits: 2})               │
//!   │                                                                       │
//!   │   clock: C        hit_weight: f64                                     │
//!   └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Updating an existing key re-scores it in place and restores heap order
//! with one sift, so `add`, `touch` and `remove_oldest` are all O(log n).
//! Equal scores evict the entry touched longest ago first.
//!
//! ## Example Usage
//!
//! ```
//! use edgecache::policy::{FrecencyHeap, ManualClock};
//! use edgecache::traits::EvictionIndex;
//!
//! let clock = ManualClock::new(1_000);
//! let heap = FrecencyHeap::with_clock(1.0, clock);
//! heap.add("hot", 10);
//! heap.add("cold", 10);
//! for _ in 0..5 {
//!     heap.touch("hot");
//! }
//!
//! assert_eq!(heap.remove_oldest(), Some(("cold".to_string(), 10)));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::ds::IndexedMinHeap;
use crate::traits::EvictionIndex;

/// Source of "now" for last-hit timestamps.
pub trait Clock: Send + Sync {
    /// Nanoseconds since the Unix epoch.
    fn now_nanos(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// Manually driven clock for deterministic tests and benches.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new(nanos: u64) -> Self {
        Self {
            nanos: AtomicU64::new(nanos),
        }
    }

    pub fn set(&self, nanos: u64) {
        self.nanos.store(nanos, AtomicOrdering::Relaxed);
    }

    pub fn advance(&self, nanos: u64) {
        self.nanos.fetch_add(nanos, AtomicOrdering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.nanos.load(AtomicOrdering::Relaxed)
    }
}

/// Totally ordered frecency score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrecencyScore(pub f64);

impl FrecencyScore {
    /// `last_hit_nanos × (1 + hits × hit_weight)`.
    pub fn compute(last_hit_nanos: u64, hits: u64, hit_weight: f64) -> Self {
        Self(last_hit_nanos as f64 * (1.0 + hits as f64 * hit_weight))
    }
}

impl Eq for FrecencyScore {}

impl PartialOrd for FrecencyScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrecencyScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Meta {
    size: u64,
    hits: u64,
    last_hit_nanos: u64,
}

impl Meta {
    fn score(&self, hit_weight: f64) -> FrecencyScore {
        FrecencyScore::compute(self.last_hit_nanos, self.hits, hit_weight)
    }
}

/// Thread-safe frecency-ranked key → size index.
pub struct FrecencyHeap<C: Clock = SystemClock> {
    heap: Mutex<IndexedMinHeap<String, FrecencyScore, Meta>>,
    hit_weight: f64,
    clock: C,
}

impl FrecencyHeap<SystemClock> {
    /// Creates an empty heap on the wall clock.
    pub fn new(hit_weight: f64) -> Self {
        Self::with_clock(hit_weight, SystemClock)
    }
}

impl<C: Clock> FrecencyHeap<C> {
    pub fn with_clock(hit_weight: f64, clock: C) -> Self {
        Self {
            heap: Mutex::new(IndexedMinHeap::new()),
            hit_weight,
            clock,
        }
    }

    pub fn hit_weight(&self) -> f64 {
        self.hit_weight
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Hit count recorded for `key`.
    pub fn hits(&self, key: &str) -> Option<u64> {
        self.heap.lock().get(key).map(|meta| meta.hits)
    }

    /// Current score of `key`.
    pub fn score(&self, key: &str) -> Option<FrecencyScore> {
        self.heap.lock().score_of(key).copied()
    }

    /// Key that `remove_oldest` would pop next.
    pub fn peek_oldest(&self) -> Option<(String, u64)> {
        self.heap
            .lock()
            .peek_min()
            .map(|(key, _, meta)| (key.clone(), meta.size))
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.heap.lock().debug_validate_invariants();
    }
}

impl<C: Clock> EvictionIndex for FrecencyHeap<C> {
    /// Counts a hit on an existing key and updates its size; a new key starts
    /// with one hit.
    fn add(&self, key: &str, size: u64) -> u64 {
        let now = self.clock.now_nanos();
        let weight = self.hit_weight;
        let mut heap = self.heap.lock();

        let mut old_size = 0;
        let updated = heap.update_with(key, |meta| {
            old_size = std::mem::replace(&mut meta.size, size);
            meta.hits = meta.hits.saturating_add(1);
            meta.last_hit_nanos = now;
            meta.score(weight)
        });
        if updated {
            return old_size;
        }

        let meta = Meta {
            size,
            hits: 1,
            last_hit_nanos: now,
        };
        heap.insert(key.to_owned(), meta.score(weight), meta);
        0
    }

    fn touch(&self, key: &str) -> bool {
        let now = self.clock.now_nanos();
        let weight = self.hit_weight;
        self.heap.lock().update_with(key, |meta| {
            meta.hits = meta.hits.saturating_add(1);
            meta.last_hit_nanos = now;
            meta.score(weight)
        })
    }

    fn remove_oldest(&self) -> Option<(String, u64)> {
        self.heap
            .lock()
            .pop_min()
            .map(|(key, _, meta)| (key, meta.size))
    }

    fn remove(&self, key: &str) -> Option<u64> {
        self.heap.lock().remove(key).map(|(_, meta)| meta.size)
    }

    /// Keys in heap order, which is only a partial order.
    fn keys(&self) -> Vec<String> {
        self.heap.lock().keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.heap.lock().len()
    }
}

impl<C: Clock> fmt::Debug for FrecencyHeap<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrecencyHeap")
            .field("len", &self.heap.lock().len())
            .field("hit_weight", &self.hit_weight)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heap_at(nanos: u64, hit_weight: f64) -> FrecencyHeap<ManualClock> {
        FrecencyHeap::with_clock(hit_weight, ManualClock::new(nanos))
    }

    #[test]
    fn score_matches_formula() {
        let score = FrecencyScore::compute(1_000, 4, 0.5);
        assert_eq!(score, FrecencyScore(1_000.0 * 3.0));
        assert!(FrecencyScore(1.0) < FrecencyScore(2.0));
    }

    #[test]
    fn new_key_starts_with_one_hit() {
        let heap = heap_at(10, 1.0);
        assert_eq!(heap.add("a", 7), 0);
        assert_eq!(heap.hits("a"), Some(1));
        assert_eq!(heap.score("a"), Some(FrecencyScore(20.0)));
    }

    #[test]
    fn re_add_counts_hit_and_returns_old_size() {
        let heap = heap_at(10, 1.0);
        heap.add("a", 7);
        heap.clock().set(20);
        assert_eq!(heap.add("a", 9), 7);
        assert_eq!(heap.hits("a"), Some(2));
        assert_eq!(heap.score("a"), Some(FrecencyScore(60.0)));
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn hot_key_outlives_cold_key_at_same_timestamp() {
        let heap = heap_at(1_000_000, 0.1);
        heap.add("A", 100);
        heap.add("B", 100);
        for _ in 0..99 {
            heap.touch("A");
        }
        heap.clock().advance(5);
        heap.touch("A");
        heap.touch("B");

        assert_eq!(heap.hits("A"), Some(101));
        assert_eq!(heap.hits("B"), Some(2));
        assert_eq!(heap.remove_oldest(), Some(("B".to_string(), 100)));
        assert_eq!(heap.remove_oldest(), Some(("A".to_string(), 100)));
        assert_eq!(heap.remove_oldest(), None);
    }

    #[test]
    fn zero_weight_degrades_to_recency() {
        let heap = heap_at(100, 0.0);
        heap.add("old", 1);
        heap.clock().advance(1);
        heap.add("new", 1);
        for _ in 0..10 {
            heap.touch("old");
        }
        heap.clock().advance(1);
        heap.touch("new");
        assert_eq!(heap.peek_oldest(), Some(("old".to_string(), 1)));
    }

    #[test]
    fn equal_scores_evict_least_recently_touched() {
        let heap = heap_at(50, 1.0);
        heap.add("x", 1);
        heap.add("y", 1);
        heap.add("z", 1);
        assert_eq!(heap.remove_oldest().map(|(k, _)| k).as_deref(), Some("x"));
        assert_eq!(heap.remove_oldest().map(|(k, _)| k).as_deref(), Some("y"));
    }

    #[test]
    fn touch_and_remove_on_missing_key() {
        let heap = heap_at(1, 1.0);
        assert!(!heap.touch("nope"));
        assert_eq!(heap.remove("nope"), None);
        heap.add("k", 3);
        assert_eq!(heap.remove("k"), Some(3));
        assert!(heap.is_empty());
    }

    #[test]
    fn keys_lists_every_entry() {
        let heap = heap_at(1, 1.0);
        for key in ["a", "b", "c", "d"] {
            heap.add(key, 1);
        }
        let mut keys = heap.keys();
        keys.sort();
        assert_eq!(keys, ["a", "b", "c", "d"]);
        heap.debug_validate_invariants();
    }

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(SystemClock.now_nanos() > 0);
    }
}
