//! Binary min-heap with a key → position index.
//!
//! Every key appears exactly once in the heap. A side map records where each
//! key currently sits, so a changed score can be restored to heap order with a
//! single sift (O(log n)) instead of re-heapifying the whole vector.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      IndexedMinHeap Layout                          │
//! │                                                                     │
//! │   entries: Vec<HeapEntry<K, S, V>>   (implicit binary tree)         │
//! │                                                                     │
//! │        idx:   0          1          2          3                    │
//! │            ┌────────┬──────────┬──────────┬──────────┐              │
//! │            │ "B",3  │  "A",10  │  "C",7   │  "D",12  │              │
//! │            └────────┴──────────┴──────────┴──────────┘              │
//! │                                                                     │
//! │   positions: FxHashMap<K, usize>                                    │
//! │            "B" → 0   "A" → 1   "C" → 2   "D" → 3                    │
//! │                                                                     │
//! │   Every swap inside sift_up / sift_down rewrites both positions.    │
//! └─────────────────────────────────────────────────────────────────────┘
//!
//! Update Flow
//! ───────────
//!   update_with("A", f):
//!     1. pos = positions["A"]
//!     2. score = f(&mut entries[pos].value)
//!     3. entries[pos].score = score, seq = next_seq
//!     4. sift_up(pos) or sift_down(pos)
//! ```
//!
//! ## Ordering
//!
//! Entries compare by `(score, seq)`. `seq` is bumped on every insert or
//! update, so among equal scores the entry touched longest ago comes out
//! first.
//!
//! ## Operations
//!
//! | Operation     | Complexity |
//! |---------------|------------|
//! | `insert`      | O(log n)   |
//! | `update_with` | O(log n)   |
//! | `remove`      | O(log n)   |
//! | `pop_min`     | O(log n)   |
//! | `peek_min`    | O(1)       |
//! | `get`         | O(1)       |
//!
//! ## Example Usage
//!
//! ```
//! use edgecache::ds::IndexedMinHeap;
//!
//! let mut heap: IndexedMinHeap<&str, u32, ()> = IndexedMinHeap::new();
//! heap.insert("a", 5, ());
//! heap.insert("b", 2, ());
//! heap.insert("c", 8, ());
//!
//! // Lower "a" below everything else in place.
//! heap.update_with(&"a", |_| 1);
//!
//! assert_eq!(heap.pop_min().map(|(k, s, _)| (k, s)), Some(("a", 1)));
//! assert_eq!(heap.pop_min().map(|(k, s, _)| (k, s)), Some(("b", 2)));
//! assert_eq!(heap.pop_min().map(|(k, s, _)| (k, s)), Some(("c", 8)));
//! assert!(heap.pop_min().is_none());
//! ```
//!
//! ## Thread Safety
//!
//! `IndexedMinHeap` is not thread-safe. Wrap in a mutex for concurrent access.
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::hash::Hash;

use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
struct HeapEntry<K, S, V> {
    key: K,
    score: S,
    seq: u64,
    value: V,
}

impl<K, S: Ord, V> HeapEntry<K, S, V> {
    fn order(&self, other: &Self) -> Ordering {
        match self.score.cmp(&other.score) {
            Ordering::Equal => self.seq.cmp(&other.seq),
            ordering => ordering,
        }
    }
}

/// Min-heap keyed by `K`, ordered by score `S`, carrying a payload `V`.
#[derive(Debug)]
pub struct IndexedMinHeap<K, S, V> {
    entries: Vec<HeapEntry<K, S, V>>,
    positions: FxHashMap<K, usize>,
    seq: u64,
}

impl<K, S, V> IndexedMinHeap<K, S, V>
where
    K: Eq + Hash + Clone,
    S: Ord,
{
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            positions: FxHashMap::default(),
            seq: 0,
        }
    }

    /// Creates an empty heap with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            positions: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.positions.contains_key(key)
    }

    /// Returns the payload stored for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let pos = *self.positions.get(key)?;
        Some(&self.entries[pos].value)
    }

    /// Returns the current score for `key`.
    pub fn score_of<Q>(&self, key: &Q) -> Option<&S>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let pos = *self.positions.get(key)?;
        Some(&self.entries[pos].score)
    }

    /// Inserts `key` or replaces its score and payload. Returns the previous payload.
    ///
    /// ```
    /// use edgecache::ds::IndexedMinHeap;
    ///
    /// let mut heap: IndexedMinHeap<&str, i32, &str> = IndexedMinHeap::new();
    /// assert_eq!(heap.insert("item", 10, "first"), None);
    /// assert_eq!(heap.insert("item", 5, "second"), Some("first"));
    /// assert_eq!(heap.score_of(&"item"), Some(&5));
    /// assert_eq!(heap.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, score: S, value: V) -> Option<V> {
        let seq = self.next_seq();
        if let Some(&pos) = self.positions.get(&key) {
            let entry = &mut self.entries[pos];
            entry.score = score;
            entry.seq = seq;
            let previous = std::mem::replace(&mut entry.value, value);
            self.fix(pos);
            return Some(previous);
        }

        let pos = self.entries.len();
        self.positions.insert(key.clone(), pos);
        self.entries.push(HeapEntry {
            key,
            score,
            seq,
            value,
        });
        self.sift_up(pos);
        None
    }

    /// Mutates the payload of `key` in place and re-scores it.
    ///
    /// `f` receives the payload and returns the new score. Returns `false`
    /// when `key` is absent (and `f` is not called).
    pub fn update_with<Q>(&mut self, key: &Q, f: impl FnOnce(&mut V) -> S) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(&pos) = self.positions.get(key) else {
            return false;
        };
        let seq = self.next_seq();
        let entry = &mut self.entries[pos];
        entry.score = f(&mut entry.value);
        entry.seq = seq;
        self.fix(pos);
        true
    }

    /// Returns the minimum entry without removing it.
    pub fn peek_min(&self) -> Option<(&K, &S, &V)> {
        self.entries
            .first()
            .map(|entry| (&entry.key, &entry.score, &entry.value))
    }

    /// Removes and returns the minimum entry.
    pub fn pop_min(&mut self) -> Option<(K, S, V)> {
        self.remove_at(0)
    }

    /// Removes `key` and returns its score and payload.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<(S, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let pos = *self.positions.get(key)?;
        let (_, score, value) = self.remove_at(pos)?;
        Some((score, value))
    }

    /// Iterates keys in heap (not sorted) order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|entry| &entry.key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.positions.clear();
    }

    #[cfg(any(test, debug_assertions))]
    /// Validates heap order and the position index (debug/test builds only).
    pub fn debug_validate_invariants(&self) {
        assert_eq!(self.entries.len(), self.positions.len());
        for (pos, entry) in self.entries.iter().enumerate() {
            assert_eq!(self.positions.get(&entry.key), Some(&pos));
            if pos > 0 {
                let parent = (pos - 1) / 2;
                assert_ne!(
                    self.entries[parent].order(entry),
                    Ordering::Greater,
                    "heap order violated at {pos}"
                );
            }
        }
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        seq
    }

    fn remove_at(&mut self, pos: usize) -> Option<(K, S, V)> {
        let last = self.entries.len().checked_sub(1)?;
        if pos != last {
            self.swap(pos, last);
        }
        let entry = self.entries.pop()?;
        self.positions.remove(&entry.key);
        if pos < self.entries.len() {
            self.fix(pos);
        }
        Some((entry.key, entry.score, entry.value))
    }

    fn fix(&mut self, pos: usize) {
        if !self.sift_up(pos) {
            self.sift_down(pos);
        }
    }

    fn less(&self, a: usize, b: usize) -> bool {
        self.entries[a].order(&self.entries[b]) == Ordering::Less
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        if let Some(slot) = self.positions.get_mut(&self.entries[a].key) {
            *slot = a;
        }
        if let Some(slot) = self.positions.get_mut(&self.entries[b].key) {
            *slot = b;
        }
    }

    /// Returns `true` if the entry moved.
    fn sift_up(&mut self, mut pos: usize) -> bool {
        let start = pos;
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less(pos, parent) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
        pos != start
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(child, pos) {
                break;
            }
            self.swap(pos, child);
            pos = child;
        }
    }
}

impl<K, S, V> Default for IndexedMinHeap<K, S, V>
where
    K: Eq + Hash + Clone,
    S: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn indexed_heap_pops_in_score_order() {
        let mut heap = IndexedMinHeap::new();
        heap.insert("a", 5, ());
        heap.insert("b", 1, ());
        heap.insert("c", 3, ());

        let order: Vec<_> = std::iter::from_fn(|| heap.pop_min().map(|(k, _, _)| k)).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn indexed_heap_tie_breaks_by_last_touch() {
        let mut heap = IndexedMinHeap::new();
        heap.insert("a", 1, ());
        heap.insert("b", 1, ());
        heap.insert("c", 1, ());
        // Re-touching "a" moves it behind its peers.
        heap.update_with(&"a", |_| 1);

        assert_eq!(heap.pop_min().map(|(k, _, _)| k), Some("b"));
        assert_eq!(heap.pop_min().map(|(k, _, _)| k), Some("c"));
        assert_eq!(heap.pop_min().map(|(k, _, _)| k), Some("a"));
    }

    #[test]
    fn indexed_heap_update_with_mutates_payload() {
        let mut heap: IndexedMinHeap<&str, u64, u64> = IndexedMinHeap::new();
        heap.insert("a", 1, 1);
        heap.insert("b", 2, 1);
        assert!(heap.update_with(&"a", |hits| {
            *hits += 1;
            10
        }));
        assert!(!heap.update_with(&"missing", |_| 0));

        assert_eq!(heap.get(&"a"), Some(&2));
        assert_eq!(heap.peek_min().map(|(k, _, _)| *k), Some("b"));
        heap.debug_validate_invariants();
    }

    #[test]
    fn indexed_heap_remove_middle_keeps_order() {
        let mut heap = IndexedMinHeap::new();
        for (i, key) in ["a", "b", "c", "d", "e", "f"].into_iter().enumerate() {
            heap.insert(key, i as u32, ());
        }
        assert_eq!(heap.remove(&"c"), Some((2, ())));
        assert_eq!(heap.remove(&"c"), None);
        heap.debug_validate_invariants();

        let order: Vec<_> = std::iter::from_fn(|| heap.pop_min().map(|(k, _, _)| k)).collect();
        assert_eq!(order, vec!["a", "b", "d", "e", "f"]);
        assert!(heap.is_empty());
    }

    #[test]
    fn indexed_heap_clear_and_keys() {
        let mut heap = IndexedMinHeap::with_capacity(4);
        heap.insert(1, 1, ());
        heap.insert(2, 2, ());
        let mut keys: Vec<_> = heap.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![1, 2]);
        assert!(heap.contains(&1));

        heap.clear();
        assert!(heap.is_empty());
        assert!(!heap.contains(&1));
    }

    proptest! {
        /// Property: after any mix of inserts, re-scores and removals the
        /// heap pops every live key exactly once in non-decreasing score order.
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_pop_order_is_sorted(
            ops in prop::collection::vec((0u8..3, 0u16..32, any::<u32>()), 0..200)
        ) {
            let mut heap: IndexedMinHeap<u16, u32, ()> = IndexedMinHeap::new();
            let mut model = std::collections::HashMap::new();

            for (op, key, score) in ops {
                match op {
                    0 => {
                        heap.insert(key, score, ());
                        model.insert(key, score);
                    },
                    1 => {
                        let updated = heap.update_with(&key, |_| score);
                        prop_assert_eq!(updated, model.contains_key(&key));
                        if updated {
                            model.insert(key, score);
                        }
                    },
                    _ => {
                        let removed = heap.remove(&key).map(|(s, _)| s);
                        prop_assert_eq!(removed, model.remove(&key));
                    },
                }
                heap.debug_validate_invariants();
            }

            let mut last = None;
            let mut popped = 0usize;
            while let Some((key, score, ())) = heap.pop_min() {
                prop_assert_eq!(model.get(&key), Some(&score));
                if let Some(prev) = last {
                    prop_assert!(prev <= score);
                }
                last = Some(score);
                popped += 1;
            }
            prop_assert_eq!(popped, model.len());
        }
    }
}
