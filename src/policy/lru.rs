//! # LRU Size Index
//!
//! Recency-ordered key → size index used by the disk caches and by the
//! LRU-backed memory cache.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                              Lru                                     │
//!   │                                                                      │
//!   │   Mutex<LruCore>                                                     │
//!   │   ┌────────────────────────────────┐   ┌──────────────────────────┐  │
//!   │   │ map: FxHashMap<String, SlotId> │──►│ list: IntrusiveList      │  │
//!   │   └────────────────────────────────┘   │                          │  │
//!   │                                        │ head (MRU)     tail (LRU)│  │
//!   │                                        │  [c,30] ◄─► [b,20] ◄─► [a,10]│
//!   │                                        └──────────────────────────┘  │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! | Operation       | Effect                                 | Cost |
//! |-----------------|----------------------------------------|------|
//! | `add`           | insert or update size, move to head    | O(1) |
//! | `touch`         | move existing key to head              | O(1) |
//! | `remove_oldest` | pop tail                               | O(1) |
//! | `remove`        | unlink by key                          | O(1) |
//! | `keys`          | oldest → newest                        | O(n) |
//!
//! ## Thread Safety
//!
//! One `parking_lot::Mutex` guards both the map and the list. Every public
//! method takes it once; no method calls back out while holding it.
//!
//! ## Example Usage
//!
//! ```
//! use edgecache::policy::Lru;
//! use edgecache::traits::EvictionIndex;
//!
//! let lru = Lru::new();
//! lru.add("a", 1);
//! lru.add("b", 1);
//! lru.add("c", 1);
//! lru.touch("a");
//!
//! assert_eq!(lru.keys(), ["b", "c", "a"]);
//! ```

use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::ds::{IntrusiveList, SlotId};
use crate::traits::EvictionIndex;

#[derive(Debug)]
struct Entry {
    key: String,
    size: u64,
}

/// Unsynchronized LRU state. Head is most recently used.
#[derive(Debug, Default)]
struct LruCore {
    map: FxHashMap<String, SlotId>,
    list: IntrusiveList<Entry>,
}

impl LruCore {
    fn add(&mut self, key: &str, size: u64) -> u64 {
        if let Some(&id) = self.map.get(key) {
            self.list.move_to_front(id);
            return match self.list.get_mut(id) {
                Some(entry) => std::mem::replace(&mut entry.size, size),
                None => 0,
            };
        }
        let id = self.list.push_front(Entry {
            key: key.to_owned(),
            size,
        });
        self.map.insert(key.to_owned(), id);
        0
    }

    fn touch(&mut self, key: &str) -> bool {
        match self.map.get(key) {
            Some(&id) => self.list.move_to_front(id),
            None => false,
        }
    }

    fn remove_oldest(&mut self) -> Option<(String, u64)> {
        let entry = self.list.pop_back()?;
        self.map.remove(&entry.key);
        Some((entry.key, entry.size))
    }

    fn remove(&mut self, key: &str) -> Option<u64> {
        let id = self.map.remove(key)?;
        self.list.remove(id).map(|entry| entry.size)
    }

    fn keys(&self) -> Vec<String> {
        self.list.iter().rev().map(|entry| entry.key.clone()).collect()
    }

    #[cfg(any(test, debug_assertions))]
    fn debug_validate_invariants(&self) {
        self.list.debug_validate_invariants();
        assert_eq!(self.map.len(), self.list.len());
        for (key, &id) in &self.map {
            let entry = self.list.get(id).expect("mapped slot missing");
            assert_eq!(&entry.key, key);
        }
    }
}

/// Thread-safe LRU key → size index.
#[derive(Default)]
pub struct Lru {
    inner: Mutex<LruCore>,
}

impl Lru {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty index with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCore {
                map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
                list: IntrusiveList::with_capacity(capacity),
            }),
        }
    }

    /// Drops every key.
    pub fn clear(&self) {
        let mut core = self.inner.lock();
        core.map.clear();
        core.list.clear();
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.inner.lock().debug_validate_invariants();
    }
}

impl EvictionIndex for Lru {
    fn add(&self, key: &str, size: u64) -> u64 {
        self.inner.lock().add(key, size)
    }

    fn touch(&self, key: &str) -> bool {
        self.inner.lock().touch(key)
    }

    fn remove_oldest(&self) -> Option<(String, u64)> {
        self.inner.lock().remove_oldest()
    }

    fn remove(&self, key: &str) -> Option<u64> {
        self.inner.lock().remove(key)
    }

    /// Keys ordered oldest → newest.
    fn keys(&self) -> Vec<String> {
        self.inner.lock().keys()
    }

    fn len(&self) -> usize {
        self.inner.lock().list.len()
    }
}

impl fmt::Debug for Lru {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.lock();
        f.debug_struct("Lru")
            .field("len", &core.list.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_reports_previous_size() {
        let lru = Lru::new();
        assert_eq!(lru.add("a", 10), 0);
        assert_eq!(lru.add("a", 25), 10);
        assert_eq!(lru.len(), 1);
        assert_eq!(lru.remove_oldest(), Some(("a".to_string(), 25)));
        lru.debug_validate_invariants();
    }

    #[test]
    fn touched_key_is_evicted_last() {
        let lru = Lru::new();
        lru.add("A", 1);
        lru.add("B", 1);
        lru.add("C", 1);
        assert!(lru.touch("A"));

        assert_eq!(lru.remove_oldest(), Some(("B".to_string(), 1)));
        assert_eq!(lru.remove_oldest(), Some(("C".to_string(), 1)));
        assert_eq!(lru.remove_oldest(), Some(("A".to_string(), 1)));
        assert_eq!(lru.remove_oldest(), None);
        assert!(lru.is_empty());
    }

    #[test]
    fn re_adding_refreshes_recency() {
        let lru = Lru::new();
        lru.add("a", 1);
        lru.add("b", 2);
        lru.add("a", 3);
        assert_eq!(lru.keys(), ["b", "a"]);
        assert_eq!(lru.remove_oldest(), Some(("b".to_string(), 2)));
    }

    #[test]
    fn touch_does_not_insert() {
        let lru = Lru::new();
        assert!(!lru.touch("ghost"));
        assert!(lru.is_empty());
        assert!(lru.keys().is_empty());
    }

    #[test]
    fn remove_unlinks_key() {
        let lru = Lru::with_capacity(4);
        lru.add("a", 1);
        lru.add("b", 2);
        lru.add("c", 3);
        assert_eq!(lru.remove("b"), Some(2));
        assert_eq!(lru.remove("b"), None);
        assert_eq!(lru.keys(), ["a", "c"]);
        lru.debug_validate_invariants();

        lru.clear();
        assert!(lru.is_empty());
    }

    #[test]
    fn concurrent_adds_keep_index_consistent() {
        use std::sync::Arc;
        use std::thread;

        let lru = Arc::new(Lru::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let lru = Arc::clone(&lru);
                thread::spawn(move || {
                    for i in 0..500 {
                        let key = format!("k{}", i % 100);
                        lru.add(&key, t + 1);
                        lru.touch(&key);
                        if i % 7 == 0 {
                            lru.remove_oldest();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        lru.debug_validate_invariants();
        assert!(lru.len() <= 100);
    }
}
