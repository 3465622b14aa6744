//! # In-Memory Object Cache
//!
//! Byte-bounded map of shared [`CacheObject`]s with a pluggable eviction
//! index.
//!
//! ## Architecture
//!
//! ```text
//!   ┌────────────────────────────────────────────────────────────────────────┐
//!   │                        MemCache<P: EvictionIndex>                      │
//!   │                                                                        │
//!   │   Arc<MemShared<P>>                                                    │
//!   │   ┌──────────────────────────────────────────────────────────────────┐ │
//!   │   │ objects: RwLock<FxHashMap<String, Arc<CacheObject>>>   (lock 1)  │ │
//!   │   │ index:   P  (Lru | FrecencyHeap, internal mutex)        (lock 2)  │ │
//!   │   │ size:    AtomicU64   == Σ obj.size over objects                  │ │
//!   │   │ max_size: u64                                                    │ │
//!   │   └──────────────────────────────────────────────────────────────────┘ │
//!   │                                                                        │
//!   │   collector ── depth-1 channel ──► "edgecache-mem-gc" thread           │
//!   └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking
//!
//! Locks are always taken in the order `objects` → `index`. `add`, `remove`
//! and each eviction step mutate the map, the index and the size counter
//! while holding the map's write lock, so the three never disagree for longer
//! than one critical section. `get` holds the read lock while touching the
//! index; `touch` ignores absent keys, so a reader racing an eviction cannot
//! re-insert the victim.
//!
//! ## Garbage Collection
//!
//! ```text
//!   add ──► size > max? ──► request pass (non-blocking, coalesced)
//!
//!   gc thread:
//!     while size > max:
//!       objects.write()
//!       index.remove_oldest()
//!         None        → error!, size = 0, stop
//!         Some(k, s)  → objects.remove(k), size -= s
//! ```
//!
//! The cap is soft: between the overflowing `add` and the end of the pass
//! `size()` may exceed `capacity()`.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use edgecache::cache::MemCache;
//! use edgecache::traits::ObjectCache;
//! use edgecache::CacheObject;
//!
//! let cache = MemCache::frecency(1 << 20, 0.5);
//! cache.add("GET:/index.html", Arc::new(CacheObject::from_body(b"<html/>".to_vec())));
//!
//! assert_eq!(cache.size(), 7);
//! assert!(cache.peek("GET:/index.html").is_some());
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, error, trace};

use crate::cache::gc::{Collect, Collector};
use crate::error::Result;
use crate::object::CacheObject;
use crate::policy::{FrecencyHeap, Lru};
use crate::traits::{EvictionIndex, ObjectCache};

struct MemShared<P> {
    objects: RwLock<FxHashMap<String, Arc<CacheObject>>>,
    index: P,
    size: AtomicU64,
    max_size: u64,
}

impl<P: EvictionIndex> MemShared<P> {
    fn apply_delta(&self, old: u64, new: u64) {
        if new >= old {
            self.size.fetch_add(new - old, Ordering::AcqRel);
        } else {
            sub_saturating(&self.size, old - new);
        }
    }
}

impl<P: EvictionIndex + 'static> Collect for MemShared<P> {
    fn collect(&self) {
        let mut evicted = 0usize;
        while self.size.load(Ordering::Acquire) > self.max_size {
            let mut objects = self.objects.write();
            let Some((key, size)) = self.index.remove_oldest() else {
                error!(
                    size = self.size.load(Ordering::Acquire),
                    capacity = self.max_size,
                    entries = objects.len(),
                    "eviction index empty while over capacity; resetting size"
                );
                self.size.store(0, Ordering::Release);
                break;
            };
            objects.remove(&key);
            sub_saturating(&self.size, size);
            drop(objects);

            trace!(key = %key, size, "evicted");
            evicted += 1;
        }
        if evicted > 0 {
            debug!(
                evicted,
                size = self.size.load(Ordering::Acquire),
                capacity = self.max_size,
                "memory cache gc pass"
            );
        }
    }
}

/// Subtracts without wrapping below zero.
pub(crate) fn sub_saturating(counter: &AtomicU64, amount: u64) {
    let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
        Some(current.saturating_sub(amount))
    });
}

/// Concurrent, byte-bounded in-memory cache.
pub struct MemCache<P: EvictionIndex + 'static = FrecencyHeap> {
    shared: Arc<MemShared<P>>,
    collector: Collector,
}

impl MemCache<Lru> {
    /// LRU-ordered cache with a soft cap of `max_bytes`.
    pub fn lru(max_bytes: u64) -> Self {
        Self::with_index(max_bytes, Lru::new())
    }
}

impl MemCache<FrecencyHeap> {
    /// Frecency-ordered cache with a soft cap of `max_bytes`.
    pub fn frecency(max_bytes: u64, hit_weight: f64) -> Self {
        Self::with_index(max_bytes, FrecencyHeap::new(hit_weight))
    }
}

impl<P: EvictionIndex + 'static> MemCache<P> {
    /// Builds a cache around an existing eviction index.
    ///
    /// Spawns the cache's collector thread.
    pub fn with_index(max_bytes: u64, index: P) -> Self {
        let shared = Arc::new(MemShared {
            objects: RwLock::new(FxHashMap::default()),
            index,
            size: AtomicU64::new(0),
            max_size: max_bytes,
        });
        let collector = Collector::spawn("edgecache-mem-gc", &shared);
        Self { shared, collector }
    }

    /// The eviction index, for inspection.
    pub fn index(&self) -> &P {
        &self.shared.index
    }
}

impl<P: EvictionIndex + 'static> ObjectCache for MemCache<P> {
    fn get(&self, key: &str) -> Option<Arc<CacheObject>> {
        let obj = {
            let objects = self.shared.objects.read();
            let obj = objects.get(key).map(Arc::clone);
            if obj.is_some() {
                self.shared.index.touch(key);
            }
            obj
        };
        match obj {
            Some(obj) => {
                let hits = obj.record_hit();
                trace!(key, hits, "memory hit");
                Some(obj)
            },
            None => {
                trace!(key, "memory miss");
                None
            },
        }
    }

    fn peek(&self, key: &str) -> Option<Arc<CacheObject>> {
        self.shared.objects.read().get(key).map(Arc::clone)
    }

    fn add(&self, key: &str, obj: Arc<CacheObject>) -> bool {
        let size = obj.size;
        {
            let mut objects = self.shared.objects.write();
            objects.insert(key.to_owned(), obj);
            let old = self.shared.index.add(key, size);
            self.shared.apply_delta(old, size);
        }
        if self.shared.size.load(Ordering::Acquire) > self.shared.max_size {
            self.collector.request(&*self.shared);
        }
        false
    }

    fn remove(&self, key: &str) -> bool {
        let mut objects = self.shared.objects.write();
        if objects.remove(key).is_none() {
            return false;
        }
        if let Some(size) = self.shared.index.remove(key) {
            sub_saturating(&self.shared.size, size);
        }
        true
    }

    fn size(&self) -> u64 {
        self.shared.size.load(Ordering::Acquire)
    }

    fn capacity(&self) -> u64 {
        self.shared.max_size
    }

    fn keys(&self) -> Vec<String> {
        self.shared.index.keys()
    }

    fn len(&self) -> usize {
        self.shared.objects.read().len()
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

impl<P: EvictionIndex + fmt::Debug + 'static> fmt::Debug for MemCache<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemCache")
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .field("index", &self.shared.index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::policy::ManualClock;

    fn obj(len: usize) -> Arc<CacheObject> {
        Arc::new(CacheObject::from_body(vec![0; len]))
    }

    fn wait_under_cap(cache: &dyn ObjectCache) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while cache.size() > cache.capacity() {
            assert!(Instant::now() < deadline, "cache never converged");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn add_get_peek_round_trip() {
        let cache = MemCache::lru(1024);
        assert!(!cache.add("k", obj(10)));
        assert_eq!(cache.size(), 10);
        assert_eq!(cache.len(), 1);

        let peeked = cache.peek("k").unwrap();
        assert_eq!(peeked.hit_count(), 0);
        let got = cache.get("k").unwrap();
        assert_eq!(got.hit_count(), 1);
        assert!(Arc::ptr_eq(&peeked, &got));
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn overwrite_applies_size_delta() {
        let cache = MemCache::lru(1024);
        cache.add("k", obj(100));
        cache.add("k", obj(30));
        assert_eq!(cache.size(), 30);
        cache.add("k", obj(60));
        assert_eq!(cache.size(), 60);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_releases_bytes() {
        let cache = MemCache::frecency(1024, 1.0);
        cache.add("a", obj(10));
        cache.add("b", obj(20));
        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        assert_eq!(cache.size(), 20);
        assert_eq!(cache.keys(), ["b"]);
    }

    #[test]
    fn lru_overflow_evicts_coldest() {
        let cache = MemCache::lru(100);
        cache.add("a", obj(40));
        cache.add("b", obj(40));
        cache.add("c", obj(40));
        wait_under_cap(&cache);

        assert_eq!(cache.size(), 80);
        assert!(cache.peek("a").is_none());
        assert!(cache.peek("b").is_some());
        assert!(cache.peek("c").is_some());
    }

    #[test]
    fn get_protects_key_from_lru_eviction() {
        let cache = MemCache::lru(100);
        cache.add("a", obj(40));
        cache.add("b", obj(40));
        cache.get("a");
        cache.add("c", obj(40));
        wait_under_cap(&cache);

        assert!(cache.peek("a").is_some());
        assert!(cache.peek("b").is_none());
    }

    #[test]
    fn frecency_keeps_frequently_hit_key() {
        let clock = ManualClock::new(1_000_000);
        let cache = MemCache::with_index(100, FrecencyHeap::with_clock(1.0, clock));
        cache.add("hot", obj(40));
        cache.add("cold", obj(40));
        for _ in 0..20 {
            cache.get("hot");
        }
        cache.index().clock().advance(10);
        cache.add("new", obj(40));
        wait_under_cap(&cache);

        assert!(cache.peek("hot").is_some());
        assert!(cache.peek("cold").is_none());
        assert!(cache.peek("new").is_some());
    }

    #[test]
    fn peek_does_not_refresh_rank() {
        let cache = MemCache::lru(1024);
        cache.add("a", obj(1));
        cache.add("b", obj(1));
        cache.peek("a");
        assert_eq!(cache.keys(), ["a", "b"]);
        cache.get("a");
        assert_eq!(cache.keys(), ["b", "a"]);
    }

    #[test]
    fn empty_index_while_over_cap_resets_size() {
        let cache = MemCache::lru(10);
        cache.shared.size.store(500, Ordering::Release);
        cache.shared.collect();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn close_is_a_no_op() {
        let cache = MemCache::lru(10);
        cache.add("a", obj(1));
        assert!(cache.close().is_ok());
        assert!(cache.peek("a").is_some());
    }
}
