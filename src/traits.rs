//! # Cache Traits
//!
//! Two seams shape the crate: [`ObjectCache`], the contract the request layer
//! consumes, and [`EvictionIndex`], the size-tracking eviction order a cache
//! consults when it runs over its byte cap.
//!
//! ## Architecture
//!
//! ```text
//!   request layer
//!        │  get / peek / add / remove / size / keys / close
//!        ▼
//!   ┌─────────────────────────────────────────────────────────────────┐
//!   │                     dyn ObjectCache                             │
//!   │                                                                 │
//!   │  MemCache<P>      DiskCache      MultiDiskCache    TierCache    │
//!   │      │                │                │               │        │
//!   │      ▼                ▼                ▼               ▼        │
//!   │  P: EvictionIndex    Lru        N × DiskCache    front + back   │
//!   │  (Lru | Frecency)                                               │
//!   └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Trait Summary
//!
//! | Trait            | Bounds          | Purpose                                   |
//! |------------------|-----------------|-------------------------------------------|
//! | `ObjectCache`    | `Send + Sync`   | Shared, size-bounded object cache         |
//! | `EvictionIndex`  | `Send + Sync`   | Key → size index ordered by eviction rank |
//!
//! ## Thread Safety
//!
//! Both traits take `&self`: every implementation synchronizes internally and
//! is shared behind an `Arc`. Callers never add their own locking.
//!
//! ## Soft Cap
//!
//! `add` never evicts synchronously. Crossing the byte cap schedules garbage
//! collection, so `size()` may exceed `capacity()` for a short window.

use std::sync::Arc;

use crate::error::Result;
use crate::object::CacheObject;

/// Size-bounded object cache shared across request handlers.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use edgecache::cache::MemCache;
/// use edgecache::traits::ObjectCache;
/// use edgecache::CacheObject;
///
/// fn serve(cache: &dyn ObjectCache, key: &str) -> Vec<u8> {
///     if let Some(obj) = cache.get(key) {
///         return obj.body.clone();
///     }
///     let body = b"from origin".to_vec();
///     cache.add(key, Arc::new(CacheObject::from_body(body.clone())));
///     body
/// }
///
/// let cache = MemCache::lru(1024);
/// assert_eq!(serve(&cache, "k"), b"from origin");
/// assert_eq!(cache.get("k").map(|o| o.hit_count()), Some(1));
/// ```
pub trait ObjectCache: Send + Sync {
    /// Looks up `key`, refreshing its eviction rank and recording a hit.
    fn get(&self, key: &str) -> Option<Arc<CacheObject>>;

    /// Looks up `key` without touching eviction order or the hit count.
    fn peek(&self, key: &str) -> Option<Arc<CacheObject>>;

    /// Inserts or replaces `key`.
    ///
    /// Always returns `false`: eviction runs asynchronously, so the caller
    /// cannot learn whether this insert displaced anything.
    fn add(&self, key: &str, obj: Arc<CacheObject>) -> bool;

    /// Removes `key`, returning `true` if it was present.
    fn remove(&self, key: &str) -> bool;

    /// Bytes currently accounted to live entries.
    fn size(&self) -> u64;

    /// Configured soft byte cap.
    fn capacity(&self) -> u64;

    /// Snapshot of live keys, in the cache's eviction order where it has one.
    fn keys(&self) -> Vec<String>;

    /// Number of live entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases backing resources. Memory caches have nothing to release.
    fn close(&self) -> Result<()>;
}

impl<C: ObjectCache + ?Sized> ObjectCache for Arc<C> {
    fn get(&self, key: &str) -> Option<Arc<CacheObject>> {
        (**self).get(key)
    }

    fn peek(&self, key: &str) -> Option<Arc<CacheObject>> {
        (**self).peek(key)
    }

    fn add(&self, key: &str, obj: Arc<CacheObject>) -> bool {
        (**self).add(key, obj)
    }

    fn remove(&self, key: &str) -> bool {
        (**self).remove(key)
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    fn capacity(&self) -> u64 {
        (**self).capacity()
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

/// Key → size index that ranks keys for eviction.
///
/// Implementations are internally synchronized. `remove_oldest` pops the
/// entry the policy considers coldest.
///
/// # Example
///
/// ```
/// use edgecache::policy::Lru;
/// use edgecache::traits::EvictionIndex;
///
/// let lru = Lru::new();
/// assert_eq!(lru.add("a", 10), 0);
/// assert_eq!(lru.add("b", 20), 0);
/// assert_eq!(lru.add("a", 15), 10);
///
/// assert_eq!(lru.remove_oldest(), Some(("b".to_string(), 20)));
/// assert!(!lru.touch("b"));
/// ```
pub trait EvictionIndex: Send + Sync {
    /// Inserts `key` or refreshes it with a new size; returns the previous
    /// size, or 0 for a new key.
    fn add(&self, key: &str, size: u64) -> u64;

    /// Records an access to an existing key. Returns `false` and does nothing
    /// if the key is absent, so a late reader never resurrects an evicted key.
    fn touch(&self, key: &str) -> bool;

    /// Pops the coldest entry.
    fn remove_oldest(&self) -> Option<(String, u64)>;

    /// Drops `key`, returning its size.
    fn remove(&self, key: &str) -> Option<u64>;

    /// Snapshot of indexed keys.
    fn keys(&self) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
