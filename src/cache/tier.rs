//! Two-level cache: a small fast tier in front of a large slow one.
//!
//! ```text
//!   get(k) ──► first ── hit ──────────────────────────► obj
//!                │ miss
//!                ▼
//!              second ── hit ──► first.add(k, obj) ──► obj
//!                │ miss
//!                ▼
//!              None
//! ```
//!
//! Writes go to both tiers. The integrating layer pairs a [`MemCache`] with a
//! [`MultiDiskCache`] for each named cache group.
//!
//! [`MemCache`]: crate::cache::MemCache
//! [`MultiDiskCache`]: crate::cache::MultiDiskCache

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::{trace, warn};

use crate::error::Result;
use crate::object::CacheObject;
use crate::traits::ObjectCache;

/// Front/back composition of two caches.
pub struct TierCache<F, S> {
    first: F,
    second: S,
}

impl<F: ObjectCache, S: ObjectCache> TierCache<F, S> {
    /// Puts `first` in front of `second`.
    pub fn new(first: F, second: S) -> Self {
        Self { first, second }
    }

    /// The front tier.
    pub fn first(&self) -> &F {
        &self.first
    }

    /// The back tier.
    pub fn second(&self) -> &S {
        &self.second
    }
}

impl<F: ObjectCache, S: ObjectCache> ObjectCache for TierCache<F, S> {
    /// First tier, then second; a second-tier hit is promoted.
    fn get(&self, key: &str) -> Option<Arc<CacheObject>> {
        if let Some(obj) = self.first.get(key) {
            return Some(obj);
        }
        let obj = self.second.get(key)?;
        trace!(key, "promoting second-tier hit");
        self.first.add(key, Arc::clone(&obj));
        Some(obj)
    }

    fn peek(&self, key: &str) -> Option<Arc<CacheObject>> {
        self.first.peek(key).or_else(|| self.second.peek(key))
    }

    fn add(&self, key: &str, obj: Arc<CacheObject>) -> bool {
        self.first.add(key, Arc::clone(&obj));
        self.second.add(key, obj);
        false
    }

    fn remove(&self, key: &str) -> bool {
        let first = self.first.remove(key);
        let second = self.second.remove(key);
        first || second
    }

    fn size(&self) -> u64 {
        self.first.size() + self.second.size()
    }

    fn capacity(&self) -> u64 {
        self.first.capacity() + self.second.capacity()
    }

    /// First-tier keys, then second-tier keys not already listed.
    fn keys(&self) -> Vec<String> {
        let mut keys = self.first.keys();
        let mut seen: FxHashSet<String> = keys.iter().cloned().collect();
        for key in self.second.keys() {
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
        keys
    }

    fn len(&self) -> usize {
        self.keys().len()
    }

    /// Closes both tiers and reports the first failure.
    fn close(&self) -> Result<()> {
        let first = self.first.close();
        let second = self.second.close();
        if let Err(err) = &first {
            warn!(error = %err, "failed to close first tier");
        }
        if let Err(err) = &second {
            warn!(error = %err, "failed to close second tier");
        }
        first.and(second)
    }
}

impl<F: fmt::Debug, S: fmt::Debug> fmt::Debug for TierCache<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TierCache")
            .field("first", &self.first)
            .field("second", &self.second)
            .finish()
    }
}
