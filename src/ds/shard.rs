//! Deterministic key-to-shard mapping for multi-file disk caches.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Shard Selection Flow                           │
//! │                                                                         │
//! │   Input Key ("GET:http://origin/a.png")                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   ┌───────────────────────────────────────────────────────────────┐   │
//! │   │  ShardSelector { shards: 4, k0: 0, k1: 0 }                    │   │
//! │   │                                                               │   │
//! │   │  1. SipHash-2-4 keyed with (k0, k1)                           │   │
//! │   │  2. Feed the raw key bytes (no length suffix)                 │   │
//! │   │  3. Compute:   hash % 4                                       │   │
//! │   └───────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   ┌─────────┬─────────┬─────────┬─────────┐                           │
//! │   │ Shard 0 │ Shard 1 │ Shard 2 │ Shard 3 │                           │
//! │   │ disk a  │ disk b  │ disk c  │ disk d  │                           │
//! │   └─────────┴─────────┴─────────┴─────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Properties
//!
//! - **Stable across restarts**: the hash depends only on the key bytes, the
//!   SipHash keys and the shard count. Nothing process-local (such as
//!   `RandomState`) is mixed in, so files written by one process are found
//!   again by the next.
//! - **No resharding**: changing the shard count remaps most keys. Treat it as
//!   a cache wipe.
//!
//! ## Example Usage
//!
//! ```
//! use edgecache::ds::ShardSelector;
//!
//! let selector = ShardSelector::new(4);
//! let shard = selector.shard_for_key("user:123");
//! assert!(shard < 4);
//! assert_eq!(selector.shard_for_key("user:123"), shard);
//! ```

use std::hash::Hasher;

use siphasher::sip::SipHasher24;

/// Deterministic shard selector using keyed SipHash-2-4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSelector {
    shards: usize,
    k0: u64,
    k1: u64,
}

impl ShardSelector {
    /// Creates a selector for `shards` shards with SipHash keys `(0, 0)`.
    ///
    /// The shard count is clamped to at least 1.
    pub fn new(shards: usize) -> Self {
        Self::with_keys(shards, 0, 0)
    }

    /// Creates a selector with explicit SipHash keys.
    ///
    /// ```
    /// use edgecache::ds::ShardSelector;
    ///
    /// let single = ShardSelector::with_keys(0, 7, 9);
    /// assert_eq!(single.shard_count(), 1);
    /// assert_eq!(single.shard_for_key("anything"), 0);
    /// ```
    pub fn with_keys(shards: usize, k0: u64, k1: u64) -> Self {
        Self {
            shards: shards.max(1),
            k0,
            k1,
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards
    }

    /// Returns the raw 64-bit SipHash of `key`.
    pub fn hash_key(&self, key: &str) -> u64 {
        let mut hasher = SipHasher24::new_with_keys(self.k0, self.k1);
        hasher.write(key.as_bytes());
        hasher.finish()
    }

    /// Maps a key to a shard index in `[0, shards)`.
    pub fn shard_for_key(&self, key: &str) -> usize {
        (self.hash_key(key) % self.shards as u64) as usize
    }
}

impl Default for ShardSelector {
    /// Creates a single-shard selector.
    fn default() -> Self {
        Self::new(1)
    }
}
