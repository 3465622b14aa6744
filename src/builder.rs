//! Cache construction from a policy choice or from full settings.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use edgecache::builder::{CacheBuilder, CachePolicy};
//! use edgecache::CacheObject;
//!
//! let cache = CacheBuilder::new(1024)
//!     .policy(CachePolicy::Frecency { hit_weight: 0.25 })
//!     .build_memory()
//!     .unwrap();
//! cache.add("k", Arc::new(CacheObject::from_body(b"hello".to_vec())));
//! assert_eq!(cache.get("k").unwrap().body, b"hello");
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{MemCache, MultiDiskCache, TierCache};
use crate::config::CacheSettings;
use crate::error::{ConfigError, Result};
use crate::traits::ObjectCache;

/// Name under which [`build_caches`] registers the default memory cache.
pub const DEFAULT_CACHE_NAME: &str = "";

/// Eviction policy of an in-memory cache.
///
/// Serialized as `"lru"` or `{"frecency": {"hit_weight": 0.5}}`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    /// Least recently used.
    #[default]
    Lru,
    /// Lowest `last_hit × (1 + hits × hit_weight)` first.
    Frecency { hit_weight: f64 },
}

impl CachePolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            CachePolicy::Lru => Ok(()),
            CachePolicy::Frecency { hit_weight } if hit_weight.is_finite() && hit_weight >= 0.0 => {
                Ok(())
            },
            CachePolicy::Frecency { hit_weight } => Err(ConfigError::new(format!(
                "frecency hit_weight must be finite and >= 0, got {hit_weight}"
            ))),
        }
    }
}

/// Builder for in-memory caches.
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    max_bytes: u64,
    policy: CachePolicy,
}

impl CacheBuilder {
    /// Starts a builder for a cache with a soft cap of `max_bytes`.
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            policy: CachePolicy::default(),
        }
    }

    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds a memory cache for the chosen policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a zero cap or an invalid hit weight.
    pub fn build_memory(&self) -> Result<Arc<dyn ObjectCache>, ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::new("cache capacity must be > 0 bytes"));
        }
        self.policy.validate()?;
        Ok(match self.policy {
            CachePolicy::Lru => Arc::new(MemCache::lru(self.max_bytes)),
            CachePolicy::Frecency { hit_weight } => {
                Arc::new(MemCache::frecency(self.max_bytes, hit_weight))
            },
        })
    }
}

/// Builds every cache named in `settings`.
///
/// The [`DEFAULT_CACHE_NAME`] entry is a memory cache of `cache_size_bytes`.
/// Each `cache_files` group becomes a [`TierCache`] with a memory cache of
/// `file_mem_bytes` in front of a [`MultiDiskCache`] over the group's files.
/// Shard indexes are rebuilt from disk before this returns.
pub fn build_caches(settings: &CacheSettings) -> Result<BTreeMap<String, Arc<dyn ObjectCache>>> {
    settings.validate()?;

    let mut caches = BTreeMap::new();
    let memory = CacheBuilder::new(settings.cache_size_bytes).policy(settings.policy);
    caches.insert(DEFAULT_CACHE_NAME.to_owned(), memory.build_memory()?);

    let front = CacheBuilder::new(settings.file_mem_bytes).policy(settings.policy);
    for (name, files) in &settings.cache_files {
        let disk = MultiDiskCache::open(files)?;
        debug!(
            group = %name,
            shards = disk.shard_count(),
            recovered = disk.size(),
            "built tiered cache"
        );
        let tier: Arc<dyn ObjectCache> = Arc::new(TierCache::new(front.build_memory()?, disk));
        caches.insert(name.clone(), tier);
    }
    Ok(caches)
}
