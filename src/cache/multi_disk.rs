//! # Sharded Disk Cache
//!
//! Spreads keys over several [`DiskCache`] files, typically one per physical
//! disk.
//!
//! ```text
//!   key ──► ShardSelector (SipHash-2-4, keys 0,0) ──► hash % N
//!                                                        │
//!        ┌───────────────┬───────────────┬───────────────┘
//!        ▼               ▼               ▼
//!   DiskCache 0     DiskCache 1     DiskCache 2      (own LRU, own GC thread)
//!   /disk1/c.redb   /disk2/c.redb   /disk3/c.redb
//! ```
//!
//! Routing depends only on the key bytes and the shard count, so a restarted
//! process finds every record where it was written. Changing the shard count
//! remaps most keys; treat it as a cache wipe.
//!
//! `size()` sums the shards one by one and is not an atomic snapshot.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::disk::DiskCache;
use crate::config::CacheFile;
use crate::ds::ShardSelector;
use crate::error::{CacheError, ConfigError, Result};
use crate::object::CacheObject;
use crate::traits::ObjectCache;

/// Disk cache sharded across several files.
pub struct MultiDiskCache {
    shards: Vec<DiskCache>,
    selector: ShardSelector,
}

impl MultiDiskCache {
    /// Opens one shard per file and rebuilds each shard's index.
    ///
    /// Fails without keeping any shard open if any file cannot be opened or
    /// scanned.
    ///
    /// ```
    /// use edgecache::cache::MultiDiskCache;
    /// use edgecache::config::CacheFile;
    /// use edgecache::traits::ObjectCache;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let files = vec![
    ///     CacheFile::new(dir.path().join("a.redb"), 1000),
    ///     CacheFile::new(dir.path().join("b.redb"), 2000),
    /// ];
    /// let cache = MultiDiskCache::open(&files).unwrap();
    /// assert_eq!(cache.shard_count(), 2);
    /// assert_eq!(cache.capacity(), 3000);
    /// ```
    pub fn open(files: &[CacheFile]) -> Result<Self> {
        if files.is_empty() {
            return Err(ConfigError::new("multi-disk cache needs at least one file").into());
        }

        let mut shards = Vec::with_capacity(files.len());
        for (index, file) in files.iter().enumerate() {
            let shard = DiskCache::open(&file.path, file.size_bytes).map_err(|source| {
                CacheError::Shard {
                    index,
                    source: Box::new(source),
                }
            })?;
            shard
                .reset_after_restart()
                .map_err(|source| CacheError::Shard {
                    index,
                    source: Box::new(source),
                })?;
            shards.push(shard);
        }

        debug!(
            shards = shards.len(),
            size = shards.iter().map(ObjectCache::size).sum::<u64>(),
            "opened multi-disk cache"
        );
        Ok(Self {
            selector: ShardSelector::new(shards.len()),
            shards,
        })
    }

    /// Number of shard files.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Index of the shard that owns `key`.
    pub fn shard_for(&self, key: &str) -> usize {
        self.selector.shard_for_key(key)
    }

    /// The shard at `index`, if it exists.
    pub fn shard(&self, index: usize) -> Option<&DiskCache> {
        self.shards.get(index)
    }

    /// Store file of each shard, in shard order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.shards.iter().map(DiskCache::path)
    }

    fn owner(&self, key: &str) -> &DiskCache {
        &self.shards[self.shard_for(key)]
    }
}

impl ObjectCache for MultiDiskCache {
    fn get(&self, key: &str) -> Option<Arc<CacheObject>> {
        self.owner(key).get(key)
    }

    fn peek(&self, key: &str) -> Option<Arc<CacheObject>> {
        self.owner(key).peek(key)
    }

    fn add(&self, key: &str, obj: Arc<CacheObject>) -> bool {
        self.owner(key).add(key, obj)
    }

    fn remove(&self, key: &str) -> bool {
        self.owner(key).remove(key)
    }

    fn size(&self) -> u64 {
        self.shards.iter().map(ObjectCache::size).sum()
    }

    fn capacity(&self) -> u64 {
        self.shards.iter().map(ObjectCache::capacity).sum()
    }

    /// Keys of every shard, shard by shard.
    fn keys(&self) -> Vec<String> {
        self.shards.iter().flat_map(ObjectCache::keys).collect()
    }

    fn len(&self) -> usize {
        self.shards.iter().map(ObjectCache::len).sum()
    }

    /// Closes every shard, even after a failure, and reports all failures.
    fn close(&self) -> Result<()> {
        let errors: Vec<CacheError> = self
            .shards
            .iter()
            .enumerate()
            .filter_map(|(index, shard)| match shard.close() {
                Ok(()) => None,
                Err(err) => {
                    warn!(shard = index, path = %shard.path().display(), error = %err, "failed to close shard");
                    Some(CacheError::Shard {
                        index,
                        source: Box::new(err),
                    })
                },
            })
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CacheError::Close(errors))
        }
    }
}

impl fmt::Debug for MultiDiskCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiDiskCache")
            .field("shards", &self.shards)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(dir: &tempfile::TempDir, n: usize, each: u64) -> Vec<CacheFile> {
        (0..n)
            .map(|i| CacheFile::new(dir.path().join(format!("shard-{i}.redb")), each))
            .collect()
    }

    #[test]
    fn keys_land_on_their_routed_shard() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MultiDiskCache::open(&files(&dir, 3, 1 << 20)).unwrap();
        for i in 0..30 {
            let key = format!("GET:http://origin/{i}");
            cache.add(&key, Arc::new(CacheObject::from_body(vec![i as u8; 8])));
            let owner = cache.shard_for(&key);
            assert!(cache.shard(owner).unwrap().peek(&key).is_some());
            for other in (0..3).filter(|&s| s != owner) {
                assert!(cache.shard(other).unwrap().peek(&key).is_none());
            }
        }
        assert_eq!(cache.len(), 30);
        assert_eq!(
            cache.size(),
            (0..3).map(|s| cache.shard(s).unwrap().size()).sum::<u64>()
        );
    }

    #[test]
    fn empty_file_list_is_rejected() {
        assert!(matches!(
            MultiDiskCache::open(&[]),
            Err(CacheError::Config(_))
        ));
    }

    #[test]
    fn failing_shard_reports_its_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = files(&dir, 2, 100);
        list.push(CacheFile::new(dir.path().join("no-such-dir").join("x.redb"), 100));
        match MultiDiskCache::open(&list) {
            Err(CacheError::Shard { index, source }) => {
                assert_eq!(index, 2);
                assert!(matches!(*source, CacheError::Open { .. }));
            },
            other => panic!("expected shard error, got {other:?}"),
        }
        // Earlier shards were released, so the files can be reopened.
        assert!(MultiDiskCache::open(&files(&dir, 2, 100)).is_ok());
    }

    #[test]
    fn close_collects_every_shard_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MultiDiskCache::open(&files(&dir, 2, 100)).unwrap();
        cache.close().unwrap();
        match cache.close() {
            Err(CacheError::Close(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(matches!(errors[0], CacheError::Shard { index: 0, .. }));
                assert!(matches!(errors[1], CacheError::Shard { index: 1, .. }));
            },
            other => panic!("expected close error, got {other:?}"),
        }
    }
}
