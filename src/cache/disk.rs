//! # Disk Object Cache
//!
//! Persistent single-file cache: records live in one table of an embedded
//! [`redb`] database, and an in-memory [`Lru`] mirrors every key with its
//! encoded record length.
//!
//! ## Architecture
//!
//! ```text
//!   ┌────────────────────────────────────────────────────────────────────────┐
//!   │                              DiskCache                                 │
//!   │                                                                        │
//!   │   Arc<DiskShared>                                                      │
//!   │   ┌──────────────────────────────────────────────────────────────────┐ │
//!   │   │ db:   RwLock<Option<redb::Database>>   (None after close)        │ │
//!   │   │        └─ table "objects": &str → [version | bincode(object)]    │ │
//!   │   │ lru:  Lru   key → encoded length, never persisted                │ │
//!   │   │ size: AtomicU64 == Σ encoded length over lru                     │ │
//!   │   └──────────────────────────────────────────────────────────────────┘ │
//!   │                                                                        │
//!   │   collector ── depth-1 channel ──► "edgecache-disk-gc" thread          │
//!   └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency
//!
//! redb admits one write transaction at a time. `add`, `remove` and each
//! eviction step update the LRU and the size counter while their write
//! transaction is open, so the index and the counter change in the same
//! order as the table. A failed commit rolls the index change back.
//!
//! ## Restart
//!
//! The LRU is not persisted. After reopening a file, call
//! [`DiskCache::reset_after_restart`] once, before any `add`: it scans the
//! table, rebuilds the index in key order and restores the byte total.
//!
//! ## Hit Counts
//!
//! `get` increments the hit count of the decoded copy it returns. The
//! increment is not written back, so counts read after a restart reflect the
//! last `add` of the key.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use edgecache::cache::DiskCache;
//! use edgecache::traits::ObjectCache;
//! use edgecache::CacheObject;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("cache.redb");
//!
//! let cache = DiskCache::open(&path, 1 << 20).unwrap();
//! cache.add("k", Arc::new(CacheObject::from_body(b"payload".to_vec())));
//! cache.close().unwrap();
//!
//! let reopened = DiskCache::open(&path, 1 << 20).unwrap();
//! let recovered = reopened.reset_after_restart().unwrap();
//! assert_eq!(recovered, reopened.size());
//! assert_eq!(reopened.get("k").unwrap().body, b"payload");
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition, TableError};
use tracing::{debug, error, trace, warn};

use crate::cache::gc::{Collect, Collector};
use crate::cache::memory::sub_saturating;
use crate::codec;
use crate::error::{CacheError, Result};
use crate::object::CacheObject;
use crate::policy::Lru;
use crate::traits::{EvictionIndex, ObjectCache};

const OBJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("objects");

fn store<E: Into<redb::Error>>(err: E) -> CacheError {
    CacheError::Store(err.into())
}

struct DiskShared {
    path: PathBuf,
    db: RwLock<Option<Database>>,
    lru: Lru,
    size: AtomicU64,
    max_size: u64,
}

impl DiskShared {
    fn apply_delta(&self, old: u64, new: u64) {
        if new >= old {
            self.size.fetch_add(new - old, Ordering::AcqRel);
        } else {
            sub_saturating(&self.size, old - new);
        }
    }

    /// Writes `record` under `key`; the index and counter move with the commit.
    fn write_record(&self, db: &Database, key: &str, record: &[u8]) -> Result<()> {
        let new = record.len() as u64;
        let txn = db.begin_write().map_err(store)?;
        {
            let mut table = txn.open_table(OBJECTS).map_err(store)?;
            table.insert(key, record).map_err(store)?;
        }
        let old = self.lru.add(key, new);
        self.apply_delta(old, new);
        if let Err(err) = txn.commit() {
            self.apply_delta(new, old);
            if old == 0 {
                self.lru.remove(key);
            } else {
                self.lru.add(key, old);
            }
            return Err(store(err));
        }
        Ok(())
    }

    fn read_record(&self, db: &Database, key: &str) -> Result<Option<CacheObject>> {
        let txn = db.begin_read().map_err(store)?;
        let table = match txn.open_table(OBJECTS) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(store(err)),
        };
        match table.get(key).map_err(store)? {
            Some(guard) => codec::decode(guard.value()).map(Some),
            None => Ok(None),
        }
    }

    fn delete_record(&self, db: &Database, key: &str) -> Result<bool> {
        let txn = db.begin_write().map_err(store)?;
        let removed;
        {
            let mut table = txn.open_table(OBJECTS).map_err(store)?;
            removed = table.remove(key).map_err(store)?.is_some();
        }
        let size = if removed { self.lru.remove(key) } else { None };
        if let Some(size) = size {
            sub_saturating(&self.size, size);
        }
        if let Err(err) = txn.commit() {
            if let Some(size) = size {
                self.lru.add(key, size);
                self.size.fetch_add(size, Ordering::AcqRel);
            }
            return Err(store(err));
        }
        Ok(removed)
    }

    /// Pops the LRU tail and deletes its record. The index entry is dropped
    /// even if the delete fails, so a failing store cannot stall the loop.
    /// The bytes are released only after the delete has committed or failed.
    fn evict_oldest(&self, db: &Database) -> Option<(String, u64)> {
        let txn = db.begin_write();
        let (key, size) = self.lru.remove_oldest()?;

        let deleted = txn.map_err(store).and_then(|txn| {
            {
                let mut table = txn.open_table(OBJECTS).map_err(store)?;
                table.remove(key.as_str()).map_err(store)?;
            }
            txn.commit().map_err(store)
        });
        if let Err(err) = deleted {
            error!(path = %self.path.display(), key = %key, error = %err, "failed to delete evicted record");
        }
        sub_saturating(&self.size, size);
        Some((key, size))
    }

    fn scan(&self, db: &Database) -> Result<u64> {
        let txn = db.begin_read().map_err(store)?;
        let table = match txn.open_table(OBJECTS) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(0),
            Err(err) => return Err(store(err)),
        };

        self.lru.clear();
        let mut total = 0u64;
        for item in table.iter().map_err(store)? {
            let (key, value) = item.map_err(store)?;
            let len = value.value().len() as u64;
            self.lru.add(key.value(), len);
            total += len;
        }
        self.size.store(total, Ordering::Release);
        Ok(total)
    }
}

impl Collect for DiskShared {
    fn collect(&self) {
        let mut evicted = 0usize;
        while self.size.load(Ordering::Acquire) > self.max_size {
            let guard = self.db.read();
            let Some(db) = guard.as_ref() else {
                return;
            };
            match self.evict_oldest(db) {
                Some((key, size)) => {
                    trace!(path = %self.path.display(), key = %key, size, "evicted");
                    evicted += 1;
                },
                None => {
                    error!(
                        path = %self.path.display(),
                        size = self.size.load(Ordering::Acquire),
                        capacity = self.max_size,
                        "disk index empty while over capacity; resetting size"
                    );
                    self.size.store(0, Ordering::Release);
                    break;
                },
            }
        }
        if evicted > 0 {
            debug!(
                path = %self.path.display(),
                evicted,
                size = self.size.load(Ordering::Acquire),
                capacity = self.max_size,
                "disk cache gc pass"
            );
        }
    }
}

/// Byte-bounded cache persisted in a single redb file.
pub struct DiskCache {
    shared: Arc<DiskShared>,
    collector: Collector,
}

impl DiskCache {
    /// Opens or creates the store at `path` with a soft cap of `max_bytes`.
    ///
    /// The index starts empty; call [`reset_after_restart`](Self::reset_after_restart)
    /// when reopening a populated file.
    pub fn open(path: impl AsRef<Path>, max_bytes: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path).map_err(|source| CacheError::Open {
            path: path.clone(),
            source,
        })?;

        let txn = db.begin_write().map_err(store)?;
        txn.open_table(OBJECTS).map_err(store)?;
        txn.commit().map_err(store)?;

        let shared = Arc::new(DiskShared {
            path,
            db: RwLock::new(Some(db)),
            lru: Lru::new(),
            size: AtomicU64::new(0),
            max_size: max_bytes,
        });
        let collector = Collector::spawn("edgecache-disk-gc", &shared);
        debug!(path = %shared.path.display(), capacity = max_bytes, "opened disk cache");
        Ok(Self { shared, collector })
    }

    /// Rebuilds the index from the stored records and returns the recovered
    /// byte total.
    ///
    /// Scan order is key order, so the lowest key is the first evicted.
    pub fn reset_after_restart(&self) -> Result<u64> {
        let total = {
            let guard = self.shared.db.read();
            let db = guard.as_ref().ok_or_else(|| self.closed())?;
            self.shared.scan(db)?
        };
        debug!(
            path = %self.shared.path.display(),
            entries = self.shared.lru.len(),
            size = total,
            "rebuilt disk index"
        );
        if total > self.shared.max_size {
            self.collector.request(&*self.shared);
        }
        Ok(total)
    }

    /// Location of the store file.
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// The recency index, for inspection.
    pub fn index(&self) -> &Lru {
        &self.shared.lru
    }

    /// Whether [`close`](ObjectCache::close) has released the store.
    pub fn is_closed(&self) -> bool {
        self.shared.db.read().is_none()
    }

    fn closed(&self) -> CacheError {
        CacheError::Closed {
            path: self.shared.path.clone(),
        }
    }
}

impl ObjectCache for DiskCache {
    fn get(&self, key: &str) -> Option<Arc<CacheObject>> {
        let obj = self.peek(key)?;
        self.shared.lru.touch(key);
        let hits = obj.record_hit();
        trace!(path = %self.shared.path.display(), key, hits, "disk hit");
        Some(obj)
    }

    fn peek(&self, key: &str) -> Option<Arc<CacheObject>> {
        let guard = self.shared.db.read();
        let Some(db) = guard.as_ref() else {
            warn!(path = %self.shared.path.display(), key, "read from closed disk cache");
            return None;
        };
        match self.shared.read_record(db, key) {
            Ok(obj) => obj.map(Arc::new),
            Err(err) => {
                error!(path = %self.shared.path.display(), key, error = %err, "failed to read record");
                None
            },
        }
    }

    fn add(&self, key: &str, obj: Arc<CacheObject>) -> bool {
        let record = match codec::encode(&obj) {
            Ok(record) => record,
            Err(err) => {
                error!(path = %self.shared.path.display(), key, error = %err, "failed to encode object");
                return false;
            },
        };
        {
            let guard = self.shared.db.read();
            let Some(db) = guard.as_ref() else {
                warn!(path = %self.shared.path.display(), key, "write to closed disk cache");
                return false;
            };
            if let Err(err) = self.shared.write_record(db, key, &record) {
                error!(path = %self.shared.path.display(), key, error = %err, "failed to write record");
                return false;
            }
        }
        if self.shared.size.load(Ordering::Acquire) > self.shared.max_size {
            self.collector.request(&*self.shared);
        }
        false
    }

    fn remove(&self, key: &str) -> bool {
        let guard = self.shared.db.read();
        let Some(db) = guard.as_ref() else {
            warn!(path = %self.shared.path.display(), key, "remove from closed disk cache");
            return false;
        };
        match self.shared.delete_record(db, key) {
            Ok(removed) => removed,
            Err(err) => {
                error!(path = %self.shared.path.display(), key, error = %err, "failed to delete record");
                false
            },
        }
    }

    fn size(&self) -> u64 {
        self.shared.size.load(Ordering::Acquire)
    }

    fn capacity(&self) -> u64 {
        self.shared.max_size
    }

    /// Keys ordered least → most recently used.
    fn keys(&self) -> Vec<String> {
        self.shared.lru.keys()
    }

    fn len(&self) -> usize {
        self.shared.lru.len()
    }

    /// Closes the store file. Later operations miss; a second close fails.
    fn close(&self) -> Result<()> {
        match self.shared.db.write().take() {
            Some(db) => {
                drop(db);
                debug!(path = %self.shared.path.display(), "closed disk cache");
                Ok(())
            },
            None => Err(self.closed()),
        }
    }
}

impl fmt::Debug for DiskCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskCache")
            .field("path", &self.shared.path)
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
