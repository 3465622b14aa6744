//! Object caches.
//!
//! | Cache              | Backing                         | Eviction index           |
//! |--------------------|---------------------------------|--------------------------|
//! | [`MemCache`]       | `FxHashMap<String, Arc<_>>`     | `Lru` or `FrecencyHeap`  |
//! | [`DiskCache`]      | one redb file                   | `Lru` (rebuilt on start) |
//! | [`MultiDiskCache`] | N `DiskCache` shards            | per shard                |
//! | [`TierCache`]      | any two `ObjectCache`s          | per tier                 |
//!
//! Each byte-bounded cache owns one garbage collection thread that evicts
//! until the cache is back under its soft cap.

mod gc;

pub mod disk;
pub mod memory;
pub mod multi_disk;
pub mod tier;

pub use disk::DiskCache;
pub use memory::MemCache;
pub use multi_disk::MultiDiskCache;
pub use tier::TierCache;
