//! edgecache: byte-bounded object caches for HTTP edge nodes.
//!
//! In-memory caches rank entries by LRU or frecency; disk caches persist
//! records in single-file redb stores, optionally sharded across disks. All
//! caches share the [`ObjectCache`] contract and evict asynchronously under a
//! soft byte cap.

pub mod builder;
pub mod cache;
pub mod codec;
pub mod config;
pub mod ds;
pub mod error;
pub mod object;
pub mod policy;
pub mod prelude;
pub mod traits;

pub use crate::builder::{CacheBuilder, CachePolicy, build_caches};
pub use crate::cache::{DiskCache, MemCache, MultiDiskCache, TierCache};
pub use crate::config::{CacheFile, CacheSettings};
pub use crate::error::{CacheError, ConfigError, Result};
pub use crate::object::CacheObject;
pub use crate::traits::{EvictionIndex, ObjectCache};
