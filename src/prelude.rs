pub use crate::builder::{CacheBuilder, CachePolicy, build_caches};
pub use crate::cache::{DiskCache, MemCache, MultiDiskCache, TierCache};
pub use crate::config::{CacheFile, CacheSettings};
pub use crate::error::{CacheError, ConfigError};
pub use crate::object::{CacheObject, Headers};
pub use crate::policy::{FrecencyHeap, Lru};
pub use crate::traits::{EvictionIndex, ObjectCache};
