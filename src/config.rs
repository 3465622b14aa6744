//! Cache settings consumed by [`build_caches`](crate::builder::build_caches).
//!
//! The structs derive serde traits so any format can feed them; reading the
//! file itself is up to the caller.
//!
//! | Field              | Default | Meaning                                       |
//! |--------------------|---------|-----------------------------------------------|
//! | `cache_size_bytes` | 1 GiB   | soft cap of the default in-memory cache       |
//! | `cache_files`      | empty   | named groups of disk shards                   |
//! | `file_mem_bytes`   | 64 MiB  | in-memory front tier for each named group     |
//! | `policy`           | `lru`   | eviction policy of every in-memory cache      |
//!
//! ## Example
//!
//! ```
//! use edgecache::builder::CachePolicy;
//! use edgecache::config::CacheSettings;
//!
//! let settings: CacheSettings = serde_json::from_str(r#"{
//!     "cache_size_bytes": 1048576,
//!     "cache_files": {
//!         "video": [
//!             {"path": "/mnt/disk1/video.redb", "size_bytes": 1073741824},
//!             {"path": "/mnt/disk2/video.redb", "size_bytes": 1073741824}
//!         ]
//!     },
//!     "policy": {"frecency": {"hit_weight": 0.5}}
//! }"#).unwrap();
//!
//! settings.validate().unwrap();
//! assert_eq!(settings.policy, CachePolicy::Frecency { hit_weight: 0.5 });
//! assert_eq!(settings.file_mem_bytes, 64 * 1024 * 1024);
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::builder::CachePolicy;
use crate::error::ConfigError;

pub const DEFAULT_CACHE_SIZE_BYTES: u64 = 1 << 30;
pub const DEFAULT_FILE_MEM_BYTES: u64 = 64 << 20;

/// One disk shard: a store file and its soft byte cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl CacheFile {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub cache_size_bytes: u64,
    pub cache_files: BTreeMap<String, Vec<CacheFile>>,
    pub file_mem_bytes: u64,
    pub policy: CachePolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            cache_size_bytes: DEFAULT_CACHE_SIZE_BYTES,
            cache_files: BTreeMap::new(),
            file_mem_bytes: DEFAULT_FILE_MEM_BYTES,
            policy: CachePolicy::default(),
        }
    }
}

impl CacheSettings {
    /// Checks the settings without touching the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_size_bytes == 0 {
            return Err(ConfigError::new("cache_size_bytes must be > 0"));
        }
        self.policy.validate()?;

        let mut seen = HashSet::new();
        for (name, files) in &self.cache_files {
            if name.is_empty() {
                return Err(ConfigError::new(
                    "cache_files group name must not be empty",
                ));
            }
            if files.is_empty() {
                return Err(ConfigError::new(format!(
                    "cache_files group {name:?} has no files"
                )));
            }
            for file in files {
                if file.size_bytes == 0 {
                    return Err(ConfigError::new(format!(
                        "cache_files group {name:?}: {} has size_bytes 0",
                        file.path.display()
                    )));
                }
                if !seen.insert(&file.path) {
                    return Err(ConfigError::new(format!(
                        "cache_files path {} is listed more than once",
                        file.path.display()
                    )));
                }
            }
        }
        Ok(())
    }
}
