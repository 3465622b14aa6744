//! Error types for the edgecache library.
//!
//! ## Key Components
//!
//! - [`CacheError`]: Returned by constructors, recovery scans and `close`.
//!   Steady-state `get`/`peek`/`add` never surface errors; they log and
//!   degrade to a miss or a no-op.
//! - [`ConfigError`]: Returned when cache settings are invalid
//!   (e.g. zero capacity, an empty shard group).
//!
//! ## Example Usage
//!
//! ```
//! use edgecache::config::{CacheFile, CacheSettings};
//! use edgecache::error::ConfigError;
//!
//! let mut settings = CacheSettings::default();
//! settings.cache_files.insert("video".into(), vec![CacheFile::new("/tmp/a.db", 0)]);
//!
//! let err: ConfigError = settings.validate().unwrap_err();
//! assert!(err.to_string().contains("size_bytes"));
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = CacheError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Errors raised by cache construction, recovery and shutdown.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store file could not be opened or created.
    #[error("opening cache store {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: redb::DatabaseError,
    },

    /// A transaction against the backing store failed.
    #[error("cache store: {0}")]
    Store(#[from] redb::Error),

    /// An object could not be serialized or deserialized.
    #[error("cache object codec: {0}")]
    Codec(#[from] bincode::Error),

    /// A stored record carries an unknown format version.
    #[error("unsupported cache record format (found {found:?}, expected {expected})")]
    Format { found: Option<u8>, expected: u8 },

    /// The store was already closed.
    #[error("cache store {} is closed", path.display())]
    Closed { path: PathBuf },

    /// A shard of a multi-file cache failed.
    #[error("cache shard {index}: {source}")]
    Shard {
        index: usize,
        #[source]
        source: Box<CacheError>,
    },

    /// One or more components failed to close.
    #[error("closing cache: {} error(s), first: {}", .0.len(), first_message(.0))]
    Close(Vec<CacheError>),

    /// Settings failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn first_message(errors: &[CacheError]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache settings are invalid.
///
/// Carries a human-readable description of which parameter failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
