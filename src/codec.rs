//! On-disk record format for [`CacheObject`].
//!
//! ```text
//!   ┌──────────┬────────────────────────────────────────────┐
//!   │ version  │ bincode(CacheObject), fixint little-endian │
//!   │ 1 byte   │                                            │
//!   └──────────┴────────────────────────────────────────────┘
//! ```
//!
//! Integers use fixed-width encoding, so a record's length does not change
//! when only its hit count does. The disk caches account for records by
//! their encoded length.

use crate::error::{CacheError, Result};
use crate::object::CacheObject;

/// Leading byte of every record written by this version of the crate.
pub const FORMAT_VERSION: u8 = 1;

/// Serializes `obj` into a versioned record.
pub fn encode(obj: &CacheObject) -> Result<Vec<u8>> {
    let body_len = bincode::serialized_size(obj)?;
    let mut buf = Vec::with_capacity(body_len as usize + 1);
    buf.push(FORMAT_VERSION);
    bincode::serialize_into(&mut buf, obj)?;
    Ok(buf)
}

/// Parses a versioned record.
pub fn decode(bytes: &[u8]) -> Result<CacheObject> {
    match bytes.split_first() {
        Some((&FORMAT_VERSION, body)) => Ok(bincode::deserialize(body)?),
        Some((&found, _)) => Err(CacheError::Format {
            found: Some(found),
            expected: FORMAT_VERSION,
        }),
        None => Err(CacheError::Format {
            found: None,
            expected: FORMAT_VERSION,
        }),
    }
}
