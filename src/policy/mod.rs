//! Eviction policies.
//!
//! Each policy is an [`EvictionIndex`](crate::traits::EvictionIndex): a
//! thread-safe key → size index that answers "which key goes next".
//!
//! | Policy          | Ranks by                              | `keys()` order   |
//! |-----------------|---------------------------------------|------------------|
//! | [`Lru`]         | last access                           | oldest → newest  |
//! | [`FrecencyHeap`]| last access × (1 + hits × hit_weight) | heap order       |

pub mod frecency;
pub mod lru;

pub use frecency::{Clock, FrecencyHeap, FrecencyScore, ManualClock, SystemClock};
pub use lru::Lru;
