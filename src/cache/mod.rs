//! Generic TTL cache for upstream fetch results.
//!
//! This module provides a source-agnostic caching mechanism that:
//! - Holds a single value together with the time its fetch started
//! - Serves the stored value untouched while it is younger than the TTL
//! - Replaces the value wholesale after the next successful fetch
//! - Leaves the previous value in place when a fetch fails

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::MemoryStorage;
pub use traits::{CacheResult, CacheSource, Clock, SystemClock};

#[cfg(test)]
pub use traits::testing;
