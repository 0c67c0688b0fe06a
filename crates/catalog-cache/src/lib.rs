//! Bounded least-recently-used cache with hit/miss statistics.

mod lru;

pub use lru::{CacheError, CacheStats, LruCache};
