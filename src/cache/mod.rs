//! Generic stale-while-fallback caching layer.
//!
//! This module is domain-agnostic:
//! - Entries live in an injected string key/value store ([`CacheStore`])
//! - Each entry carries its write timestamp and expires lazily on read
//! - Failed remote calls are answered with embedded fallback data
//! - Every result is tagged with where it came from ([`CacheSource`])

mod layer;
mod storage;
mod traits;

pub use layer::{CachePolicy, CachedFetcher, ClearScope};
pub use storage::{CacheStore, MemoryStore, NoopStore, SqliteStore};
pub use traits::{now_millis, CacheEntry, CacheResult, CacheSource};
