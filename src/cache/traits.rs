//! Core types for the caching system.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached payload together with the moment it was written.
///
/// Serialized as `{"data": ..., "timestamp": <epoch millis>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  pub data: T,
  /// Write time in milliseconds since the Unix epoch
  pub timestamp: i64,
}

impl<T> CacheEntry<T> {
  /// Create an entry stamped with the current time.
  pub fn new(data: T) -> Self {
    Self {
      data,
      timestamp: now_millis(),
    }
  }

  /// Create an entry with an explicit timestamp.
  pub fn at(data: T, timestamp: i64) -> Self {
    Self { data, timestamp }
  }

  /// An entry is fresh while `now - timestamp < ttl`.
  pub fn is_fresh(&self, ttl: Duration, now: i64) -> bool {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now.saturating_sub(self.timestamp) < ttl_ms
  }

  pub fn written_at(&self) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(self.timestamp).single()
  }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
  Utc::now().timestamp_millis()
}

/// Result from a cached fetch, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Fresh data from the remote source.
  pub fn live(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Live,
      cached_at: None,
    }
  }

  /// Data served from a fresh cache entry.
  pub fn from_cache(data: T, cached_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at,
    }
  }

  /// Hardcoded data substituted after a failed remote call.
  pub fn fallback(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Fallback,
      cached_at: None,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheResult<U> {
    CacheResult {
      data: f(self.data),
      source: self.source,
      cached_at: self.cached_at,
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSource {
  /// Fresh data from the network
  Live,
  /// Data from a cache entry that is still within its TTL
  Cache,
  /// Embedded default data, the live path failed
  Fallback,
}

impl CacheSource {
  pub fn label(&self) -> &'static str {
    match self {
      Self::Live => "live",
      Self::Cache => "cache",
      Self::Fallback => "fallback",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const THIRTY_MINUTES: Duration = Duration::from_secs(30 * 60);

  #[test]
  fn test_entry_fresh_within_ttl() {
    let now = now_millis();
    let entry = CacheEntry::at(1, now - 29 * 60 * 1000);
    assert!(entry.is_fresh(THIRTY_MINUTES, now));
  }

  #[test]
  fn test_entry_stale_after_ttl() {
    let now = now_millis();
    let entry = CacheEntry::at(1, now - 31 * 60 * 1000);
    assert!(!entry.is_fresh(THIRTY_MINUTES, now));
  }

  #[test]
  fn test_entry_stale_at_exact_ttl() {
    let now = now_millis();
    let entry = CacheEntry::at(1, now - 30 * 60 * 1000);
    assert!(!entry.is_fresh(THIRTY_MINUTES, now));
  }

  #[test]
  fn test_entry_wire_format() {
    let entry = CacheEntry::at(vec!["a".to_string()], 1_700_000_000_000);
    let json = serde_json::to_string(&entry).unwrap();
    assert_eq!(json, r#"{"data":["a"],"timestamp":1700000000000}"#);
  }

  #[test]
  fn test_source_labels() {
    assert_eq!(CacheSource::Live.label(), "live");
    assert_eq!(CacheSource::Cache.label(), "cache");
    assert_eq!(CacheSource::Fallback.label(), "fallback");
  }
}
