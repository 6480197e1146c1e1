//! Cache storage trait and its backends.
//!
//! The store is a flat string key/value map. Entries are written as JSON by the
//! fetcher layer; the store itself never interprets values.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Trait for cache storage backends.
pub trait CacheStore: Send + Sync {
  /// Raw value stored under `key`.
  fn get(&self, key: &str) -> Result<Option<String>>;

  /// Store `value` under `key`, replacing any previous value.
  fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Remove `key`. Removing a missing key is not an error.
  fn clear(&self, key: &str) -> Result<()>;

  /// Remove every key starting with `prefix`, returning how many were removed.
  fn clear_prefix(&self, prefix: &str) -> Result<usize>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStore;

impl CacheStore for NoopStore {
  fn get(&self, _key: &str) -> Result<Option<String>> {
    Ok(None) // Always miss
  }

  fn set(&self, _key: &str, _value: &str) -> Result<()> {
    Ok(()) // Discard
  }

  fn clear(&self, _key: &str) -> Result<()> {
    Ok(())
  }

  fn clear_prefix(&self, _prefix: &str) -> Result<usize> {
    Ok(0)
  }
}

/// Process-local store, used by tests and `--no-persist`.
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
    self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  #[cfg(test)]
  pub fn keys(&self) -> Vec<String> {
    self
      .lock()
      .map(|m| m.keys().cloned().collect())
      .unwrap_or_default()
  }
}

impl CacheStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.lock()?.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    self.lock()?.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn clear(&self, key: &str) -> Result<()> {
    self.lock()?.remove(key);
    Ok(())
  }

  fn clear_prefix(&self, prefix: &str) -> Result<usize> {
    let mut entries = self.lock()?;
    let before = entries.len();
    entries.retain(|k, _| !k.starts_with(prefix));
    Ok(before - entries.len())
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open the store at the default location.
  pub fn open_default() -> Result<Self> {
    Self::open(&Self::default_path()?)
  }

  /// Open or create the store at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    tracing::debug!(path = %path.display(), "Opened cache database");

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("cyberfolio").join("cache.db"))
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    self
      .lock()?
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for the key/value table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl CacheStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    self
      .lock()?
      .query_row(
        "SELECT value FROM kv_cache WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache key {}: {}", key, e))
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    self
      .lock()?
      .execute(
        "INSERT OR REPLACE INTO kv_cache (key, value, written_at) VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write cache key {}: {}", key, e))?;

    Ok(())
  }

  fn clear(&self, key: &str) -> Result<()> {
    self
      .lock()?
      .execute("DELETE FROM kv_cache WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to delete cache key {}: {}", key, e))?;

    Ok(())
  }

  fn clear_prefix(&self, prefix: &str) -> Result<usize> {
    // substr() instead of LIKE so '_' and '%' in keys are matched literally
    self
      .lock()?
      .execute(
        "DELETE FROM kv_cache WHERE substr(key, 1, length(?1)) = ?1",
        params![prefix],
      )
      .map_err(|e| eyre!("Failed to delete cache keys under {}: {}", prefix, e))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn exercise(store: &dyn CacheStore) {
    assert_eq!(store.get("missing").unwrap(), None);

    store.set("cyber_skills_cache", "one").unwrap();
    store.set("cyber_skills_cache", "two").unwrap();
    assert_eq!(
      store.get("cyber_skills_cache").unwrap().as_deref(),
      Some("two")
    );

    store.clear("cyber_skills_cache").unwrap();
    store.clear("cyber_skills_cache").unwrap();
    assert_eq!(store.get("cyber_skills_cache").unwrap(), None);
  }

  fn exercise_prefix(store: &dyn CacheStore) {
    store.set("cyber_weather_cache_default_en", "a").unwrap();
    store.set("cyber_weather_cache_Paris_zh", "b").unwrap();
    store.set("cyber_weatherXcache", "keep").unwrap();
    store.set("language", "zh").unwrap();

    assert_eq!(store.clear_prefix("cyber_weather_cache_").unwrap(), 2);
    assert_eq!(store.get("cyber_weather_cache_Paris_zh").unwrap(), None);
    assert_eq!(store.get("cyber_weatherXcache").unwrap().as_deref(), Some("keep"));
    assert_eq!(store.get("language").unwrap().as_deref(), Some("zh"));
  }

  #[test]
  fn test_memory_store_roundtrip() {
    exercise(&MemoryStore::new());
  }

  #[test]
  fn test_memory_store_prefix_clear() {
    exercise_prefix(&MemoryStore::new());
  }

  #[test]
  fn test_sqlite_store_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("nested").join("cache.db")).unwrap();
    exercise(&store);
  }

  #[test]
  fn test_sqlite_store_prefix_is_literal() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("cache.db")).unwrap();
    exercise_prefix(&store);
  }

  #[test]
  fn test_sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    {
      let store = SqliteStore::open(&path).unwrap();
      store.set("language", "zh").unwrap();
    }
    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(store.get("language").unwrap().as_deref(), Some("zh"));
  }

  #[test]
  fn test_noop_store_always_misses() {
    let store = NoopStore;
    store.set("k", "v").unwrap();
    assert_eq!(store.get("k").unwrap(), None);
    assert_eq!(store.clear_prefix("k").unwrap(), 0);
  }
}
