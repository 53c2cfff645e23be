//! Cache storage trait and its implementations.
//!
//! Storage only deals in opaque blobs keyed by namespace. Expiry, where a
//! backend has any, is applied here and is invisible to the cache layer.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{RefDataError, Result};

/// Upper bound on entries held by [`MemoryStorage`]; there is one per namespace.
const MEMORY_CAPACITY: u64 = 64;

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Get the blob stored for a namespace, if present and unexpired.
  fn get(&self, namespace: &str) -> Result<Option<Vec<u8>>>;

  /// Store a namespace's blob, replacing any previous value.
  fn set(&self, namespace: &str, blob: &[u8]) -> Result<()>;

  /// Remove a namespace's blob.
  fn delete(&self, namespace: &str) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Every lookup goes to the back office.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _namespace: &str) -> Result<Option<Vec<u8>>> {
    Ok(None) // Always miss
  }

  fn set(&self, _namespace: &str, _blob: &[u8]) -> Result<()> {
    Ok(()) // Discard
  }

  fn delete(&self, _namespace: &str) -> Result<()> {
    Ok(())
  }
}

/// In-process storage backed by a moka cache.
pub struct MemoryStorage {
  cache: moka::sync::Cache<String, Arc<Vec<u8>>>,
}

impl MemoryStorage {
  /// Create memory storage, expiring entries `ttl` after they were written.
  pub fn new(ttl: Option<std::time::Duration>) -> Self {
    let mut builder = moka::sync::Cache::builder().max_capacity(MEMORY_CAPACITY);
    if let Some(ttl) = ttl {
      builder = builder.time_to_live(ttl);
    }
    Self {
      cache: builder.build(),
    }
  }
}

impl Default for MemoryStorage {
  fn default() -> Self {
    Self::new(None)
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, namespace: &str) -> Result<Option<Vec<u8>>> {
    Ok(self.cache.get(namespace).map(|blob| blob.as_ref().clone()))
  }

  fn set(&self, namespace: &str, blob: &[u8]) -> Result<()> {
    self
      .cache
      .insert(namespace.to_string(), Arc::new(blob.to_vec()));
    Ok(())
  }

  fn delete(&self, namespace: &str) -> Result<()> {
    self.cache.invalidate(namespace);
    Ok(())
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
  /// Rows older than this are treated as absent
  ttl: Option<Duration>,
}

impl SqliteStorage {
  /// Open (or create) the cache database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| {
        RefDataError::Storage(format!("failed to create cache directory: {}", e))
      })?;
    }

    let conn = Connection::open(path)?;
    Self::with_connection(conn)
  }

  /// Open a private in-memory database.
  pub fn open_in_memory() -> Result<Self> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
      ttl: None,
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Set how long a stored namespace stays valid.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = Some(ttl);
    self
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| RefDataError::Storage("could not determine data directory".into()))?;

    Ok(data_dir.join("refdata").join("cache.db"))
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| RefDataError::Storage(format!("lock poisoned: {}", e)))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    self.lock()?.execute_batch(CACHE_SCHEMA)?;
    Ok(())
  }

  fn is_expired(&self, cached_at: DateTime<Utc>) -> bool {
    self
      .ttl
      .is_some_and(|ttl| Utc::now() - cached_at > ttl)
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- One serialized map per namespace
CREATE TABLE IF NOT EXISTS namespace_cache (
    namespace TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl CacheStorage for SqliteStorage {
  fn get(&self, namespace: &str) -> Result<Option<Vec<u8>>> {
    let conn = self.lock()?;

    let row: Option<(Vec<u8>, String)> = conn
      .query_row(
        "SELECT data, cached_at FROM namespace_cache WHERE namespace = ?",
        params![namespace],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()?;

    match row {
      Some((data, cached_at)) => {
        if self.is_expired(parse_datetime(&cached_at)?) {
          return Ok(None);
        }
        Ok(Some(data))
      }
      None => Ok(None),
    }
  }

  fn set(&self, namespace: &str, blob: &[u8]) -> Result<()> {
    self.lock()?.execute(
      "INSERT OR REPLACE INTO namespace_cache (namespace, data, cached_at)
       VALUES (?, ?, datetime('now'))",
      params![namespace, blob],
    )?;
    Ok(())
  }

  fn delete(&self, namespace: &str) -> Result<()> {
    self.lock()?.execute(
      "DELETE FROM namespace_cache WHERE namespace = ?",
      params![namespace],
    )?;
    Ok(())
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| RefDataError::Storage(format!("failed to parse datetime '{}': {}", s, e)))
}
