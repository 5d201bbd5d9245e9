//! Cache storage trait and SQLite implementation.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::traits::{CacheEntry, Cacheable};

/// Trait for cache storage backends.
///
/// Keys are record identifiers; each key holds at most one entry.
pub trait CacheStorage: Send + Sync + 'static {
  /// Get a single entry by key.
  fn get<T: Cacheable>(&self, key: &str) -> Result<Option<CacheEntry<T>>>;

  /// Get every entry present for `keys` under one consistent read.
  /// Keys without an entry are left out of the map.
  fn get_many<T: Cacheable>(&self, keys: &[String]) -> Result<HashMap<String, CacheEntry<T>>>;

  /// Store a single entry, replacing whatever was stored under its key.
  fn put<T: Cacheable>(&self, entry: &CacheEntry<T>) -> Result<()>;

  /// Store a group of entries in one transaction.
  fn put_many<T: Cacheable>(&self, entries: &[CacheEntry<T>]) -> Result<()>;
}

/// Schema version written to `PRAGMA user_version`.
const SCHEMA_VERSION: i32 = 1;

const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS video_cache (
    id TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    timestamp INTEGER NOT NULL
);
"#;

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the cache database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;
    debug!(path = %path.display(), "opened cache database");

    Self::with_connection(conn)
  }

  /// Open a private in-memory database. Contents are lost when dropped.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("vidmeta").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let version: i32 = conn
      .query_row("PRAGMA user_version", [], |row| row.get(0))
      .map_err(|e| eyre!("Failed to read cache schema version: {}", e))?;
    if version > SCHEMA_VERSION {
      return Err(eyre!(
        "Cache database schema version {} is newer than supported version {}",
        version,
        SCHEMA_VERSION
      ));
    }

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;
    conn
      .pragma_update(None, "user_version", SCHEMA_VERSION)
      .map_err(|e| eyre!("Failed to set cache schema version: {}", e))?;

    Ok(())
  }
}

/// Decode a stored row. An unreadable payload counts as a miss so the next
/// fetch overwrites it.
fn decode_entry<T: Cacheable>(key: &str, data: &[u8], timestamp: i64) -> Option<CacheEntry<T>> {
  match serde_json::from_slice(data) {
    Ok(data) => Some(CacheEntry { data, timestamp }),
    Err(e) => {
      warn!(key, error = %e, "discarding unreadable cache entry");
      None
    }
  }
}

impl CacheStorage for SqliteStorage {
  fn get<T: Cacheable>(&self, key: &str) -> Result<Option<CacheEntry<T>>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(Vec<u8>, i64)> = conn
      .query_row(
        "SELECT data, timestamp FROM video_cache WHERE id = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry {}: {}", key, e))?;

    Ok(row.and_then(|(data, timestamp)| decode_entry(key, &data, timestamp)))
  }

  fn get_many<T: Cacheable>(&self, keys: &[String]) -> Result<HashMap<String, CacheEntry<T>>> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin read transaction: {}", e))?;

    let mut found = HashMap::new();
    {
      let mut stmt = tx
        .prepare("SELECT data, timestamp FROM video_cache WHERE id = ?")
        .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

      for key in keys {
        let row: Option<(Vec<u8>, i64)> = stmt
          .query_row(params![key], |row| Ok((row.get(0)?, row.get(1)?)))
          .optional()
          .map_err(|e| eyre!("Failed to read cache entry {}: {}", key, e))?;

        if let Some(entry) = row.and_then(|(data, ts)| decode_entry(key, &data, ts)) {
          found.insert(key.clone(), entry);
        }
      }
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to finish read transaction: {}", e))?;

    Ok(found)
  }

  fn put<T: Cacheable>(&self, entry: &CacheEntry<T>) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let data =
      serde_json::to_vec(&entry.data).map_err(|e| eyre!("Failed to serialize entry: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO video_cache (id, data, timestamp) VALUES (?, ?, ?)",
        params![entry.key(), data, entry.timestamp],
      )
      .map_err(|e| eyre!("Failed to store cache entry {}: {}", entry.key(), e))?;

    Ok(())
  }

  fn put_many<T: Cacheable>(&self, entries: &[CacheEntry<T>]) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    // Dropping the transaction without commit rolls the whole batch back
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;
    {
      let mut stmt = tx
        .prepare("INSERT OR REPLACE INTO video_cache (id, data, timestamp) VALUES (?, ?, ?)")
        .map_err(|e| eyre!("Failed to prepare insert: {}", e))?;

      for entry in entries {
        let data = serde_json::to_vec(&entry.data)
          .map_err(|e| eyre!("Failed to serialize entry: {}", e))?;
        stmt
          .execute(params![entry.key(), data, entry.timestamp])
          .map_err(|e| eyre!("Failed to store cache entry {}: {}", entry.key(), e))?;
      }
    }
    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    debug!(count = entries.len(), "stored cache entries");
    Ok(())
  }
}
