//! Core traits and types for the caching system.

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};

/// Trait for records that can be cached.
///
/// Implementors provide the identifier the record is stored under. The cache
/// holds at most one entry per key.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Unique identifier for this record (e.g. a video id)
  fn cache_key(&self) -> &str;
}

/// A cached record together with the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
  /// The cached record, exactly as it was fetched
  pub data: T,
  /// Insertion time in milliseconds since the Unix epoch
  pub timestamp: i64,
}

impl<T: Cacheable> CacheEntry<T> {
  pub fn new(data: T, timestamp: i64) -> Self {
    Self { data, timestamp }
  }

  /// Wrap a record stamped with the current time.
  pub fn now(data: T) -> Self {
    Self::new(data, now_millis())
  }

  pub fn key(&self) -> &str {
    self.data.cache_key()
  }
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
  Utc::now().timestamp_millis()
}
