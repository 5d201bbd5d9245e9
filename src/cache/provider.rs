//! Lazily opened, process-wide store handle.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use super::storage::{CacheStorage, SqliteStorage};

type Opener<S> = Box<dyn Fn() -> Result<S> + Send + Sync>;

/// Hands out a shared storage handle, opening it on first use.
///
/// Concurrent first calls wait on the same open, so at most one underlying
/// store is ever created. A failed open is reported to every waiter and
/// attempted again on the next call.
pub struct StoreProvider<S: CacheStorage> {
  handle: OnceCell<Arc<S>>,
  open: Opener<S>,
}

impl<S: CacheStorage> StoreProvider<S> {
  /// Create a provider that opens the store with `open` when first needed.
  pub fn new<F>(open: F) -> Self
  where
    F: Fn() -> Result<S> + Send + Sync + 'static,
  {
    Self {
      handle: OnceCell::new(),
      open: Box::new(open),
    }
  }

  /// Create a provider around an already opened store.
  pub fn ready(storage: S) -> Self {
    Self {
      handle: OnceCell::new_with(Some(Arc::new(storage))),
      open: Box::new(|| Err(eyre!("Cache store was provided already open"))),
    }
  }

  /// Get the shared store handle, opening it if this is the first use.
  pub async fn handle(&self) -> Result<Arc<S>> {
    let handle = self
      .handle
      .get_or_try_init(|| async {
        debug!("initializing cache store");
        (self.open)().map(Arc::new)
      })
      .await?;
    Ok(Arc::clone(handle))
  }

  /// Whether the store has been opened yet.
  pub fn is_initialized(&self) -> bool {
    self.handle.initialized()
  }
}

impl StoreProvider<SqliteStorage> {
  /// Provider for a SQLite cache file at `path`.
  pub fn sqlite(path: PathBuf) -> Self {
    Self::new(move || SqliteStorage::open(&path))
  }
}
