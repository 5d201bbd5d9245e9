//! Cached video lookups: read through the local cache, fetch the gap, and
//! write fresh results back in the background.

use color_eyre::Result;
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{now_millis, CacheEntry, CacheStorage, SqliteStorage, StoreProvider};
use crate::config::Config;
use crate::scheduler::WriteBackScheduler;

use super::auth::EnvCredentials;
use super::client::VideoClient;
use super::types::Video;

/// Video lookups with transparent caching.
///
/// Cache hits are served without touching the network. Misses are fetched and
/// returned as soon as the fetch completes; persisting them is handed to the
/// write-back scheduler, so a lookup issued before that write lands may fetch
/// the same video again.
pub struct VideoResolver<S: CacheStorage = SqliteStorage> {
  client: VideoClient,
  store: Arc<StoreProvider<S>>,
  scheduler: Arc<dyn WriteBackScheduler>,
}

impl<S: CacheStorage> Clone for VideoResolver<S> {
  fn clone(&self) -> Self {
    Self {
      client: self.client.clone(),
      store: Arc::clone(&self.store),
      scheduler: Arc::clone(&self.scheduler),
    }
  }
}

impl VideoResolver<SqliteStorage> {
  /// Build a resolver from configuration, reading the token from the
  /// environment and caching in the configured SQLite file.
  pub fn from_config(config: &Config, scheduler: Arc<dyn WriteBackScheduler>) -> Result<Self> {
    let credentials = Arc::new(EnvCredentials::new(config.auth.granted_scopes.clone()));
    let client = VideoClient::new(&config.api, &config.auth, credentials)?;
    let store = Arc::new(StoreProvider::sqlite(config.cache.resolved_path()?));

    Ok(Self::new(client, store, scheduler))
  }
}

impl<S: CacheStorage> VideoResolver<S> {
  pub fn new(
    client: VideoClient,
    store: Arc<StoreProvider<S>>,
    scheduler: Arc<dyn WriteBackScheduler>,
  ) -> Self {
    Self {
      client,
      store,
      scheduler,
    }
  }

  /// Look up one video.
  ///
  /// `None` means the video could not be resolved this time; nothing is
  /// remembered about the miss, so the next call tries the network again.
  pub async fn get(&self, id: &str) -> Result<Option<Video>> {
    let store = self.store.handle().await?;

    if let Some(entry) = store.get::<Video>(id)? {
      debug!(id, "cache hit");
      return Ok(Some(entry.data));
    }

    let video = self.client.fetch_one(id).await?;
    if let Some(video) = &video {
      self.write_back_one(store, video.clone());
    }

    Ok(video)
  }

  /// Look up many videos at once.
  ///
  /// The returned map holds every id that was cached or could be fetched;
  /// ids the API did not return are left out.
  pub async fn get_many(&self, ids: &[String]) -> Result<HashMap<String, Video>> {
    let store = self.store.handle().await?;
    let cached = store.get_many::<Video>(ids)?;

    let mut results = HashMap::with_capacity(ids.len());
    let mut missing = Vec::new();

    for id in ids {
      match cached.get(id) {
        Some(entry) => {
          results.insert(id.clone(), entry.data.clone());
        }
        None => missing.push(id.clone()),
      }
    }
    debug!(hits = results.len(), missing = missing.len(), "cache lookup");

    if !missing.is_empty() {
      let fetched = self.client.fetch_many(&missing).await?;

      let fresh: Vec<Video> = fetched.iter().map(|(_, video)| video.clone()).collect();
      results.extend(fetched);

      if !fresh.is_empty() {
        self.write_back_many(store, fresh);
      }
    }

    Ok(results)
  }

  fn write_back_one(&self, store: Arc<S>, video: Video) {
    self.scheduler.schedule(
      async move {
        let entry = CacheEntry::new(video, now_millis());
        if let Err(e) = store.put(&entry) {
          warn!(id = entry.key(), error = %e, "failed to cache video");
        }
      }
      .boxed(),
    );
  }

  fn write_back_many(&self, store: Arc<S>, videos: Vec<Video>) {
    self.scheduler.schedule(
      async move {
        let timestamp = now_millis();
        let entries: Vec<CacheEntry<Video>> = videos
          .into_iter()
          .map(|video| CacheEntry::new(video, timestamp))
          .collect();

        if let Err(e) = store.put_many(&entries) {
          warn!(count = entries.len(), error = %e, "failed to cache videos");
        }
      }
      .boxed(),
    );
  }
}
