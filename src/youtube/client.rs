use color_eyre::{eyre::eyre, Result};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::config::{ApiConfig, AuthConfig};
use crate::error::FetchFailure;

use super::api_types::{first_video, keyed_videos, ApiVideoListResponse};
use super::auth::{CredentialProvider, YOUTUBE_READONLY_SCOPE};
use super::types::Video;

/// Most ids the videos endpoint accepts in one request.
pub const MAX_IDS_PER_REQUEST: usize = 50;

/// Result of one request: the data, or the reason there is none.
#[derive(Debug)]
pub enum FetchOutcome<T> {
  Success(T),
  Failure(FetchFailure),
}

impl<T> FetchOutcome<T> {
  /// The data on success. A failure is logged with `context` and dropped.
  pub fn or_log(self, context: &str) -> Option<T> {
    match self {
      FetchOutcome::Success(data) => Some(data),
      FetchOutcome::Failure(reason) => {
        warn!(context, error = %reason, "video fetch failed");
        None
      }
    }
  }

  pub fn is_success(&self) -> bool {
    matches!(self, FetchOutcome::Success(_))
  }
}

impl<T> From<Result<T, FetchFailure>> for FetchOutcome<T> {
  fn from(result: Result<T, FetchFailure>) -> Self {
    match result {
      Ok(data) => FetchOutcome::Success(data),
      Err(reason) => FetchOutcome::Failure(reason),
    }
  }
}

/// YouTube Data API client for video metadata.
#[derive(Clone)]
pub struct VideoClient {
  http: reqwest::Client,
  endpoint: Url,
  parts: String,
  credentials: Arc<dyn CredentialProvider>,
  interactive: bool,
}

impl VideoClient {
  pub fn new(
    api: &ApiConfig,
    auth: &AuthConfig,
    credentials: Arc<dyn CredentialProvider>,
  ) -> Result<Self> {
    let endpoint = Url::parse(&api.endpoint)
      .map_err(|e| eyre!("Invalid API endpoint {}: {}", api.endpoint, e))?;

    let http = reqwest::Client::builder()
      .user_agent(concat!("vidmeta/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      endpoint,
      parts: api.parts.join(","),
      credentials,
      interactive: auth.interactive,
    })
  }

  /// Acquire a token carrying the read-only scope.
  async fn authorize(&self) -> Result<String> {
    let credential = self.credentials.acquire(self.interactive).await?;
    let token = credential.authorize(YOUTUBE_READONLY_SCOPE)?;
    Ok(token.to_string())
  }

  fn request_url(&self, ids: &[String]) -> Url {
    let mut url = self.endpoint.clone();
    url
      .query_pairs_mut()
      .append_pair("id", &ids.join(","))
      .append_pair("part", &self.parts);
    url
  }

  /// Issue one request and return the raw `items` of the response.
  async fn request(
    &self,
    token: &str,
    ids: &[String],
  ) -> Result<Vec<serde_json::Value>, FetchFailure> {
    let response = self
      .http
      .get(self.request_url(ids))
      .bearer_auth(token)
      .send()
      .await?;

    let status = response.status();
    let body = response.bytes().await?;
    debug!(%status, count = ids.len(), "videos response");

    ApiVideoListResponse::parse(&body)
  }

  /// Fetch one video, keeping the reason when nothing usable came back.
  ///
  /// Only an authorization failure is returned as an error.
  pub async fn try_fetch_one(&self, id: &str) -> Result<FetchOutcome<Option<Video>>> {
    let token = self.authorize().await?;
    let ids = [id.to_string()];

    let result = match self.request(&token, &ids).await {
      Ok(items) => first_video(items),
      Err(e) => Err(e),
    };
    Ok(result.into())
  }

  /// Fetch one video. `None` when it does not exist or the request failed.
  pub async fn fetch_one(&self, id: &str) -> Result<Option<Video>> {
    let outcome = self.try_fetch_one(id).await?;
    Ok(outcome.or_log(id).flatten())
  }

  /// Fetch one chunk of at most [`MAX_IDS_PER_REQUEST`] ids.
  pub async fn fetch_chunk(
    &self,
    token: &str,
    ids: &[String],
  ) -> FetchOutcome<Vec<(String, Video)>> {
    self.request(token, ids).await.map(keyed_videos).into()
  }

  /// Fetch any number of videos, one concurrent request per chunk.
  ///
  /// A failed chunk contributes nothing; the other chunks are unaffected.
  /// Results come back in chunk order. Ids the API does not return are
  /// simply absent.
  ///
  /// An empty `ids` returns an empty list without acquiring a credential, so
  /// it succeeds even when authorization would fail.
  pub async fn fetch_many(&self, ids: &[String]) -> Result<Vec<(String, Video)>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }

    let token = self.authorize().await?;
    let chunks: Vec<&[String]> = ids.chunks(MAX_IDS_PER_REQUEST).collect();
    debug!(ids = ids.len(), chunks = chunks.len(), "fetching videos");

    let outcomes = join_all(chunks.iter().map(|chunk| self.fetch_chunk(&token, chunk))).await;

    let videos = outcomes
      .into_iter()
      .enumerate()
      .filter_map(|(index, outcome)| outcome.or_log(&format!("chunk {}", index)))
      .flatten()
      .collect();

    Ok(videos)
  }
}
