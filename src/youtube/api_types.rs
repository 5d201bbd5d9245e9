//! Serde types matching the videos endpoint response.
//!
//! Items are kept as raw JSON until validated so one bad item never spoils the
//! rest of the page.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::FetchFailure;

use super::types::Video;

/// Top-level response of `GET /youtube/v3/videos`.
#[derive(Debug, Deserialize)]
pub struct ApiVideoListResponse {
  #[serde(default)]
  items: Option<Value>,
}

impl ApiVideoListResponse {
  /// Parse a response body. A body whose `items` is absent or not an array
  /// is a failure for the whole request.
  pub fn parse(body: &[u8]) -> Result<Vec<Value>, FetchFailure> {
    let response: ApiVideoListResponse = serde_json::from_slice(body)?;
    match response.items {
      Some(Value::Array(items)) => Ok(items),
      _ => Err(FetchFailure::MissingItems),
    }
  }
}

/// Whether an item carries a usable string `id`.
fn has_string_id(item: &Value) -> bool {
  matches!(item.get("id"), Some(Value::String(id)) if !id.is_empty())
}

fn into_video(item: Value) -> Result<Video, FetchFailure> {
  serde_json::from_value(item).map_err(FetchFailure::MalformedItem)
}

/// Read the first item of a response as a video.
///
/// Fails only when that item has no string `id`.
pub fn first_video(items: Vec<Value>) -> Result<Option<Video>, FetchFailure> {
  items.into_iter().next().map(into_video).transpose()
}

/// Keep the items carrying a string `id`, paired with that id.
///
/// Items without one are dropped silently; everything else is kept as
/// received.
pub fn keyed_videos(items: Vec<Value>) -> Vec<(String, Video)> {
  items
    .into_iter()
    .filter(has_string_id)
    .filter_map(|item| match into_video(item) {
      Ok(video) => Some((video.id.clone(), video)),
      Err(e) => {
        debug!(error = %e, "dropping unreadable video item");
        None
      }
    })
    .collect()
}
