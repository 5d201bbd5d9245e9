use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::Cacheable;

/// Metadata for a single video, as returned by the videos endpoint.
///
/// Only `id` is required. Every other field stays in the raw payload so a
/// record written to the cache round-trips exactly as it was received,
/// including fields that are missing, null, or of an unexpected type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
  pub id: String,
  #[serde(flatten)]
  pub payload: Map<String, Value>,
}

impl Video {
  /// Resource kind tag, e.g. `youtube#video`
  pub fn kind(&self) -> Option<&str> {
    self.payload.get("kind")?.as_str()
  }

  /// Change-detection token from the API
  pub fn etag(&self) -> Option<&str> {
    self.payload.get("etag")?.as_str()
  }

  pub fn snippet(&self) -> Option<&Value> {
    self.payload.get("snippet").filter(|v| !v.is_null())
  }

  pub fn content_details(&self) -> Option<&Value> {
    self.payload.get("contentDetails").filter(|v| !v.is_null())
  }

  /// Video title from the snippet, if present
  pub fn title(&self) -> Option<&str> {
    self.snippet()?.get("title")?.as_str()
  }
}

impl Cacheable for Video {
  fn cache_key(&self) -> &str {
    &self.id
  }
}
