//! Typed errors callers may want to match on.
//!
//! Everything else travels as a `color_eyre::Report`; these types are carried
//! inside the report and can be recovered with `downcast_ref`.

use thiserror::Error;

/// Authorization could not be obtained. Fatal for the whole fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
  #[error("Credential provider did not return an access token")]
  MissingToken,

  #[error("Required scope {required} was not granted")]
  MissingScope { required: String },

  #[error("Failed to acquire credentials: {0}")]
  Provider(String),
}

/// Why a single request produced no usable data.
///
/// These never reach the caller as errors; they are logged and turned into an
/// empty result for the unit of work that failed.
#[derive(Debug, Error)]
pub enum FetchFailure {
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("response body is not valid JSON: {0}")]
  InvalidJson(#[from] serde_json::Error),

  #[error("items array missing from response")]
  MissingItems,

  #[error("item could not be read as a video: {0}")]
  MalformedItem(serde_json::Error),
}
