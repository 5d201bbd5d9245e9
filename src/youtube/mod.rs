//! YouTube Data API access: credentials, the videos endpoint, and the cached
//! resolver built on top of them.

mod api_types;
mod auth;
mod client;
mod resolver;
mod types;

pub use auth::{
  Credential, CredentialProvider, EnvCredentials, StaticCredentials, YOUTUBE_READONLY_SCOPE,
};
pub use client::{FetchOutcome, VideoClient, MAX_IDS_PER_REQUEST};
pub use resolver::VideoResolver;
pub use types::Video;
