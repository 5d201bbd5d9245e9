//! Cached YouTube video metadata lookups.
//!
//! [`VideoResolver`] answers lookups from a local SQLite cache and fetches
//! whatever is missing from the YouTube Data API, fifty ids per request.
//! Fresh results are written back to the cache in the background.

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod youtube;

pub use config::Config;
pub use error::{AuthError, FetchFailure};
pub use youtube::{Video, VideoResolver};
