//! Persistent record cache.
//!
//! Records are stored by identifier with the time they were written. Entries
//! are never expired or evicted; a later write for the same key replaces the
//! earlier one.

mod provider;
mod storage;
mod traits;

pub use provider::StoreProvider;
pub use storage::{CacheStorage, SqliteStorage};
pub use traits::{now_millis, CacheEntry, Cacheable};
