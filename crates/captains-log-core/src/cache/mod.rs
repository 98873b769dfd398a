//! Client-side query cache.
//!
//! This module provides the `QueryCache`, a process-wide store of
//! server-derived state keyed by typed cache keys, and the `QueryLoader`
//! that screens use to read through it.
//!
//! Entries are never evicted. They are created on first fetch, overwritten by
//! optimistic writes and refetches, and marked stale by invalidation.

pub mod key;
pub mod query;
pub mod store;

pub use key::{
    BoatDetail, BoatsList, CacheKey, MaintenanceList, NotesList, QueryKey, Resource, SettingsKey,
    TodoListKey, TripDetail, TripsList,
};
pub use query::{QueryLoader, DEFAULT_STALE_AFTER_MINUTES};
pub use store::{CacheEntry, CacheEvent, CacheEventKind, QueryCache};
