//! Core library for Captain's Log.
//!
//! - [`api`]: REST client, error normalization, retry helper
//! - [`auth`]: bearer token store and the persisted session
//! - [`cache`]: typed query keys and the shared query cache
//! - [`mutation`]: optimistic writes with rollback
//! - [`logbook`]: screen-level actions built on the pieces above
//! - [`models`]: server entities
//! - [`config`]: on-disk configuration

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod logbook;
pub mod models;
pub mod mutation;

pub use api::{ApiClient, ApiError, ApiResult, RetryPolicy};
pub use auth::{Session, TokenStore};
pub use cache::{CacheEntry, CacheEvent, CacheEventKind, CacheKey, QueryCache, QueryKey, QueryLoader};
pub use config::Config;
pub use logbook::{BoatOverview, Logbook};
pub use mutation::MutationCoordinator;
