//! Screen-level actions.
//!
//! `Logbook` is what front ends talk to. Reads go through the `QueryLoader`;
//! writes pair a cache key with a pure local transformation and the matching
//! `ApiClient` call, and hand both to the `MutationCoordinator`.
//!
//! The pure transformations are free functions in each submodule so they can
//! be tested without a server.

pub mod boats;
pub mod maintenance;
pub mod notes;
pub mod settings;
pub mod todos;
pub mod trips;

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::api::{ApiClient, ApiResult, RetryPolicy};
use crate::cache::{QueryCache, QueryLoader, Resource};
use crate::config::Config;
use crate::models::{Identified, LoginResponse, PENDING_ID_PREFIX};
use crate::mutation::MutationCoordinator;

pub use boats::BoatOverview;

/// Every resource family, for wholesale invalidation.
const ALL_RESOURCES: [Resource; 6] = [
    Resource::Boats,
    Resource::Trips,
    Resource::Notes,
    Resource::Maintenance,
    Resource::Todos,
    Resource::Settings,
];

#[derive(Clone)]
pub struct Logbook {
    api: ApiClient,
    loader: QueryLoader,
    coordinator: MutationCoordinator,
    retry: RetryPolicy,
}

impl Logbook {
    pub fn new(api: ApiClient, cache: Arc<QueryCache>, config: &Config) -> Self {
        Self::from_parts(api, cache, config.stale_after(), config.retry_policy())
    }

    pub fn from_parts(
        api: ApiClient,
        cache: Arc<QueryCache>,
        stale_after: chrono::Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            api,
            loader: QueryLoader::new(cache.clone(), stale_after),
            coordinator: MutationCoordinator::new(cache),
            retry,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        self.loader.cache()
    }

    /// Log in and mark everything cached for the previous user stale.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        let login = self.api.login(email, password).await?;
        let stale = self.invalidate_all();
        info!(user_id = %login.user.id, stale, "Logged in");
        Ok(login)
    }

    /// Mark every cached entry stale. Returns how many entries were marked.
    pub fn invalidate_all(&self) -> usize {
        ALL_RESOURCES
            .iter()
            .map(|resource| self.cache().invalidate_prefix(&resource.root()))
            .sum()
    }
}

/// Id for an entity that exists only in the cache until the server answers.
pub fn pending_id() -> String {
    format!("{}{}", PENDING_ID_PREFIX, Utc::now().timestamp_micros())
}

/// Copy of `items` without the entry whose id is `id`.
pub fn remove_by_id<T: Identified + Clone>(items: &[T], id: &str) -> Vec<T> {
    items.iter().filter(|item| item.id() != id).cloned().collect()
}

/// Copy of `items` with the entry whose id is `id` passed through `update`.
/// Returns None if no entry matches.
pub fn update_by_id<T, F>(items: &[T], id: &str, update: F) -> Option<Vec<T>>
where
    T: Identified + Clone,
    F: FnOnce(&mut T),
{
    let index = items.iter().position(|item| item.id() == id)?;
    let mut updated = items.to_vec();
    update(&mut updated[index]);
    Some(updated)
}
