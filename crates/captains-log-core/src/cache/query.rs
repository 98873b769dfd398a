use std::future::Future;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::debug;

use super::key::QueryKey;
use super::store::{CacheEntry, QueryCache};

/// Consider fresh entries stale after 5 minutes.
/// Boats and settings change rarely; lists are invalidated by mutations anyway.
pub const DEFAULT_STALE_AFTER_MINUTES: i64 = 5;

/// Observer-side read helper: serve from the cache when it's trustworthy,
/// fetch and store otherwise.
#[derive(Clone)]
pub struct QueryLoader {
    cache: Arc<QueryCache>,
    stale_after: Duration,
}

impl QueryLoader {
    pub fn new(cache: Arc<QueryCache>, stale_after: Duration) -> Self {
        Self { cache, stale_after }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    fn is_expired<K: QueryKey>(&self, key: &K) -> bool {
        self.cache
            .updated_at(&key.cache_key())
            .map(|at| Utc::now() - at > self.stale_after)
            .unwrap_or(true)
    }

    /// Return the cached value if it is fresh and younger than the stale
    /// window; otherwise run `fetch`, store its result and return it.
    /// A failed fetch leaves the cache as it was.
    pub async fn load<K, E, F, Fut>(&self, key: &K, fetch: F) -> Result<K::Value, E>
    where
        K: QueryKey,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<K::Value, E>>,
    {
        if let CacheEntry::Fresh(value) = self.cache.entry(key) {
            if !self.is_expired(key) {
                debug!(key = %key.cache_key(), "Serving from cache");
                return Ok(value);
            }
        }
        self.refetch(key, fetch).await
    }

    /// Fetch unconditionally and store the result.
    pub async fn refetch<K, E, F, Fut>(&self, key: &K, fetch: F) -> Result<K::Value, E>
    where
        K: QueryKey,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<K::Value, E>>,
    {
        debug!(key = %key.cache_key(), "Fetching");
        let value = fetch().await?;
        self.cache.set(key, value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::cache::key::SettingsKey;
    use crate::models::{UnitSystem, UserSettings};

    fn settings(units: UnitSystem) -> UserSettings {
        UserSettings {
            units,
            ..Default::default()
        }
    }

    fn loader() -> QueryLoader {
        QueryLoader::new(Arc::new(QueryCache::new()), Duration::minutes(DEFAULT_STALE_AFTER_MINUTES))
    }

    #[tokio::test]
    async fn test_absent_fetches_and_stores() {
        let loader = loader();
        let value = loader
            .load(&SettingsKey, || async { Ok::<_, String>(settings(UnitSystem::Metric)) })
            .await
            .unwrap();
        assert_eq!(value.units, UnitSystem::Metric);
        assert_eq!(loader.cache().get(&SettingsKey), Some(settings(UnitSystem::Metric)));
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_fetch() {
        let loader = loader();
        loader.cache().set(&SettingsKey, settings(UnitSystem::Imperial));

        let calls = AtomicU32::new(0);
        let counter = &calls;
        let value = loader
            .load(&SettingsKey, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(settings(UnitSystem::Metric))
            })
            .await
            .unwrap();
        assert_eq!(value.units, UnitSystem::Imperial);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_entry_refetches() {
        let loader = loader();
        loader.cache().set(&SettingsKey, settings(UnitSystem::Imperial));
        loader.cache().invalidate(&SettingsKey);

        let value = loader
            .load(&SettingsKey, || async { Ok::<_, String>(settings(UnitSystem::Metric)) })
            .await
            .unwrap();
        assert_eq!(value.units, UnitSystem::Metric);
        assert!(!loader.cache().entry(&SettingsKey).is_stale());
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let loader = QueryLoader::new(Arc::new(QueryCache::new()), Duration::zero());
        loader.cache().set(&SettingsKey, settings(UnitSystem::Imperial));
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let value = loader
            .load(&SettingsKey, || async { Ok::<_, String>(settings(UnitSystem::Nautical)) })
            .await
            .unwrap();
        assert_eq!(value.units, UnitSystem::Nautical);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cache_untouched() {
        let loader = loader();
        loader.cache().set(&SettingsKey, settings(UnitSystem::Imperial));
        loader.cache().invalidate(&SettingsKey);

        let result = loader
            .load(&SettingsKey, || async { Err::<UserSettings, _>("offline".to_string()) })
            .await;
        assert_eq!(result, Err("offline".to_string()));
        assert_eq!(
            loader.cache().entry(&SettingsKey),
            CacheEntry::Stale(settings(UnitSystem::Imperial))
        );
    }
}
