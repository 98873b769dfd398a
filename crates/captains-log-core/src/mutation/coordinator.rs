//! Optimistic mutations with rollback.
//!
//! A mutation writes its expected result into the cache before the remote
//! call, then either confirms (invalidate, so the next read pulls server
//! truth) or rolls back to the snapshot taken before the write.
//!
//! Mutations on the same key are not serialized against each other. Two
//! concurrent calls race and the later `set`/`invalidate` wins.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{QueryCache, QueryKey};

/// Bookkeeping for one `mutate` call. Lives exactly as long as the call.
struct MutationAttempt<'a, K: QueryKey> {
    cache: &'a QueryCache,
    key: &'a K,
    previous: Option<K::Value>,
    in_flight: bool,
}

impl<'a, K: QueryKey> MutationAttempt<'a, K> {
    fn begin(cache: &'a QueryCache, key: &'a K) -> Self {
        let previous = cache.get(key);
        debug!(key = %key.cache_key(), has_previous = previous.is_some(), "Mutation started");
        Self {
            cache,
            key,
            previous,
            in_flight: false,
        }
    }

    /// Write the optimistic value. Skipped when nothing is cached yet.
    fn apply<E, A>(&self, apply: A) -> Result<(), E>
    where
        A: FnOnce(&K::Value) -> Result<K::Value, E>,
        E: Display,
    {
        let Some(previous) = self.previous.as_ref() else {
            debug!(key = %self.key.cache_key(), "Nothing cached, skipping optimistic write");
            return Ok(());
        };
        match apply(previous) {
            Ok(optimistic) => {
                self.cache.set(self.key, optimistic);
                Ok(())
            }
            Err(e) => {
                warn!(key = %self.key.cache_key(), error = %e, "Local mutation failed");
                Err(e)
            }
        }
    }

    fn confirm(mut self) {
        self.in_flight = false;
        self.cache.invalidate(self.key);
        debug!(key = %self.key.cache_key(), "Mutation confirmed");
    }

    fn rollback(mut self, error: &dyn Display) {
        self.in_flight = false;
        if let Some(previous) = self.previous.take() {
            self.cache.set(self.key, previous);
        }
        warn!(key = %self.key.cache_key(), error = %error, "Mutation failed, rolled back");
    }
}

impl<K: QueryKey> Drop for MutationAttempt<'_, K> {
    /// Future dropped mid-flight: the outcome is unknown, so restore the
    /// snapshot and let the next read ask the server.
    fn drop(&mut self) {
        if !self.in_flight {
            return;
        }
        if let Some(previous) = self.previous.take() {
            self.cache.set(self.key, previous);
        }
        self.cache.invalidate(self.key);
        debug!(key = %self.key.cache_key(), "Mutation abandoned in flight");
    }
}

/// Runs local-then-remote mutations against the shared cache.
#[derive(Clone)]
pub struct MutationCoordinator {
    cache: Arc<QueryCache>,
}

impl MutationCoordinator {
    pub fn new(cache: Arc<QueryCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Apply `apply` to the cached value for `key`, then run `remote`.
    ///
    /// - Nothing cached: the optimistic write is skipped.
    /// - `apply` fails: nothing is written, `remote` is not called.
    /// - `remote` succeeds: the key is invalidated and the result returned.
    /// - `remote` fails: the snapshot is restored and the error returned
    ///   unchanged.
    pub async fn mutate<K, T, E, A, R, Fut>(&self, key: &K, apply: A, remote: R) -> Result<T, E>
    where
        K: QueryKey,
        A: FnOnce(&K::Value) -> Result<K::Value, E>,
        R: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = MutationAttempt::begin(&self.cache, key);
        attempt.apply(apply)?;

        attempt.in_flight = true;
        match remote().await {
            Ok(value) => {
                attempt.confirm();
                Ok(value)
            }
            Err(e) => {
                attempt.rollback(&e);
                Err(e)
            }
        }
    }

    /// Like [`mutate`](Self::mutate) for remotes that answer with the new
    /// value of the key itself. On success the server's value is stored
    /// and then invalidated, which also populates a key that was absent.
    pub async fn mutate_and_store<K, E, A, R, Fut>(&self, key: &K, apply: A, remote: R) -> Result<K::Value, E>
    where
        K: QueryKey,
        A: FnOnce(&K::Value) -> Result<K::Value, E>,
        R: FnOnce() -> Fut,
        Fut: Future<Output = Result<K::Value, E>>,
        E: Display,
    {
        let mut attempt = MutationAttempt::begin(&self.cache, key);
        attempt.apply(apply)?;

        attempt.in_flight = true;
        match remote().await {
            Ok(value) => {
                self.cache.set(key, value.clone());
                attempt.confirm();
                Ok(value)
            }
            Err(e) => {
                attempt.rollback(&e);
                Err(e)
            }
        }
    }
}
