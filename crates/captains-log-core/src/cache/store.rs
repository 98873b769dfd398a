//! In-memory, process-wide query cache.
//!
//! One `QueryCache` is created at startup and shared through `Arc` with every
//! consumer. Values are stored type-erased and recovered through the
//! `QueryKey` that wrote them.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::key::{CacheKey, QueryKey};

/// Capacity of the event channel. Slow observers miss events rather than
/// blocking writers; a lagged receiver should reload what it displays.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What an observer sees for a key.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry<V> {
    /// Never populated
    Absent,
    /// Last written value, not invalidated since
    Fresh(V),
    /// Last written value, marked for refetch
    Stale(V),
}

impl<V> CacheEntry<V> {
    pub fn into_value(self) -> Option<V> {
        match self {
            CacheEntry::Absent => None,
            CacheEntry::Fresh(v) | CacheEntry::Stale(v) => Some(v),
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, CacheEntry::Stale(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, CacheEntry::Absent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    Updated,
    Invalidated,
}

/// Published on every write and invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub key: CacheKey,
    pub kind: CacheEventKind,
}

struct Slot {
    value: Arc<dyn Any + Send + Sync>,
    stale: bool,
    updated_at: DateTime<Utc>,
}

pub struct QueryCache {
    entries: RwLock<HashMap<CacheKey, Slot>>,
    events: broadcast::Sender<CacheEvent>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// A poisoned lock only means a writer panicked mid-insert; the map is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, Slot>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, Slot>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, key: CacheKey, kind: CacheEventKind) {
        // No receivers is fine
        let _ = self.events.send(CacheEvent { key, kind });
    }

    fn downcast<K: QueryKey>(key: &CacheKey, slot: &Slot) -> Option<K::Value> {
        match slot.value.downcast_ref::<K::Value>() {
            Some(value) => Some(value.clone()),
            None => {
                warn!(key = %key, "Cached value has unexpected type");
                None
            }
        }
    }

    /// Last written value for `key`, stale or not.
    pub fn get<K: QueryKey>(&self, key: &K) -> Option<K::Value> {
        self.entry(key).into_value()
    }

    pub fn entry<K: QueryKey>(&self, key: &K) -> CacheEntry<K::Value> {
        let cache_key = key.cache_key();
        let entries = self.read();
        match entries.get(&cache_key) {
            None => CacheEntry::Absent,
            Some(slot) => match Self::downcast::<K>(&cache_key, slot) {
                None => CacheEntry::Absent,
                Some(value) if slot.stale => CacheEntry::Stale(value),
                Some(value) => CacheEntry::Fresh(value),
            },
        }
    }

    /// Overwrite the entry and notify observers before returning.
    pub fn set<K: QueryKey>(&self, key: &K, value: K::Value) {
        let cache_key = key.cache_key();
        self.write().insert(
            cache_key.clone(),
            Slot {
                value: Arc::new(value),
                stale: false,
                updated_at: Utc::now(),
            },
        );
        debug!(key = %cache_key, "Cache entry set");
        self.publish(cache_key, CacheEventKind::Updated);
    }

    /// Mark the entry stale so observers refetch it. Performs no I/O.
    /// Returns false if there was nothing to invalidate.
    pub fn invalidate<K: QueryKey>(&self, key: &K) -> bool {
        self.invalidate_key(&key.cache_key())
    }

    pub fn invalidate_key(&self, key: &CacheKey) -> bool {
        let found = match self.write().get_mut(key) {
            Some(slot) => {
                slot.stale = true;
                true
            }
            None => false,
        };
        if found {
            debug!(key = %key, "Cache entry invalidated");
            self.publish(key.clone(), CacheEventKind::Invalidated);
        }
        found
    }

    /// Mark every entry under `prefix` stale. Returns how many were marked.
    pub fn invalidate_prefix(&self, prefix: &CacheKey) -> usize {
        let invalidated: Vec<CacheKey> = {
            let mut entries = self.write();
            entries
                .iter_mut()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(key, slot)| {
                    slot.stale = true;
                    key.clone()
                })
                .collect()
        };
        debug!(prefix = %prefix, count = invalidated.len(), "Cache prefix invalidated");
        let count = invalidated.len();
        for key in invalidated {
            self.publish(key, CacheEventKind::Invalidated);
        }
        count
    }

    pub fn updated_at(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        self.read().get(key).map(|slot| slot.updated_at)
    }

    pub fn is_stale(&self, key: &CacheKey) -> Option<bool> {
        self.read().get(key).map(|slot| slot.stale)
    }

    /// Every populated key, sorted.
    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }
}
