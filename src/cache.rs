use std::{
    collections::HashMap,
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
    time::SystemTime,
};
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// The entry for this key is stale and the next read goes to the source.
    Invalidated(String),
    /// A fresh value was fetched and stored for this key.
    Refreshed(String),
}

struct CacheEntry<T> {
    value: T,
    fetched_at: SystemTime,
    stale: bool,
}

/// Keyed read cache for values fetched from the backend.
///
/// Values are never edited in place: writers call [`QueryCache::invalidate`]
/// and the next [`QueryCache::get_or_fetch`] goes back to the source.
/// Subscribers are told about every invalidation and refresh.
pub struct QueryCache<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    events: broadcast::Sender<CacheEvent>,
    generation: AtomicU64,
}

impl<T: Clone + Send + Sync> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> QueryCache<T> {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            events,
            generation: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Number of invalidations since the cache was created.
    pub fn invalidation_count(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn is_fresh(&self, key: &str) -> bool {
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|entry| !entry.stale)
    }

    pub async fn fetched_at(&self, key: &str) -> Option<SystemTime> {
        self.entries.read().await.get(key).map(|e| e.fetched_at)
    }

    /// Returns the cached value when fresh, otherwise runs `fetch` and stores
    /// the result. A value whose fetch raced with an invalidation is returned
    /// but kept stale.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(key)
                && !entry.stale
            {
                debug!("Cache hit for '{}'", key);
                return Ok(entry.value.clone());
            }
        }

        debug!("Cache miss for '{}', fetching", key);
        let started_at = self.generation.load(Ordering::SeqCst);
        let value = fetch().await?;
        let stale = self.generation.load(Ordering::SeqCst) != started_at;

        self.entries.write().await.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                fetched_at: SystemTime::now(),
                stale,
            },
        );

        if !stale {
            // No receivers is fine
            let _ = self.events.send(CacheEvent::Refreshed(key.to_string()));
        }

        Ok(value)
    }

    /// Marks `key` stale and notifies subscribers. Returns whether a cached
    /// value existed.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let existed = match self.entries.write().await.get_mut(key) {
            Some(entry) => {
                entry.stale = true;
                true
            }
            None => false,
        };

        debug!("Invalidated cache key '{}' (cached: {})", key, existed);
        let _ = self.events.send(CacheEvent::Invalidated(key.to_string()));
        existed
    }
}
