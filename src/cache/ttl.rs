//! Process-local TTL cache for identification results.
//!
//! Entries expire `ttl` after they were written. There is no size bound and no LRU: stale
//! entries are dropped lazily by [`TtlCache::get`] and in bulk by [`TtlCache::purge_expired`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use tokio::time;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::types::CacheEntry;
use crate::model::ResponseEnvelope;

pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    /// Creates a cache on the wall clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Creates a cache with an explicit time source.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
        }
    }

    /// Returns the value for `key` unless it is missing or stale. Stale entries are evicted.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now, self.ttl) => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write();
        // Re-check under the write lock; a concurrent set may have refreshed the entry.
        match entries.get(key) {
            Some(entry) if entry.is_expired(now, self.ttl) => {
                entries.remove(key);
                debug!(key, "evicted expired cache entry");
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Stores `value` under `key`, overwriting any previous entry and stamping the current time.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
        };
        self.entries.write().insert(key.into(), entry);
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.write().remove(key).map(|e| e.value)
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Drops every stale entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, ttl));
        before - entries.len()
    }

    #[inline]
    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Current time according to the cache clock.
    #[inline]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.entries.read().len())
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}

/// Shared handle to a [`TtlCache`].
pub struct TtlCacheHandle<V> {
    inner: Arc<TtlCache<V>>,
    reaper_running: Arc<AtomicBool>,
}

impl<V> Clone for TtlCacheHandle<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            reaper_running: Arc::clone(&self.reaper_running),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> TtlCacheHandle<V> {
    #[inline]
    pub fn new(ttl: Duration) -> Self {
        Self::from_cache(TtlCache::new(ttl))
    }

    #[inline]
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self::from_cache(TtlCache::with_clock(ttl, clock))
    }

    pub fn from_cache(cache: TtlCache<V>) -> Self {
        Self {
            inner: Arc::new(cache),
            reaper_running: Arc::new(AtomicBool::new(false)),
        }
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key)
    }

    #[inline]
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.inner.set(key, value)
    }

    #[inline]
    pub fn remove(&self, key: &str) -> Option<V> {
        self.inner.remove(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn clear(&self) {
        self.inner.clear();
    }

    #[inline]
    pub fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }

    #[inline]
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.now()
    }

    /// Returns the number of strong references to the underlying cache.
    #[inline]
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Starts a background task that purges stale entries every `every` (no-op if already running).
    pub fn start_purge_task(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        if self.reaper_running.swap(true, Ordering::AcqRel) {
            return tokio::spawn(async {});
        }

        let cache = Arc::downgrade(&self.inner);
        let reaper_running = Arc::clone(&self.reaper_running);

        tokio::spawn(async move {
            let mut interval = time::interval(every);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let purged = cache.purge_expired();
                if purged > 0 {
                    debug!(purged, remaining = cache.len(), "purged expired cache entries");
                }
            }
            reaper_running.store(false, Ordering::Release);
        })
    }
}

impl<V> std::fmt::Debug for TtlCacheHandle<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCacheHandle")
            .field("strong_count", &Arc::strong_count(&self.inner))
            .finish()
    }
}

/// The result cache used by the pipeline: envelopes keyed by `imghash:<image_id>`.
pub type ResultCache = TtlCacheHandle<ResponseEnvelope>;
