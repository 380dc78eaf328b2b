//! In-process cache backend (DashMap).
//!
//! Suitable for single-instance deployments and tests. Locks are process-local,
//! so the get-or-lock guarantee only holds among tasks sharing this instance.
//!
//! The map is bounded: once `max_entries` is reached an insert first sweeps
//! expired entries, and skips new keys if the map is still full. A background
//! task started with [`LocalCache::spawn_purge`] sweeps periodically as well.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::{
    Cache, CacheConfig, CacheItem, CacheLock, CacheResult, CachedValue, LockRelease, lock_key,
};

/// A cached entry with TTL support.
///
/// The data is wrapped in `Arc` so hits clone a pointer rather than the payload.
#[derive(Clone, Debug)]
struct CachedEntry {
    data: Arc<Vec<u8>>,
    cached_at: Instant,
    ttl: Duration,
}

impl CachedEntry {
    fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.cached_at.elapsed() >= self.ttl
    }
}

#[derive(Debug)]
struct LockEntry {
    token: String,
    expires_at: Instant,
}

struct Inner {
    entries: DashMap<String, CachedEntry>,
    locks: DashMap<String, LockEntry>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Local cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently stored (expired entries not yet swept included).
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Expired entries removed by sweeps.
    pub evictions: u64,
}

/// DashMap-backed cache with per-key TTL and in-process mutexes.
#[derive(Clone)]
pub struct LocalCache {
    inner: Arc<Inner>,
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::with_max_entries(CacheConfig::default().max_entries)
    }
}

impl LocalCache {
    /// Create an empty local cache with the default size bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty local cache holding at most `max_entries` entries.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                locks: DashMap::new(),
                max_entries: max_entries.max(1),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
            }),
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.inner.entries.len(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            evictions: self.inner.evictions.load(Ordering::Relaxed),
        }
    }

    /// Returns `true` if a live (unexpired) entry exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Returns `true` if the mutex for `key` is currently held.
    pub fn is_locked(&self, key: &str) -> bool {
        self.inner
            .locks
            .get(&lock_key(key))
            .is_some_and(|entry| entry.expires_at > Instant::now())
    }

    /// Remove every expired entry and lock. Returns how many entries were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.entries.len();
        self.inner.entries.retain(|_, entry| !entry.is_expired());
        self.inner.locks.retain(|_, entry| entry.expires_at > now);

        let removed = before.saturating_sub(self.inner.entries.len());
        self.inner
            .evictions
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Sweep expired entries every `every` until the cache is dropped.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_purge(&self, every: Duration) -> JoinHandle<()> {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let every = every.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let removed = LocalCache { inner }.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired cache entries (local)");
                }
            }
        })
    }

    /// Whether `item` may be stored. Sweeps once the map is full; a key that
    /// is already present can always be overwritten.
    fn admit(&self, item: &CacheItem) -> bool {
        let inner = &self.inner;
        if inner.entries.len() < inner.max_entries || inner.entries.contains_key(&item.key) {
            return true;
        }

        self.purge_expired();
        if inner.entries.len() < inner.max_entries {
            return true;
        }

        tracing::warn!(
            max_entries = inner.max_entries,
            key = %item.key,
            "local cache at capacity, skipping insertion"
        );
        false
    }

    fn insert(&self, item: &CacheItem) {
        self.inner.entries.insert(
            item.key.clone(),
            CachedEntry::new(item.value.clone(), item.ttl),
        );
    }
}

#[async_trait]
impl Cache for LocalCache {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<CachedValue>> {
        let found = match self.inner.entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(Arc::clone(&entry.data)),
            Some(entry) => {
                drop(entry);
                self.inner.entries.remove_if(key, |_, e| e.is_expired());
                None
            }
            None => None,
        };

        match found {
            Some(data) => {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "cache hit (local)");
                Ok(Some(CachedValue::from_bytes(data.as_ref().clone())))
            }
            None => {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "cache miss (local)");
                Ok(None)
            }
        }
    }

    async fn try_lock(&self, key: &str, ttl: Duration) -> CacheResult<Option<CacheLock>> {
        let lock_key = lock_key(key);
        let token = CacheLock::new_token();
        let now = Instant::now();

        let acquired = match self.inner.locks.entry(lock_key.clone()) {
            Entry::Occupied(mut held) => {
                if held.get().expires_at <= now {
                    held.insert(LockEntry {
                        token: token.clone(),
                        expires_at: now + ttl,
                    });
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(LockEntry {
                    token: token.clone(),
                    expires_at: now + ttl,
                });
                true
            }
        };

        if acquired {
            tracing::debug!(lock_key = %lock_key, "cache lock acquired (local)");
            let releaser: Arc<dyn LockRelease> = Arc::new(self.clone());
            Ok(Some(CacheLock::new(lock_key, token, releaser)))
        } else {
            tracing::debug!(lock_key = %lock_key, "cache lock busy (local)");
            Ok(None)
        }
    }

    async fn set(&self, item: &CacheItem) -> CacheResult<()> {
        if self.admit(item) {
            self.insert(item);
            tracing::debug!(key = %item.key, ttl_ms = item.ttl.as_millis() as u64, "cache set (local)");
        }
        Ok(())
    }

    async fn set_multi(&self, items: &[CacheItem]) -> CacheResult<()> {
        for item in items {
            self.set(item).await?;
        }
        Ok(())
    }

    async fn set_if_locked(&self, lock: &CacheLock, items: &[CacheItem]) -> CacheResult<bool> {
        // Sweeping takes the lock map, so admission runs before the guard below.
        let admitted: Vec<&CacheItem> = items.iter().filter(|item| self.admit(item)).collect();

        // Holding the lock entry keeps `delete` from revoking it mid-write.
        let Some(held) = self.inner.locks.get(lock.lock_key()) else {
            tracing::debug!(lock_key = %lock.lock_key(), "cache lock gone, write skipped (local)");
            return Ok(false);
        };
        if held.token != lock.token() || held.expires_at <= Instant::now() {
            tracing::debug!(lock_key = %lock.lock_key(), "cache lock lost, write skipped (local)");
            return Ok(false);
        }

        for item in admitted {
            self.insert(item);
        }
        tracing::debug!(lock_key = %lock.lock_key(), items = items.len(), "cache set under lock (local)");
        Ok(true)
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        // Locks go first: a holder that already passed its ownership check
        // finishes writing before the entries below are removed.
        for key in keys {
            self.inner.locks.remove(&lock_key(key));
        }
        let removed = keys
            .iter()
            .filter_map(|key| self.inner.entries.remove(key))
            .filter(|(_, entry)| !entry.is_expired())
            .count() as u64;
        tracing::debug!(keys = keys.len(), removed, "cache delete (local)");
        Ok(removed)
    }
}

#[async_trait]
impl LockRelease for LocalCache {
    async fn release(&self, lock_key: &str, token: &str) -> CacheResult<()> {
        self.inner
            .locks
            .remove_if(lock_key, |_, entry| entry.token == token);
        Ok(())
    }
}
