//! Get-or-lock protocol and degraded-mode handling over a [`Cache`] backend.

use std::sync::Arc;
use std::time::Duration;

use crate::{Cache, CacheConfig, CacheItem, CacheLock, CacheResult, CachedValue, NoOpCache};

/// Smallest TTL worth writing. Anything shorter would be expired on arrival.
const MIN_TTL: Duration = Duration::from_millis(1);

/// Outcome of [`CacheManager::get_or_lock`].
#[derive(Debug)]
pub enum Lookup {
    /// A payload is cached. No lock is held; do not repopulate.
    Hit(Vec<u8>),
    /// The key is known to have no record. Report "not found" without a store query.
    Nil,
    /// Miss, and this caller owns the key's mutex. Compute, store under the
    /// lock, release.
    Miss(CacheLock),
    /// Miss, and someone else is computing. Go to the store, do not write back.
    Busy,
    /// Caching is disabled or the backend failed. Go to the store, do not
    /// write back.
    Bypass,
}

impl Lookup {
    /// Take the lock out of a `Miss`.
    pub fn into_lock(self) -> Option<CacheLock> {
        match self {
            Lookup::Miss(lock) => Some(lock),
            _ => None,
        }
    }
}

/// Cache surface used by repositories.
///
/// Lookups never fail: backend errors are logged at `warn` and reported as
/// [`Lookup::Bypass`] or `None`. Writes come in two flavours, "without
/// blocking" (errors swallowed) and plain (errors returned for the caller to
/// judge).
#[derive(Clone)]
pub struct CacheManager {
    backend: Arc<dyn Cache>,
    enabled: bool,
    default_ttl: Duration,
    nil_ttl: Duration,
    lock_ttl: Duration,
    lock_timeout: Duration,
}

impl CacheManager {
    /// Wrap a backend using the TTLs and timeouts from `config`.
    pub fn new(backend: Arc<dyn Cache>, config: &CacheConfig) -> Self {
        Self {
            backend,
            enabled: config.enabled,
            default_ttl: config.default_ttl,
            nil_ttl: config.nil_ttl,
            lock_ttl: config.lock_ttl,
            lock_timeout: config.lock_timeout,
        }
    }

    /// A manager that never caches.
    pub fn disabled() -> Self {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        Self::new(Arc::new(NoOpCache), &config)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn backend_name(&self) -> &'static str {
        if self.enabled {
            self.backend.backend_name()
        } else {
            "disabled"
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn nil_ttl(&self) -> Duration {
        self.nil_ttl
    }

    /// Plain read. Errors and disabled caching read as `None`.
    pub async fn get(&self, key: &str) -> Option<CachedValue> {
        if !self.enabled {
            return None;
        }
        match self.backend.get(key).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, backend = self.backend.backend_name(), "cache get failed, treating as miss");
                None
            }
        }
    }

    /// Read `key`; on a miss try (once, without waiting) to take its mutex.
    pub async fn get_or_lock(&self, key: &str) -> Lookup {
        if !self.enabled {
            return Lookup::Bypass;
        }

        match self.backend.get(key).await {
            Ok(Some(CachedValue::Value(data))) => return Lookup::Hit(data),
            Ok(Some(CachedValue::Nil)) => return Lookup::Nil,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache get failed, bypassing cache");
                return Lookup::Bypass;
            }
        }

        let attempt = self.backend.try_lock(key, self.lock_ttl);
        let lock = match tokio::time::timeout(self.lock_timeout, attempt).await {
            Ok(Ok(Some(lock))) => lock,
            Ok(Ok(None)) => return Lookup::Busy,
            Ok(Err(e)) => {
                tracing::warn!(key = %key, error = %e, "cache lock failed, bypassing cache");
                return Lookup::Bypass;
            }
            Err(_) => {
                tracing::warn!(key = %key, timeout_ms = self.lock_timeout.as_millis() as u64, "cache lock timed out, bypassing cache");
                return Lookup::Bypass;
            }
        };

        // Another holder may have populated the key between our read and the lock.
        match self.backend.get(key).await {
            Ok(Some(CachedValue::Value(data))) => {
                lock.release().await;
                Lookup::Hit(data)
            }
            Ok(Some(CachedValue::Nil)) => {
                lock.release().await;
                Lookup::Nil
            }
            Ok(None) => Lookup::Miss(lock),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache re-check failed after lock");
                Lookup::Miss(lock)
            }
        }
    }

    /// Write one item; failures are logged and swallowed.
    pub async fn store_without_blocking(&self, item: CacheItem) {
        self.store_multi_without_blocking(vec![item]).await;
    }

    /// Write several items in one backend call; failures are logged and swallowed.
    ///
    /// Items whose TTL is already used up are skipped.
    pub async fn store_multi_without_blocking(&self, items: Vec<CacheItem>) {
        if !self.enabled {
            return;
        }

        let items = live_items(items);
        let result = match items.as_slice() {
            [] => return,
            [item] => self.backend.set(item).await,
            many => self.backend.set_multi(many).await,
        };

        if let Err(e) = result {
            tracing::warn!(items = items.len(), error = %e, "cache store failed");
        }
    }

    /// Write back what a [`Lookup::Miss`] holder loaded.
    ///
    /// Nothing is written once `lock` no longer owns the key's mutex, which is
    /// the case after [`CacheManager::delete_by_keys`] invalidated the key.
    /// Returns whether the items were written; failures are logged.
    pub async fn store_under_lock(&self, lock: &CacheLock, items: Vec<CacheItem>) -> bool {
        if !self.enabled {
            return false;
        }

        let items = live_items(items);
        if items.is_empty() {
            return false;
        }

        match self.backend.set_if_locked(lock, &items).await {
            Ok(written) => written,
            Err(e) => {
                tracing::warn!(lock_key = %lock.lock_key(), items = items.len(), error = %e, "cache store under lock failed");
                false
            }
        }
    }

    /// Record, under the key's mutex, that `key` has no record in the store.
    ///
    /// Returns `Ok(false)` if the mutex was lost and the marker not written.
    pub async fn store_nil(&self, lock: &CacheLock, key: &str) -> CacheResult<bool> {
        if !self.enabled {
            return Ok(false);
        }
        self.backend
            .set_if_locked(lock, &[CacheItem::nil(key, self.nil_ttl)])
            .await
    }

    /// Delete keys (payloads and nil markers alike) and their mutexes.
    pub async fn delete_by_keys(&self, keys: &[String]) -> CacheResult<()> {
        if !self.enabled || keys.is_empty() {
            return Ok(());
        }
        let removed = self.backend.delete(keys).await?;
        tracing::debug!(keys = keys.len(), removed, "cache keys invalidated");
        Ok(())
    }
}

/// Drop items whose TTL is already used up.
fn live_items(items: Vec<CacheItem>) -> Vec<CacheItem> {
    items
        .into_iter()
        .filter(|item| {
            let keep = item.ttl >= MIN_TTL;
            if !keep {
                tracing::debug!(key = %item.key, "skipping cache write with elapsed ttl");
            }
            keep
        })
        .collect()
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("backend", &self.backend_name())
            .field("nil_ttl", &self.nil_ttl)
            .field("lock_ttl", &self.lock_ttl)
            .field("lock_timeout", &self.lock_timeout)
            .finish()
    }
}
