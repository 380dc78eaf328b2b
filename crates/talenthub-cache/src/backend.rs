//! Backend trait implemented by every cache store.

use async_trait::async_trait;
use std::time::Duration;

use crate::{CacheItem, CacheLock, CacheResult, CachedValue};

/// Key/value cache with per-key TTL and a non-blocking per-key mutex.
///
/// Implementations must be safe to share across tasks. They report transport
/// problems as errors; deciding what to do about them is the job of
/// [`crate::CacheManager`].
#[async_trait]
pub trait Cache: Send + Sync {
    /// Backend name (for logging).
    fn backend_name(&self) -> &'static str;

    /// Read a key. `None` means the key is not cached at all.
    async fn get(&self, key: &str) -> CacheResult<Option<CachedValue>>;

    /// Try to acquire the mutex guarding `key`.
    ///
    /// Returns immediately: `Some(lock)` if acquired, `None` if another caller
    /// holds it. The mutex expires after `ttl` even if never released.
    async fn try_lock(&self, key: &str, ttl: Duration) -> CacheResult<Option<CacheLock>>;

    /// Write a single item.
    async fn set(&self, item: &CacheItem) -> CacheResult<()>;

    /// Write several items in one round trip.
    async fn set_multi(&self, items: &[CacheItem]) -> CacheResult<()>;

    /// Write items only while `lock` still owns its mutex.
    ///
    /// The ownership check and the write are atomic. Returns `false` and
    /// writes nothing once the lock has expired, been taken over, or been
    /// removed by [`Cache::delete`].
    async fn set_if_locked(&self, lock: &CacheLock, items: &[CacheItem]) -> CacheResult<bool>;

    /// Delete keys together with their mutexes. Returns how many keys existed.
    ///
    /// Dropping the mutex revokes any in-flight recomputation of the key, so
    /// a value loaded before the delete can no longer be written back.
    async fn delete(&self, keys: &[String]) -> CacheResult<u64>;
}

/// Backend used when caching is disabled. Stores nothing, grants no locks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCache;

#[async_trait]
impl Cache for NoOpCache {
    fn backend_name(&self) -> &'static str {
        "disabled"
    }

    async fn get(&self, _key: &str) -> CacheResult<Option<CachedValue>> {
        Ok(None)
    }

    async fn try_lock(&self, _key: &str, _ttl: Duration) -> CacheResult<Option<CacheLock>> {
        Ok(None)
    }

    async fn set(&self, _item: &CacheItem) -> CacheResult<()> {
        Ok(())
    }

    async fn set_multi(&self, _items: &[CacheItem]) -> CacheResult<()> {
        Ok(())
    }

    async fn set_if_locked(&self, _lock: &CacheLock, _items: &[CacheItem]) -> CacheResult<bool> {
        Ok(false)
    }

    async fn delete(&self, _keys: &[String]) -> CacheResult<u64> {
        Ok(0)
    }
}
