//! Cache abstraction for the Talenthub session store.
//!
//! ## Architecture
//!
//! - **[`Cache`]**: backend trait (get / lock / set / delete with per-key TTL)
//! - **[`LocalCache`]**: in-memory DashMap backend, single instance
//! - **[`RedisCache`]**: shared backend across instances
//! - **[`CacheManager`]**: the surface consumed by repositories. Wraps a backend
//!   with the get-or-lock protocol, the nil marker and the global disable switch.
//!
//! ## Get-or-lock
//!
//! ```text
//! get_or_lock(key) ─┬─ value cached ───────────────→ Hit(bytes)
//!                   ├─ nil marker cached ──────────→ Nil
//!                   ├─ miss, lock acquired ────────→ Miss(lock)  caller recomputes
//!                   ├─ miss, lock held elsewhere ──→ Busy        caller falls back
//!                   └─ disabled / transport error ─→ Bypass      caller falls back
//! ```
//!
//! ## Graceful Degradation
//!
//! Transport errors never reach the caller of [`CacheManager`]. They are logged
//! and turned into misses, so the relational store stays the only thing that
//! can fail a request.

pub mod backend;
pub mod config;
pub mod error;
pub mod item;
pub mod local;
pub mod lock;
pub mod manager;
pub mod redis;

pub use backend::{Cache, NoOpCache};
pub use config::{CacheConfig, RedisConfig};
pub use error::{CacheError, CacheResult};
pub use item::{CacheItem, CachedValue};
pub use local::{CacheStats, LocalCache};
pub use lock::{CacheLock, LockRelease, lock_key, release};
pub use manager::{CacheManager, Lookup};
pub use redis::RedisCache;

/// Create a cache manager based on configuration.
///
/// ## Cache Modes
///
/// - **Caching disabled**: every lookup bypasses the cache
/// - **Redis disabled**: local-only cache (DashMap)
/// - **Redis enabled**: connects to Redis, falls back to local on failure
///
/// A local cache is bounded by `max_entries` and swept every
/// `purge_interval` by a background task that ends when the cache is dropped.
pub async fn create_cache(config: &CacheConfig) -> CacheManager {
    use std::sync::Arc;

    if !config.enabled {
        tracing::info!("caching disabled, every lookup goes to the store");
        return CacheManager::disabled();
    }

    if !config.redis.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return CacheManager::new(Arc::new(local_cache(config)), config);
    }

    tracing::info!(url = %config.redis.url, "connecting to Redis");

    match RedisCache::connect(&config.redis).await {
        Ok(redis) => {
            tracing::info!("connected to Redis");
            CacheManager::new(Arc::new(redis), config)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "failed to connect to Redis, falling back to local cache"
            );
            CacheManager::new(Arc::new(local_cache(config)), config)
        }
    }
}

fn local_cache(config: &CacheConfig) -> LocalCache {
    let cache = LocalCache::with_max_entries(config.max_entries);
    cache.spawn_purge(config.purge_interval);
    tracing::debug!(
        max_entries = config.max_entries,
        purge_interval_ms = config.purge_interval.as_millis() as u64,
        "local cache configured"
    );
    cache
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_cache_disabled() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let cache = create_cache(&config).await;
        assert!(!cache.is_enabled());
        assert_eq!(cache.backend_name(), "disabled");
    }

    #[tokio::test]
    async fn test_create_cache_local_when_redis_disabled() {
        let cache = create_cache(&CacheConfig::default()).await;
        assert!(cache.is_enabled());
        assert_eq!(cache.backend_name(), "local");
    }

    #[tokio::test]
    async fn test_create_cache_falls_back_to_local() {
        let mut config = CacheConfig::default();
        config.redis.enabled = true;
        config.redis.url = "redis://127.0.0.1:1".to_string();
        config.redis.timeout_ms = 200;

        let cache = create_cache(&config).await;
        assert_eq!(cache.backend_name(), "local");
    }
}
