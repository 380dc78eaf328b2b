//! Redis cache backend for multi-instance deployments.
//!
//! Every instance talking to the same Redis shares both the cached entries and
//! the get-or-lock mutexes.

use async_trait::async_trait;
use deadpool_redis::{Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    Cache, CacheError, CacheItem, CacheLock, CacheResult, CachedValue, LockRelease, RedisConfig,
    lock_key,
};

/// Deletes the lock only if it still carries our token.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Writes `KEYS[2..]` only if `KEYS[1]` still holds the owner token in
/// `ARGV[1]`. Each key takes a value and a `PX` expiry from `ARGV`, in order.
const GUARDED_SET_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) ~= ARGV[1] then
    return 0
end
for i = 2, #KEYS do
    redis.call("SET", KEYS[i], ARGV[2 * i - 2], "PX", ARGV[2 * i - 1])
end
return 1
"#;

/// Shared cache backed by a deadpool Redis pool.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
    release_script: Arc<redis::Script>,
    guarded_set_script: Arc<redis::Script>,
}

impl RedisCache {
    /// Build a pool from configuration and verify the server answers.
    pub async fn connect(config: &RedisConfig) -> CacheResult<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);

        let mut redis_config = deadpool_redis::Config::from_url(&config.url);
        let mut pool_config = PoolConfig::new(config.pool_size);
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::connection(e.to_string()))?;

        let cache = Self::from_pool(pool);
        cache.ping().await?;
        Ok(cache)
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: Pool) -> Self {
        Self {
            pool,
            release_script: Arc::new(redis::Script::new(RELEASE_SCRIPT)),
            guarded_set_script: Arc::new(redis::Script::new(GUARDED_SET_SCRIPT)),
        }
    }

    /// Check that Redis answers (for health checks).
    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Millisecond expiry for `PX`, never zero.
fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl Cache for RedisCache {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<CachedValue>> {
        let mut conn = self.pool.get().await?;
        let data: Option<Vec<u8>> = conn.get(key).await?;
        match &data {
            Some(_) => tracing::debug!(key = %key, "cache hit (redis)"),
            None => tracing::debug!(key = %key, "cache miss (redis)"),
        }
        Ok(data.map(CachedValue::from_bytes))
    }

    async fn try_lock(&self, key: &str, ttl: Duration) -> CacheResult<Option<CacheLock>> {
        let lock_key = lock_key(key);
        let token = CacheLock::new_token();

        let mut conn = self.pool.get().await?;
        let acquired: Option<String> = redis::cmd("SET")
            .arg(&lock_key)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;

        if acquired.is_some() {
            tracing::debug!(lock_key = %lock_key, "cache lock acquired (redis)");
            let releaser: Arc<dyn LockRelease> = Arc::new(self.clone());
            Ok(Some(CacheLock::new(lock_key, token, releaser)))
        } else {
            tracing::debug!(lock_key = %lock_key, "cache lock busy (redis)");
            Ok(None)
        }
    }

    async fn set(&self, item: &CacheItem) -> CacheResult<()> {
        let mut conn = self.pool.get().await?;
        let _: () = redis::cmd("SET")
            .arg(&item.key)
            .arg(item.value.as_slice())
            .arg("PX")
            .arg(ttl_millis(item.ttl))
            .query_async(&mut conn)
            .await?;
        tracing::debug!(key = %item.key, ttl_ms = ttl_millis(item.ttl), "cache set (redis)");
        Ok(())
    }

    async fn set_multi(&self, items: &[CacheItem]) -> CacheResult<()> {
        if items.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for item in items {
            pipe.cmd("SET")
                .arg(&item.key)
                .arg(item.value.as_slice())
                .arg("PX")
                .arg(ttl_millis(item.ttl))
                .ignore();
        }

        let mut conn = self.pool.get().await?;
        let _: () = pipe.query_async(&mut conn).await?;
        tracing::debug!(items = items.len(), "cache set_multi (redis)");
        Ok(())
    }

    async fn set_if_locked(&self, lock: &CacheLock, items: &[CacheItem]) -> CacheResult<bool> {
        let mut invocation = self.guarded_set_script.key(lock.lock_key());
        invocation.arg(lock.token());
        for item in items {
            invocation
                .key(&item.key)
                .arg(item.value.as_slice())
                .arg(ttl_millis(item.ttl));
        }

        let mut conn = self.pool.get().await?;
        let written: i64 = invocation.invoke_async(&mut conn).await?;
        if written == 1 {
            tracing::debug!(lock_key = %lock.lock_key(), items = items.len(), "cache set under lock (redis)");
            Ok(true)
        } else {
            tracing::debug!(lock_key = %lock.lock_key(), "cache lock lost, write skipped (redis)");
            Ok(false)
        }
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let locks: Vec<String> = keys.iter().map(|key| lock_key(key)).collect();

        let mut pipe = redis::pipe();
        pipe.atomic().del(keys).del(&locks).ignore();

        let mut conn = self.pool.get().await?;
        let (removed,): (u64,) = pipe.query_async(&mut conn).await?;
        tracing::debug!(keys = keys.len(), removed, "cache delete (redis)");
        Ok(removed)
    }
}

#[async_trait]
impl LockRelease for RedisCache {
    async fn release(&self, lock_key: &str, token: &str) -> CacheResult<()> {
        let mut conn = self.pool.get().await?;
        let _: i64 = self
            .release_script
            .key(lock_key)
            .arg(token)
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }
}
