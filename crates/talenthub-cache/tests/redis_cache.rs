//! Integration tests for the Redis backend.
//!
//! Tests use testcontainers to spin up a real Redis instance.

use std::sync::Arc;
use std::time::Duration;
use talenthub_cache::{
    Cache, CacheConfig, CacheItem, CacheManager, CachedValue, Lookup, RedisCache, RedisConfig,
    create_cache, release,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{}", host_port);

            (container, url)
        })
        .await;

    url.clone()
}

async fn redis_config() -> RedisConfig {
    RedisConfig {
        enabled: true,
        url: get_redis_url().await,
        pool_size: 5,
        timeout_ms: 5000,
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_create_cache_selects_redis() {
    let config = CacheConfig {
        redis: redis_config().await,
        ..CacheConfig::default()
    };

    let cache = create_cache(&config).await;
    assert_eq!(cache.backend_name(), "redis");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_set_get_and_nil_marker() {
    let cache = RedisCache::connect(&redis_config().await).await.unwrap();

    cache
        .set_multi(&[
            CacheItem::new("it:value", b"{\"a\":1}".to_vec(), Duration::from_secs(60)),
            CacheItem::nil("it:nil", Duration::from_secs(60)),
        ])
        .await
        .unwrap();

    assert_eq!(
        cache.get("it:value").await.unwrap(),
        Some(CachedValue::Value(b"{\"a\":1}".to_vec()))
    );
    assert_eq!(cache.get("it:nil").await.unwrap(), Some(CachedValue::Nil));
    assert_eq!(cache.get("it:unknown").await.unwrap(), None);

    let removed = cache
        .delete(&["it:value".to_string(), "it:nil".to_string(), "it:unknown".to_string()])
        .await
        .unwrap();
    assert_eq!(removed, 2);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_entries_expire() {
    let cache = RedisCache::connect(&redis_config().await).await.unwrap();
    cache
        .set(&CacheItem::new("it:short", b"1".to_vec(), Duration::from_millis(100)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(cache.get("it:short").await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_lock_shared_between_instances() {
    let config = redis_config().await;
    let first = RedisCache::connect(&config).await.unwrap();
    let second = RedisCache::connect(&config).await.unwrap();

    let lock = first
        .try_lock("it:locked", Duration::from_secs(5))
        .await
        .unwrap()
        .expect("first instance gets the lock");
    assert!(second.try_lock("it:locked", Duration::from_secs(5)).await.unwrap().is_none());

    lock.release().await;
    let again = second
        .try_lock("it:locked", Duration::from_secs(5))
        .await
        .unwrap();
    assert!(again.is_some());
    release(again).await;
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_stale_holder_cannot_release_new_lock() {
    let cache = RedisCache::connect(&redis_config().await).await.unwrap();

    let stale = cache
        .try_lock("it:stale", Duration::from_millis(50))
        .await
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let fresh = cache
        .try_lock("it:stale", Duration::from_secs(5))
        .await
        .unwrap()
        .expect("expired lock can be re-acquired");

    stale.release().await;
    assert!(cache.try_lock("it:stale", Duration::from_secs(5)).await.unwrap().is_none());

    fresh.release().await;
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_get_or_lock_across_managers() {
    let config = redis_config().await;
    let a = CacheManager::new(
        Arc::new(RedisCache::connect(&config).await.unwrap()),
        &CacheConfig::default(),
    );
    let b = CacheManager::new(
        Arc::new(RedisCache::connect(&config).await.unwrap()),
        &CacheConfig::default(),
    );

    let lookup = a.get_or_lock("it:shared").await;
    assert!(matches!(lookup, Lookup::Miss(_)));
    assert!(matches!(b.get_or_lock("it:shared").await, Lookup::Busy));

    let lock = lookup.into_lock().expect("lock");
    assert!(
        a.store_under_lock(
            &lock,
            vec![CacheItem::new("it:shared", b"1".to_vec(), Duration::from_secs(60))]
        )
        .await
    );
    release(Some(lock)).await;

    assert!(matches!(b.get_or_lock("it:shared").await, Lookup::Hit(_)));
    b.delete_by_keys(&["it:shared".to_string()]).await.unwrap();
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_delete_revokes_pending_write_back() {
    let cache = RedisCache::connect(&redis_config().await).await.unwrap();
    let item = CacheItem::new("it:guarded", b"stale".to_vec(), Duration::from_secs(60));

    let lock = cache
        .try_lock("it:guarded", Duration::from_secs(5))
        .await
        .unwrap()
        .expect("lock");
    cache.delete(&["it:guarded".to_string()]).await.unwrap();

    assert!(!cache.set_if_locked(&lock, std::slice::from_ref(&item)).await.unwrap());
    assert_eq!(cache.get("it:guarded").await.unwrap(), None);

    let fresh = cache
        .try_lock("it:guarded", Duration::from_secs(5))
        .await
        .unwrap()
        .expect("delete freed the mutex");
    assert!(!cache.set_if_locked(&lock, std::slice::from_ref(&item)).await.unwrap());
    assert!(
        cache
            .set_if_locked(&fresh, &[item, CacheItem::nil("it:guarded:nil", Duration::from_secs(60))])
            .await
            .unwrap()
    );
    assert_eq!(
        cache.get("it:guarded").await.unwrap(),
        Some(CachedValue::Value(b"stale".to_vec()))
    );
    assert_eq!(cache.get("it:guarded:nil").await.unwrap(), Some(CachedValue::Nil));

    release(Some(fresh)).await;
    lock.release().await;
    cache
        .delete(&["it:guarded".to_string(), "it:guarded:nil".to_string()])
        .await
        .unwrap();
}
