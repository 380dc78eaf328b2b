//! Cache-aside repositories over the storage traits.
//!
//! Reads go cache first. On a miss the caller that wins the key's mutex loads
//! from the store and repopulates, either with the record or with the nil
//! marker. Writes go to the store first and then invalidate, which also
//! revokes the mutex of any read still loading the old value. Cache problems
//! are logged and never fail an operation.

mod candidate;
mod session;

pub use candidate::CachedCandidateRepository;
pub use session::CachedSessionRepository;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use talenthub_cache::{CacheItem, CacheManager, Lookup, release};

use crate::AuthResult;

/// Encode `value` as a cache item, logging instead of failing.
pub(crate) fn json_item<T: Serialize + ?Sized>(
    key: String,
    value: &T,
    ttl: Duration,
) -> Option<CacheItem> {
    match CacheItem::json(key, value, ttl) {
        Ok(item) => Some(item),
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode cache entry");
            None
        }
    }
}

/// Cache-aside read of one key.
///
/// `load` runs only when the cache cannot answer. Only the caller holding the
/// key's mutex writes the result back (through `populate` for a record, as the
/// nil marker for `None`), and only while it still holds it: a write that
/// invalidated the key in the meantime also revoked the mutex, so a value
/// loaded before that write is never cached.
pub(crate) async fn read_through<T, L, P>(
    cache: &CacheManager,
    key: &str,
    load: L,
    populate: P,
) -> AuthResult<Option<T>>
where
    T: DeserializeOwned,
    L: Future<Output = AuthResult<Option<T>>>,
    P: FnOnce(&T) -> Vec<CacheItem>,
{
    let lookup = match cache.get_or_lock(key).await {
        Lookup::Hit(bytes) => match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => {
                tracing::debug!(key = %key, "cache hit");
                return Ok(Some(value));
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "undecodable cache entry, reloading from store");
                invalidate(cache, &[key.to_string()]).await;
                cache.get_or_lock(key).await
            }
        },
        other => other,
    };

    let lock = match lookup {
        Lookup::Hit(bytes) => match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => return Ok(Some(value)),
            Err(_) => None,
        },
        Lookup::Nil => {
            tracing::debug!(key = %key, "negative cache hit");
            return Ok(None);
        }
        Lookup::Miss(lock) => Some(lock),
        Lookup::Busy | Lookup::Bypass => None,
    };

    let loaded = match load.await {
        Ok(loaded) => loaded,
        Err(e) => {
            release(lock).await;
            return Err(e);
        }
    };

    if let Some(lock) = &lock {
        let written = match &loaded {
            Some(value) => cache.store_under_lock(lock, populate(value)).await,
            None => cache.store_nil(lock, key).await.unwrap_or_else(|e| {
                tracing::warn!(key = %key, error = %e, "failed to store nil marker");
                false
            }),
        };
        if written {
            tracing::debug!(key = %key, negative = loaded.is_none(), "cache populated");
        } else {
            tracing::debug!(key = %key, "cache write-back skipped");
        }
    }

    release(lock).await;
    Ok(loaded)
}

/// Drop keys after a write, logging failures.
pub(crate) async fn invalidate(cache: &CacheManager, keys: &[String]) {
    if let Err(e) = cache.delete_by_keys(keys).await {
        tracing::warn!(keys = keys.len(), error = %e, "cache invalidation failed");
    }
}
