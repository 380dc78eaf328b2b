//! Distributed mutex handle returned by get-or-lock.
//!
//! A [`CacheLock`] is an ownership token over `lock:<key>`. Releasing is a
//! compare-and-delete on the owner token, so a holder whose lock already
//! expired cannot remove a lock someone else acquired afterwards.
//!
//! Release is always defined: [`release`] accepts `None`, releasing twice is a
//! no-op, and a handle dropped without release schedules one in the background.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::CacheResult;

/// Prefix applied to a cache key to form its mutex key.
pub const LOCK_KEY_PREFIX: &str = "lock:";

/// Mutex key guarding `key`.
pub fn lock_key(key: &str) -> String {
    format!("{LOCK_KEY_PREFIX}{key}")
}

/// Backend side of a lock release.
#[async_trait]
pub trait LockRelease: Send + Sync + 'static {
    /// Delete `lock_key` if and only if it still holds `token`.
    async fn release(&self, lock_key: &str, token: &str) -> CacheResult<()>;
}

/// Ownership of the mutex for one cache key.
pub struct CacheLock {
    lock_key: String,
    token: String,
    releaser: Option<Arc<dyn LockRelease>>,
}

impl CacheLock {
    /// Create a handle for a lock the backend just acquired.
    pub fn new(
        lock_key: impl Into<String>,
        token: impl Into<String>,
        releaser: Arc<dyn LockRelease>,
    ) -> Self {
        Self {
            lock_key: lock_key.into(),
            token: token.into(),
            releaser: Some(releaser),
        }
    }

    /// Generate a fresh owner token.
    pub fn new_token() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// The mutex key (`lock:<key>`).
    pub fn lock_key(&self) -> &str {
        &self.lock_key
    }

    /// The owner token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Release the lock. Failures are logged; the lock then expires on its own.
    pub async fn release(mut self) {
        if let Some(releaser) = self.releaser.take() {
            if let Err(e) = releaser.release(&self.lock_key, &self.token).await {
                tracing::warn!(lock_key = %self.lock_key, error = %e, "failed to release cache lock");
            } else {
                tracing::debug!(lock_key = %self.lock_key, "cache lock released");
            }
        }
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let Some(releaser) = self.releaser.take() else {
            return;
        };
        let lock_key = std::mem::take(&mut self.lock_key);
        let token = std::mem::take(&mut self.token);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = releaser.release(&lock_key, &token).await {
                        tracing::warn!(lock_key = %lock_key, error = %e, "failed to release dropped cache lock");
                    }
                });
            }
            Err(_) => {
                tracing::debug!(lock_key = %lock_key, "no runtime to release dropped cache lock, leaving it to expire");
            }
        }
    }
}

impl fmt::Debug for CacheLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheLock")
            .field("lock_key", &self.lock_key)
            .field("held", &self.releaser.is_some())
            .finish()
    }
}

/// Release an optional lock. `None` is a no-op.
pub async fn release(lock: Option<CacheLock>) {
    if let Some(lock) = lock {
        lock.release().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingReleaser {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LockRelease for CountingReleaser {
        async fn release(&self, _lock_key: &str, _token: &str) -> CacheResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_lock_key_format() {
        assert_eq!(
            lock_key("cache:object:session:id:1"),
            "lock:cache:object:session:id:1"
        );
    }

    #[tokio::test]
    async fn test_release_none_is_noop() {
        release(None).await;
    }

    #[tokio::test]
    async fn test_release_runs_once() {
        let releaser = Arc::new(CountingReleaser::default());
        let lock = CacheLock::new("lock:k", CacheLock::new_token(), releaser.clone());

        release(Some(lock)).await;
        assert_eq!(releaser.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_schedules_release() {
        let releaser = Arc::new(CountingReleaser::default());
        {
            let _lock = CacheLock::new("lock:k", "t", releaser.clone());
        }
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(releaser.calls.load(Ordering::SeqCst), 1);
    }
}
