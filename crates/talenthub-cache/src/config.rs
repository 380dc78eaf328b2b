//! Cache configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cache configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [cache]
/// enabled = true
/// nil_ttl = "5m"
/// lock_ttl = "5s"
/// max_entries = 100000
/// purge_interval = "1m"
///
/// [cache.redis]
/// enabled = true
/// url = "redis://localhost:6379"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Global switch. When disabled every lookup goes straight to the store.
    pub enabled: bool,

    /// TTL for entries stored without an explicit TTL.
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,

    /// TTL of the nil (known-absent) marker.
    #[serde(with = "humantime_serde")]
    pub nil_ttl: Duration,

    /// Expiry of a get-or-lock mutex. Covers worst-case recomputation time.
    #[serde(with = "humantime_serde")]
    pub lock_ttl: Duration,

    /// Upper bound on a single lock acquisition attempt.
    #[serde(with = "humantime_serde")]
    pub lock_timeout: Duration,

    /// Upper bound on entries held by the local backend. Once reached,
    /// expired entries are swept and new keys are skipped if it is still full.
    pub max_entries: usize,

    /// How often the local backend sweeps expired entries in the background.
    #[serde(with = "humantime_serde")]
    pub purge_interval: Duration,

    /// Shared cache backend.
    pub redis: RedisConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: Duration::from_secs(15 * 60),
            nil_ttl: Duration::from_secs(5 * 60),
            lock_ttl: Duration::from_secs(5),
            lock_timeout: Duration::from_millis(50),
            max_entries: 100_000,
            purge_interval: Duration::from_secs(60),
            redis: RedisConfig::default(),
        }
    }
}

/// Redis configuration for horizontal scaling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis (gracefully degrades without it)
    /// Default: false (local cache for single-instance deployments)
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    50
}

fn default_redis_timeout_ms() -> u64 {
    2000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}
