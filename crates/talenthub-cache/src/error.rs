//! Cache error types.

/// Cache-layer errors (transport, command, serialization).
///
/// These never escape [`crate::CacheManager`] lookups; they exist so backends
/// can report what went wrong and so invalidation callers can decide how
/// strictly to treat a failure.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Could not obtain a connection to the backend.
    #[error("Cache connection error: {0}")]
    Connection(String),

    /// The backend rejected or failed a command.
    #[error("Cache command error: {0}")]
    Command(String),

    /// The operation did not finish within its time budget.
    #[error("Cache operation timed out: {0}")]
    Timeout(String),

    /// A payload could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    /// Create a `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a `Command` error.
    #[must_use]
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command(message.into())
    }

    /// Create a `Timeout` error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout(operation.into())
    }

    /// Returns `true` if the backend could not be reached at all.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
            Self::Connection(e.to_string())
        } else if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else {
            Self::Command(e.to_string())
        }
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        Self::Connection(e.to_string())
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
