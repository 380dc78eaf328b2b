//! Cache entries as seen by writers and readers.

use serde::Serialize;
use std::time::Duration;

use crate::CacheResult;

/// A value to be written under a key with its own TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem {
    pub key: String,
    pub value: Vec<u8>,
    pub ttl: Duration,
}

impl CacheItem {
    /// Create a new item from raw bytes.
    pub fn new(key: impl Into<String>, value: Vec<u8>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            value,
            ttl,
        }
    }

    /// Create an item holding the JSON encoding of `value`.
    pub fn json<T: Serialize + ?Sized>(
        key: impl Into<String>,
        value: &T,
        ttl: Duration,
    ) -> CacheResult<Self> {
        Ok(Self::new(key, serde_json::to_vec(value)?, ttl))
    }

    /// Create the nil marker for `key`.
    pub fn nil(key: impl Into<String>, ttl: Duration) -> Self {
        Self::new(key, Vec::new(), ttl)
    }

    /// Returns `true` if this item is the nil marker.
    pub fn is_nil(&self) -> bool {
        self.value.is_empty()
    }
}

/// What a backend found under a key.
///
/// The nil marker is stored as an empty value. Real payloads are JSON and
/// therefore never empty, so the two cannot be confused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    /// A payload.
    Value(Vec<u8>),
    /// The key is known to have no record in the source of truth.
    Nil,
}

impl CachedValue {
    /// Interpret raw bytes read from a backend.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            Self::Nil
        } else {
            Self::Value(bytes)
        }
    }
}
