//! Cache-aside session repository.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use talenthub_cache::{CacheItem, CacheManager, CachedValue};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{invalidate, json_item, read_through};
use crate::error::TokenKind;
use crate::keys;
use crate::storage::SessionStore;
use crate::token::TokenExistence;
use crate::types::Session;
use crate::{AuthError, AuthResult};

/// Remaining lifetime of `expires_at`, zero once it has passed.
fn ttl_until(expires_at: OffsetDateTime, now: OffsetDateTime) -> Duration {
    Duration::try_from(expires_at - now).unwrap_or(Duration::ZERO)
}

/// Cache entries for a session.
///
/// The access-token and id keys expire with the access token, the
/// refresh-token key with the refresh token.
fn session_items(session: &Session) -> Vec<CacheItem> {
    let now = OffsetDateTime::now_utc();
    let access_ttl = ttl_until(session.access_token_expires_at, now);
    let refresh_ttl = ttl_until(session.refresh_token_expires_at, now);

    [
        (keys::session_token(&session.access_token), access_ttl),
        (keys::session_id(session.id), access_ttl),
        (keys::session_token(&session.refresh_token), refresh_ttl),
    ]
    .into_iter()
    .filter_map(|(key, ttl)| json_item(key, session, ttl))
    .collect()
}

/// Session lookups and writes with cache-aside reads.
///
/// Every session occupies three keys: one per token and one for its id.
#[derive(Clone)]
pub struct CachedSessionRepository {
    store: Arc<dyn SessionStore>,
    cache: CacheManager,
}

impl CachedSessionRepository {
    pub fn new(store: Arc<dyn SessionStore>, cache: CacheManager) -> Self {
        Self { store, cache }
    }

    /// Persist a new session and populate its three keys.
    #[tracing::instrument(skip(self, session), fields(session_id = %session.id, candidate_id = %session.candidate_id))]
    pub async fn create(&self, session: &Session) -> AuthResult<()> {
        self.store.create(session).await?;
        self.cache
            .store_multi_without_blocking(session_items(session))
            .await;
        Ok(())
    }

    /// Session owning `token`.
    ///
    /// Both tokens share one key space, so the result may have been found
    /// through the other column; callers compare the token they hold.
    pub async fn find_by_token(&self, kind: TokenKind, token: &str) -> AuthResult<Option<Session>> {
        let key = keys::session_token(token);
        let store = &self.store;
        let load = async move {
            if let Some(session) = store.find_by_token(kind, token).await? {
                return Ok(Some(session));
            }
            let other = match kind {
                TokenKind::Access => TokenKind::Refresh,
                TokenKind::Refresh => TokenKind::Access,
            };
            store.find_by_token(other, token).await
        };
        read_through(&self.cache, &key, load, session_items).await
    }

    /// Session by id.
    pub async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Session>> {
        let key = keys::session_id(id);
        read_through(&self.cache, &key, self.store.find_by_id(id), session_items).await
    }

    /// Returns `true` if some session already uses `token`.
    ///
    /// A cached session or nil marker answers directly; otherwise the store
    /// decides.
    pub async fn check_token(&self, token: &str) -> AuthResult<bool> {
        match self.cache.get(&keys::session_token(token)).await {
            Some(CachedValue::Value(_)) => Ok(true),
            Some(CachedValue::Nil) => Ok(false),
            None => self.store.token_exists(token).await,
        }
    }

    /// Swap `previous`'s token pair for `next`'s.
    ///
    /// Fails with `NotFound` if the session is gone or `previous` was already
    /// rotated by someone else. The old keys are dropped before the new pair
    /// is cached.
    #[tracing::instrument(skip(self, previous, next), fields(session_id = %next.id))]
    pub async fn rotate(&self, previous: &Session, next: &Session) -> AuthResult<Session> {
        let updated = self
            .store
            .update_tokens(&previous.refresh_token, next)
            .await?
            .ok_or_else(|| AuthError::not_found("session"))?;

        invalidate(&self.cache, &keys::session_keys(previous)).await;
        self.cache
            .store_multi_without_blocking(session_items(&updated))
            .await;
        Ok(updated)
    }

    /// Delete a session and its keys.
    #[tracing::instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn delete(&self, session: &Session) -> AuthResult<()> {
        if !self.store.delete(session.id).await? {
            return Err(AuthError::not_found("session"));
        }
        invalidate(&self.cache, &keys::session_keys(session)).await;
        Ok(())
    }

    /// Delete one batch of a candidate's sessions ranked after the first
    /// `keep`, then their keys. Returns how many rows were deleted.
    ///
    /// Cache eviction failures are logged; the entries then live until
    /// their TTL.
    pub async fn delete_excess_batch(
        &self,
        candidate_id: Uuid,
        keep: u32,
        limit: u32,
    ) -> AuthResult<u64> {
        let deleted = self.store.delete_excess(candidate_id, keep, limit).await?;
        if deleted.is_empty() {
            return Ok(0);
        }

        let stale: Vec<String> = deleted.iter().flat_map(keys::session_keys).collect();
        if let Err(e) = self.cache.delete_by_keys(&stale).await {
            tracing::warn!(
                candidate_id = %candidate_id,
                sessions = deleted.len(),
                error = %e,
                "evicted sessions left in cache until expiry"
            );
        }
        Ok(deleted.len() as u64)
    }
}

#[async_trait]
impl TokenExistence for CachedSessionRepository {
    async fn token_exists(&self, token: &str) -> AuthResult<bool> {
        self.check_token(token).await
    }
}
