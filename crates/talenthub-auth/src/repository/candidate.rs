//! Cache-aside candidate repository.

use std::sync::Arc;
use talenthub_cache::CacheManager;
use uuid::Uuid;

use super::{invalidate, json_item, read_through};
use crate::keys;
use crate::storage::CandidateStore;
use crate::types::{Candidate, NewCandidate};
use crate::{AuthError, AuthResult};

/// Candidate lookups and writes with cache-aside reads.
///
/// Email and phone keys map to the candidate id; the record itself lives
/// under the id key, and the password hash under its own key so the record
/// can be handed out freely.
#[derive(Clone)]
pub struct CachedCandidateRepository {
    store: Arc<dyn CandidateStore>,
    cache: CacheManager,
}

impl CachedCandidateRepository {
    pub fn new(store: Arc<dyn CandidateStore>, cache: CacheManager) -> Self {
        Self { store, cache }
    }

    /// Live candidate by id.
    pub async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Candidate>> {
        let key = keys::candidate_id(id);
        let ttl = self.cache.default_ttl();
        read_through(&self.cache, &key, self.store.find_by_id(id), |candidate| {
            json_item(key.clone(), candidate, ttl).into_iter().collect()
        })
        .await
    }

    /// Password hash of a live candidate.
    pub async fn find_password_by_id(&self, id: Uuid) -> AuthResult<Option<String>> {
        let key = keys::candidate_password(id);
        let ttl = self.cache.default_ttl();
        read_through(
            &self.cache,
            &key,
            self.store.find_password_by_id(id),
            |hash| json_item(key.clone(), hash, ttl).into_iter().collect(),
        )
        .await
    }

    /// Live candidate by normalized email.
    pub async fn find_by_email(&self, email: &str) -> AuthResult<Option<Candidate>> {
        let key = keys::candidate_email(email);
        let ttl = self.cache.default_ttl();
        let id = read_through(
            &self.cache,
            &key,
            self.store.find_id_by_email(email),
            |id| json_item(key.clone(), id, ttl).into_iter().collect(),
        )
        .await?;

        match id {
            Some(id) => self.find_by_id(id).await,
            None => Ok(None),
        }
    }

    /// Live candidate by normalized phone.
    pub async fn find_by_phone(&self, phone: &str) -> AuthResult<Option<Candidate>> {
        let key = keys::candidate_phone(phone);
        let ttl = self.cache.default_ttl();
        let id = read_through(
            &self.cache,
            &key,
            self.store.find_id_by_phone(phone),
            |id| json_item(key.clone(), id, ttl).into_iter().collect(),
        )
        .await?;

        match id {
            Some(id) => self.find_by_id(id).await,
            None => Ok(None),
        }
    }

    /// Id of any candidate, deleted or not, owning `email`. Never cached.
    pub async fn find_unscoped_id_by_email(&self, email: &str) -> AuthResult<Option<Uuid>> {
        self.store.find_unscoped_id_by_email(email).await
    }

    /// Id of any candidate, deleted or not, owning `phone`. Never cached.
    pub async fn find_unscoped_id_by_phone(&self, phone: &str) -> AuthResult<Option<Uuid>> {
        self.store.find_unscoped_id_by_phone(phone).await
    }

    /// Insert a candidate and drop any cached state (nil markers included)
    /// for its id, email and phone.
    #[tracing::instrument(skip(self, candidate), fields(candidate_id = %candidate.id))]
    pub async fn create(&self, candidate: &NewCandidate) -> AuthResult<Candidate> {
        let created = self.store.create(candidate).await?;
        invalidate(&self.cache, &keys::candidate_keys(&created)).await;
        Ok(created)
    }

    /// Update a candidate and drop cached state under both its old and new
    /// identifiers.
    #[tracing::instrument(skip(self, candidate), fields(candidate_id = %candidate.id))]
    pub async fn update(&self, candidate: &Candidate) -> AuthResult<()> {
        let previous = self
            .store
            .update(candidate)
            .await?
            .ok_or_else(|| AuthError::not_found("candidate"))?;

        let mut stale = keys::candidate_keys(&previous);
        for key in keys::candidate_keys(candidate) {
            if !stale.contains(&key) {
                stale.push(key);
            }
        }
        invalidate(&self.cache, &stale).await;
        Ok(())
    }
}
