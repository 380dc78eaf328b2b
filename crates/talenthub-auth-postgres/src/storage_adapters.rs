//! Arc-owning storage adapters.
//!
//! These adapters wrap the lifetime-based storage types and own an
//! `Arc<PgPool>`, so they can be handed to the cache-aside repositories as
//! `Arc<dyn CandidateStore>` / `Arc<dyn SessionStore>`.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use talenthub_auth::storage::{CandidateStore, SessionStore};
use talenthub_auth::{AuthResult, Candidate, NewCandidate, Session, TokenKind};

use crate::PgPool;
use crate::candidate::CandidateStorage;
use crate::session::SessionStorage;

// =============================================================================
// Arc-Owning Candidate Storage
// =============================================================================

/// Arc-owning PostgreSQL candidate storage adapter.
#[derive(Clone)]
pub struct ArcCandidateStorage {
    pool: Arc<PgPool>,
}

impl ArcCandidateStorage {
    /// Create a new Arc-owning candidate storage.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    fn storage(&self) -> CandidateStorage<'_> {
        CandidateStorage::new(&self.pool)
    }
}

#[async_trait]
impl CandidateStore for ArcCandidateStorage {
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Candidate>> {
        Ok(self.storage().find_by_id(id).await?)
    }

    async fn find_password_by_id(&self, id: Uuid) -> AuthResult<Option<String>> {
        Ok(self.storage().find_password_by_id(id).await?)
    }

    async fn find_id_by_email(&self, email: &str) -> AuthResult<Option<Uuid>> {
        Ok(self.storage().find_id_by_email(email).await?)
    }

    async fn find_id_by_phone(&self, phone: &str) -> AuthResult<Option<Uuid>> {
        Ok(self.storage().find_id_by_phone(phone).await?)
    }

    async fn find_unscoped_id_by_email(&self, email: &str) -> AuthResult<Option<Uuid>> {
        Ok(self.storage().find_unscoped_id_by_email(email).await?)
    }

    async fn find_unscoped_id_by_phone(&self, phone: &str) -> AuthResult<Option<Uuid>> {
        Ok(self.storage().find_unscoped_id_by_phone(phone).await?)
    }

    async fn create(&self, candidate: &NewCandidate) -> AuthResult<Candidate> {
        Ok(self.storage().create(candidate).await?)
    }

    async fn update(&self, candidate: &Candidate) -> AuthResult<Option<Candidate>> {
        Ok(self.storage().update(candidate).await?)
    }
}

// =============================================================================
// Arc-Owning Session Storage
// =============================================================================

/// Arc-owning PostgreSQL session storage adapter.
#[derive(Clone)]
pub struct ArcSessionStorage {
    pool: Arc<PgPool>,
}

impl ArcSessionStorage {
    /// Create a new Arc-owning session storage.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    fn storage(&self) -> SessionStorage<'_> {
        SessionStorage::new(&self.pool)
    }
}

#[async_trait]
impl SessionStore for ArcSessionStorage {
    async fn create(&self, session: &Session) -> AuthResult<()> {
        Ok(self.storage().create(session).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Session>> {
        Ok(self.storage().find_by_id(id).await?)
    }

    async fn find_by_token(&self, kind: TokenKind, token: &str) -> AuthResult<Option<Session>> {
        Ok(self.storage().find_by_token(kind, token).await?)
    }

    async fn token_exists(&self, token: &str) -> AuthResult<bool> {
        Ok(self.storage().token_exists(token).await?)
    }

    async fn update_tokens(
        &self,
        previous_refresh_token: &str,
        session: &Session,
    ) -> AuthResult<Option<Session>> {
        Ok(self
            .storage()
            .update_tokens(previous_refresh_token, session)
            .await?)
    }

    async fn delete(&self, id: Uuid) -> AuthResult<bool> {
        Ok(self.storage().delete(id).await?)
    }

    async fn delete_excess(
        &self,
        candidate_id: Uuid,
        keep: u32,
        limit: u32,
    ) -> AuthResult<Vec<Session>> {
        Ok(self
            .storage()
            .delete_excess(candidate_id, keep, limit)
            .await?)
    }
}
