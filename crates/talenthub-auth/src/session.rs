//! Session lifecycle: login, token authentication, refresh and logout.
//!
//! ```text
//! None ──login──► Active ──refresh──► Rotated ──refresh──► Rotated …
//!                   │                    │
//!                   └──logout / evict────┴──► Revoked
//!                   (expiry is passive: every read re-checks the timestamps)
//! ```

use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::TokenKind;
use crate::password::{PasswordHasher, verify_blocking};
use crate::repository::{CachedCandidateRepository, CachedSessionRepository};
use crate::retention::RetentionPolicy;
use crate::token::TokenGenerator;
use crate::types::{AuthenticatedCandidate, Candidate, ClientInfo, LoginRequest, RefreshRequest, Session};
use crate::validation::{Identifier, Validator};
use crate::{AuthError, AuthResult};

/// Drives sessions through their lifecycle.
#[derive(Clone)]
pub struct SessionManager {
    candidates: CachedCandidateRepository,
    sessions: CachedSessionRepository,
    tokens: TokenGenerator,
    retention: RetentionPolicy,
    validator: Arc<Validator>,
    hasher: Arc<dyn PasswordHasher>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(
        candidates: CachedCandidateRepository,
        sessions: CachedSessionRepository,
        validator: Arc<Validator>,
        hasher: Arc<dyn PasswordHasher>,
        config: SessionConfig,
    ) -> Self {
        let tokens = TokenGenerator::new(Arc::new(sessions.clone()), &config);
        let retention = RetentionPolicy::new(sessions.clone(), &config);
        Self {
            candidates,
            sessions,
            tokens,
            retention,
            validator,
            hasher,
            config,
        }
    }

    /// Session repository backing this manager.
    pub fn sessions(&self) -> &CachedSessionRepository {
        &self.sessions
    }

    /// Retention policy applied after each login.
    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    /// Authenticate with email or phone plus password and open a session.
    ///
    /// An unknown identifier, a candidate without password and a wrong
    /// password all fail with the same `Unauthorized`. After the session is
    /// stored the candidate's excess sessions are evicted; failures there are
    /// logged and do not fail the login.
    #[tracing::instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> AuthResult<Session> {
        let candidate = match self.validator.parse_identifier(&request.identifier)? {
            Identifier::Email(email) => self.candidates.find_by_email(&email).await?,
            Identifier::Phone(phone) => self.candidates.find_by_phone(&phone).await?,
        }
        .ok_or(AuthError::Unauthorized)?;

        let hash = self
            .candidates
            .find_password_by_id(candidate.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        if !verify_blocking(self.hasher.clone(), request.password, hash).await? {
            tracing::debug!(candidate_id = %candidate.id, "password mismatch");
            return Err(AuthError::Unauthorized);
        }

        let session = self.open_session(&candidate, request.client).await?;

        if let Err(e) = self
            .retention
            .evict_excess(candidate.id, self.config.max_active_sessions)
            .await
        {
            tracing::error!(candidate_id = %candidate.id, error = %e, "session retention failed after login");
        }

        tracing::info!(candidate_id = %candidate.id, session_id = %session.id, "candidate logged in");
        Ok(session)
    }

    /// Resolve an access token to its candidate.
    ///
    /// Fails with `NotFound` if no session holds `access_token` as its access
    /// token (a refresh token does not authenticate), and with
    /// `TokenExpired(Access)` once the token is past its expiry, even if a
    /// cache entry survived.
    pub async fn authenticate(&self, access_token: &str) -> AuthResult<AuthenticatedCandidate> {
        let session = self
            .sessions
            .find_by_token(TokenKind::Access, access_token)
            .await?
            .filter(|s| s.access_token == access_token)
            .ok_or_else(|| AuthError::not_found("session"))?;

        if session.is_access_token_expired() {
            return Err(AuthError::token_expired(TokenKind::Access));
        }

        let candidate = self
            .candidates
            .find_by_id(session.candidate_id)
            .await?
            .ok_or_else(|| AuthError::not_found("candidate"))?;

        Ok(AuthenticatedCandidate {
            candidate,
            session_id: session.id,
        })
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The old pair stops working. If another refresh of the same token got
    /// there first this one fails with `NotFound`.
    #[tracing::instrument(skip(self, request))]
    pub async fn refresh(&self, request: RefreshRequest) -> AuthResult<Session> {
        let session = self
            .sessions
            .find_by_token(TokenKind::Refresh, &request.refresh_token)
            .await?
            .filter(|s| s.refresh_token == request.refresh_token)
            .ok_or_else(|| AuthError::not_found("session"))?;

        if session.is_refresh_token_expired() {
            return Err(AuthError::token_expired(TokenKind::Refresh));
        }

        let candidate = self
            .candidates
            .find_by_id(session.candidate_id)
            .await?
            .ok_or_else(|| AuthError::not_found("candidate"))?;

        let access_token = self.tokens.generate(candidate.id).await?;
        let refresh_token = self.tokens.generate(candidate.id).await?;

        let now = OffsetDateTime::now_utc();
        let next = Session {
            access_token,
            refresh_token,
            access_token_expires_at: now + self.config.access_token_duration,
            refresh_token_expires_at: now + self.config.refresh_token_duration,
            client: request.client,
            updated_at: now,
            ..session.clone()
        };

        let rotated = self.sessions.rotate(&session, &next).await?;
        tracing::info!(candidate_id = %candidate.id, session_id = %rotated.id, "session refreshed");
        Ok(rotated)
    }

    /// Revoke a session by id.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self, session_id: Uuid) -> AuthResult<()> {
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AuthError::not_found("session"))?;

        self.sessions.delete(&session).await?;
        tracing::info!(candidate_id = %session.candidate_id, session_id = %session.id, "session revoked");
        Ok(())
    }

    async fn open_session(&self, candidate: &Candidate, client: ClientInfo) -> AuthResult<Session> {
        let access_token = self.tokens.generate(candidate.id).await?;
        let refresh_token = self.tokens.generate(candidate.id).await?;

        let now = OffsetDateTime::now_utc();
        let session = Session {
            id: Uuid::new_v4(),
            candidate_id: candidate.id,
            access_token,
            refresh_token,
            access_token_expires_at: now + self.config.access_token_duration,
            refresh_token_expires_at: now + self.config.refresh_token_duration,
            client,
            created_at: now,
            updated_at: now,
        };

        self.sessions.create(&session).await?;
        Ok(session)
    }
}
