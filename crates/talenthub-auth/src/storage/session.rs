//! Session storage trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::TokenKind;
use crate::types::Session;

/// Storage for login sessions.
///
/// Tokens are unique across both columns: an implementation must reject a
/// session whose access or refresh token is already in use.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a session.
    async fn create(&self, session: &Session) -> AuthResult<()>;

    /// Find a session by id.
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Session>>;

    /// Find a session by the given token column.
    async fn find_by_token(&self, kind: TokenKind, token: &str) -> AuthResult<Option<Session>>;

    /// Returns `true` if any session uses `token` as its access or refresh token.
    async fn token_exists(&self, token: &str) -> AuthResult<bool>;

    /// Replace tokens, expiries and client metadata of `session.id`.
    ///
    /// The write only happens if the row still carries `previous_refresh_token`.
    /// Returns the updated row, or `None` if the session is gone or was
    /// rotated concurrently.
    async fn update_tokens(
        &self,
        previous_refresh_token: &str,
        session: &Session,
    ) -> AuthResult<Option<Session>>;

    /// Delete a session. Returns `false` if it did not exist.
    async fn delete(&self, id: Uuid) -> AuthResult<bool>;

    /// Delete up to `limit` of a candidate's sessions ranked after the first
    /// `keep`, in one transaction.
    ///
    /// Ranking is by `refresh_token_expires_at` descending, then `created_at`
    /// descending, then `id`. Returns the deleted sessions.
    async fn delete_excess(
        &self,
        candidate_id: Uuid,
        keep: u32,
        limit: u32,
    ) -> AuthResult<Vec<Session>>;
}
