//! Candidate storage trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::{Candidate, NewCandidate};

/// Storage for candidates.
///
/// Lookups by id, email and phone only see candidates that are not
/// soft-deleted. The `unscoped` variants see every candidate and back the
/// registration duplicate check.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Find a live candidate by id.
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Candidate>>;

    /// Password hash of a live candidate.
    async fn find_password_by_id(&self, id: Uuid) -> AuthResult<Option<String>>;

    /// Id of the live candidate owning a normalized email.
    async fn find_id_by_email(&self, email: &str) -> AuthResult<Option<Uuid>>;

    /// Id of the live candidate owning a normalized phone.
    async fn find_id_by_phone(&self, phone: &str) -> AuthResult<Option<Uuid>>;

    /// Id of any candidate (deleted or not) owning an email.
    async fn find_unscoped_id_by_email(&self, email: &str) -> AuthResult<Option<Uuid>>;

    /// Id of any candidate (deleted or not) owning a phone.
    async fn find_unscoped_id_by_phone(&self, phone: &str) -> AuthResult<Option<Uuid>>;

    /// Insert a candidate.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DuplicateResource` if the email or phone is taken.
    async fn create(&self, candidate: &NewCandidate) -> AuthResult<Candidate>;

    /// Update name, email, phone and `deleted_at`.
    ///
    /// Returns the row as it was before the update, or `None` if no such
    /// candidate exists.
    async fn update(&self, candidate: &Candidate) -> AuthResult<Option<Candidate>>;
}
