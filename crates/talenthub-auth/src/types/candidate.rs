//! Candidate (user) domain types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A registered candidate.
///
/// This is the cached read copy: it never carries the password hash, which
/// lives under its own cache key and store column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,

    pub full_name: String,

    /// Normalized (trimmed, lowercase) email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Normalized phone in `+<country code><digits>` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,

    /// Soft-delete marker. Deleted candidates cannot log in but still hold
    /// their email and phone against new registrations.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub deleted_at: Option<OffsetDateTime>,
}

impl Candidate {
    /// Returns `true` if this candidate has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A candidate about to be inserted, with its already-hashed password.
#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
}

/// Registration request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCandidateInput {
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Identity handed to transports once an access token checks out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedCandidate {
    pub candidate: Candidate,
    /// Session the presented token belongs to (used for logout).
    pub session_id: Uuid,
}
