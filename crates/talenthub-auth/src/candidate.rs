//! Candidate registration.

use std::sync::Arc;
use uuid::Uuid;

use crate::password::{PasswordHasher, hash_blocking};
use crate::repository::CachedCandidateRepository;
use crate::types::{Candidate, CreateCandidateInput, NewCandidate};
use crate::validation::Validator;
use crate::{AuthError, AuthResult};

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Registers candidates and reads them back.
#[derive(Clone)]
pub struct CandidateService {
    candidates: CachedCandidateRepository,
    validator: Arc<Validator>,
    hasher: Arc<dyn PasswordHasher>,
}

impl CandidateService {
    pub fn new(
        candidates: CachedCandidateRepository,
        validator: Arc<Validator>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            candidates,
            validator,
            hasher,
        }
    }

    /// Register a candidate.
    ///
    /// Email and phone are normalized before the duplicate check, which also
    /// sees soft-deleted candidates: an identifier once registered stays
    /// taken.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a blank name, no email and no phone, a malformed
    ///   email or phone, a short password or a confirmation mismatch
    /// - `DuplicateResource` if the email or phone is already registered
    #[tracing::instrument(skip(self, input))]
    pub async fn create(&self, input: CreateCandidateInput) -> AuthResult<Candidate> {
        let full_name = input.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(AuthError::invalid_input("full name is required"));
        }

        let email = match input.email.trim() {
            "" => None,
            email => Some(self.validator.normalize_email(email)?),
        };
        let phone = match input.phone.trim() {
            "" => None,
            phone => Some(self.validator.normalize_phone(phone)?),
        };
        if email.is_none() && phone.is_none() {
            return Err(AuthError::invalid_input("email or phone is required"));
        }

        if input.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::invalid_input(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        if input.password != input.password_confirmation {
            return Err(AuthError::invalid_input("password confirmation does not match"));
        }

        if let Some(email) = &email {
            if self.candidates.find_unscoped_id_by_email(email).await?.is_some() {
                return Err(AuthError::duplicate("email already registered"));
            }
        }
        if let Some(phone) = &phone {
            if self.candidates.find_unscoped_id_by_phone(phone).await?.is_some() {
                return Err(AuthError::duplicate("phone already registered"));
            }
        }

        let password_hash = hash_blocking(self.hasher.clone(), input.password).await?;
        let id = Uuid::new_v4();
        self.candidates
            .create(&NewCandidate {
                id,
                full_name,
                email,
                phone,
                password_hash,
            })
            .await?;

        let candidate = self
            .candidates
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::not_found("candidate"))?;

        tracing::info!(candidate_id = %candidate.id, "candidate registered");
        Ok(candidate)
    }

    /// Live candidate by id.
    pub async fn find_by_id(&self, id: Uuid) -> AuthResult<Candidate> {
        self.candidates
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::not_found("candidate"))
    }
}
