//! Password hashing.
//!
//! Hashes are Argon2id PHC strings with a per-password salt from `OsRng`.
//! Hashing is CPU-bound, so async callers go through [`hash_blocking`] and
//! [`verify_blocking`], which move the work off the runtime threads.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use std::sync::Arc;

use crate::{AuthError, AuthResult};

/// Hashes and verifies passwords.
pub trait PasswordHasher: Send + Sync + 'static {
    /// Hash a plaintext password for storage.
    fn hash(&self, password: &str) -> AuthResult<String>;

    /// Compare a plaintext password with a stored hash.
    ///
    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
    fn verify(&self, password: &str, hash: &str) -> AuthResult<bool>;
}

/// Argon2id hasher.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Hasher with Argon2's default cost parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hasher with explicit costs (memory in KiB, iterations, lanes).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> AuthResult<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| AuthError::internal(format!("argon2 params: {e}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::internal(format!("password hashing: {e}")))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AuthError::internal(format!("stored password hash: {e}")))?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Hash on the blocking pool.
pub async fn hash_blocking(hasher: Arc<dyn PasswordHasher>, password: String) -> AuthResult<String> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| AuthError::internal(format!("password hashing task: {e}")))?
}

/// Verify on the blocking pool.
pub async fn verify_blocking(
    hasher: Arc<dyn PasswordHasher>,
    password: String,
    hash: String,
) -> AuthResult<bool> {
    tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
        .await
        .map_err(|e| AuthError::internal(format!("password verification task: {e}")))?
}
