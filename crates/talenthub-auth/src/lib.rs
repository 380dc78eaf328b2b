//! # talenthub-auth
//!
//! Candidate authentication and session lifecycle for Talenthub.
//!
//! This crate provides:
//! - Login with email or phone plus password
//! - Opaque access/refresh token pairs with rotation on refresh
//! - Per-candidate session retention
//! - Candidate registration
//! - Cache-aside repositories with negative caching and stampede protection
//!
//! ## Modules
//!
//! - [`config`] - Session settings and application configuration loading
//! - [`session`] - Session lifecycle (login, authenticate, refresh, logout)
//! - [`candidate`] - Candidate registration and lookup
//! - [`retention`] - Batched eviction of a candidate's oldest sessions
//! - [`token`] - Unique token generation
//! - [`repository`] - Cache-aside repositories over the storage traits
//! - [`storage`] - Storage traits and the in-memory implementation
//! - [`validation`] - Email and phone normalization
//! - [`password`] - Password hashing

pub mod candidate;
pub mod config;
pub mod error;
pub mod keys;
pub mod password;
pub mod repository;
pub mod retention;
pub mod session;
pub mod storage;
pub mod token;
pub mod types;
pub mod validation;

pub use candidate::CandidateService;
pub use config::{AppConfig, ConfigError, PostgresConfig, SessionConfig};
pub use error::{AuthError, ErrorCategory, TokenKind};
pub use password::{Argon2Hasher, PasswordHasher};
pub use repository::{CachedCandidateRepository, CachedSessionRepository};
pub use retention::RetentionPolicy;
pub use session::SessionManager;
pub use storage::{CandidateStore, MemoryStore, SessionStore};
pub use token::{TokenExistence, TokenGenerator};
pub use types::{
    AuthenticatedCandidate, Candidate, ClientInfo, CreateCandidateInput, LoginRequest,
    NewCandidate, RefreshRequest, Session,
};
pub use validation::{Identifier, Validator};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use talenthub_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::candidate::CandidateService;
    pub use crate::config::{AppConfig, ConfigError, SessionConfig};
    pub use crate::error::{AuthError, ErrorCategory, TokenKind};
    pub use crate::password::{Argon2Hasher, PasswordHasher};
    pub use crate::repository::{CachedCandidateRepository, CachedSessionRepository};
    pub use crate::session::SessionManager;
    pub use crate::storage::{CandidateStore, SessionStore};
    pub use crate::types::{
        AuthenticatedCandidate, Candidate, ClientInfo, CreateCandidateInput, LoginRequest,
        RefreshRequest, Session,
    };
    pub use crate::validation::Validator;
}
