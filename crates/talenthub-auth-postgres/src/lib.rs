//! PostgreSQL storage backend for Talenthub Auth
//!
//! Provides persistent storage for:
//!
//! - Candidates (`candidates` table, soft delete)
//! - Login sessions (`sessions` table, one row per token pair)
//!
//! Tables are created by the embedded migrations in [`migrations`].
//!
//! # Example
//!
//! ```ignore
//! use talenthub_auth_postgres::PostgresAuthStorage;
//!
//! let storage = PostgresAuthStorage::connect(&config.postgres).await?;
//! storage.migrate().await?;
//!
//! let candidates = CachedCandidateRepository::new(Arc::new(storage.candidate_store()), cache.clone());
//! let sessions = CachedSessionRepository::new(Arc::new(storage.session_store()), cache);
//! ```

pub mod candidate;
pub mod migrations;
pub mod session;
pub mod storage_adapters;

use std::sync::Arc;

use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;
use talenthub_auth::{AuthError, PostgresConfig};

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use candidate::CandidateStorage;
pub use session::SessionStorage;
pub use storage_adapters::{ArcCandidateStorage, ArcSessionStorage};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during auth storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Resource already exists (conflict).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Applying a migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx_core::migrate::MigrateError),
}

impl StorageError {
    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Returns `true` if this is a client error (4xx equivalent).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a server error (5xx equivalent).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Serialization(_) | Self::Migration(_)
        )
    }

    /// Map a unique violation to `Conflict` using `describe` on the
    /// violated constraint name, anything else to `Database`.
    pub(crate) fn from_write(
        error: sqlx_core::Error,
        describe: impl FnOnce(Option<&str>) -> String,
    ) -> Self {
        if let sqlx_core::Error::Database(ref db_err) = error
            && db_err.is_unique_violation()
        {
            return Self::conflict(describe(db_err.constraint()));
        }
        Self::from(error)
    }
}

impl From<StorageError> for AuthError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Conflict(message) => AuthError::duplicate(message),
            other => {
                tracing::error!(error = %other, "relational store failure");
                AuthError::storage(other.to_string())
            }
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// PostgreSQL Auth Storage
// =============================================================================

/// PostgreSQL storage backend for candidates and sessions.
#[derive(Debug, Clone)]
pub struct PostgresAuthStorage {
    pool: Arc<PgPool>,
}

impl PostgresAuthStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create new storage by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(config: &PostgresConfig) -> StorageResult<Self> {
        use sqlx_core::pool::PoolOptions;
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails to execute.
    pub async fn migrate(&self) -> StorageResult<()> {
        migrations::run(&self.pool).await
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get candidate storage operations.
    #[must_use]
    pub fn candidates(&self) -> CandidateStorage<'_> {
        CandidateStorage::new(&self.pool)
    }

    /// Get session storage operations.
    #[must_use]
    pub fn sessions(&self) -> SessionStorage<'_> {
        SessionStorage::new(&self.pool)
    }

    /// Candidate store owning a handle to the pool.
    #[must_use]
    pub fn candidate_store(&self) -> ArcCandidateStorage {
        ArcCandidateStorage::new(Arc::clone(&self.pool))
    }

    /// Session store owning a handle to the pool.
    #[must_use]
    pub fn session_store(&self) -> ArcSessionStorage {
        ArcSessionStorage::new(Arc::clone(&self.pool))
    }
}
