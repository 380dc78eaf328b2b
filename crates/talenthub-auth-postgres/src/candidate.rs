//! Candidate storage.
//!
//! Scoped lookups only see live rows (`deleted_at IS NULL`); the unscoped
//! ones used by registration see every row.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::row::Row;
use sqlx_postgres::PgRow;
use talenthub_auth::{Candidate, NewCandidate};
use uuid::Uuid;

use crate::{PgPool, StorageError, StorageResult};

const CANDIDATE_COLUMNS: &str =
    "id, full_name, email, phone, created_at, updated_at, deleted_at";

fn candidate_from_row(row: &PgRow) -> StorageResult<Candidate> {
    Ok(Candidate {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

/// Conflict message for a violated candidate constraint.
fn describe_conflict(constraint: Option<&str>) -> String {
    match constraint {
        Some("candidates_email_live_key") => "email already registered".to_string(),
        Some("candidates_phone_live_key") => "phone already registered".to_string(),
        _ => "candidate already exists".to_string(),
    }
}

/// Candidate storage operations.
pub struct CandidateStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> CandidateStorage<'a> {
    /// Create a new candidate storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a live candidate by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Candidate>> {
        let sql = format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE id = $1 AND deleted_at IS NULL"
        );
        let row = query(&sql).bind(id).fetch_optional(self.pool).await?;
        row.as_ref().map(candidate_from_row).transpose()
    }

    /// Password hash of a live candidate.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_password_by_id(&self, id: Uuid) -> StorageResult<Option<String>> {
        let row: Option<(String,)> = query_as(
            r#"
            SELECT password_hash
            FROM candidates
            WHERE id = $1
              AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(hash,)| hash))
    }

    /// Id of the live candidate owning `email`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_id_by_email(&self, email: &str) -> StorageResult<Option<Uuid>> {
        self.find_id("email", email, true).await
    }

    /// Id of the live candidate owning `phone`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_id_by_phone(&self, phone: &str) -> StorageResult<Option<Uuid>> {
        self.find_id("phone", phone, true).await
    }

    /// Id of any candidate, deleted or not, owning `email`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_unscoped_id_by_email(&self, email: &str) -> StorageResult<Option<Uuid>> {
        self.find_id("email", email, false).await
    }

    /// Id of any candidate, deleted or not, owning `phone`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_unscoped_id_by_phone(&self, phone: &str) -> StorageResult<Option<Uuid>> {
        self.find_id("phone", phone, false).await
    }

    async fn find_id(
        &self,
        column: &'static str,
        value: &str,
        live_only: bool,
    ) -> StorageResult<Option<Uuid>> {
        let scope = if live_only { "AND deleted_at IS NULL" } else { "" };
        // Deleted rows may share the identifier; prefer the live one.
        let sql = format!(
            "SELECT id FROM candidates WHERE {column} = $1 {scope} \
             ORDER BY deleted_at IS NOT NULL, created_at DESC LIMIT 1"
        );
        let row: Option<(Uuid,)> = query_as(&sql)
            .bind(value)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Insert a candidate.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if a live candidate already owns the email or phone.
    pub async fn create(&self, candidate: &NewCandidate) -> StorageResult<Candidate> {
        let sql = format!(
            r#"
            INSERT INTO candidates (id, full_name, email, phone, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CANDIDATE_COLUMNS}
            "#
        );
        let row = query(&sql)
            .bind(candidate.id)
            .bind(&candidate.full_name)
            .bind(&candidate.email)
            .bind(&candidate.phone)
            .bind(&candidate.password_hash)
            .fetch_one(self.pool)
            .await
            .map_err(|e| StorageError::from_write(e, describe_conflict))?;

        candidate_from_row(&row)
    }

    /// Update name, identifiers and deletion mark of a candidate.
    ///
    /// Returns the row as it was before the update, or `None` if the
    /// candidate does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the new email or phone belongs to another live
    /// candidate.
    pub async fn update(&self, candidate: &Candidate) -> StorageResult<Option<Candidate>> {
        let mut tx = self.pool.begin().await?;

        let select = format!("SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE id = $1 FOR UPDATE");
        let Some(previous) = query(&select)
            .bind(candidate.id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };
        let previous = candidate_from_row(&previous)?;

        query(
            r#"
            UPDATE candidates
            SET full_name = $2,
                email = $3,
                phone = $4,
                deleted_at = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.full_name)
        .bind(&candidate.email)
        .bind(&candidate.phone)
        .bind(candidate.deleted_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::from_write(e, describe_conflict))?;

        tx.commit().await?;
        Ok(Some(previous))
    }
}
