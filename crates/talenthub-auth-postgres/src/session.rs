//! Login session storage.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::row::Row;
use sqlx_postgres::PgRow;
use talenthub_auth::{ClientInfo, Session, TokenKind};
use uuid::Uuid;

use crate::{PgPool, StorageError, StorageResult};

const SESSION_COLUMNS: &str = "id, candidate_id, access_token, refresh_token, \
     access_token_expires_at, refresh_token_expires_at, \
     user_agent, ip_address, latitude, longitude, created_at, updated_at";

fn session_from_row(row: &PgRow) -> StorageResult<Session> {
    Ok(Session {
        id: row.try_get("id")?,
        candidate_id: row.try_get("candidate_id")?,
        access_token: row.try_get("access_token")?,
        refresh_token: row.try_get("refresh_token")?,
        access_token_expires_at: row.try_get("access_token_expires_at")?,
        refresh_token_expires_at: row.try_get("refresh_token_expires_at")?,
        client: ClientInfo {
            user_agent: row.try_get("user_agent")?,
            ip_address: row.try_get("ip_address")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn token_column(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Access => "access_token",
        TokenKind::Refresh => "refresh_token",
    }
}

/// Session storage operations.
pub struct SessionStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> SessionStorage<'a> {
    /// Create a new session storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a session.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if either token or the id is already in use.
    pub async fn create(&self, session: &Session) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO sessions (
                id, candidate_id, access_token, refresh_token,
                access_token_expires_at, refresh_token_expires_at,
                user_agent, ip_address, latitude, longitude,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(session.id)
        .bind(session.candidate_id)
        .bind(&session.access_token)
        .bind(&session.refresh_token)
        .bind(session.access_token_expires_at)
        .bind(session.refresh_token_expires_at)
        .bind(&session.client.user_agent)
        .bind(&session.client.ip_address)
        .bind(&session.client.latitude)
        .bind(&session.client.longitude)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            StorageError::from_write(e, |_| format!("Session '{}' or its tokens already exist", session.id))
        })?;

        Ok(())
    }

    /// Find a session by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Session>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1");
        let row = query(&sql).bind(id).fetch_optional(self.pool).await?;
        row.as_ref().map(session_from_row).transpose()
    }

    /// Find a session by one of its tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_token(&self, kind: TokenKind, token: &str) -> StorageResult<Option<Session>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE {} = $1",
            token_column(kind)
        );
        let row = query(&sql).bind(token).fetch_optional(self.pool).await?;
        row.as_ref().map(session_from_row).transpose()
    }

    /// Returns `true` if any session uses `token` in either column.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn token_exists(&self, token: &str) -> StorageResult<bool> {
        let (exists,): (bool,) = query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM sessions
                WHERE access_token = $1 OR refresh_token = $1
            )
            "#,
        )
        .bind(token)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Replace the token pair, expiries and client metadata of `session.id`
    /// if it still carries `previous_refresh_token`.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if a new token collides with another session.
    pub async fn update_tokens(
        &self,
        previous_refresh_token: &str,
        session: &Session,
    ) -> StorageResult<Option<Session>> {
        let sql = format!(
            r#"
            UPDATE sessions
            SET access_token = $3,
                refresh_token = $4,
                access_token_expires_at = $5,
                refresh_token_expires_at = $6,
                user_agent = $7,
                ip_address = $8,
                latitude = $9,
                longitude = $10,
                updated_at = $11
            WHERE id = $1
              AND refresh_token = $2
            RETURNING {SESSION_COLUMNS}
            "#
        );
        let row = query(&sql)
            .bind(session.id)
            .bind(previous_refresh_token)
            .bind(&session.access_token)
            .bind(&session.refresh_token)
            .bind(session.access_token_expires_at)
            .bind(session.refresh_token_expires_at)
            .bind(&session.client.user_agent)
            .bind(&session.client.ip_address)
            .bind(&session.client.latitude)
            .bind(&session.client.longitude)
            .bind(session.updated_at)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| {
                StorageError::from_write(e, |_| format!("Session '{}' token already in use", session.id))
            })?;

        row.as_ref().map(session_from_row).transpose()
    }

    /// Delete a session. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: Uuid) -> StorageResult<bool> {
        let result = query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete up to `limit` of a candidate's sessions ranked after the first
    /// `keep`, in one transaction. Returns the deleted rows.
    ///
    /// The selected rows are locked, so concurrent evictions for the same
    /// candidate serialize instead of deleting past the limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails. Nothing is deleted then.
    #[tracing::instrument(skip(self), fields(candidate_id = %candidate_id))]
    pub async fn delete_excess(
        &self,
        candidate_id: Uuid,
        keep: u32,
        limit: u32,
    ) -> StorageResult<Vec<Session>> {
        let mut tx = self.pool.begin().await?;

        let doomed: Vec<(Uuid,)> = query_as(
            r#"
            SELECT id
            FROM sessions
            WHERE candidate_id = $1
            ORDER BY refresh_token_expires_at DESC, created_at DESC, id
            OFFSET $2
            LIMIT $3
            FOR UPDATE
            "#,
        )
        .bind(candidate_id)
        .bind(i64::from(keep))
        .bind(i64::from(limit))
        .fetch_all(&mut *tx)
        .await?;

        if doomed.is_empty() {
            tx.commit().await?;
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = doomed.into_iter().map(|(id,)| id).collect();
        let sql = format!("DELETE FROM sessions WHERE id = ANY($1) RETURNING {SESSION_COLUMNS}");
        let rows = query(&sql).bind(&ids).fetch_all(&mut *tx).await?;

        tx.commit().await?;

        rows.iter().map(session_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_column() {
        assert_eq!(token_column(TokenKind::Access), "access_token");
        assert_eq!(token_column(TokenKind::Refresh), "refresh_token");
    }
}
