//! Schema migrations, embedded at compile time.

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use std::borrow::Cow;
use tracing::{info, instrument};

use crate::{PgPool, StorageResult};

/// Embedded migrations in chronological order: (version, description, sql).
macro_rules! embedded_migrations {
    () => {
        &[
            (
                20260101000001i64,
                "candidates",
                include_str!("../../migrations/20260101000001_candidates.sql"),
            ),
            (
                20260101000002i64,
                "sessions",
                include_str!("../../migrations/20260101000002_sessions.sql"),
            ),
        ]
    };
}

fn build_migrations() -> Vec<Migration> {
    embedded_migrations!()
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

/// Apply every pending migration. Applied versions are tracked in
/// `_sqlx_migrations`.
///
/// # Errors
///
/// Returns an error if a migration fails to execute.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> StorageResult<()> {
    let migrations = build_migrations();
    info!(count = migrations.len(), "running embedded migrations");

    let migrator = Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };
    migrator.run(pool).await?;

    info!("database migrations completed");
    Ok(())
}
