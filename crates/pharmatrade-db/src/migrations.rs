//! # Schema Migrations
//!
//! The SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied on startup by `Database::new` (unless disabled in `DbConfig`).
//!
//! ```text
//!   startup ──► _sqlx_migrations ──► diff against embedded set ──► apply rest
//!                (created on first run)      001_initial_schema.sql
//! ```
//!
//! Applied files are checksummed by sqlx. Schema changes go in a new
//! `NNN_description.sql`; editing an applied file makes startup fail.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every embedded migration not yet recorded in the database.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let embedded = MIGRATOR.migrations.len();
    MIGRATOR.run(pool).await?;
    info!(embedded, "Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
///
/// Fails when the bookkeeping table is missing, i.e. nothing was ever applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
        .fetch_one(pool)
        .await?;

    Ok((MIGRATOR.migrations.len(), applied.max(0) as usize))
}
