//! Versioned schema changes
//!
//! `init` creates the current schema with `CREATE TABLE IF NOT EXISTS`, which
//! cannot alter tables that already exist. Column additions for databases
//! created by earlier releases live here, one function per version, and the
//! highest applied version is recorded in `schema_version`. Released
//! migrations are never edited; each checks for its column before altering.

use crate::Result;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

/// Bump together with a new arm in [`apply`]
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Highest recorded version, or 0 on a database that predates versioning
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let has_table: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
    )
    .fetch_one(pool)
    .await?;

    if !has_table {
        return Ok(0);
    }

    let version: Option<i32> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await?;

    Ok(version.unwrap_or(0))
}

async fn record_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

async fn apply(pool: &SqlitePool, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(pool).await,
        2 => migrate_v2(pool).await,
        other => Err(crate::Error::Internal(format!(
            "no migration defined for schema version {}",
            other
        ))),
    }
}

/// Bring the schema up to [`CURRENT_SCHEMA_VERSION`]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let from = get_schema_version(pool).await?;

    if from > CURRENT_SCHEMA_VERSION {
        warn!(
            found = from,
            supported = CURRENT_SCHEMA_VERSION,
            "Database was written by a newer release; leaving schema alone"
        );
        return Ok(());
    }
    if from == CURRENT_SCHEMA_VERSION {
        debug!("Schema at v{}", from);
        return Ok(());
    }

    for version in (from + 1)..=CURRENT_SCHEMA_VERSION {
        apply(pool, version).await?;
        record_version(pool, version).await?;
        info!("Applied schema migration v{}", version);
    }

    Ok(())
}

/// Migration v1: add `last_synced_at` to projects
///
/// Early databases tracked only `updated_at`, which cannot tell a local edit
/// from a sync write.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    if column_exists(pool, "projects", "last_synced_at").await? {
        debug!("projects.last_synced_at present");
        return Ok(());
    }

    sqlx::query("ALTER TABLE projects ADD COLUMN last_synced_at TEXT")
        .execute(pool)
        .await?;

    info!("Added projects.last_synced_at");
    Ok(())
}

/// Migration v2: add `external_speaker_id` to speaker sessions
///
/// Before speaker roster sync, sessions were only created by speakers themselves.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    if !column_exists(pool, "speaker_sessions", "external_speaker_id").await? {
        sqlx::query("ALTER TABLE speaker_sessions ADD COLUMN external_speaker_id TEXT")
            .execute(pool)
            .await?;
        info!("Added speaker_sessions.external_speaker_id");
    }

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_speaker_sessions_external
         ON speaker_sessions(project_id, external_speaker_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn column_exists(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}
