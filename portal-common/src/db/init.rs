//! Database initialization
//!
//! Creates the portal database on first run, applies the schema idempotently,
//! runs versioned migrations and seeds default settings.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets review queries run while a sync run writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    prepare(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// The pool is limited to one connection; every new `:memory:` connection
/// would otherwise see its own empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    prepare(&pool).await?;

    Ok(pool)
}

async fn prepare(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_schema(pool).await?;
    crate::db::migrations::run_migrations(pool).await?;
    init_default_settings(pool).await?;

    Ok(())
}

/// Create every portal table (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_projects_table(pool).await?;
    create_speaker_sessions_table(pool).await?;

    // Speaker form steps
    create_honorarium_table(pool).await?;
    create_transportation_tables(pool).await?;
    create_project_fields_table(pool).await?;
    create_field_responses_table(pool).await?;
    create_consent_records_table(pool).await?;
    create_presentation_files_table(pool).await?;
    create_arrival_guides_table(pool).await?;

    create_sync_runs_table(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Key/value runtime settings such as `admin_key_sha256` and the sync toggles
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the projects table
///
/// `external_project_id` is the only de-duplication key used by sync.
pub async fn create_projects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            event_date TEXT,
            venue TEXT,
            external_project_id TEXT UNIQUE,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_synced_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_speaker_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS speaker_sessions (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            email TEXT NOT NULL,
            name TEXT NOT NULL,
            phone TEXT,
            organization TEXT,
            job_title TEXT,
            bio TEXT,
            external_speaker_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (project_id, email)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_honorarium_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS honorarium_info (
            session_id TEXT PRIMARY KEY REFERENCES speaker_sessions(id) ON DELETE CASCADE,
            bank_name TEXT NOT NULL,
            account_holder TEXT NOT NULL,
            account_number TEXT NOT NULL,
            id_number TEXT,
            tax_type TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_transportation_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transportation_rules (
            project_id TEXT PRIMARY KEY REFERENCES projects(id) ON DELETE CASCADE,
            rules_json TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transportation_info (
            session_id TEXT PRIMARY KEY REFERENCES speaker_sessions(id) ON DELETE CASCADE,
            mode TEXT NOT NULL,
            departure_location TEXT,
            return_location TEXT,
            needs_parking INTEGER NOT NULL DEFAULT 0,
            requested_amount INTEGER,
            notes TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_project_fields_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_fields (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            category TEXT NOT NULL,
            field_key TEXT NOT NULL,
            label TEXT NOT NULL,
            field_type TEXT NOT NULL,
            options_json TEXT NOT NULL DEFAULT '[]',
            required INTEGER NOT NULL DEFAULT 0,
            sort_order INTEGER NOT NULL DEFAULT 0,
            UNIQUE (project_id, category, field_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_field_responses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS field_responses (
            session_id TEXT NOT NULL REFERENCES speaker_sessions(id) ON DELETE CASCADE,
            category TEXT NOT NULL,
            responses_json TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (session_id, category)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_consent_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS consent_records (
            session_id TEXT PRIMARY KEY REFERENCES speaker_sessions(id) ON DELETE CASCADE,
            responses_json TEXT NOT NULL,
            signature_data TEXT NOT NULL,
            signed_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_presentation_files_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS presentation_files (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES speaker_sessions(id) ON DELETE CASCADE,
            field_key TEXT,
            original_name TEXT NOT NULL,
            stored_path TEXT NOT NULL,
            content_type TEXT,
            size_bytes INTEGER NOT NULL,
            uploaded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_arrival_guides_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS arrival_guides (
            project_id TEXT PRIMARY KEY REFERENCES projects(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            venue_address TEXT,
            map_url TEXT,
            contact TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sync_runs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sync_runs (
            id TEXT PRIMARY KEY,
            trigger TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            projects_inserted INTEGER NOT NULL DEFAULT 0,
            projects_updated INTEGER NOT NULL DEFAULT 0,
            speakers_inserted INTEGER NOT NULL DEFAULT 0,
            speakers_updated INTEGER NOT NULL DEFAULT 0,
            failures INTEGER NOT NULL DEFAULT 0,
            errors_json TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed settings that must exist on every database
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "sync_speakers_on_full_sync", "true").await?;
    ensure_setting(pool, "sync_run_history_limit", "50").await?;
    Ok(())
}

/// Insert a setting if missing or NULL; existing values are left alone
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value WHERE settings.value IS NULL
        "#,
    )
    .bind(key)
    .bind(default_value)
    .execute(pool)
    .await?;

    Ok(())
}
