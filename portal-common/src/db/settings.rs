//! Settings table accessors
//!
//! Key/value pairs stored as text and parsed on read.

use sqlx::SqlitePool;

use crate::{Error, Result};

/// Read and parse a setting; None when the key is absent or NULL
pub async fn get_setting<T>(db: &SqlitePool, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match row {
        Some((Some(value),)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting {} failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

/// Insert or replace a setting
pub async fn set_setting<T>(db: &SqlitePool, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

/// Whether a full sync also refreshes every project's speaker roster
pub async fn sync_speakers_on_full_sync(db: &SqlitePool) -> Result<bool> {
    get_setting(db, "sync_speakers_on_full_sync")
        .await
        .map(|opt| opt.unwrap_or(true))
}

/// Number of sync runs returned by the history endpoint
pub async fn sync_run_history_limit(db: &SqlitePool) -> Result<i64> {
    get_setting(db, "sync_run_history_limit")
        .await
        .map(|opt| opt.unwrap_or(50))
}
