//! Sync run audit log

use chrono::Utc;
use portal_common::db::{SyncRun, SyncTrigger};
use portal_common::Result;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Counters written when a run finishes
#[derive(Debug, Clone, Default)]
pub struct RunTotals {
    pub projects_inserted: usize,
    pub projects_updated: usize,
    pub speakers_inserted: usize,
    pub speakers_updated: usize,
    pub errors: Vec<String>,
}

/// Record the start of a run and return its id
pub async fn start(db: &SqlitePool, trigger: SyncTrigger) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO sync_runs (id, trigger, started_at) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(trigger)
        .bind(Utc::now())
        .execute(db)
        .await?;
    Ok(id)
}

pub async fn finish(db: &SqlitePool, id: &str, totals: &RunTotals) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE sync_runs
        SET finished_at = ?, projects_inserted = ?, projects_updated = ?,
            speakers_inserted = ?, speakers_updated = ?, failures = ?, errors_json = ?
        WHERE id = ?
        "#,
    )
    .bind(Utc::now())
    .bind(totals.projects_inserted as i64)
    .bind(totals.projects_updated as i64)
    .bind(totals.speakers_inserted as i64)
    .bind(totals.speakers_updated as i64)
    .bind(totals.errors.len() as i64)
    .bind(Json(&totals.errors))
    .bind(id)
    .execute(db)
    .await?;
    Ok(())
}

/// Most recent runs first
pub async fn recent(db: &SqlitePool, limit: i64) -> Result<Vec<SyncRun>> {
    let runs = sqlx::query_as::<_, SyncRun>(
        "SELECT * FROM sync_runs ORDER BY started_at DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(runs)
}
