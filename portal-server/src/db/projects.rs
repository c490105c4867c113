//! Project queries

use chrono::Utc;
use portal_common::db::Project;
use portal_common::Result;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Descriptive columns shared by local edits and sync writes
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectFields {
    pub title: String,
    pub description: String,
    pub event_date: Option<String>,
    pub venue: Option<String>,
}

/// Partial admin update; None leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<String>,
    pub venue: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn list(db: &SqlitePool) -> Result<Vec<Project>> {
    let projects = sqlx::query_as::<_, Project>(
        "SELECT * FROM projects ORDER BY created_at DESC, title ASC",
    )
    .fetch_all(db)
    .await?;
    Ok(projects)
}

pub async fn get(db: &SqlitePool, id: &str) -> Result<Option<Project>> {
    let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(project)
}

pub async fn get_by_slug(db: &SqlitePool, slug: &str) -> Result<Option<Project>> {
    let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE slug = ?")
        .bind(slug)
        .fetch_optional(db)
        .await?;
    Ok(project)
}

pub async fn get_by_external_id(db: &SqlitePool, external_id: &str) -> Result<Option<Project>> {
    let project =
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE external_project_id = ?")
            .bind(external_id)
            .fetch_optional(db)
            .await?;
    Ok(project)
}

/// External id → local id for every project that carries one
pub async fn external_id_map(db: &SqlitePool) -> Result<HashMap<String, String>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT external_project_id, id FROM projects WHERE external_project_id IS NOT NULL",
    )
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().collect())
}

pub async fn all_slugs(db: &SqlitePool) -> Result<HashSet<String>> {
    let slugs: Vec<String> = sqlx::query_scalar("SELECT slug FROM projects")
        .fetch_all(db)
        .await?;
    Ok(slugs.into_iter().collect())
}

/// Insert a project; `external_project_id` marks it as synced
pub async fn insert(
    db: &SqlitePool,
    slug: &str,
    fields: &ProjectFields,
    external_project_id: Option<&str>,
) -> Result<Project> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let synced_at = external_project_id.map(|_| now);

    sqlx::query(
        r#"
        INSERT INTO projects (id, slug, title, description, event_date, venue,
                              external_project_id, is_active, created_at, updated_at, last_synced_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(slug)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(&fields.event_date)
    .bind(&fields.venue)
    .bind(external_project_id)
    .bind(now)
    .bind(now)
    .bind(synced_at)
    .execute(db)
    .await?;

    fetch(db, &id).await
}

/// Overwrite descriptive columns from the external row; slug is never touched
pub async fn update_from_sync(db: &SqlitePool, id: &str, fields: &ProjectFields) -> Result<Project> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE projects
        SET title = ?, description = ?, event_date = ?, venue = ?,
            updated_at = ?, last_synced_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(&fields.event_date)
    .bind(&fields.venue)
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(portal_common::Error::NotFound(format!("project {}", id)));
    }

    fetch(db, id).await
}

pub async fn update(db: &SqlitePool, id: &str, update: &ProjectUpdate) -> Result<Option<Project>> {
    let result = sqlx::query(
        r#"
        UPDATE projects
        SET slug = COALESCE(?, slug),
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            event_date = COALESCE(?, event_date),
            venue = COALESCE(?, venue),
            is_active = COALESCE(?, is_active),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.slug)
    .bind(&update.title)
    .bind(&update.description)
    .bind(&update.event_date)
    .bind(&update.venue)
    .bind(update.is_active)
    .bind(Utc::now())
    .bind(id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get(db, id).await
}

pub async fn delete(db: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

async fn fetch(db: &SqlitePool, id: &str) -> Result<Project> {
    get(db, id)
        .await?
        .ok_or_else(|| portal_common::Error::NotFound(format!("project {}", id)))
}
