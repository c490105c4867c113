//! Presentation file metadata

use chrono::Utc;
use portal_common::db::PresentationFile;
use portal_common::Result;
use sqlx::SqlitePool;

#[derive(Debug, Clone)]
pub struct NewFile {
    pub id: String,
    pub field_key: Option<String>,
    pub original_name: String,
    pub stored_path: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
}

pub async fn insert(db: &SqlitePool, session_id: &str, file: &NewFile) -> Result<PresentationFile> {
    sqlx::query(
        r#"
        INSERT INTO presentation_files (id, session_id, field_key, original_name, stored_path,
                                        content_type, size_bytes, uploaded_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&file.id)
    .bind(session_id)
    .bind(&file.field_key)
    .bind(&file.original_name)
    .bind(&file.stored_path)
    .bind(&file.content_type)
    .bind(file.size_bytes)
    .bind(Utc::now())
    .execute(db)
    .await?;

    get(db, &file.id)
        .await?
        .ok_or_else(|| portal_common::Error::Internal("file row missing after insert".into()))
}

pub async fn get(db: &SqlitePool, id: &str) -> Result<Option<PresentationFile>> {
    let file = sqlx::query_as::<_, PresentationFile>("SELECT * FROM presentation_files WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(file)
}

pub async fn list_for_session(db: &SqlitePool, session_id: &str) -> Result<Vec<PresentationFile>> {
    let files = sqlx::query_as::<_, PresentationFile>(
        "SELECT * FROM presentation_files WHERE session_id = ? ORDER BY uploaded_at ASC",
    )
    .bind(session_id)
    .fetch_all(db)
    .await?;
    Ok(files)
}

/// Every file uploaded by speakers of one project
pub async fn list_for_project(db: &SqlitePool, project_id: &str) -> Result<Vec<PresentationFile>> {
    let files = sqlx::query_as::<_, PresentationFile>(
        r#"
        SELECT f.* FROM presentation_files f
        JOIN speaker_sessions s ON s.id = f.session_id
        WHERE s.project_id = ?
        ORDER BY f.uploaded_at DESC
        "#,
    )
    .bind(project_id)
    .fetch_all(db)
    .await?;
    Ok(files)
}

pub async fn delete(db: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM presentation_files WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
