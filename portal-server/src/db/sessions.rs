//! Speaker session queries

use chrono::Utc;
use portal_common::db::SpeakerSession;
use portal_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Roster columns written by speaker sync
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerFields {
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub organization: Option<String>,
    pub job_title: Option<String>,
}

/// Profile step payload
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: String,
    pub phone: Option<String>,
    pub organization: Option<String>,
    pub job_title: Option<String>,
    pub bio: Option<String>,
}

pub async fn get(db: &SqlitePool, id: &str) -> Result<Option<SpeakerSession>> {
    let session = sqlx::query_as::<_, SpeakerSession>("SELECT * FROM speaker_sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(session)
}

pub async fn find_by_email(
    db: &SqlitePool,
    project_id: &str,
    email: &str,
) -> Result<Option<SpeakerSession>> {
    let session = sqlx::query_as::<_, SpeakerSession>(
        "SELECT * FROM speaker_sessions WHERE project_id = ? AND email = ?",
    )
    .bind(project_id)
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(session)
}

/// Return the session for (project, email), creating it when absent
///
/// `email` must already be normalized. The bool is true when a row was created.
pub async fn get_or_create(
    db: &SqlitePool,
    project_id: &str,
    email: &str,
    name: &str,
) -> Result<(SpeakerSession, bool)> {
    if let Some(existing) = find_by_email(db, project_id, email).await? {
        return Ok((existing, false));
    }

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    // A concurrent submit for the same email may win the race; fall back to its row
    sqlx::query(
        r#"
        INSERT INTO speaker_sessions (id, project_id, email, name, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(project_id, email) DO NOTHING
        "#,
    )
    .bind(&id)
    .bind(project_id)
    .bind(email)
    .bind(name)
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;

    let session = find_by_email(db, project_id, email)
        .await?
        .ok_or_else(|| portal_common::Error::Internal("session vanished after insert".into()))?;
    let created = session.id == id;
    Ok((session, created))
}

pub async fn update_profile(
    db: &SqlitePool,
    id: &str,
    profile: &ProfileUpdate,
) -> Result<Option<SpeakerSession>> {
    let result = sqlx::query(
        r#"
        UPDATE speaker_sessions
        SET name = ?, phone = ?, organization = ?, job_title = ?, bio = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&profile.name)
    .bind(&profile.phone)
    .bind(&profile.organization)
    .bind(&profile.job_title)
    .bind(&profile.bio)
    .bind(Utc::now())
    .bind(id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get(db, id).await
}

pub async fn list_for_project(db: &SqlitePool, project_id: &str) -> Result<Vec<SpeakerSession>> {
    let sessions = sqlx::query_as::<_, SpeakerSession>(
        "SELECT * FROM speaker_sessions WHERE project_id = ? ORDER BY name ASC, email ASC",
    )
    .bind(project_id)
    .fetch_all(db)
    .await?;
    Ok(sessions)
}

pub async fn count_for_project(db: &SqlitePool, project_id: &str) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM speaker_sessions WHERE project_id = ?")
            .bind(project_id)
            .fetch_one(db)
            .await?;
    Ok(count)
}

pub async fn list_page(
    db: &SqlitePool,
    project_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<SpeakerSession>> {
    let sessions = sqlx::query_as::<_, SpeakerSession>(
        r#"
        SELECT * FROM speaker_sessions WHERE project_id = ?
        ORDER BY name ASC, email ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(project_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(sessions)
}

pub async fn insert_synced(
    db: &SqlitePool,
    project_id: &str,
    fields: &SpeakerFields,
) -> Result<SpeakerSession> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO speaker_sessions (id, project_id, email, name, phone, organization,
                                      job_title, external_speaker_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(project_id)
    .bind(&fields.email)
    .bind(&fields.name)
    .bind(&fields.phone)
    .bind(&fields.organization)
    .bind(&fields.job_title)
    .bind(&fields.external_id)
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;

    fetch(db, &id).await
}

/// Apply roster data to an existing session
///
/// Optional columns are only overwritten when the external row has a value,
/// so details a speaker typed in are not blanked by a sparse roster.
pub async fn update_synced(
    db: &SqlitePool,
    id: &str,
    fields: &SpeakerFields,
) -> Result<SpeakerSession> {
    let result = sqlx::query(
        r#"
        UPDATE speaker_sessions
        SET external_speaker_id = ?, email = ?, name = ?,
            phone = COALESCE(?, phone),
            organization = COALESCE(?, organization),
            job_title = COALESCE(?, job_title),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.external_id)
    .bind(&fields.email)
    .bind(&fields.name)
    .bind(&fields.phone)
    .bind(&fields.organization)
    .bind(&fields.job_title)
    .bind(Utc::now())
    .bind(id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(portal_common::Error::NotFound(format!("speaker session {}", id)));
    }

    fetch(db, id).await
}

async fn fetch(db: &SqlitePool, id: &str) -> Result<SpeakerSession> {
    get(db, id)
        .await?
        .ok_or_else(|| portal_common::Error::NotFound(format!("speaker session {}", id)))
}
