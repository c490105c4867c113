//! Arrival guides

use chrono::Utc;
use portal_common::db::ArrivalGuide;
use portal_common::Result;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Default)]
pub struct GuideInput {
    pub content: String,
    pub venue_address: Option<String>,
    pub map_url: Option<String>,
    pub contact: Option<String>,
}

pub async fn get(db: &SqlitePool, project_id: &str) -> Result<Option<ArrivalGuide>> {
    let guide = sqlx::query_as::<_, ArrivalGuide>("SELECT * FROM arrival_guides WHERE project_id = ?")
        .bind(project_id)
        .fetch_optional(db)
        .await?;
    Ok(guide)
}

pub async fn save(db: &SqlitePool, project_id: &str, input: &GuideInput) -> Result<ArrivalGuide> {
    sqlx::query(
        r#"
        INSERT INTO arrival_guides (project_id, content, venue_address, map_url, contact, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(project_id) DO UPDATE SET
            content = excluded.content,
            venue_address = excluded.venue_address,
            map_url = excluded.map_url,
            contact = excluded.contact,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(project_id)
    .bind(&input.content)
    .bind(&input.venue_address)
    .bind(&input.map_url)
    .bind(&input.contact)
    .bind(Utc::now())
    .execute(db)
    .await?;

    get(db, project_id)
        .await?
        .ok_or_else(|| portal_common::Error::Internal("guide missing after save".into()))
}
