//! Custom field definitions per project

use portal_common::db::{FieldCategory, FieldType, ProjectField};
use portal_common::Result;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub category: FieldCategory,
    pub field_key: String,
    pub label: String,
    pub field_type: FieldType,
    pub options: Vec<String>,
    pub required: bool,
    pub sort_order: i64,
}

/// Fields for a project, optionally restricted to one category, in display order
pub async fn list_for_project(
    db: &SqlitePool,
    project_id: &str,
    category: Option<FieldCategory>,
) -> Result<Vec<ProjectField>> {
    let fields = sqlx::query_as::<_, ProjectField>(
        r#"
        SELECT * FROM project_fields
        WHERE project_id = ? AND (? IS NULL OR category = ?)
        ORDER BY category ASC, sort_order ASC, field_key ASC
        "#,
    )
    .bind(project_id)
    .bind(category)
    .bind(category)
    .fetch_all(db)
    .await?;
    Ok(fields)
}

pub async fn get(db: &SqlitePool, id: &str) -> Result<Option<ProjectField>> {
    let field = sqlx::query_as::<_, ProjectField>("SELECT * FROM project_fields WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(field)
}

pub async fn create(
    db: &SqlitePool,
    project_id: &str,
    definition: &FieldDefinition,
) -> Result<ProjectField> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO project_fields (id, project_id, category, field_key, label, field_type,
                                    options_json, required, sort_order)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(project_id)
    .bind(definition.category)
    .bind(&definition.field_key)
    .bind(&definition.label)
    .bind(definition.field_type)
    .bind(Json(&definition.options))
    .bind(definition.required)
    .bind(definition.sort_order)
    .execute(db)
    .await?;

    get(db, &id)
        .await?
        .ok_or_else(|| portal_common::Error::Internal("field missing after insert".into()))
}

pub async fn update(
    db: &SqlitePool,
    id: &str,
    definition: &FieldDefinition,
) -> Result<Option<ProjectField>> {
    let result = sqlx::query(
        r#"
        UPDATE project_fields
        SET category = ?, field_key = ?, label = ?, field_type = ?,
            options_json = ?, required = ?, sort_order = ?
        WHERE id = ?
        "#,
    )
    .bind(definition.category)
    .bind(&definition.field_key)
    .bind(&definition.label)
    .bind(definition.field_type)
    .bind(Json(&definition.options))
    .bind(definition.required)
    .bind(definition.sort_order)
    .bind(id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get(db, id).await
}

pub async fn delete(db: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM project_fields WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
