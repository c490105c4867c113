//! Admin console: projects, custom fields, transportation rules, arrival guides

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use portal_common::db::{
    ArrivalGuide, FieldCategory, FieldType, Project, ProjectField, TransportationRules,
};
use portal_common::events::PortalEvent;
use portal_common::{slugify, unique_slug};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::db::fields::{self, FieldDefinition};
use crate::db::guides::{self, GuideInput};
use crate::db::projects::{self, ProjectFields, ProjectUpdate};
use crate::db::{files, steps};
use crate::validation::{optional_text, require_text};
use crate::{ApiError, ApiResult, AppState};

async fn load_project(state: &AppState, id: &str) -> ApiResult<Project> {
    projects::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {}", id)))
}

fn changed(state: &AppState, project_id: &str) {
    state
        .event_bus
        .emit_lossy(PortalEvent::project_changed(project_id));
}

/// Slug supplied by an organizer, normalized the same way as generated ones
fn explicit_slug(raw: &str) -> ApiResult<String> {
    let slug = slugify(raw);
    if slug.is_empty() {
        return Err(ApiError::BadRequest(format!("'{}' does not form a usable slug", raw)));
    }
    Ok(slug)
}

// ============================================================================
// Projects
// ============================================================================

/// GET /api/admin/projects
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(projects::list(&state.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
}

/// POST /api/admin/projects
///
/// The slug is derived from the title unless one is given; a given slug that
/// is already taken is a conflict.
pub async fn create_project(
    State(state): State<AppState>,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let fields = ProjectFields {
        title: require_text("title", &request.title).map_err(ApiError::BadRequest)?,
        description: optional_text(request.description).unwrap_or_default(),
        event_date: optional_text(request.event_date),
        venue: optional_text(request.venue),
    };

    let slug = match optional_text(request.slug) {
        Some(raw) => explicit_slug(&raw)?,
        None => {
            let taken = projects::all_slugs(&state.db).await?;
            unique_slug(&slugify(&fields.title), &taken)
        }
    };

    let project = projects::insert(&state.db, &slug, &fields, None).await?;
    info!(project_id = %project.id, slug = %project.slug, "Project created");
    changed(&state, &project.id);

    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/admin/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    Ok(Json(load_project(&state, &id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// PUT /api/admin/projects/:id
///
/// Partial update: omitted fields keep their stored value.
pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    let title = match request.title {
        Some(title) => Some(require_text("title", &title).map_err(ApiError::BadRequest)?),
        None => None,
    };
    let slug = match optional_text(request.slug) {
        Some(raw) => Some(explicit_slug(&raw)?),
        None => None,
    };

    let update = ProjectUpdate {
        slug,
        title,
        description: request.description.map(|d| d.trim().to_string()),
        event_date: optional_text(request.event_date),
        venue: optional_text(request.venue),
        is_active: request.is_active,
    };

    let project = projects::update(&state.db, &id, &update)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {}", id)))?;

    changed(&state, &project.id);
    Ok(Json(project))
}

/// DELETE /api/admin/projects/:id
///
/// Sessions and their step rows go with the project; stored uploads are
/// removed from disk afterwards.
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let stored = files::list_for_project(&state.db, &id).await?;

    if !projects::delete(&state.db, &id).await? {
        return Err(ApiError::NotFound(format!("project {}", id)));
    }

    for file in stored {
        if let Err(e) = state.uploads.remove(&file.stored_path).await {
            warn!("Failed to remove upload {}: {}", file.stored_path, e);
        }
    }

    info!(project_id = %id, "Project deleted");
    changed(&state, &id);
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Custom fields
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct FieldQuery {
    #[serde(default)]
    pub category: Option<String>,
}

/// GET /api/admin/projects/:id/fields[?category=presentation]
pub async fn list_fields(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<FieldQuery>,
) -> ApiResult<Json<Vec<ProjectField>>> {
    let project = load_project(&state, &id).await?;
    let category = query
        .category
        .as_deref()
        .map(str::parse::<FieldCategory>)
        .transpose()?;

    Ok(Json(fields::list_for_project(&state.db, &project.id, category).await?))
}

#[derive(Debug, Deserialize)]
pub struct FieldRequest {
    pub category: FieldCategory,
    pub field_key: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub sort_order: i64,
}

impl FieldRequest {
    fn into_definition(self) -> ApiResult<FieldDefinition> {
        let field_key = self.field_key.trim().to_string();
        if field_key.is_empty()
            || !field_key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(ApiError::BadRequest(
                "field_key must be lowercase letters, digits or underscores".to_string(),
            ));
        }

        let label = require_text("label", &self.label).map_err(ApiError::BadRequest)?;

        let mut seen = HashSet::new();
        let options: Vec<String> = self
            .options
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty() && seen.insert(o.clone()))
            .collect();

        if self.field_type == FieldType::Select && options.is_empty() {
            return Err(ApiError::BadRequest(format!(
                "select field {} needs at least one option",
                field_key
            )));
        }
        if self.category == FieldCategory::Consent && self.field_type != FieldType::Checkbox {
            return Err(ApiError::BadRequest(
                "consent fields must be checkboxes".to_string(),
            ));
        }

        Ok(FieldDefinition {
            category: self.category,
            field_key,
            label,
            field_type: self.field_type,
            options,
            required: self.required,
            sort_order: self.sort_order,
        })
    }
}

/// POST /api/admin/projects/:id/fields
pub async fn create_field(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<FieldRequest>,
) -> ApiResult<(StatusCode, Json<ProjectField>)> {
    let project = load_project(&state, &id).await?;
    let definition = request.into_definition()?;

    let field = fields::create(&state.db, &project.id, &definition).await?;
    changed(&state, &project.id);
    Ok((StatusCode::CREATED, Json(field)))
}

/// PUT /api/admin/fields/:field_id
pub async fn update_field(
    State(state): State<AppState>,
    Path(field_id): Path<String>,
    Json(request): Json<FieldRequest>,
) -> ApiResult<Json<ProjectField>> {
    let definition = request.into_definition()?;

    let field = fields::update(&state.db, &field_id, &definition)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("field {}", field_id)))?;

    changed(&state, &field.project_id);
    Ok(Json(field))
}

/// DELETE /api/admin/fields/:field_id
pub async fn delete_field(
    State(state): State<AppState>,
    Path(field_id): Path<String>,
) -> ApiResult<StatusCode> {
    let field = fields::get(&state.db, &field_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("field {}", field_id)))?;

    fields::delete(&state.db, &field.id).await?;
    changed(&state, &field.project_id);
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Transportation rules
// ============================================================================

/// GET /api/admin/projects/:id/transportation-rules
///
/// A project without rules returns an empty mode list.
pub async fn get_transportation_rules(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TransportationRules>> {
    let project = load_project(&state, &id).await?;
    let rules = steps::get_transportation_rules(&state.db, &project.id)
        .await?
        .unwrap_or_default();
    Ok(Json(rules))
}

/// PUT /api/admin/projects/:id/transportation-rules
pub async fn put_transportation_rules(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut rules): Json<TransportationRules>,
) -> ApiResult<Json<TransportationRules>> {
    let project = load_project(&state, &id).await?;

    let mut seen = HashSet::new();
    for rule in &mut rules.modes {
        rule.mode = require_text("mode", &rule.mode).map_err(ApiError::BadRequest)?;
        if !seen.insert(rule.mode.clone()) {
            return Err(ApiError::BadRequest(format!("duplicate mode: {}", rule.mode)));
        }
        if rule.max_amount.is_some_and(|max| max < 0) {
            return Err(ApiError::BadRequest(format!(
                "max_amount for {} must not be negative",
                rule.mode
            )));
        }
    }

    steps::save_transportation_rules(&state.db, &project.id, &rules).await?;
    changed(&state, &project.id);
    Ok(Json(rules))
}

// ============================================================================
// Arrival guide
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GuideRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub venue_address: Option<String>,
    #[serde(default)]
    pub map_url: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

/// GET /api/admin/projects/:id/arrival-guide
pub async fn get_arrival_guide(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<ArrivalGuide>>> {
    let project = load_project(&state, &id).await?;
    Ok(Json(guides::get(&state.db, &project.id).await?))
}

/// PUT /api/admin/projects/:id/arrival-guide
pub async fn put_arrival_guide(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<GuideRequest>,
) -> ApiResult<Json<ArrivalGuide>> {
    let project = load_project(&state, &id).await?;

    let input = GuideInput {
        content: request.content.trim().to_string(),
        venue_address: optional_text(request.venue_address),
        map_url: optional_text(request.map_url),
        contact: optional_text(request.contact),
    };

    let guide = guides::save(&state.db, &project.id, &input).await?;
    changed(&state, &project.id);
    Ok(Json(guide))
}
