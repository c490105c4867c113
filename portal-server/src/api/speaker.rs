//! Speaker entry points: project view, session creation, arrival guide

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use portal_common::db::{ArrivalGuide, FieldCategory, Project, ProjectField, SpeakerSession};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{fields, guides, projects, sessions, steps};
use crate::validation::{normalize_email, require_text};
use crate::{ApiError, ApiResult, AppState};

/// Active project by slug; inactive projects are hidden from speakers
pub(super) async fn active_project(state: &AppState, slug: &str) -> ApiResult<Project> {
    projects::get_by_slug(&state.db, slug)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| ApiError::NotFound(format!("project {}", slug)))
}

pub(super) async fn load_session(state: &AppState, id: &str) -> ApiResult<SpeakerSession> {
    sessions::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("session {}", id)))
}

/// Public subset of a project
#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub event_date: Option<String>,
    pub venue: Option<String>,
}

impl From<&Project> for ProjectSummary {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id.clone(),
            slug: p.slug.clone(),
            title: p.title.clone(),
            description: p.description.clone(),
            event_date: p.event_date.clone(),
            venue: p.venue.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectView {
    pub project: ProjectSummary,
    pub presentation_fields: Vec<ProjectField>,
    pub consent_fields: Vec<ProjectField>,
    pub attendance_fields: Vec<ProjectField>,
}

/// GET /api/projects/:slug
pub async fn get_project(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<ProjectView>> {
    let project = active_project(&state, &slug).await?;
    let all = fields::list_for_project(&state.db, &project.id, None).await?;

    let of = |category: FieldCategory| -> Vec<ProjectField> {
        all.iter().filter(|f| f.category == category).cloned().collect()
    };

    Ok(Json(ProjectView {
        project: ProjectSummary::from(&project),
        presentation_fields: of(FieldCategory::Presentation),
        consent_fields: of(FieldCategory::Consent),
        attendance_fields: of(FieldCategory::Attendance),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub name: String,
    pub email: String,
}

/// What the client keeps to identify the speaker on later steps
#[derive(Debug, Serialize)]
pub struct SessionBlob {
    pub session: SpeakerSession,
    pub project: ProjectSummary,
    pub created: bool,
}

/// POST /api/projects/:slug/session
///
/// Returns the existing session when this email already has one in the project.
pub async fn create_session(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<SessionBlob>)> {
    let project = active_project(&state, &slug).await?;
    let name = require_text("name", &request.name).map_err(ApiError::BadRequest)?;
    let email = normalize_email(&request.email).map_err(ApiError::BadRequest)?;

    let (session, created) = sessions::get_or_create(&state.db, &project.id, &email, &name).await?;

    let status = if created {
        info!(project = %project.slug, session_id = %session.id, "Speaker session created");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(SessionBlob {
            session,
            project: ProjectSummary::from(&project),
            created,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session: SpeakerSession,
    pub project: ProjectSummary,
    pub completion: steps::StepCompletion,
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let session = load_session(&state, &id).await?;
    let project = projects::get(&state.db, &session.project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {}", session.project_id)))?;
    let completion = steps::completion(&state.db, &session.id).await?;

    Ok(Json(SessionView {
        session,
        project: ProjectSummary::from(&project),
        completion,
    }))
}

/// GET /api/projects/:slug/arrival-guide
pub async fn get_arrival_guide(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Option<ArrivalGuide>>> {
    let project = active_project(&state, &slug).await?;
    Ok(Json(guides::get(&state.db, &project.id).await?))
}
