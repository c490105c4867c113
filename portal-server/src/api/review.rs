//! Submission review for organizers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use portal_common::db::{
    ConsentRecord, FieldCategory, FieldResponses, HonorariumInfo, PresentationFile,
    SpeakerSession, TransportationInfo,
};
use serde::Serialize;

use crate::db::steps::{self, StepCompletion};
use crate::db::{files, projects, sessions};
use crate::pagination::{calculate_pagination, PageQuery, Pagination, PAGE_SIZE};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct SubmissionRow {
    pub session: SpeakerSession,
    pub completion: StepCompletion,
}

#[derive(Debug, Serialize)]
pub struct SubmissionPage {
    pub project_id: String,
    pub pagination: Pagination,
    pub submissions: Vec<SubmissionRow>,
}

/// GET /api/admin/projects/:id/submissions?page=N
pub async fn list_submissions(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<SubmissionPage>> {
    projects::get(&state.db, &project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {}", project_id)))?;

    let total = sessions::count_for_project(&state.db, &project_id).await?;
    let pagination = calculate_pagination(total, query.page.unwrap_or(1));

    let page = sessions::list_page(&state.db, &project_id, PAGE_SIZE, pagination.offset).await?;

    let mut submissions = Vec::with_capacity(page.len());
    for session in page {
        let completion = steps::completion(&state.db, &session.id).await?;
        submissions.push(SubmissionRow {
            session,
            completion,
        });
    }

    Ok(Json(SubmissionPage {
        project_id,
        pagination,
        submissions,
    }))
}

/// Everything one speaker submitted; banking details are masked
#[derive(Debug, Serialize)]
pub struct SubmissionDetail {
    pub session: SpeakerSession,
    pub completion: StepCompletion,
    pub honorarium: Option<HonorariumInfo>,
    pub transportation: Option<TransportationInfo>,
    pub presentation: Option<FieldResponses>,
    pub attendance: Option<FieldResponses>,
    pub consent: Option<ConsentRecord>,
    pub files: Vec<PresentationFile>,
}

/// GET /api/admin/sessions/:id
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SubmissionDetail>> {
    let db = &state.db;
    let session = sessions::get(db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("session {}", id)))?;

    Ok(Json(SubmissionDetail {
        completion: steps::completion(db, &session.id).await?,
        honorarium: steps::get_honorarium(db, &session.id)
            .await?
            .map(|h| h.masked()),
        transportation: steps::get_transportation(db, &session.id).await?,
        presentation: steps::get_responses(db, &session.id, FieldCategory::Presentation).await?,
        attendance: steps::get_responses(db, &session.id, FieldCategory::Attendance).await?,
        consent: steps::get_consent(db, &session.id).await?,
        files: files::list_for_session(db, &session.id).await?,
        session,
    }))
}
