//! External sync endpoints and the row-change webhook

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use portal_common::api::auth::constant_time_eq;
use portal_common::db::{settings, SyncRun, SyncTrigger};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::db::{projects, sync_runs};
use crate::external::ExternalProject;
use crate::sync::mapping::display_title;
use crate::sync::webhook::WebhookPayload;
use crate::sync::SyncReport;
use crate::{ApiError, ApiResult, AppState};

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// POST /api/admin/sync
pub async fn sync_all(State(state): State<AppState>) -> ApiResult<Json<SyncReport>> {
    let engine = state.sync_engine()?;
    Ok(Json(engine.sync_all(SyncTrigger::Manual).await?))
}

/// POST /api/admin/projects/:id/sync
///
/// Only projects linked to an external row can be synced.
pub async fn sync_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SyncReport>> {
    let project = projects::get(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {}", id)))?;

    let external_id = project.external_project_id.ok_or_else(|| {
        ApiError::BadRequest(format!("project {} is not linked to an external project", id))
    })?;

    let engine = state.sync_engine()?;
    Ok(Json(engine.sync_project(&external_id, SyncTrigger::Manual).await?))
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub external_ids: Vec<String>,
}

/// POST /api/admin/import
pub async fn import_projects(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<SyncReport>> {
    let ids: Vec<String> = request
        .external_ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();

    if ids.is_empty() {
        return Err(ApiError::BadRequest("external_ids must not be empty".to_string()));
    }

    let engine = state.sync_engine()?;
    Ok(Json(engine.import_projects(&ids).await?))
}

/// External row as listed for the import picker
#[derive(Debug, Serialize)]
pub struct ExternalProjectRow {
    pub display_title: String,
    pub imported: bool,
    pub local_slug: Option<String>,
    pub external: ExternalProject,
}

/// GET /api/admin/external/projects
pub async fn list_external_projects(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ExternalProjectRow>>> {
    let directory = state.directory()?;
    let batch = directory.list_projects().await?;
    for rejected in &batch.rejected {
        warn!(
            external_id = rejected.id.as_deref().unwrap_or("-"),
            "Unreadable external project row: {}", rejected.message
        );
    }

    let local_slugs: HashMap<String, String> = projects::list(&state.db)
        .await?
        .into_iter()
        .filter_map(|p| p.external_project_id.map(|ext| (ext, p.slug)))
        .collect();

    let listed = batch
        .rows
        .into_iter()
        .map(|row| {
            let local_slug = local_slugs.get(&row.id).cloned();
            ExternalProjectRow {
                display_title: display_title(&row),
                imported: local_slug.is_some(),
                local_slug,
                external: row,
            }
        })
        .collect();

    Ok(Json(listed))
}

/// GET /api/admin/sync/runs
pub async fn list_sync_runs(State(state): State<AppState>) -> ApiResult<Json<Vec<SyncRun>>> {
    let limit = settings::sync_run_history_limit(&state.db).await?;
    Ok(Json(sync_runs::recent(&state.db, limit).await?))
}

/// POST /api/webhooks/external
///
/// When a webhook secret is configured the request must carry it in
/// `x-webhook-secret`.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> ApiResult<Json<SyncReport>> {
    if let Some(secret) = state.webhook_secret.as_deref() {
        let provided = headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !constant_time_eq(provided, secret) {
            warn!("Rejected webhook with missing or wrong secret");
            return Err(ApiError::Unauthorized("invalid webhook secret".to_string()));
        }
    }

    let engine = state.sync_engine()?;
    let report = engine.handle_webhook(&payload).await?;
    info!(run_id = %report.run_id, failures = report.failures.len(), "Webhook sync done");
    Ok(Json(report))
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/api/webhooks/external", post(receive_webhook))
}
