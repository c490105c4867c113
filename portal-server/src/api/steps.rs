//! Speaker form steps
//!
//! `GET` returns the stored row (or null), `PUT` validates and upserts it.

use axum::{
    extract::{Path, State},
    Json,
};
use portal_common::db::{
    ConsentRecord, FieldCategory, FieldResponses, HonorariumInfo, ResponseMap, SpeakerSession,
    TransportationInfo,
};
use portal_common::events::PortalEvent;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::speaker::load_session;
use crate::db::sessions::{self, ProfileUpdate};
use crate::db::steps::{self, HonorariumInput, TransportationInput};
use crate::db::fields;
use crate::validation::{
    optional_text, require_text, validate_account_number, validate_consent, validate_responses,
    validate_transportation,
};
use crate::{ApiError, ApiResult, AppState};

fn announce(state: &AppState, session: &SpeakerSession, step: &str) {
    debug!(session_id = %session.id, step, "Step saved");
    state
        .event_bus
        .emit_lossy(PortalEvent::submission(&session.project_id, &session.id, step));
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// GET /api/sessions/:id/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SpeakerSession>> {
    Ok(Json(load_session(&state, &id).await?))
}

/// PUT /api/sessions/:id/profile
pub async fn put_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ProfileRequest>,
) -> ApiResult<Json<SpeakerSession>> {
    let profile = ProfileUpdate {
        name: require_text("name", &request.name).map_err(ApiError::BadRequest)?,
        phone: optional_text(request.phone),
        organization: optional_text(request.organization),
        job_title: optional_text(request.job_title),
        bio: optional_text(request.bio),
    };

    let session = sessions::update_profile(&state.db, &id, &profile)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("session {}", id)))?;

    announce(&state, &session, "profile");
    Ok(Json(session))
}

// ============================================================================
// Honorarium
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HonorariumRequest {
    pub bank_name: String,
    pub account_holder: String,
    pub account_number: String,
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(default)]
    pub tax_type: Option<String>,
}

/// GET /api/sessions/:id/honorarium
pub async fn get_honorarium(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<HonorariumInfo>>> {
    let session = load_session(&state, &id).await?;
    Ok(Json(steps::get_honorarium(&state.db, &session.id).await?))
}

/// PUT /api/sessions/:id/honorarium
pub async fn put_honorarium(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<HonorariumRequest>,
) -> ApiResult<Json<HonorariumInfo>> {
    let session = load_session(&state, &id).await?;

    let input = HonorariumInput {
        bank_name: require_text("bank_name", &request.bank_name).map_err(ApiError::BadRequest)?,
        account_holder: require_text("account_holder", &request.account_holder)
            .map_err(ApiError::BadRequest)?,
        account_number: validate_account_number(&request.account_number)
            .map_err(ApiError::BadRequest)?,
        id_number: optional_text(request.id_number),
        tax_type: optional_text(request.tax_type),
    };

    let saved = steps::save_honorarium(&state.db, &session.id, &input).await?;
    announce(&state, &session, "honorarium");
    Ok(Json(saved))
}

// ============================================================================
// Transportation
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TransportationRequest {
    pub mode: String,
    #[serde(default)]
    pub departure_location: Option<String>,
    #[serde(default)]
    pub return_location: Option<String>,
    #[serde(default)]
    pub needs_parking: bool,
    #[serde(default)]
    pub requested_amount: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// GET /api/sessions/:id/transportation
pub async fn get_transportation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<TransportationInfo>>> {
    let session = load_session(&state, &id).await?;
    Ok(Json(steps::get_transportation(&state.db, &session.id).await?))
}

/// PUT /api/sessions/:id/transportation
pub async fn put_transportation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<TransportationRequest>,
) -> ApiResult<Json<TransportationInfo>> {
    let session = load_session(&state, &id).await?;
    let mode = require_text("mode", &request.mode).map_err(ApiError::BadRequest)?;

    let rules = steps::get_transportation_rules(&state.db, &session.project_id).await?;
    validate_transportation(rules.as_ref(), &mode, request.requested_amount)
        .map_err(ApiError::BadRequest)?;

    let input = TransportationInput {
        mode,
        departure_location: optional_text(request.departure_location),
        return_location: optional_text(request.return_location),
        needs_parking: request.needs_parking,
        requested_amount: request.requested_amount,
        notes: optional_text(request.notes),
    };

    let saved = steps::save_transportation(&state.db, &session.id, &input).await?;
    announce(&state, &session, "transportation");
    Ok(Json(saved))
}

// ============================================================================
// Presentation / attendance answers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ResponsesRequest {
    #[serde(default)]
    pub responses: ResponseMap,
}

async fn load_responses(
    state: &AppState,
    id: &str,
    category: FieldCategory,
) -> ApiResult<Json<Option<FieldResponses>>> {
    let session = load_session(state, id).await?;
    Ok(Json(steps::get_responses(&state.db, &session.id, category).await?))
}

async fn save_responses(
    state: &AppState,
    id: &str,
    category: FieldCategory,
    request: ResponsesRequest,
) -> ApiResult<Json<FieldResponses>> {
    let session = load_session(state, id).await?;
    let defined = fields::list_for_project(&state.db, &session.project_id, Some(category)).await?;

    let cleaned = validate_responses(&defined, &request.responses).map_err(ApiError::BadRequest)?;
    let saved = steps::save_responses(&state.db, &session.id, category, &cleaned).await?;

    announce(state, &session, category.as_str());
    Ok(Json(saved))
}

/// GET /api/sessions/:id/presentation
pub async fn get_presentation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<FieldResponses>>> {
    load_responses(&state, &id, FieldCategory::Presentation).await
}

/// PUT /api/sessions/:id/presentation
pub async fn put_presentation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ResponsesRequest>,
) -> ApiResult<Json<FieldResponses>> {
    save_responses(&state, &id, FieldCategory::Presentation, request).await
}

/// GET /api/sessions/:id/attendance
pub async fn get_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<FieldResponses>>> {
    load_responses(&state, &id, FieldCategory::Attendance).await
}

/// PUT /api/sessions/:id/attendance
pub async fn put_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ResponsesRequest>,
) -> ApiResult<Json<FieldResponses>> {
    save_responses(&state, &id, FieldCategory::Attendance, request).await
}

// ============================================================================
// Consent
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ConsentRequest {
    #[serde(default)]
    pub responses: BTreeMap<String, bool>,
    /// Data URL of a drawn signature, or a typed name
    #[serde(default)]
    pub signature_data: String,
}

/// GET /api/sessions/:id/consent
pub async fn get_consent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<ConsentRecord>>> {
    let session = load_session(&state, &id).await?;
    Ok(Json(steps::get_consent(&state.db, &session.id).await?))
}

/// PUT /api/sessions/:id/consent
pub async fn put_consent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ConsentRequest>,
) -> ApiResult<Json<ConsentRecord>> {
    let session = load_session(&state, &id).await?;
    let defined =
        fields::list_for_project(&state.db, &session.project_id, Some(FieldCategory::Consent))
            .await?;

    let accepted = validate_consent(&defined, &request.responses, &request.signature_data)
        .map_err(ApiError::BadRequest)?;

    let saved = steps::save_consent(
        &state.db,
        &session.id,
        &accepted,
        request.signature_data.trim(),
    )
    .await?;

    announce(&state, &session, "consent");
    Ok(Json(saved))
}
