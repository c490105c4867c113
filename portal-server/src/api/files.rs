//! Presentation file upload and review

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use portal_common::db::PresentationFile;
use portal_common::events::PortalEvent;
use tracing::{info, warn};
use uuid::Uuid;

use super::speaker::load_session;
use crate::db::files::{self, NewFile};
use crate::db::{fields, projects};
use crate::validation::{optional_text, validate_file_field_key};
use crate::{ApiError, ApiResult, AppState};

/// One file part collected from the multipart body
struct UploadPart {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// POST /api/sessions/:id/files
///
/// Multipart body with an optional `field_key` text part and one `file` part.
/// A given `field_key` must name one of the project's file fields.
pub async fn upload_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<PresentationFile>)> {
    let session = load_session(&state, &id).await?;

    let mut field_key = None;
    let mut upload: Option<UploadPart> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("field_key") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable field_key: {}", e)))?;
                field_key = optional_text(Some(text));
            }
            Some("file") => {
                if upload.is_some() {
                    return Err(ApiError::BadRequest("Only one file per upload".to_string()));
                }
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable file: {}", e)))?;
                upload = Some(UploadPart {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| ApiError::BadRequest("Missing file part".to_string()))?;
    if upload.bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }
    if upload.bytes.len() > state.max_upload_bytes {
        return Err(ApiError::BadRequest(format!(
            "File exceeds the {} byte limit",
            state.max_upload_bytes
        )));
    }

    if let Some(key) = field_key.as_deref() {
        let defined = fields::list_for_project(&state.db, &session.project_id, None).await?;
        validate_file_field_key(&defined, key).map_err(ApiError::BadRequest)?;
    }

    let file_id = Uuid::new_v4().to_string();
    let stored_path = state
        .uploads
        .save(&session.id, &file_id, &upload.file_name, &upload.bytes)
        .await?;

    let record = NewFile {
        id: file_id,
        field_key,
        original_name: upload.file_name,
        stored_path,
        content_type: upload.content_type,
        size_bytes: upload.bytes.len() as i64,
    };

    let saved = match files::insert(&state.db, &session.id, &record).await {
        Ok(saved) => saved,
        Err(e) => {
            // Keep disk and database in step
            if let Err(io) = state.uploads.remove(&record.stored_path).await {
                warn!("Failed to remove orphaned upload {}: {}", record.stored_path, io);
            }
            return Err(e.into());
        }
    };

    info!(
        session_id = %session.id,
        file_id = %saved.id,
        size = saved.size_bytes,
        "Presentation file uploaded"
    );
    state
        .event_bus
        .emit_lossy(PortalEvent::submission(&session.project_id, &session.id, "files"));

    Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /api/sessions/:id/files
pub async fn list_session_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<PresentationFile>>> {
    let session = load_session(&state, &id).await?;
    Ok(Json(files::list_for_session(&state.db, &session.id).await?))
}

/// DELETE /api/sessions/:id/files/:file_id
pub async fn delete_session_file(
    State(state): State<AppState>,
    Path((id, file_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let session = load_session(&state, &id).await?;

    let file = files::get(&state.db, &file_id)
        .await?
        .filter(|f| f.session_id == session.id)
        .ok_or_else(|| ApiError::NotFound(format!("file {}", file_id)))?;

    files::delete(&state.db, &file.id).await?;
    state.uploads.remove(&file.stored_path).await?;

    state
        .event_bus
        .emit_lossy(PortalEvent::submission(&session.project_id, &session.id, "files"));
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/projects/:id/files
pub async fn list_project_files(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Vec<PresentationFile>>> {
    projects::get(&state.db, &project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {}", project_id)))?;
    Ok(Json(files::list_for_project(&state.db, &project_id).await?))
}

/// GET /api/admin/files/:file_id
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let file = files::get(&state.db, &file_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("file {}", file_id)))?;

    let bytes = state.uploads.read(&file.stored_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound(format!("stored file for {}", file.id))
        } else {
            ApiError::Io(e)
        }
    })?;

    let content_type = file
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let disposition = format!(
        "attachment; filename=\"{}\"",
        crate::storage::sanitize_file_name(&file.original_name)
    );

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
