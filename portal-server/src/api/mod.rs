//! HTTP API handlers

mod admin;
mod auth;
mod events;
mod files;
mod health;
mod review;
mod speaker;
mod steps;
mod sync;

pub use auth::{admin_auth_middleware, ADMIN_KEY_HEADER};
pub use health::health_routes;
pub use sync::{webhook_routes, WEBHOOK_SECRET_HEADER};

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::AppState;

/// Multipart framing overhead allowed on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Speaker-facing routes (no authentication)
pub fn speaker_routes(max_upload_bytes: usize) -> Router<AppState> {
    let uploads = Router::new()
        .route(
            "/api/sessions/:id/files",
            post(files::upload_file).get(files::list_session_files),
        )
        .route("/api/sessions/:id/files/:file_id", delete(files::delete_session_file))
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        ));

    Router::new()
        .route("/api/projects/:slug", get(speaker::get_project))
        .route("/api/projects/:slug/session", post(speaker::create_session))
        .route("/api/projects/:slug/arrival-guide", get(speaker::get_arrival_guide))
        .route("/api/sessions/:id", get(speaker::get_session))
        .route(
            "/api/sessions/:id/profile",
            get(steps::get_profile).put(steps::put_profile),
        )
        .route(
            "/api/sessions/:id/honorarium",
            get(steps::get_honorarium).put(steps::put_honorarium),
        )
        .route(
            "/api/sessions/:id/transportation",
            get(steps::get_transportation).put(steps::put_transportation),
        )
        .route(
            "/api/sessions/:id/presentation",
            get(steps::get_presentation).put(steps::put_presentation),
        )
        .route(
            "/api/sessions/:id/attendance",
            get(steps::get_attendance).put(steps::put_attendance),
        )
        .route(
            "/api/sessions/:id/consent",
            get(steps::get_consent).put(steps::put_consent),
        )
        .merge(uploads)
}

/// Admin console routes; the caller applies [`admin_auth_middleware`]
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // Projects
        .route(
            "/api/admin/projects",
            get(admin::list_projects).post(admin::create_project),
        )
        .route(
            "/api/admin/projects/:id",
            get(admin::get_project)
                .put(admin::update_project)
                .delete(admin::delete_project),
        )
        // Custom fields
        .route(
            "/api/admin/projects/:id/fields",
            get(admin::list_fields).post(admin::create_field),
        )
        .route(
            "/api/admin/fields/:field_id",
            put(admin::update_field).delete(admin::delete_field),
        )
        // Transportation rules and arrival guide
        .route(
            "/api/admin/projects/:id/transportation-rules",
            get(admin::get_transportation_rules).put(admin::put_transportation_rules),
        )
        .route(
            "/api/admin/projects/:id/arrival-guide",
            get(admin::get_arrival_guide).put(admin::put_arrival_guide),
        )
        // Submission review
        .route("/api/admin/projects/:id/submissions", get(review::list_submissions))
        .route("/api/admin/sessions/:id", get(review::get_submission))
        .route("/api/admin/projects/:id/files", get(files::list_project_files))
        .route("/api/admin/files/:file_id", get(files::download_file))
        // External sync
        .route("/api/admin/sync", post(sync::sync_all))
        .route("/api/admin/projects/:id/sync", post(sync::sync_project))
        .route("/api/admin/import", post(sync::import_projects))
        .route("/api/admin/external/projects", get(sync::list_external_projects))
        .route("/api/admin/sync/runs", get(sync::list_sync_runs))
        // Events
        .route("/api/admin/events", get(events::event_stream))
}
