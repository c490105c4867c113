//! portal-server library
//!
//! HTTP API for the speaker portal: speaker form steps, admin console and
//! the external roster sync. Exposed as a library for integration testing.

pub mod api;
pub mod db;
pub mod error;
pub mod external;
pub mod pagination;
pub mod storage;
pub mod sync;
pub mod validation;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use portal_common::events::EventBus;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::external::{DirectoryError, ExternalDirectory};
use crate::storage::UploadStore;
use crate::sync::SyncEngine;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Event bus for the admin SSE stream
    pub event_bus: EventBus,
    /// None when no external datastore is configured
    pub directory: Option<Arc<dyn ExternalDirectory>>,
    /// SHA-256 of the admin key; None disables admin auth
    pub admin_key_digest: Option<String>,
    /// Required `x-webhook-secret` value; None accepts any webhook
    pub webhook_secret: Option<String>,
    pub uploads: UploadStore,
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            event_bus,
            directory: None,
            admin_key_digest: None,
            webhook_secret: None,
            uploads: UploadStore::new(uploads_dir),
            max_upload_bytes: portal_common::config::DEFAULT_MAX_UPLOAD_BYTES as usize,
            startup_time: Utc::now(),
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn ExternalDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_admin_key_digest(mut self, digest: Option<String>) -> Self {
        self.admin_key_digest = digest;
        self
    }

    pub fn with_webhook_secret(mut self, secret: Option<String>) -> Self {
        self.webhook_secret = secret;
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = usize::try_from(bytes).unwrap_or(usize::MAX);
        self
    }

    pub fn directory(&self) -> Result<Arc<dyn ExternalDirectory>, DirectoryError> {
        self.directory.clone().ok_or(DirectoryError::NotConfigured)
    }

    /// Sync engine over the configured directory
    pub fn sync_engine(&self) -> Result<SyncEngine, DirectoryError> {
        Ok(SyncEngine::new(
            self.db.clone(),
            self.directory()?,
            self.event_bus.clone(),
        ))
    }
}

/// Build application router
///
/// Admin routes sit behind the admin key middleware; speaker routes, the
/// webhook and health are public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let admin = api::admin_routes().layer(
        middleware::from_fn_with_state(state.clone(), api::admin_auth_middleware),
    );

    let public = Router::new()
        .merge(api::speaker_routes(state.max_upload_bytes))
        .merge(api::webhook_routes())
        .merge(api::health_routes());

    Router::new()
        .merge(admin)
        .merge(public)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
