//! Admin key middleware
//!
//! Every `/api/admin/*` request carries the admin key in `x-admin-key`. The
//! key is hashed and compared with the digest loaded at startup.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use portal_common::api::auth::{verify_admin_key, AdminAuthError};
use tracing::warn;

use crate::{ApiError, AppState};

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Reject admin requests without a valid key
///
/// When no digest is configured admin auth is disabled and requests pass through.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(digest) = state.admin_key_digest.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    verify_admin_key(provided, digest).map_err(|e| {
        if matches!(e, AdminAuthError::InvalidKey) {
            warn!("Rejected admin request to {}: invalid key", request.uri().path());
        }
        ApiError::Unauthorized(e.to_string())
    })?;

    Ok(next.run(request).await)
}
