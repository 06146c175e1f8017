//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use study_tracker_core::PortError;
use tracing::{error, warn};

use crate::web::{auth::session_cookie, state::AppState};

/// The authenticated caller, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub auth_session_id: String,
}

/// Middleware that validates the auth session cookie and resolves the user handle.
///
/// If valid, inserts a `CurrentUser` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Parse session ID from the cookie header
    let auth_session_id = session_cookie(req.headers())
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_string();

    // 2. Validate auth session in database, get user_id
    let user_id = state
        .auth_sessions
        .validate_auth_session(&auth_session_id)
        .await
        .map_err(|e| match e {
            PortError::Unauthorized => {
                warn!("Rejected unknown or expired auth session");
                StatusCode::UNAUTHORIZED
            }
            other => {
                error!("Failed to validate auth session: {:?}", other);
                StatusCode::SERVICE_UNAVAILABLE
            }
        })?;

    // 3. Insert the caller into request extensions and continue to the handler
    req.extensions_mut().insert(CurrentUser {
        user_id,
        auth_session_id,
    });
    Ok(next.run(req).await)
}
