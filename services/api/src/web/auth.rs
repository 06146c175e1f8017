//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for handle registration, login, logout and the
//! availability check shown while a user types a handle.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_tracker_core::{users, User};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::port_rejection;
use crate::web::state::AppState;

const SESSION_COOKIE: &str = "session";
const SESSION_DAYS: i64 = 30;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub user_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            name: user.name,
            email: user.email,
            avatar: user.avatar,
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct AvailabilityQuery {
    #[serde(alias = "userId")]
    pub user_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub available: bool,
    pub message: String,
}

//=========================================================================================
// Cookie Helpers
//=========================================================================================

/// Extracts the auth session id from the `Cookie` header, if any.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

fn session_set_cookie(auth_session_id: &str) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        auth_session_id,
        Duration::days(SESSION_DAYS).num_seconds()
    )
}

fn session_clear_cookie() -> String {
    format!("{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE)
}

/// Creates an auth session for `user_id` and returns the `Set-Cookie` value.
async fn issue_session(state: &AppState, user_id: &str) -> Result<String, (StatusCode, String)> {
    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_DAYS);

    state
        .auth_sessions
        .create_auth_session(&auth_session_id, user_id, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            port_rejection(e)
        })?;

    Ok(session_set_cookie(&auth_session_id))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Claim a new handle
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 400, description = "Handle too short"),
        (status = 409, description = "Handle already taken"),
        (status = 503, description = "User store unavailable")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Normalize, validate and store the handle
    let user = users::register(
        state.users.as_ref(),
        &req.user_id,
        req.name.as_deref(),
        req.email.as_deref(),
        req.avatar.as_deref(),
    )
    .await
    .map_err(port_rejection)?;
    info!("Registered user {}", user.user_id);

    // 2. Create the initial progress record, starting the plan today
    state.progress.load(&user.user_id, Utc::now()).await;

    // 3. Log the new user in
    let cookie = issue_session(&state, &user.user_id).await?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse::from(user)),
    ))
}

/// POST /auth/login - Login with an existing handle
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 404, description = "Unknown handle; register first"),
        (status = 503, description = "User store unavailable")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = users::login(state.users.as_ref(), &req.user_id)
        .await
        .map_err(port_rejection)?;

    let cookie = issue_session(&state, &user.user_id).await?;
    info!("User {} logged in", user.user_id);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse::from(user)),
    ))
}

/// POST /auth/logout - Logout and invalidate the auth session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let auth_session_id = session_cookie(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .auth_sessions
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            port_rejection(e)
        })?;

    Ok((StatusCode::OK, [(header::SET_COOKIE, session_clear_cookie())]))
}

/// GET /auth/check - Whether a handle can still be registered
#[utoipa::path(
    get,
    path = "/auth/check",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Availability of the handle", body = AvailabilityResponse),
        (status = 503, description = "User store unavailable")
    )
)]
pub async fn check_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, (StatusCode, String)> {
    let availability = users::check_availability(state.users.as_ref(), &query.user_id)
        .await
        .map_err(port_rejection)?;

    Ok(Json(AvailabilityResponse {
        available: availability.is_available(),
        message: availability.message(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let h = headers("theme=dark; session=abc-123; lang=en");
        assert_eq!(session_cookie(&h), Some("abc-123"));
    }

    #[test]
    fn missing_or_empty_session_cookie_is_none() {
        assert_eq!(session_cookie(&HeaderMap::new()), None);
        assert_eq!(session_cookie(&headers("theme=dark")), None);
        assert_eq!(session_cookie(&headers("session=")), None);
    }

    #[test]
    fn set_cookie_lasts_thirty_days() {
        let cookie = session_set_cookie("abc");
        assert!(cookie.starts_with("session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.ends_with("Max-Age=2592000"));
        assert!(session_clear_cookie().ends_with("Max-Age=0"));
    }
}
