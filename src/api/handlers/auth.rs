//! Authentication endpoints: login, logout, current user.

use axum::{Json, extract::State, http::HeaderMap};

use crate::{
    AppState,
    api::models::{
        auth::{LoginRequest, LoginResponse, LogoutResponse},
        users::UserResponse,
    },
    auth::{
        identity::Identity,
        session::{self, ClientInfo},
    },
    db::{errors::DbError, handlers::repository::Repository, handlers::users::Users},
    errors::{Error, Result},
};

fn client_info(headers: &HeaderMap) -> ClientInfo {
    ClientInfo {
        ip_address: headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string()),
        user_agent: headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string()),
    }
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Malformed email"),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "No account with this email"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, headers: HeaderMap, Json(request): Json<LoginRequest>) -> Result<Json<LoginResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let ttl = state.config.auth.session.ttl;
    let (user, session) = session::login(&mut conn, &request.email, &request.password, ttl, client_info(&headers)).await?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        access_token: session.token,
        user: UserResponse::from(user),
    }))
}

/// Revoke the caller's session
///
/// Requires a live session; an invalid or expired token fails extraction
/// with 401 before anything is deleted.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Session revoked", body = LogoutResponse),
        (status = 401, description = "Missing, invalid, or expired session token"),
        (status = 404, description = "Session was revoked concurrently"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = identity.id))]
pub async fn logout(State(state): State<AppState>, identity: Identity) -> Result<Json<LogoutResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    session::logout(&mut conn, &identity.token).await?;

    Ok(Json(LogoutResponse {
        message: "Logout successful".to_string(),
    }))
}

/// The caller's own account
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = identity.id))]
pub async fn me(State(state): State<AppState>, identity: Identity) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut users = Users::new(&mut conn);

    let user = users
        .get_by_id(identity.id)
        .await?
        .ok_or_else(|| Error::not_found("User", identity.id))?;

    Ok(Json(UserResponse::from(user)))
}
