//! User account endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        auth::SessionResponse,
        pagination::Pagination,
        users::{ChangePasswordRequest, UserCreate, UserResponse, UserUpdate},
    },
    auth::{
        guard::{RequireAdmin, ensure_can_act},
        identity::Identity,
        password, session,
    },
    db::{
        errors::DbError,
        handlers::{
            repository::Repository,
            sessions::Sessions,
            users::{UserFilter, Users},
        },
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::{Error, Result},
    types::UserId,
};

/// Register a new user account
#[utoipa::path(
    post,
    path = "/users",
    request_body = UserCreate,
    tag = "users",
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(State(state): State<AppState>, Json(request): Json<UserCreate>) -> Result<(StatusCode, Json<UserResponse>)> {
    if !session::is_valid_email(&request.email) {
        return Err(Error::Validation {
            message: "Invalid email address".to_string(),
        });
    }

    let password_config = &state.config.auth.password;
    password::validate_password(&request.password, password_config.min_length, password_config.max_length)?;

    // Hash on a blocking thread to keep argon2 off the async runtime
    let plaintext = request.password.clone();
    let params = password_config.argon2_params();
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string_with_params(&plaintext, Some(params)))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("join password hashing task: {e}"),
        })??;

    let create_request = UserCreateDBRequest {
        name: request.name,
        email: request.email,
        phone: request.phone.unwrap_or_default(),
        password_hash,
        role: request.role.unwrap_or_else(|| "user".to_string()),
        age: request.age,
        image: request.image,
    };

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut users = Users::new(&mut conn);
    let user = users.create(&create_request).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// List user accounts
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(Pagination),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an admin"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<UserResponse>>> {
    let (skip, limit) = pagination.params();

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut users = Users::new(&mut conn);
    let list = users.list(&UserFilter::new(skip, limit)).await?;

    Ok(Json(list.into_iter().map(UserResponse::from).collect()))
}

/// Fetch a single user account
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 403, description = "Caller is neither the user nor an admin"),
        (status = 404, description = "No such user"),
    )
)]
#[tracing::instrument(skip_all, fields(target = id))]
pub async fn get_user(State(state): State<AppState>, identity: Identity, Path(id): Path<UserId>) -> Result<Json<UserResponse>> {
    ensure_can_act(&identity, id, "account")?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut users = Users::new(&mut conn);
    let user = users.get_by_id(id).await?.ok_or_else(|| Error::not_found("User", id))?;

    Ok(Json(UserResponse::from(user)))
}

/// Update a user account
#[utoipa::path(
    put,
    path = "/users/{id}",
    request_body = UserUpdate,
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 403, description = "Caller is neither the user nor an admin"),
        (status = 404, description = "No such user"),
    )
)]
#[tracing::instrument(skip_all, fields(target = id))]
pub async fn update_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<UserId>,
    Json(request): Json<UserUpdate>,
) -> Result<Json<UserResponse>> {
    ensure_can_act(&identity, id, "account")?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut users = Users::new(&mut conn);
    let user = match users.update(id, &UserUpdateDBRequest::from(request)).await {
        Ok(user) => user,
        Err(DbError::NotFound) => return Err(Error::not_found("User", id)),
        Err(e) => return Err(e.into()),
    };

    Ok(Json(UserResponse::from(user)))
}

/// Change a user's password
///
/// Users change their own password by proving the current one; admins may
/// reset anyone's without it.
#[utoipa::path(
    put,
    path = "/users/{id}/password",
    request_body = ChangePasswordRequest,
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Password changed"),
        (status = 401, description = "Current password is wrong"),
        (status = 403, description = "Caller is neither the user nor an admin"),
        (status = 404, description = "No such user"),
    )
)]
#[tracing::instrument(skip_all, fields(target = id))]
pub async fn change_password(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<UserId>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    ensure_can_act(&identity, id, "account")?;

    let password_config = &state.config.auth.password;
    password::validate_password(&request.new_password, password_config.min_length, password_config.max_length)?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut users = Users::new(&mut conn);
    let user = users.get_by_id(id).await?.ok_or_else(|| Error::not_found("User", id))?;

    if identity.id == id {
        let current = request.current_password.clone();
        let stored_hash = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || password::verify_string(&current, &stored_hash))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("join password verification task: {e}"),
            })??;
        if !verified {
            return Err(Error::Unauthenticated {
                message: Some("Invalid Password".to_string()),
            });
        }
    }

    let new_password = request.new_password.clone();
    let params = password_config.argon2_params();
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string_with_params(&new_password, Some(params)))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("join password hashing task: {e}"),
        })??;

    let update = UserUpdateDBRequest {
        password_hash: Some(password_hash),
        ..Default::default()
    };
    users.update(id, &update).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// List a user's login sessions
///
/// Tokens are not included; the listing is metadata only.
#[utoipa::path(
    get,
    path = "/users/{id}/sessions",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sessions belonging to the user", body = Vec<SessionResponse>),
        (status = 403, description = "Caller is neither the user nor an admin"),
    )
)]
#[tracing::instrument(skip_all, fields(target = id))]
pub async fn list_user_sessions(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<UserId>,
) -> Result<Json<Vec<SessionResponse>>> {
    ensure_can_act(&identity, id, "account")?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut sessions = Sessions::new(&mut conn);
    let list = sessions.list_for_user(id).await?;

    Ok(Json(list.into_iter().map(SessionResponse::from).collect()))
}

/// Delete a user account
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Caller is neither the user nor an admin"),
        (status = 404, description = "No such user"),
    )
)]
#[tracing::instrument(skip_all, fields(target = id))]
pub async fn delete_user(State(state): State<AppState>, identity: Identity, Path(id): Path<UserId>) -> Result<StatusCode> {
    ensure_can_act(&identity, id, "account")?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut users = Users::new(&mut conn);
    if !users.delete(id).await? {
        return Err(Error::not_found("User", id));
    }

    Ok(StatusCode::NO_CONTENT)
}
