//! Event registration endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        pagination::Pagination,
        registrations::{RegistrationCreate, RegistrationResponse},
    },
    auth::{
        guard::{RequireAdmin, can_act, ensure_can_act},
        identity::Identity,
    },
    db::{
        errors::DbError,
        handlers::{events::Events, registrations::Registrations, repository::Repository},
        models::registrations::RegistrationCreateDBRequest,
    },
    errors::{Error, Result},
    types::{EventId, RegistrationId, UserId},
};

/// Register for an event
///
/// Callers register themselves; passing another `user_id` requires the
/// admin role. Only active, approved events accept registrations.
#[utoipa::path(
    post,
    path = "/registrations",
    request_body = RegistrationCreate,
    tag = "registrations",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Registered", body = RegistrationResponse),
        (status = 400, description = "Event is not open for registration"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Registering someone else without the admin role"),
        (status = 404, description = "No such event"),
        (status = 409, description = "Already registered"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = identity.id, event_id = request.event_id))]
pub async fn create_registration(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<RegistrationCreate>,
) -> Result<(StatusCode, Json<RegistrationResponse>)> {
    let attendee = request.user_id.unwrap_or(identity.id);
    ensure_can_act(&identity, attendee, "registration")?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let mut events = Events::new(&mut conn);
    let event = events
        .get_by_id(request.event_id)
        .await?
        .ok_or_else(|| Error::not_found("Event", request.event_id))?;
    if !event.is_public() {
        return Err(Error::Validation {
            message: "Event is not open for registration".to_string(),
        });
    }

    let mut registrations = Registrations::new(&mut conn);
    let registration = registrations
        .create(&RegistrationCreateDBRequest {
            user_id: attendee,
            event_id: request.event_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(RegistrationResponse::from(registration))))
}

/// List every registration on the platform
#[utoipa::path(
    get,
    path = "/registrations",
    tag = "registrations",
    params(Pagination),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All registrations", body = Vec<RegistrationResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an admin"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_registrations(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<RegistrationResponse>>> {
    let (skip, limit) = pagination.params();

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut registrations = Registrations::new(&mut conn);
    let list = registrations.list(skip, limit).await?;

    Ok(Json(list.into_iter().map(RegistrationResponse::from).collect()))
}

/// Fetch a single registration
#[utoipa::path(
    get,
    path = "/registrations/{id}",
    tag = "registrations",
    params(("id" = i64, Path, description = "Registration ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The registration", body = RegistrationResponse),
        (status = 403, description = "Caller is neither the registrant nor an admin"),
        (status = 404, description = "No such registration"),
    )
)]
#[tracing::instrument(skip_all, fields(registration_id = id))]
pub async fn get_registration(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<RegistrationId>,
) -> Result<Json<RegistrationResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut registrations = Registrations::new(&mut conn);

    let registration = registrations
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found("Registration", id))?;
    ensure_can_act(&identity, registration.user_id, "registration")?;

    Ok(Json(RegistrationResponse::from(registration)))
}

/// List a user's registrations
#[utoipa::path(
    get,
    path = "/users/{id}/registrations",
    tag = "registrations",
    params(("id" = i64, Path, description = "User ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Registrations made by the user", body = Vec<RegistrationResponse>),
        (status = 403, description = "Caller is neither the user nor an admin"),
    )
)]
#[tracing::instrument(skip_all, fields(target = id))]
pub async fn list_user_registrations(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<UserId>,
) -> Result<Json<Vec<RegistrationResponse>>> {
    ensure_can_act(&identity, id, "registration")?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut registrations = Registrations::new(&mut conn);
    let list = registrations.list_for_user(id).await?;

    Ok(Json(list.into_iter().map(RegistrationResponse::from).collect()))
}

/// List the caller's registrations
#[utoipa::path(
    get,
    path = "/registrations/mine",
    tag = "registrations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Registrations made by the caller", body = Vec<RegistrationResponse>),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = identity.id))]
pub async fn list_my_registrations(State(state): State<AppState>, identity: Identity) -> Result<Json<Vec<RegistrationResponse>>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut registrations = Registrations::new(&mut conn);
    let list = registrations.list_for_user(identity.id).await?;

    Ok(Json(list.into_iter().map(RegistrationResponse::from).collect()))
}

/// List registrations for an event
///
/// Restricted to the event's owner and admins.
#[utoipa::path(
    get,
    path = "/events/{id}/registrations",
    tag = "registrations",
    params(("id" = i64, Path, description = "Event ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Registrations for the event", body = Vec<RegistrationResponse>),
        (status = 403, description = "Caller is neither the owner nor an admin"),
        (status = 404, description = "No such event"),
    )
)]
#[tracing::instrument(skip_all, fields(event_id = id))]
pub async fn list_event_registrations(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<EventId>,
) -> Result<Json<Vec<RegistrationResponse>>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let mut events = Events::new(&mut conn);
    let event = events.get_by_id(id).await?.ok_or_else(|| Error::not_found("Event", id))?;
    ensure_can_act(&identity, event.user_id, "event")?;

    let mut registrations = Registrations::new(&mut conn);
    let list = registrations.list_for_event(id).await?;

    Ok(Json(list.into_iter().map(RegistrationResponse::from).collect()))
}

/// Cancel a registration
#[utoipa::path(
    delete,
    path = "/registrations/{id}",
    tag = "registrations",
    params(("id" = i64, Path, description = "Registration ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Registration cancelled"),
        (status = 403, description = "Caller is neither the registrant nor an admin"),
        (status = 404, description = "No such registration"),
    )
)]
#[tracing::instrument(skip_all, fields(registration_id = id))]
pub async fn delete_registration(State(state): State<AppState>, identity: Identity, Path(id): Path<RegistrationId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut registrations = Registrations::new(&mut conn);

    let registration = registrations
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found("Registration", id))?;

    if !can_act(&identity, registration.user_id) {
        return Err(Error::Forbidden {
            message: "Not allowed to cancel this registration".to_string(),
        });
    }

    registrations.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
