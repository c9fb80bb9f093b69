//! Event endpoints.
//!
//! Anonymous callers only ever see active, approved events. Owners and
//! admins additionally see unapproved or deactivated ones.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        events::{ApprovalRequest, EventCreate, EventListQuery, EventResponse, EventUpdate},
        pagination::Pagination,
    },
    auth::{
        guard::{RequireAdmin, can_act, ensure_can_act},
        identity::Identity,
    },
    db::{
        errors::DbError,
        handlers::{
            events::{EventFilter, Events},
            repository::Repository,
        },
        models::events::{EventCreateDBRequest, EventUpdateDBRequest},
    },
    errors::{Error, Result},
    types::EventId,
};

/// List publicly visible events
#[utoipa::path(
    get,
    path = "/events",
    tag = "events",
    params(Pagination, EventListQuery),
    responses(
        (status = 200, description = "Active, approved events", body = Vec<EventResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<EventListQuery>,
) -> Result<Json<Vec<EventResponse>>> {
    let (skip, limit) = pagination.params();

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut events = Events::new(&mut conn);
    let list = events
        .list(
            &EventFilter::new(skip, limit)
                .public()
                .with_event_type(filters.event_type)
                .with_user_type(filters.user_type),
        )
        .await?;

    Ok(Json(list.into_iter().map(EventResponse::from).collect()))
}

/// List trending events
#[utoipa::path(
    get,
    path = "/events/trending",
    tag = "events",
    params(Pagination),
    responses(
        (status = 200, description = "Trending public events", body = Vec<EventResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_trending_events(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<EventResponse>>> {
    let (skip, limit) = pagination.params();

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut events = Events::new(&mut conn);
    let list = events.list(&EventFilter::new(skip, limit).public().trending()).await?;

    Ok(Json(list.into_iter().map(EventResponse::from).collect()))
}

/// List every event, regardless of visibility
#[utoipa::path(
    get,
    path = "/events/all",
    tag = "events",
    params(Pagination, EventListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All events", body = Vec<EventResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an admin"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_all_events(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<EventListQuery>,
) -> Result<Json<Vec<EventResponse>>> {
    let (skip, limit) = pagination.params();

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut events = Events::new(&mut conn);
    let list = events
        .list(
            &EventFilter::new(skip, limit)
                .with_event_type(filters.event_type)
                .with_user_type(filters.user_type),
        )
        .await?;

    Ok(Json(list.into_iter().map(EventResponse::from).collect()))
}

/// List the caller's own events, including unapproved ones
#[utoipa::path(
    get,
    path = "/events/mine",
    tag = "events",
    params(Pagination),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Events created by the caller", body = Vec<EventResponse>),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = identity.id))]
pub async fn list_my_events(
    State(state): State<AppState>,
    identity: Identity,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<EventResponse>>> {
    let (skip, limit) = pagination.params();

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut events = Events::new(&mut conn);
    let list = events.list(&EventFilter::new(skip, limit).owned_by(identity.id)).await?;

    Ok(Json(list.into_iter().map(EventResponse::from).collect()))
}

/// Fetch a single event
///
/// Unapproved or deactivated events are only visible to their owner and to
/// admins; everyone else gets a 404, not a 403, so their existence leaks
/// nothing.
#[utoipa::path(
    get,
    path = "/events/{id}",
    tag = "events",
    params(("id" = i64, Path, description = "Event ID")),
    responses(
        (status = 200, description = "The event", body = EventResponse),
        (status = 404, description = "No such event, or not visible to the caller"),
    )
)]
#[tracing::instrument(skip_all, fields(event_id = id))]
pub async fn get_event(
    State(state): State<AppState>,
    identity: Option<Identity>,
    Path(id): Path<EventId>,
) -> Result<Json<EventResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut events = Events::new(&mut conn);
    let event = events.get_by_id(id).await?.ok_or_else(|| Error::not_found("Event", id))?;

    if !event.is_public() {
        let visible = identity.as_ref().is_some_and(|caller| can_act(caller, event.user_id));
        if !visible {
            return Err(Error::not_found("Event", id));
        }
    }

    Ok(Json(EventResponse::from(event)))
}

/// Create an event
///
/// New events start in the PENDING moderation state and stay invisible to
/// the public until an admin approves them.
#[utoipa::path(
    post,
    path = "/events",
    request_body = EventCreate,
    tag = "events",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = identity.id))]
pub async fn create_event(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<EventCreate>,
) -> Result<(StatusCode, Json<EventResponse>)> {
    if request.event_name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Event name must not be empty".to_string(),
        });
    }
    if request.event_end_date < request.event_start_date {
        return Err(Error::Validation {
            message: "Event end date must not precede its start date".to_string(),
        });
    }

    let create_request = EventCreateDBRequest {
        user_id: identity.id,
        event_name: request.event_name,
        email: request.email.unwrap_or_default(),
        phone: request.phone.unwrap_or_default(),
        location: request.location.unwrap_or_default(),
        description: request.description.unwrap_or_default(),
        event_type: request.event_type.unwrap_or_default(),
        user_type: request.user_type.unwrap_or_default(),
        image: request.image.unwrap_or_default(),
        registration_fee: request.registration_fee.unwrap_or(0.0),
        event_start_date: request.event_start_date,
        event_end_date: request.event_end_date,
    };

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut events = Events::new(&mut conn);
    let event = events.create(&create_request).await?;

    Ok((StatusCode::CREATED, Json(EventResponse::from(event))))
}

/// Update an event
#[utoipa::path(
    put,
    path = "/events/{id}",
    request_body = EventUpdate,
    tag = "events",
    params(("id" = i64, Path, description = "Event ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated event", body = EventResponse),
        (status = 403, description = "Caller is neither the owner nor an admin"),
        (status = 404, description = "No such event"),
    )
)]
#[tracing::instrument(skip_all, fields(event_id = id))]
pub async fn update_event(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<EventId>,
    Json(request): Json<EventUpdate>,
) -> Result<Json<EventResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut events = Events::new(&mut conn);
    let event = events.get_by_id(id).await?.ok_or_else(|| Error::not_found("Event", id))?;

    ensure_can_act(&identity, event.user_id, "event")?;

    let update = EventUpdateDBRequest {
        event_name: request.event_name,
        email: request.email,
        phone: request.phone,
        location: request.location,
        description: request.description,
        event_type: request.event_type,
        user_type: request.user_type,
        image: request.image,
        registration_fee: request.registration_fee,
        event_start_date: request.event_start_date,
        event_end_date: request.event_end_date,
        trending: request.trending,
        status: request.status,
        approval: None, // Moderation has its own endpoint
    };
    let updated = events.update(id, &update).await?;

    Ok(Json(EventResponse::from(updated)))
}

/// Approve or reject an event
#[utoipa::path(
    put,
    path = "/events/{id}/approval",
    request_body = ApprovalRequest,
    tag = "events",
    params(("id" = i64, Path, description = "Event ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Moderated event", body = EventResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such event"),
    )
)]
#[tracing::instrument(skip_all, fields(event_id = id))]
pub async fn set_event_approval(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<EventId>,
    Json(request): Json<ApprovalRequest>,
) -> Result<Json<EventResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut events = Events::new(&mut conn);
    let event = match events.set_approval(id, request.approval).await {
        Ok(event) => event,
        Err(DbError::NotFound) => return Err(Error::not_found("Event", id)),
        Err(e) => return Err(e.into()),
    };

    Ok(Json(EventResponse::from(event)))
}

/// Delete an event
#[utoipa::path(
    delete,
    path = "/events/{id}",
    tag = "events",
    params(("id" = i64, Path, description = "Event ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 403, description = "Caller is neither the owner nor an admin"),
        (status = 404, description = "No such event"),
    )
)]
#[tracing::instrument(skip_all, fields(event_id = id))]
pub async fn delete_event(State(state): State<AppState>, identity: Identity, Path(id): Path<EventId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut events = Events::new(&mut conn);
    let event = events.get_by_id(id).await?.ok_or_else(|| Error::not_found("Event", id))?;

    ensure_can_act(&identity, event.user_id, "event")?;
    events.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
