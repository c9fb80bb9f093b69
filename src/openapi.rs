//! OpenAPI documentation for the management API at `/api/v1/*`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Registers the session-token bearer scheme referenced by the handlers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "bearer_auth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("Opaque session token")
                        .description(Some(
                            "Session token authentication. Obtain a token from `POST /auth/login` \
                            and send it in the `Authorization` header:\n\n\
                            ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api/v1", description = "Management API server")
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::auth::me,
        api::handlers::users::create_user,
        api::handlers::users::list_users,
        api::handlers::users::get_user,
        api::handlers::users::update_user,
        api::handlers::users::change_password,
        api::handlers::users::list_user_sessions,
        api::handlers::users::delete_user,
        api::handlers::events::list_events,
        api::handlers::events::list_trending_events,
        api::handlers::events::list_all_events,
        api::handlers::events::list_my_events,
        api::handlers::events::get_event,
        api::handlers::events::create_event,
        api::handlers::events::update_event,
        api::handlers::events::set_event_approval,
        api::handlers::events::delete_event,
        api::handlers::registrations::create_registration,
        api::handlers::registrations::list_registrations,
        api::handlers::registrations::get_registration,
        api::handlers::registrations::list_my_registrations,
        api::handlers::registrations::list_user_registrations,
        api::handlers::registrations::list_event_registrations,
        api::handlers::registrations::delete_registration,
    ),
    components(
        schemas(
            api::models::auth::LoginRequest,
            api::models::auth::LoginResponse,
            api::models::auth::LogoutResponse,
            api::models::auth::SessionResponse,
            api::models::users::UserCreate,
            api::models::users::UserUpdate,
            api::models::users::ChangePasswordRequest,
            api::models::users::UserResponse,
            api::models::events::ApprovalStatus,
            api::models::events::EventCreate,
            api::models::events::EventUpdate,
            api::models::events::ApprovalRequest,
            api::models::events::EventResponse,
            api::models::registrations::RegistrationCreate,
            api::models::registrations::RegistrationResponse,
            api::models::pagination::Pagination,
        )
    ),
    tags(
        (name = "authentication", description = "Session login, logout, and identity lookup."),
        (name = "users", description = "User account registration and management."),
        (name = "events", description = "Event listing, creation, and moderation."),
        (name = "registrations", description = "Event attendance registrations."),
    ),
    info(
        title = "Eventum API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Event management API with session-token authentication.

## Authentication

Most endpoints require a session token obtained from `POST /auth/login`, passed
in the `Authorization` header:

```
Authorization: Bearer YOUR_TOKEN
```

Tokens expire after a fixed interval and are revoked by `POST /auth/logout`.",
    ),
)]
pub struct ApiDoc;
