//! Eventum: backend for an event-management platform.
//!
//! The crate exposes a REST API for user accounts, opaque-token sessions,
//! events, and event registrations. Access control is enforced per handler
//! with three primitives:
//!
//! - [`auth::identity::Identity`]: extractor that resolves the bearer token
//!   to the calling user, rejecting the request with 401 otherwise
//! - [`auth::guard::RoleRequirement`]: explicit role checks (403 on failure)
//! - [`auth::guard::ensure_can_act`]: ownership-or-admin checks for
//!   resource mutation
//!
//! # Usage
//!
//! ```rust,no_run
//! use clap::Parser;
//! use eventum::{Application, Config, config::Args, telemetry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = Args::parse();
//!     let config = Config::load(&args)?;
//!     telemetry::init_telemetry()?;
//!     Application::new(config).await?.serve(std::future::pending()).await
//! }
//! ```
//!
//! # Migrations
//!
//! Database migrations are embedded in the binary and run automatically at
//! startup. They are also exposed for external tooling:
//!
//! ```rust,no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
//! eventum::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```

use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post, put},
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::Config;
pub use errors::{Error, Result};

use crate::openapi::ApiDoc;

/// Shared state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the eventum database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Connect to PostgreSQL and run migrations
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let url = config
        .database
        .url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("No database URL configured: set database.url or DATABASE_URL"))?;

    let pool_settings = &config.database.pool;
    let pool = PgPoolOptions::new()
        .max_connections(pool_settings.max_connections)
        .min_connections(pool_settings.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(pool_settings.acquire_timeout_secs))
        .connect(url)
        .await?;

    migrator().run(&pool).await?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;

    let mut origins = Vec::new();
    for origin in &cors_config.allowed_origins {
        origins.push(origin.parse::<HeaderValue>()?);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(cors_config.allow_credentials)
        .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE])
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ]);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// The API is served under `/api/v1`, with interactive documentation at
/// `/docs` and a plain-text health check at `/healthz`.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        // Sessions
        .route("/auth/login", post(api::handlers::auth::login))
        .route("/auth/logout", post(api::handlers::auth::logout))
        .route("/auth/me", get(api::handlers::auth::me))
        // User accounts (registration is open, listing is admin only)
        .route("/users", get(api::handlers::users::list_users))
        .route("/users", post(api::handlers::users::create_user))
        .route("/users/{id}", get(api::handlers::users::get_user))
        .route("/users/{id}", put(api::handlers::users::update_user))
        .route("/users/{id}", delete(api::handlers::users::delete_user))
        .route("/users/{id}/password", put(api::handlers::users::change_password))
        .route("/users/{id}/sessions", get(api::handlers::users::list_user_sessions))
        .route("/users/{id}/registrations", get(api::handlers::registrations::list_user_registrations))
        // Events (specific paths before the {id} capture)
        .route("/events", get(api::handlers::events::list_events))
        .route("/events", post(api::handlers::events::create_event))
        .route("/events/trending", get(api::handlers::events::list_trending_events))
        .route("/events/all", get(api::handlers::events::list_all_events))
        .route("/events/mine", get(api::handlers::events::list_my_events))
        .route("/events/{id}", get(api::handlers::events::get_event))
        .route("/events/{id}", put(api::handlers::events::update_event))
        .route("/events/{id}", delete(api::handlers::events::delete_event))
        .route("/events/{id}/approval", put(api::handlers::events::set_event_approval))
        .route("/events/{id}/registrations", get(api::handlers::registrations::list_event_registrations))
        // Registrations (the bare listing is admin only)
        .route("/registrations", get(api::handlers::registrations::list_registrations))
        .route("/registrations", post(api::handlers::registrations::create_registration))
        .route("/registrations/mine", get(api::handlers::registrations::list_my_registrations))
        .route("/registrations/{id}", get(api::handlers::registrations::get_registration))
        .route("/registrations/{id}", delete(api::handlers::registrations::delete_registration))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;
    let router = router.layer(cors_layer);

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Container for background tasks and their lifecycle management.
///
/// Holds the expired-session sweeper when enabled. When dropped, the
/// `drop_guard` cancels the shutdown token, signaling all tasks to stop.
pub struct BackgroundServices {
    background_tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown_token: tokio_util::sync::CancellationToken,
    // Pub so that we can disarm it if we want to
    pub drop_guard: Option<tokio_util::sync::DropGuard>,
}

impl BackgroundServices {
    /// Gracefully shutdown all background tasks
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();

        for handle in self.background_tasks {
            let _ = handle.await;
        }
    }
}

/// Setup background services (expired-session sweeper)
fn setup_background_services(pool: PgPool, config: &Config, shutdown_token: tokio_util::sync::CancellationToken) -> BackgroundServices {
    let drop_guard = shutdown_token.clone().drop_guard();
    let mut background_tasks = Vec::new();

    let sweeper_config = &config.background_services.session_sweeper;
    if sweeper_config.enabled {
        let interval = sweeper_config.interval;
        let sweeper_shutdown = shutdown_token.clone();
        let handle = tokio::spawn(async move {
            info!("Starting session sweeper with interval {:?}", interval);
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately; skip it so a restart loop doesn't hammer the database
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = sweep_expired_sessions(&pool).await {
                            tracing::error!("Session sweep failed: {e}");
                        }
                    }
                    _ = sweeper_shutdown.cancelled() => {
                        info!("Session sweeper shutting down");
                        break;
                    }
                }
            }
        });
        background_tasks.push(handle);
    }

    BackgroundServices {
        background_tasks,
        shutdown_token,
        drop_guard: Some(drop_guard),
    }
}

async fn sweep_expired_sessions(pool: &PgPool) -> Result<()> {
    use crate::db::handlers::sessions::Sessions;

    let mut conn = pool.acquire().await.map_err(db::errors::DbError::from)?;
    let mut sessions = Sessions::new(&mut conn);
    let removed = sessions.delete_expired(chrono::Utc::now()).await?;
    if removed > 0 {
        info!("Session sweeper removed {removed} expired sessions");
    }
    Ok(())
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] connects to the database, runs
///    migrations, and starts background services
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts
///    handling requests
/// 3. **Shutdown**: when the shutdown future resolves, in-flight requests
///    drain and background tasks are stopped
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    bg_services: BackgroundServices,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting eventum with configuration: {:#?}", config);

        let pool = setup_database(&config).await?;

        let shutdown_token = tokio_util::sync::CancellationToken::new();
        let bg_services = setup_background_services(pool.clone(), &config, shutdown_token);

        let app_state = AppState {
            db: pool.clone(),
            config: config.clone(),
        };
        let router = build_router(&app_state)?;

        Ok(Self {
            router,
            config,
            pool,
            bg_services,
        })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Eventum listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        self.bg_services.shutdown().await;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::models::{auth::LoginResponse, events::EventResponse, users::UserResponse},
        test_utils,
        types::ADMIN_ROLE,
    };
    use axum_test::TestServer;
    use serde_json::json;

    fn test_server(pool: PgPool) -> TestServer {
        let state = AppState {
            db: pool,
            config: test_utils::create_test_config(),
        };
        let router = build_router(&state).expect("failed to build router");
        TestServer::new(router).expect("failed to create test server")
    }

    async fn login(server: &TestServer, email: &str, password: &str) -> String {
        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .await;
        response.assert_status_ok();
        response.json::<LoginResponse>().access_token
    }

    #[sqlx::test]
    async fn test_healthz(pool: PgPool) {
        let server = test_server(pool);
        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[sqlx::test]
    async fn test_register_login_me_logout_flow(pool: PgPool) {
        let server = test_server(pool);

        let response = server
            .post("/api/v1/users")
            .json(&json!({
                "name": "Flow User",
                "email": "flow@example.com",
                "password": "long-enough-password"
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let created = response.json::<UserResponse>();
        assert_eq!(created.email, "flow@example.com");

        let token = login(&server, "flow@example.com", "long-enough-password").await;

        let response = server.get("/api/v1/auth/me").authorization_bearer(&token).await;
        response.assert_status_ok();
        assert_eq!(response.json::<UserResponse>().id, created.id);

        let response = server.post("/api/v1/auth/logout").authorization_bearer(&token).await;
        response.assert_status_ok();

        // The token is dead after logout, for /me and for logout itself
        let response = server.get("/api/v1/auth/me").authorization_bearer(&token).await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);

        let response = server.post("/api/v1/auth/logout").authorization_bearer(&token).await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_missing_token_gets_401(pool: PgPool) {
        let server = test_server(pool);
        let response = server.get("/api/v1/auth/me").await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);

        // Logout authenticates like everything else; a token that was never
        // issued is rejected, not reported as a missing session
        let response = server.post("/api/v1/auth/logout").authorization_bearer("never-issued-token").await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_admin_endpoint_requires_admin_role(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        test_utils::create_test_user_with_password(&mut conn, "plain@example.com", "user", "plain-password").await;
        test_utils::create_test_user_with_password(&mut conn, "admin@example.com", ADMIN_ROLE, "admin-password").await;
        drop(conn);

        let server = test_server(pool);

        // Regular user: authenticated but forbidden
        let token = login(&server, "plain@example.com", "plain-password").await;
        let response = server.get("/api/v1/users").authorization_bearer(&token).await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);

        // Admin passes
        let token = login(&server, "admin@example.com", "admin-password").await;
        let response = server.get("/api/v1/users").authorization_bearer(&token).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Vec<UserResponse>>().len(), 2);

        // Anonymous caller is rejected before the role check
        let response = server.get("/api/v1/users").await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_event_moderation_and_visibility(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        test_utils::create_test_user_with_password(&mut conn, "organizer@example.com", "user", "organizer-pass").await;
        test_utils::create_test_user_with_password(&mut conn, "visitor@example.com", "user", "visitor-pass").await;
        test_utils::create_test_user_with_password(&mut conn, "admin@example.com", ADMIN_ROLE, "admin-password").await;
        drop(conn);

        let server = test_server(pool);
        let organizer_token = login(&server, "organizer@example.com", "organizer-pass").await;
        let visitor_token = login(&server, "visitor@example.com", "visitor-pass").await;
        let admin_token = login(&server, "admin@example.com", "admin-password").await;

        let response = server
            .post("/api/v1/events")
            .authorization_bearer(&organizer_token)
            .json(&json!({
                "event_name": "Launch Party",
                "event_start_date": "2026-09-01T18:00:00Z",
                "event_end_date": "2026-09-01T22:00:00Z"
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let event = response.json::<EventResponse>();

        // Pending events are hidden from other users, 404 so existence leaks nothing
        let response = server
            .get(&format!("/api/v1/events/{}", event.id))
            .authorization_bearer(&visitor_token)
            .await;
        response.assert_status(axum::http::StatusCode::NOT_FOUND);

        // The owner still sees it
        let response = server
            .get(&format!("/api/v1/events/{}", event.id))
            .authorization_bearer(&organizer_token)
            .await;
        response.assert_status_ok();

        // Moderation is admin only
        let response = server
            .put(&format!("/api/v1/events/{}/approval", event.id))
            .authorization_bearer(&organizer_token)
            .json(&json!({ "approval": "APPROVED" }))
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);

        let response = server
            .put(&format!("/api/v1/events/{}/approval", event.id))
            .authorization_bearer(&admin_token)
            .json(&json!({ "approval": "APPROVED" }))
            .await;
        response.assert_status_ok();

        // Approved and active events are public, no token needed
        let response = server.get(&format!("/api/v1/events/{}", event.id)).await;
        response.assert_status_ok();

        let response = server.get("/api/v1/events").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Vec<EventResponse>>().len(), 1);
    }

    #[sqlx::test]
    async fn test_registration_requires_public_event(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let organizer = test_utils::create_test_user_with_password(&mut conn, "host@example.com", "user", "host-password").await;
        test_utils::create_test_user_with_password(&mut conn, "guest@example.com", "user", "guest-password").await;
        let event = test_utils::create_test_event(&mut conn, organizer.id, "Workshop").await;
        drop(conn);

        let server = test_server(pool.clone());
        let guest_token = login(&server, "guest@example.com", "guest-password").await;

        // Event starts unapproved; registration is rejected
        let response = server
            .post("/api/v1/registrations")
            .authorization_bearer(&guest_token)
            .json(&json!({ "event_id": event.id }))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);

        let mut conn = pool.acquire().await.unwrap();
        test_utils::approve_event(&mut conn, event.id).await;
        drop(conn);

        let response = server
            .post("/api/v1/registrations")
            .authorization_bearer(&guest_token)
            .json(&json!({ "event_id": event.id }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        // Registering twice conflicts
        let response = server
            .post("/api/v1/registrations")
            .authorization_bearer(&guest_token)
            .json(&json!({ "event_id": event.id }))
            .await;
        response.assert_status(axum::http::StatusCode::CONFLICT);
    }

    #[sqlx::test]
    async fn test_user_cannot_touch_other_accounts(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        test_utils::create_test_user_with_password(&mut conn, "first@example.com", "user", "first-password").await;
        let second = test_utils::create_test_user_with_password(&mut conn, "second@example.com", "user", "second-password").await;
        drop(conn);

        let server = test_server(pool);
        let token = login(&server, "first@example.com", "first-password").await;

        let response = server
            .get(&format!("/api/v1/users/{}", second.id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);

        let response = server
            .put(&format!("/api/v1/users/{}", second.id))
            .authorization_bearer(&token)
            .json(&json!({ "name": "Hijacked" }))
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);

        let response = server
            .delete(&format!("/api/v1/users/{}", second.id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    async fn test_session_and_registration_listings_are_owner_or_admin(pool: PgPool) {
        use crate::api::models::{auth::SessionResponse, registrations::RegistrationResponse};

        let mut conn = pool.acquire().await.unwrap();
        let owner = test_utils::create_test_user_with_password(&mut conn, "owner@example.com", "user", "owner-password").await;
        test_utils::create_test_user_with_password(&mut conn, "nosy@example.com", "user", "nosy-password").await;
        test_utils::create_test_user_with_password(&mut conn, "admin@example.com", ADMIN_ROLE, "admin-password").await;
        let event = test_utils::create_test_event(&mut conn, owner.id, "Members Only").await;
        test_utils::approve_event(&mut conn, event.id).await;
        drop(conn);

        let server = test_server(pool);
        let owner_token = login(&server, "owner@example.com", "owner-password").await;
        let nosy_token = login(&server, "nosy@example.com", "nosy-password").await;
        let admin_token = login(&server, "admin@example.com", "admin-password").await;

        let response = server
            .post("/api/v1/registrations")
            .authorization_bearer(&owner_token)
            .json(&json!({ "event_id": event.id }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let registration = response.json::<RegistrationResponse>();

        // Owners see their own sessions and registrations
        let response = server
            .get(&format!("/api/v1/users/{}/sessions", owner.id))
            .authorization_bearer(&owner_token)
            .await;
        response.assert_status_ok();
        let sessions = response.json::<Vec<SessionResponse>>();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].user_id, owner.id);

        let response = server
            .get(&format!("/api/v1/users/{}/registrations", owner.id))
            .authorization_bearer(&owner_token)
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Vec<RegistrationResponse>>().len(), 1);

        // Other users are shut out
        let response = server
            .get(&format!("/api/v1/users/{}/sessions", owner.id))
            .authorization_bearer(&nosy_token)
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);

        let response = server
            .get(&format!("/api/v1/registrations/{}", registration.id))
            .authorization_bearer(&nosy_token)
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);

        // Admins see everything, including the global registration listing
        let response = server
            .get(&format!("/api/v1/users/{}/registrations", owner.id))
            .authorization_bearer(&admin_token)
            .await;
        response.assert_status_ok();

        let response = server.get("/api/v1/registrations").authorization_bearer(&admin_token).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Vec<RegistrationResponse>>().len(), 1);

        let response = server.get("/api/v1/registrations").authorization_bearer(&nosy_token).await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    async fn test_openapi_docs_served(pool: PgPool) {
        let server = test_server(pool);
        let response = server.get("/docs").await;
        response.assert_status_ok();
    }
}
