//! Test fixtures shared across unit and integration tests (available with the
//! `test-utils` feature).

use chrono::{Duration, Utc};
use sqlx::PgConnection;

use crate::auth::password::{self, Argon2Params};
use crate::auth::session::generate_session_token;
use crate::config::Config;
use crate::db::handlers::{events::Events, repository::Repository, sessions::Sessions, users::Users};
use crate::db::models::{
    events::{EventCreateDBRequest, EventDBResponse},
    sessions::{SessionCreateDBRequest, SessionDBResponse},
    users::{UserCreateDBRequest, UserDBResponse},
};
use crate::types::{EventId, UserId};

// Deliberately weak hashing parameters; production defaults make test suites crawl
const TEST_ARGON2_PARAMS: Argon2Params = Argon2Params {
    memory_kib: 1024,
    iterations: 1,
    parallelism: 1,
};

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.auth.password.argon2_memory_kib = TEST_ARGON2_PARAMS.memory_kib;
    config.auth.password.argon2_iterations = TEST_ARGON2_PARAMS.iterations;
    config.auth.password.argon2_parallelism = TEST_ARGON2_PARAMS.parallelism;
    config.background_services.session_sweeper.enabled = false;
    config
}

pub async fn create_test_user(conn: &mut PgConnection, email: &str, role: &str) -> UserDBResponse {
    create_test_user_with_password(conn, email, role, "test-password").await
}

pub async fn create_test_user_with_password(conn: &mut PgConnection, email: &str, role: &str, password: &str) -> UserDBResponse {
    let password_hash = password::hash_string_with_params(password, Some(TEST_ARGON2_PARAMS)).expect("failed to hash test password");

    let request = UserCreateDBRequest {
        name: "Test User".to_string(),
        email: email.to_string(),
        phone: String::new(),
        password_hash,
        role: role.to_string(),
        age: None,
        image: None,
    };

    let mut users = Users::new(conn);
    users.create(&request).await.expect("failed to create test user")
}

pub async fn create_test_session(conn: &mut PgConnection, user_id: UserId, offset: Duration) -> SessionDBResponse {
    let request = SessionCreateDBRequest {
        token: generate_session_token(),
        user_id,
        expires_at: Utc::now() + offset,
        ip_address: None,
        user_agent: None,
    };

    let mut sessions = Sessions::new(conn);
    sessions.create(&request).await.expect("failed to create test session")
}

pub async fn create_test_event(conn: &mut PgConnection, user_id: UserId, name: &str) -> EventDBResponse {
    let request = EventCreateDBRequest {
        user_id,
        event_name: name.to_string(),
        email: String::new(),
        phone: String::new(),
        location: "Test Hall".to_string(),
        description: String::new(),
        event_type: "conference".to_string(),
        user_type: "individual".to_string(),
        image: String::new(),
        registration_fee: 0.0,
        event_start_date: Utc::now() + Duration::days(7),
        event_end_date: Utc::now() + Duration::days(8),
    };

    let mut events = Events::new(conn);
    events.create(&request).await.expect("failed to create test event")
}

/// Approve an event so it shows up in public listings. Events are created
/// active, so approval is the only gate left.
pub async fn approve_event(conn: &mut PgConnection, event_id: EventId) {
    use crate::api::models::events::ApprovalStatus;

    let mut events = Events::new(conn);
    events
        .set_approval(event_id, ApprovalStatus::Approved)
        .await
        .expect("failed to approve test event");
}
