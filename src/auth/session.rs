//! Session lifecycle: login, token validation, logout.
//!
//! Tokens are opaque UUIDv4 strings stored server-side; possession of the
//! token is the whole credential. Validation never mutates session rows, so
//! an expired session stays in the table until the sweeper (or logout)
//! removes it.

use crate::auth::password;
use crate::db::{
    handlers::{repository::Repository, sessions::Sessions, users::Users},
    models::{
        sessions::{SessionCreateDBRequest, SessionDBResponse},
        users::UserDBResponse,
    },
};
use crate::errors::{Error, Result};
use chrono::{Duration, Utc};
use sqlx::PgConnection;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Request metadata recorded alongside a new session.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Generate a fresh opaque session token.
pub fn generate_session_token() -> String {
    Uuid::new_v4().to_string()
}

/// Minimal shape check for email addresses: one `@`, a non-empty local part,
/// and a dotted domain. Anything stricter belongs to the mail provider.
pub fn is_valid_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty()
}

/// Authenticate a user by email and password, issuing a new session.
///
/// Unknown emails and wrong passwords fail differently: the former is a
/// missing resource, the latter a rejected credential.
#[instrument(skip(conn, password, client), fields(email = %email), err)]
pub async fn login(
    conn: &mut PgConnection,
    email: &str,
    password: &str,
    ttl: std::time::Duration,
    client: ClientInfo,
) -> Result<(UserDBResponse, SessionDBResponse)> {
    if !is_valid_email(email) {
        return Err(Error::Validation {
            message: "Invalid email address".to_string(),
        });
    }
    if password.is_empty() {
        return Err(Error::Validation {
            message: "Password must not be empty".to_string(),
        });
    }

    let mut users = Users::new(conn);
    let user = users.get_user_by_email(email).await?.ok_or_else(|| Error::NotFound {
        message: "User does not exist.".to_string(),
    })?;

    // Argon2 verification is CPU-bound; keep it off the async runtime
    let candidate = password.to_string();
    let stored_hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || password::verify_string(&candidate, &stored_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("join password verification task: {e}"),
        })??;

    if !verified {
        return Err(Error::Unauthenticated {
            message: Some("Invalid Password".to_string()),
        });
    }

    let ttl = Duration::from_std(ttl).map_err(|e| Error::Internal {
        operation: format!("convert session ttl: {e}"),
    })?;
    let request = SessionCreateDBRequest {
        token: generate_session_token(),
        user_id: user.id,
        expires_at: Utc::now() + ttl,
        ip_address: client.ip_address,
        user_agent: client.user_agent,
    };

    let mut sessions = Sessions::new(conn);
    let session = sessions.create(&request).await?;
    debug!(user_id = user.id, session_id = session.id, "issued session");

    Ok((user, session))
}

/// Resolve a token to its user, or `None` when the token is unknown, the
/// session has expired, or the user no longer exists.
#[instrument(skip(conn, token), err)]
pub async fn validate_token(conn: &mut PgConnection, token: &str) -> Result<Option<UserDBResponse>> {
    let mut sessions = Sessions::new(conn);
    let Some(session) = sessions.get_by_token(token).await? else {
        return Ok(None);
    };

    if session.is_expired(Utc::now()) {
        debug!(session_id = session.id, "rejected expired session");
        return Ok(None);
    }

    let mut users = Users::new(conn);
    Ok(users.get_by_id(session.user_id).await?)
}

/// Revoke the session holding this token. A token that was never issued (or
/// already revoked) is a missing resource.
#[instrument(skip(conn, token), err)]
pub async fn logout(conn: &mut PgConnection, token: &str) -> Result<()> {
    let mut sessions = Sessions::new(conn);
    let removed = sessions.delete_by_token(token).await?;
    if removed == 0 {
        return Err(Error::NotFound {
            message: "Session not found".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use axum::http::StatusCode;
    use sqlx::PgPool;

    const TTL: std::time::Duration = std::time::Duration::from_secs(3600);

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user.name+tag@sub.example.co.uk"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("plainaddress"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("user@example."));
        assert!(!is_valid_email("user name@example.com"));
        assert!(!is_valid_email("user@@example.com"));
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(generate_session_token(), generate_session_token());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_roundtrip(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = test_utils::create_test_user_with_password(&mut conn, "login@example.com", "user", "hunter2-long").await;

        let (logged_in, session) = login(&mut conn, "login@example.com", "hunter2-long", TTL, ClientInfo::default())
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(session.expires_at > Utc::now());

        let resolved = validate_token(&mut conn, &session.token).await.unwrap();
        assert_eq!(resolved.unwrap().id, user.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_email_is_case_insensitive(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        test_utils::create_test_user_with_password(&mut conn, "Mixed@Example.com", "user", "hunter2-long").await;

        let result = login(&mut conn, "mixed@example.com", "hunter2-long", TTL, ClientInfo::default()).await;
        assert!(result.is_ok());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_unknown_email_is_not_found(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();

        let err = login(&mut conn, "ghost@example.com", "whatever-long", TTL, ClientInfo::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_wrong_password_is_unauthorized(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        test_utils::create_test_user_with_password(&mut conn, "victim@example.com", "user", "correct-password").await;

        let err = login(&mut conn, "victim@example.com", "wrong-password", TTL, ClientInfo::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_malformed_email_is_validation_error(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();

        let err = login(&mut conn, "not-an-email", "whatever-long", TTL, ClientInfo::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_empty_password_is_validation_error(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        test_utils::create_test_user_with_password(&mut conn, "blank@example.com", "user", "real-password").await;

        let err = login(&mut conn, "blank@example.com", "", TTL, ClientInfo::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_validate_unknown_token(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();

        let resolved = validate_token(&mut conn, "no-such-token").await.unwrap();
        assert!(resolved.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_validate_expired_token(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = test_utils::create_test_user(&mut conn, "expired@example.com", "user").await;
        let session = test_utils::create_test_session(&mut conn, user.id, Duration::hours(-1)).await;

        let resolved = validate_token(&mut conn, &session.token).await.unwrap();
        assert!(resolved.is_none());

        // Validation is read-only; the row is still there for the sweeper
        let mut sessions = Sessions::new(&mut conn);
        assert!(sessions.get_by_token(&session.token).await.unwrap().is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_logout_invalidates_token(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = test_utils::create_test_user_with_password(&mut conn, "bye@example.com", "user", "hunter2-long").await;

        let (_, session) = login(&mut conn, "bye@example.com", "hunter2-long", TTL, ClientInfo::default())
            .await
            .unwrap();
        logout(&mut conn, &session.token).await.unwrap();

        assert!(validate_token(&mut conn, &session.token).await.unwrap().is_none());

        // Second logout finds nothing to revoke
        let err = logout(&mut conn, &session.token).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        let _ = user;
    }
}
