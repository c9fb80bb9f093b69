//! The authenticated-caller extractor.
//!
//! Handlers that need a caller take an [`Identity`] argument; extraction
//! reads the bearer token, resolves it against the sessions table, and
//! rejects the request with 401 before the handler body runs. There is no
//! request-scoped mutable auth context: whoever needs the caller receives
//! it explicitly.

use crate::{
    AppState,
    auth::session,
    db::{errors::DbError, models::users::UserDBResponse},
    errors::{Error, Result},
    types::{ADMIN_ROLE, UserId},
};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use tracing::{debug, instrument, trace};

/// The resolved caller of a request: the session's user plus the token that
/// authenticated them, so operations acting on the session itself (logout)
/// need no second look at the headers.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub token: String,
}

impl Identity {
    fn new(user: UserDBResponse, token: String) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            token,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Pull the bearer token out of the Authorization header.
/// Returns:
/// - None: no Authorization header, or not a Bearer credential
/// - Some(Ok(token)): well-formed bearer token
/// - Some(Err(error)): header present but not valid UTF-8
pub fn bearer_token(parts: &Parts) -> Option<Result<&str>> {
    let auth_header = parts.headers.get(axum::http::header::AUTHORIZATION)?;

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::Validation {
                message: format!("Invalid authorization header: {e}"),
            }));
        }
    };

    auth_str.strip_prefix("Bearer ").map(Ok)
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = match bearer_token(parts) {
            Some(Ok(token)) => token,
            Some(Err(e)) => return Err(e),
            None => {
                trace!("no bearer credential on request");
                return Err(Error::Unauthenticated { message: None });
            }
        };

        let mut conn = state.db.acquire().await.map_err(DbError::from)?;
        match session::validate_token(&mut conn, token).await? {
            Some(user) => {
                debug!(user_id = user.id, "authenticated session token");
                Ok(Identity::new(user, token.to_string()))
            }
            None => Err(Error::Unauthenticated {
                message: Some("Invalid or expired session token".to_string()),
            }),
        }
    }
}

/// Optional extraction for endpoints that serve both anonymous and
/// authenticated callers. A missing or unresolvable credential yields
/// `None` instead of a 401; only a malformed header is an error.
impl OptionalFromRequestParts<AppState> for Identity {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Option<Self>> {
        let token = match bearer_token(parts) {
            Some(Ok(token)) => token,
            Some(Err(e)) => return Err(e),
            None => return Ok(None),
        };

        let mut conn = state.db.acquire().await.map_err(DbError::from)?;
        Ok(session::validate_token(&mut conn, token)
            .await?
            .map(|user| Identity::new(user, token.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts_with_auth(value: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header(axum::http::header::AUTHORIZATION, value)
            .body(())
            .unwrap();
        let (parts, _body) = request.into_parts();
        parts
    }

    #[test]
    fn test_bearer_token_extraction() {
        let parts = parts_with_auth("Bearer abc-123");
        assert_eq!(bearer_token(&parts).unwrap().unwrap(), "abc-123");
    }

    #[test]
    fn test_non_bearer_scheme_is_skipped() {
        let parts = parts_with_auth("Basic dXNlcjpwYXNz");
        assert!(bearer_token(&parts).is_none());
    }

    #[test]
    fn test_missing_header() {
        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (parts, _body) = request.into_parts();
        assert!(bearer_token(&parts).is_none());
    }

    #[test]
    fn test_case_sensitive_scheme() {
        // "bearer" (lowercase) is not accepted; the scheme match is exact
        let parts = parts_with_auth("bearer abc-123");
        assert!(bearer_token(&parts).is_none());
    }
}
