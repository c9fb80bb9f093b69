//! Database repository for login sessions.
//!
//! Sessions are opaque token rows: created at login, looked up on every
//! authenticated request, deleted at logout. There is no update path.

use crate::db::{
    errors::Result,
    models::sessions::{SessionCreateDBRequest, SessionDBResponse},
};
use crate::types::{SessionId, UserId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

const SESSION_COLUMNS: &str = "id, token, user_id, expires_at, ip_address, user_agent, created_at";

#[derive(Debug, Clone, FromRow)]
struct Session {
    pub id: SessionId,
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Session> for SessionDBResponse {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            token: session.token,
            user_id: session.user_id,
            expires_at: session.expires_at,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            created_at: session.created_at,
        }
    }
}

pub struct Sessions<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Sessions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = request.user_id), err)]
    pub async fn create(&mut self, request: &SessionCreateDBRequest) -> Result<SessionDBResponse> {
        let query = format!(
            "INSERT INTO sessions (token, user_id, expires_at, ip_address, user_agent) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {SESSION_COLUMNS}"
        );
        let session = sqlx::query_as::<_, Session>(&query)
            .bind(&request.token)
            .bind(request.user_id)
            .bind(request.expires_at)
            .bind(&request.ip_address)
            .bind(&request.user_agent)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(session.into())
    }

    /// Look up a session by its token, expired or not. Expiry is the
    /// caller's concern so it stays checkable without touching the clock here.
    #[instrument(skip(self, token), err)]
    pub async fn get_by_token(&mut self, token: &str) -> Result<Option<SessionDBResponse>> {
        let query = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE token = $1");
        let session = sqlx::query_as::<_, Session>(&query)
            .bind(token)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(session.map(Into::into))
    }

    /// Delete the session holding this token. Returns the number of rows
    /// removed, which is 0 when the token was never issued or already revoked.
    #[instrument(skip(self, token), err)]
    pub async fn delete_by_token(&mut self, token: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }

    /// Remove every session whose expiry instant has passed; the boundary
    /// matches [`SessionDBResponse::is_expired`].
    #[instrument(skip(self), err)]
    pub async fn delete_expired(&mut self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < $1")
            .bind(now)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }

    /// List sessions belonging to a user, newest first.
    #[instrument(skip(self), err)]
    pub async fn list_for_user(&mut self, user_id: UserId) -> Result<Vec<SessionDBResponse>> {
        let query = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = $1 ORDER BY created_at DESC");
        let sessions = sqlx::query_as::<_, Session>(&query)
            .bind(user_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(sessions.into_iter().map(Into::into).collect())
    }
}
