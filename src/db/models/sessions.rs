//! Database models for login sessions.

use crate::types::{SessionId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a session
#[derive(Debug, Clone)]
pub struct SessionCreateDBRequest {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Database response for a session
#[derive(Debug, Clone)]
pub struct SessionDBResponse {
    pub id: SessionId,
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionDBResponse {
    /// A session is expired only once its expiry instant has passed; at the
    /// instant itself it is still live.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}
