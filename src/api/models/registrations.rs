//! API request/response models for event registrations.

use crate::db::models::registrations::RegistrationDBResponse;
use crate::types::{EventId, RegistrationId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistrationCreate {
    pub event_id: EventId,
    /// Register someone else; admin only. Defaults to the caller.
    #[serde(default)]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistrationResponse {
    pub id: RegistrationId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub registered_at: DateTime<Utc>,
}

impl From<RegistrationDBResponse> for RegistrationResponse {
    fn from(db: RegistrationDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            event_id: db.event_id,
            registered_at: db.registered_at,
        }
    }
}
