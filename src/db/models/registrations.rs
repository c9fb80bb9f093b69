//! Database models for event registrations.

use crate::types::{EventId, RegistrationId, UserId};
use chrono::{DateTime, Utc};

/// Database request for registering a user to an event
#[derive(Debug, Clone)]
pub struct RegistrationCreateDBRequest {
    pub user_id: UserId,
    pub event_id: EventId,
}

/// Database response for an event registration
#[derive(Debug, Clone)]
pub struct RegistrationDBResponse {
    pub id: RegistrationId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub registered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
