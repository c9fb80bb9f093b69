//! API request/response models for events.

use crate::db::models::events::EventDBResponse;
use crate::types::{EventId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Moderation state of an event. Stored as uppercase text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

// Event request models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventCreate {
    pub event_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub registration_fee: Option<f64>,
    pub event_start_date: DateTime<Utc>,
    pub event_end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct EventUpdate {
    pub event_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub event_type: Option<String>,
    pub user_type: Option<String>,
    pub image: Option<String>,
    pub registration_fee: Option<f64>,
    pub event_start_date: Option<DateTime<Utc>>,
    pub event_end_date: Option<DateTime<Utc>>,
    pub trending: Option<bool>,
    pub status: Option<bool>,
}

/// Optional category filters for event listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct EventListQuery {
    /// Only events of this type, e.g. `conference` or `workshop`
    pub event_type: Option<String>,
    /// Only events hosted by this kind of organizer
    pub user_type: Option<String>,
}

/// Body for the admin moderation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApprovalRequest {
    pub approval: ApprovalStatus,
}

// Event response models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    pub id: EventId,
    pub user_id: UserId,
    pub event_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub description: String,
    pub event_type: String,
    pub user_type: String,
    pub image: String,
    pub registration_fee: f64,
    pub event_start_date: DateTime<Utc>,
    pub event_end_date: DateTime<Utc>,
    pub trending: bool,
    pub status: bool,
    pub approval: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventDBResponse> for EventResponse {
    fn from(db: EventDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            event_name: db.event_name,
            email: db.email,
            phone: db.phone,
            location: db.location,
            description: db.description,
            event_type: db.event_type,
            user_type: db.user_type,
            image: db.image,
            registration_fee: db.registration_fee,
            event_start_date: db.event_start_date,
            event_end_date: db.event_end_date,
            trending: db.trending,
            status: db.status,
            approval: db.approval,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
