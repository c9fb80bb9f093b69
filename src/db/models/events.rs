//! Database models for events.

use crate::api::models::events::ApprovalStatus;
use crate::types::{EventId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating an event
#[derive(Debug, Clone)]
pub struct EventCreateDBRequest {
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
}

/// Database request for updating an event
#[derive(Debug, Clone, Default)]
pub struct EventUpdateDBRequest {
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
    pub approval: Option<ApprovalStatus>,
}

/// Database response for an event
#[derive(Debug, Clone)]
pub struct EventDBResponse {
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

impl EventDBResponse {
    /// Publicly visible means active and approved.
    pub fn is_public(&self) -> bool {
        self.status && self.approval == ApprovalStatus::Approved
    }
}
