//! Database repository for events.

use crate::api::models::events::ApprovalStatus;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::events::{EventCreateDBRequest, EventDBResponse, EventUpdateDBRequest},
};
use crate::types::{EventId, UserId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

const EVENT_COLUMNS: &str = "\
    id, user_id, event_name, email, phone, location, description, \
    event_type, user_type, image, registration_fee, event_start_date, \
    event_end_date, trending, status, approval, created_at, updated_at";

/// Filter for listing events.
///
/// `public_only` narrows to active, approved events; the other fields are
/// additive constraints. Defaults list everything (the admin view).
#[derive(Debug, Clone)]
pub struct EventFilter {
    pub skip: i64,
    pub limit: i64,
    pub public_only: bool,
    pub trending_only: bool,
    pub owner: Option<UserId>,
    pub event_type: Option<String>,
    pub user_type: Option<String>,
}

impl EventFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            public_only: false,
            trending_only: false,
            owner: None,
            event_type: None,
            user_type: None,
        }
    }

    pub fn public(mut self) -> Self {
        self.public_only = true;
        self
    }

    pub fn trending(mut self) -> Self {
        self.trending_only = true;
        self
    }

    pub fn owned_by(mut self, user_id: UserId) -> Self {
        self.owner = Some(user_id);
        self
    }

    pub fn with_event_type(mut self, event_type: Option<String>) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn with_user_type(mut self, user_type: Option<String>) -> Self {
        self.user_type = user_type;
        self
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Event {
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

impl From<Event> for EventDBResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            user_id: event.user_id,
            event_name: event.event_name,
            email: event.email,
            phone: event.phone,
            location: event.location,
            description: event.description,
            event_type: event.event_type,
            user_type: event.user_type,
            image: event.image,
            registration_fee: event.registration_fee,
            event_start_date: event.event_start_date,
            event_end_date: event.event_end_date,
            trending: event.trending,
            status: event.status,
            approval: event.approval,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

pub struct Events<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Events<'c> {
    type CreateRequest = EventCreateDBRequest;
    type UpdateRequest = EventUpdateDBRequest;
    type Response = EventDBResponse;
    type Id = EventId;
    type Filter = EventFilter;

    #[instrument(skip(self, request), fields(event_name = %request.event_name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let query = format!(
            "INSERT INTO events (user_id, event_name, email, phone, location, description, \
                 event_type, user_type, image, registration_fee, event_start_date, event_end_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {EVENT_COLUMNS}"
        );
        let event = sqlx::query_as::<_, Event>(&query)
            .bind(request.user_id)
            .bind(&request.event_name)
            .bind(&request.email)
            .bind(&request.phone)
            .bind(&request.location)
            .bind(&request.description)
            .bind(&request.event_type)
            .bind(&request.user_type)
            .bind(&request.image)
            .bind(request.registration_fee)
            .bind(request.event_start_date)
            .bind(request.event_end_date)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(event.into())
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let query = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        let event = sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(event.map(Into::into))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<EventId>) -> Result<std::collections::HashMap<Self::Id, EventDBResponse>> {
        if ids.is_empty() {
            return Ok(std::collections::HashMap::new());
        }

        let query = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ANY($1)");
        let events = sqlx::query_as::<_, Event>(&query)
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(events.into_iter().map(|e| (e.id, e.into())).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        // $1 and $2 are limit/offset; value conditions number from $3 in bind order
        let mut conditions = Vec::new();
        let mut next_param = 3;
        if filter.public_only {
            conditions.push("status = TRUE AND approval = 'APPROVED'".to_string());
        }
        if filter.trending_only {
            conditions.push("trending = TRUE".to_string());
        }
        if filter.owner.is_some() {
            conditions.push(format!("user_id = ${next_param}"));
            next_param += 1;
        }
        if filter.event_type.is_some() {
            conditions.push(format!("event_type = ${next_param}"));
            next_param += 1;
        }
        if filter.user_type.is_some() {
            conditions.push(format!("user_type = ${next_param}"));
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {} ", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM events {where_clause}\
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        let mut q = sqlx::query_as::<_, Event>(&query).bind(filter.limit).bind(filter.skip);
        if let Some(owner) = filter.owner {
            q = q.bind(owner);
        }
        if let Some(event_type) = &filter.event_type {
            q = q.bind(event_type);
        }
        if let Some(user_type) = &filter.user_type {
            q = q.bind(user_type);
        }
        let events = q.fetch_all(&mut *self.db).await?;

        Ok(events.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let query = format!(
            "UPDATE events SET \
                event_name = COALESCE($2, event_name), \
                email = COALESCE($3, email), \
                phone = COALESCE($4, phone), \
                location = COALESCE($5, location), \
                description = COALESCE($6, description), \
                event_type = COALESCE($7, event_type), \
                user_type = COALESCE($8, user_type), \
                image = COALESCE($9, image), \
                registration_fee = COALESCE($10, registration_fee), \
                event_start_date = COALESCE($11, event_start_date), \
                event_end_date = COALESCE($12, event_end_date), \
                trending = COALESCE($13, trending), \
                status = COALESCE($14, status), \
                approval = COALESCE($15, approval), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {EVENT_COLUMNS}"
        );
        let event = sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .bind(&request.event_name)
            .bind(&request.email)
            .bind(&request.phone)
            .bind(&request.location)
            .bind(&request.description)
            .bind(&request.event_type)
            .bind(&request.user_type)
            .bind(&request.image)
            .bind(request.registration_fee)
            .bind(request.event_start_date)
            .bind(request.event_end_date)
            .bind(request.trending)
            .bind(request.status)
            .bind(request.approval)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(event.into())
    }
}

impl<'c> Events<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Flip the moderation state of an event.
    #[instrument(skip(self), err)]
    pub async fn set_approval(&mut self, id: EventId, approval: ApprovalStatus) -> Result<EventDBResponse> {
        let request = EventUpdateDBRequest {
            approval: Some(approval),
            ..Default::default()
        };
        self.update(id, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use crate::test_utils;
    use chrono::Duration;
    use sqlx::PgPool;

    fn sample_event(user_id: UserId, name: &str) -> EventCreateDBRequest {
        let start = Utc::now() + Duration::days(7);
        EventCreateDBRequest {
            user_id,
            event_name: name.to_string(),
            email: "organizer@example.com".to_string(),
            phone: "555-0100".to_string(),
            location: "Main Hall".to_string(),
            description: "A gathering".to_string(),
            event_type: "conference".to_string(),
            user_type: "organization".to_string(),
            image: String::new(),
            registration_fee: 25.0,
            event_start_date: start,
            event_end_date: start + Duration::days(1),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_event_starts_pending(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = test_utils::create_test_user(&mut conn, "org@example.com", "user").await;
        let mut repo = Events::new(&mut conn);

        let event = repo.create(&sample_event(user.id, "Launch Day")).await.unwrap();
        assert_eq!(event.approval, ApprovalStatus::Pending);
        assert!(event.status);
        assert!(!event.trending);
        assert!(!event.is_public());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_public_listing_excludes_unapproved(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = test_utils::create_test_user(&mut conn, "org2@example.com", "user").await;
        let mut repo = Events::new(&mut conn);

        let pending = repo.create(&sample_event(user.id, "Pending Event")).await.unwrap();
        let approved = repo.create(&sample_event(user.id, "Approved Event")).await.unwrap();
        repo.set_approval(approved.id, ApprovalStatus::Approved).await.unwrap();

        let public = repo.list(&EventFilter::new(0, 100).public()).await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, approved.id);

        let all = repo.list(&EventFilter::new(0, 100)).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|e| e.id == pending.id));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_trending_listing(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = test_utils::create_test_user(&mut conn, "org3@example.com", "user").await;
        let mut repo = Events::new(&mut conn);

        let event = repo.create(&sample_event(user.id, "Hot Event")).await.unwrap();
        repo.create(&sample_event(user.id, "Quiet Event")).await.unwrap();

        let update = EventUpdateDBRequest {
            trending: Some(true),
            approval: Some(ApprovalStatus::Approved),
            ..Default::default()
        };
        repo.update(event.id, &update).await.unwrap();

        let trending = repo.list(&EventFilter::new(0, 100).public().trending()).await.unwrap();
        assert_eq!(trending.len(), 1);
        assert_eq!(trending[0].id, event.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_owner_listing(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let alice = test_utils::create_test_user(&mut conn, "alice@example.com", "user").await;
        let bob = test_utils::create_test_user(&mut conn, "bob@example.com", "user").await;
        let mut repo = Events::new(&mut conn);

        repo.create(&sample_event(alice.id, "Alice Event")).await.unwrap();
        repo.create(&sample_event(bob.id, "Bob Event")).await.unwrap();

        let mine = repo.list(&EventFilter::new(0, 100).owned_by(alice.id)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].event_name, "Alice Event");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_type_filters_combine(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = test_utils::create_test_user(&mut conn, "org5@example.com", "user").await;
        let mut repo = Events::new(&mut conn);

        repo.create(&sample_event(user.id, "Conference A")).await.unwrap();
        let mut workshop = sample_event(user.id, "Workshop B");
        workshop.event_type = "workshop".to_string();
        workshop.user_type = "individual".to_string();
        repo.create(&workshop).await.unwrap();

        let filter = EventFilter::new(0, 100).with_event_type(Some("workshop".to_string()));
        let found = repo.list(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].event_name, "Workshop B");

        // Both type filters together
        let filter = EventFilter::new(0, 100)
            .with_event_type(Some("workshop".to_string()))
            .with_user_type(Some("organization".to_string()));
        assert!(repo.list(&filter).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_reject_event(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = test_utils::create_test_user(&mut conn, "org4@example.com", "user").await;
        let mut repo = Events::new(&mut conn);

        let event = repo.create(&sample_event(user.id, "Doomed Event")).await.unwrap();
        let rejected = repo.set_approval(event.id, ApprovalStatus::Rejected).await.unwrap();
        assert_eq!(rejected.approval, ApprovalStatus::Rejected);
        assert!(!rejected.is_public());

        let missing = repo.set_approval(9999, ApprovalStatus::Approved).await;
        assert!(matches!(missing, Err(DbError::NotFound)));
    }
}
