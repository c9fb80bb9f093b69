//! Database repository for event registrations.
//!
//! A registration is a (user, event) pair; duplicates are rejected by the
//! table's unique constraint. Registrations are created and deleted, never
//! updated.

use crate::db::{
    errors::Result,
    models::registrations::{RegistrationCreateDBRequest, RegistrationDBResponse},
};
use crate::types::{EventId, RegistrationId, UserId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

const REGISTRATION_COLUMNS: &str = "id, user_id, event_id, registered_at, created_at";

#[derive(Debug, Clone, FromRow)]
struct Registration {
    pub id: RegistrationId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub registered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Registration> for RegistrationDBResponse {
    fn from(registration: Registration) -> Self {
        Self {
            id: registration.id,
            user_id: registration.user_id,
            event_id: registration.event_id,
            registered_at: registration.registered_at,
            created_at: registration.created_at,
        }
    }
}

pub struct Registrations<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Registrations<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = request.user_id, event_id = request.event_id), err)]
    pub async fn create(&mut self, request: &RegistrationCreateDBRequest) -> Result<RegistrationDBResponse> {
        let query = format!(
            "INSERT INTO event_registrations (user_id, event_id) \
             VALUES ($1, $2) \
             RETURNING {REGISTRATION_COLUMNS}"
        );
        let registration = sqlx::query_as::<_, Registration>(&query)
            .bind(request.user_id)
            .bind(request.event_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(registration.into())
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: RegistrationId) -> Result<Option<RegistrationDBResponse>> {
        let query = format!("SELECT {REGISTRATION_COLUMNS} FROM event_registrations WHERE id = $1");
        let registration = sqlx::query_as::<_, Registration>(&query)
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(registration.map(Into::into))
    }

    /// All registrations, newest first. Admin listing.
    #[instrument(skip(self), err)]
    pub async fn list(&mut self, skip: i64, limit: i64) -> Result<Vec<RegistrationDBResponse>> {
        let query = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM event_registrations \
             ORDER BY registered_at DESC LIMIT $1 OFFSET $2"
        );
        let registrations = sqlx::query_as::<_, Registration>(&query)
            .bind(limit)
            .bind(skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(registrations.into_iter().map(Into::into).collect())
    }

    /// Registrations made by a user, newest first.
    #[instrument(skip(self), err)]
    pub async fn list_for_user(&mut self, user_id: UserId) -> Result<Vec<RegistrationDBResponse>> {
        let query = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM event_registrations \
             WHERE user_id = $1 ORDER BY registered_at DESC"
        );
        let registrations = sqlx::query_as::<_, Registration>(&query)
            .bind(user_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(registrations.into_iter().map(Into::into).collect())
    }

    /// Registrations for an event, newest first.
    #[instrument(skip(self), err)]
    pub async fn list_for_event(&mut self, event_id: EventId) -> Result<Vec<RegistrationDBResponse>> {
        let query = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM event_registrations \
             WHERE event_id = $1 ORDER BY registered_at DESC"
        );
        let registrations = sqlx::query_as::<_, Registration>(&query)
            .bind(event_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(registrations.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&mut self, id: RegistrationId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM event_registrations WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use crate::test_utils;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_and_list(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = test_utils::create_test_user(&mut conn, "attendee@example.com", "user").await;
        let event = test_utils::create_test_event(&mut conn, user.id, "Meetup").await;

        let mut repo = Registrations::new(&mut conn);
        let registration = repo
            .create(&RegistrationCreateDBRequest {
                user_id: user.id,
                event_id: event.id,
            })
            .await
            .unwrap();

        let by_user = repo.list_for_user(user.id).await.unwrap();
        assert_eq!(by_user.len(), 1);
        assert_eq!(by_user[0].id, registration.id);

        let by_event = repo.list_for_event(event.id).await.unwrap();
        assert_eq!(by_event.len(), 1);
        assert_eq!(by_event[0].user_id, user.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_registration_rejected(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = test_utils::create_test_user(&mut conn, "dupe@example.com", "user").await;
        let event = test_utils::create_test_event(&mut conn, user.id, "Popular Event").await;

        let mut repo = Registrations::new(&mut conn);
        let request = RegistrationCreateDBRequest {
            user_id: user.id,
            event_id: event.id,
        };
        repo.create(&request).await.unwrap();

        let result = repo.create(&request).await;
        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unregister(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = test_utils::create_test_user(&mut conn, "leave@example.com", "user").await;
        let event = test_utils::create_test_event(&mut conn, user.id, "Skippable Event").await;

        let mut repo = Registrations::new(&mut conn);
        let registration = repo
            .create(&RegistrationCreateDBRequest {
                user_id: user.id,
                event_id: event.id,
            })
            .await
            .unwrap();

        assert!(repo.delete(registration.id).await.unwrap());
        assert!(!repo.delete(registration.id).await.unwrap());
        assert!(repo.get_by_id(registration.id).await.unwrap().is_none());
    }
}
