//! PostgreSQL implementations of the store contracts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::StoredActivity;
use crate::collaborators::{ActivityStore, MetricStore, ServiceProbe, UserDirectory};
use crate::domain::{ActivityEvent, MetricSnapshot, UserId};
use crate::error::GatewayError;

/// User online flags backed by the `users` table.
#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    /// Creates a directory over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn set_online_status(
        &self,
        user: UserId,
        online: bool,
        at: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO users (id, is_online, last_seen_at) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE \
             SET is_online = EXCLUDED.is_online, last_seen_at = EXCLUDED.last_seen_at",
        )
        .bind(*user.as_uuid())
        .bind(online)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn online_user_ids(&self) -> Result<Vec<UserId>, GatewayError> {
        let rows = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE is_online = TRUE")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        Ok(rows.into_iter().map(UserId::from).collect())
    }

    async fn reset_online_flags(&self) -> Result<u64, GatewayError> {
        let result = sqlx::query("UPDATE users SET is_online = FALSE WHERE is_online = TRUE")
            .execute(&self.pool)
            .await
            .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

/// Metric snapshot history backed by the `metric_snapshots` table.
#[derive(Debug, Clone)]
pub struct PostgresMetricStore {
    pool: PgPool,
}

impl PostgresMetricStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricStore for PostgresMetricStore {
    async fn append(&self, snapshot: &MetricSnapshot) -> Result<(), GatewayError> {
        let sample = serde_json::to_value(&snapshot.sample)
            .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        sqlx::query("INSERT INTO metric_snapshots (sampled_at, sample) VALUES ($1, $2)")
            .bind(snapshot.sampled_at)
            .bind(sample)
            .execute(&self.pool)
            .await
            .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        Ok(())
    }
}

/// Activity event log backed by the `activity_events` table.
#[derive(Debug, Clone)]
pub struct PostgresActivityStore {
    pool: PgPool,
}

impl PostgresActivityStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityStore for PostgresActivityStore {
    async fn record(&self, event: &ActivityEvent) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO activity_events \
             (user_id, action, description, category, severity, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(*event.actor_id.as_uuid())
        .bind(&event.action)
        .bind(&event.description)
        .bind(&event.category)
        .bind(event.severity.as_str())
        .bind(&event.metadata)
        .bind(event.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn recorded_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<ActivityEvent>, GatewayError> {
        let rows = sqlx::query_as::<_, (
            i64,
            Uuid,
            String,
            String,
            String,
            String,
            Option<serde_json::Value>,
            DateTime<Utc>,
        )>(
            "SELECT id, user_id, action, description, category, severity, metadata, created_at \
             FROM activity_events WHERE created_at > $1 ORDER BY created_at ASC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(id, user_id, action, description, category, severity, metadata, created_at)| {
                    StoredActivity {
                        id,
                        user_id,
                        action,
                        description,
                        category,
                        severity,
                        metadata,
                        created_at,
                    }
                    .into_event()
                },
            )
            .collect())
    }
}

/// Health probe that pings the database with a trivial query.
#[derive(Debug, Clone)]
pub struct DatabaseProbe {
    pool: PgPool,
}

impl DatabaseProbe {
    /// Creates a probe over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceProbe for DatabaseProbe {
    fn name(&self) -> &str {
        "database"
    }

    async fn probe(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
