//! Persistence layer: PostgreSQL-backed collaborator implementations.
//!
//! Provides the durable implementations of [`crate::collaborators`]
//! store contracts — user online flags, metric snapshot history, and
//! the activity event log — using `sqlx::PgPool` for async PostgreSQL
//! access. Schema setup is embedded via `sqlx::migrate!` and applied
//! idempotently at startup.

pub mod models;
pub mod postgres;

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::GatewayConfig;
use crate::error::GatewayError;

pub use postgres::{
    DatabaseProbe, PostgresActivityStore, PostgresMetricStore, PostgresUserDirectory,
};

/// Opens a connection pool sized per configuration.
///
/// # Errors
///
/// Returns a [`GatewayError::Persistence`] when the database is
/// unreachable within the configured connect timeout.
pub async fn connect(config: &GatewayConfig) -> Result<PgPool, GatewayError> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))
}

/// Applies pending embedded migrations.
///
/// # Errors
///
/// Returns a [`GatewayError::Persistence`] when a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), GatewayError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))
}
