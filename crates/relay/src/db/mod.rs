//! Document-store access for customer passports.
//!
//! One table, `customer_passports`, holds one row (document) per customer:
//! the customer id, the whole passport as JSONB, and two write stamps
//! (`migrated_at` for the one-time migration, `last_updated_at` for every
//! write).
//!
//! # Migrations
//!
//! Migrations are stored in `crates/relay/migrations/` and applied with the
//! embedded migrator at startup, before the listener binds.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod passports;

pub use passports::PassportStore;

/// Errors from the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No live connection could be acquired. Fatal for writes; read paths
    /// fall back to the legacy metafield source.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// A query failed on a live connection.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored passport could not be decoded.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
