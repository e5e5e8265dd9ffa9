//! Passport repository: one document per customer.

use alfie_passport_core::{CustomerId, Passport};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::pool::PoolConnection;
use sqlx::types::Json;
use tracing::{debug, instrument};

use super::StoreError;

/// Repository for the `customer_passports` collection.
///
/// The caller never distinguishes insert from update: both write paths are
/// a replace-upsert on the customer id.
#[derive(Clone)]
pub struct PassportStore {
    pool: PgPool,
}

impl PassportStore {
    /// Create a new passport store over a shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Acquire a live connection, mapping failure to [`StoreError::Unavailable`]
    /// so callers can tell "no storage" apart from a failed query.
    async fn acquire(&self) -> Result<PoolConnection<sqlx::Postgres>, StoreError> {
        self.pool.acquire().await.map_err(StoreError::Unavailable)
    }

    /// Look up a customer's passport document.
    ///
    /// Returns `None` if the customer has no document yet (the trigger for
    /// the migration-on-read path).
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` if no connection could be acquired,
    /// `StoreError::Database` if the query fails,
    /// `StoreError::DataCorruption` if the stored blob is not a JSON object.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn find_passport(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<Passport>, StoreError> {
        let mut conn = self.acquire().await?;

        let row: Option<Value> = sqlx::query_scalar(
            r"
            SELECT passport FROM customer_passports
            WHERE customer_id = $1
            ",
        )
        .bind(customer_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(value) => {
                let passport = serde_json::from_value(value).map_err(|e| {
                    StoreError::DataCorruption(format!(
                        "stored passport for customer {customer_id} is not an object: {e}"
                    ))
                })?;
                Ok(Some(passport))
            }
            None => Ok(None),
        }
    }

    /// Replace a customer's whole passport, creating the document if absent.
    ///
    /// Stamps `last_updated_at`.
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` if no connection could be acquired,
    /// `StoreError::Database` if the write fails.
    #[instrument(skip(self, passport), fields(customer_id = %customer_id))]
    pub async fn upsert_passport(
        &self,
        customer_id: &CustomerId,
        passport: &Passport,
    ) -> Result<(), StoreError> {
        let mut conn = self.acquire().await?;

        sqlx::query(
            r"
            INSERT INTO customer_passports (customer_id, passport, last_updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (customer_id)
            DO UPDATE SET passport = EXCLUDED.passport, last_updated_at = now()
            ",
        )
        .bind(customer_id.as_str())
        .bind(Json(passport))
        .execute(&mut *conn)
        .await?;

        debug!("Upserted passport document");
        Ok(())
    }

    /// Persist a passport fetched from the legacy source, stamping
    /// `migrated_at` as well as `last_updated_at`.
    ///
    /// Concurrent first-reads may both land here; the replace-upsert makes
    /// the race convergent, and the stamps reflect whichever write lands
    /// last.
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` if no connection could be acquired,
    /// `StoreError::Database` if the write fails.
    #[instrument(skip(self, passport), fields(customer_id = %customer_id))]
    pub async fn upsert_migrated(
        &self,
        customer_id: &CustomerId,
        passport: &Passport,
    ) -> Result<(), StoreError> {
        let mut conn = self.acquire().await?;

        sqlx::query(
            r"
            INSERT INTO customer_passports (customer_id, passport, migrated_at, last_updated_at)
            VALUES ($1, $2, now(), now())
            ON CONFLICT (customer_id)
            DO UPDATE SET passport = EXCLUDED.passport,
                          migrated_at = now(),
                          last_updated_at = now()
            ",
        )
        .bind(customer_id.as_str())
        .bind(Json(passport))
        .execute(&mut *conn)
        .await?;

        debug!("Migrated legacy passport into document store");
        Ok(())
    }
}
