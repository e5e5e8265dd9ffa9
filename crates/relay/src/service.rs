//! Passport service: read-with-migration-fallback and write-through.
//!
//! The only component with business logic beyond shape normalization. The
//! document store is authoritative; the Shopify metafield is a read-only
//! migration source. Migration happens as a side effect of the first read
//! for a customer and is idempotent because later reads short-circuit on
//! the existing document.

use alfie_passport_core::{CustomerId, EntryDraft, Passport, normalize};
use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::db::{PassportStore, StoreError};
use crate::shopify::{MetafieldClient, RemoteError};

/// Errors from the passport service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Document store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Legacy metafield source failure (only surfaced in degraded mode,
    /// when the document store is unavailable and the legacy source is the
    /// only one left).
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Passport serialization failure.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The action requested for one tasting entry.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryAction {
    /// Create or update an entry.
    Save {
        entry_id: Option<String>,
        draft: EntryDraft,
    },
    /// Remove an entry from the roast's sequence.
    Reset { entry_id: Option<String> },
}

/// What an entry action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// The entry was created or updated; carries its id.
    Saved { entry_id: String },
    /// The entry was removed (or was never there - also success).
    Reset,
}

/// Orchestrates passport reads and writes across the two stores.
///
/// Both dependencies are injected at construction; the service holds no
/// global state and is cheap to clone.
#[derive(Clone)]
pub struct PassportService {
    store: PassportStore,
    remote: MetafieldClient,
}

impl PassportService {
    /// Create a new passport service.
    #[must_use]
    pub const fn new(store: PassportStore, remote: MetafieldClient) -> Self {
        Self { store, remote }
    }

    /// Fetch a customer's passport.
    ///
    /// Steady state: the document store has a document, return its passport.
    /// First read: no document yet, so the legacy metafield is consulted;
    /// if it holds data and `allow_migration` is set, the passport is
    /// persisted to the document store stamped `migrated_at` before being
    /// returned. Degraded mode: the document store is unavailable, so the
    /// legacy source is read directly and migration is skipped.
    ///
    /// Two racing first-reads may both migrate; the store's replace-upsert
    /// makes that convergent, so no lock is taken.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` on store failure, or on remote failure in
    /// degraded mode.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_passport(
        &self,
        customer_id: &CustomerId,
        allow_migration: bool,
    ) -> Result<Passport, ServiceError> {
        let existing = match self.store.find_passport(customer_id).await {
            Ok(found) => found,
            Err(StoreError::Unavailable(e)) => {
                warn!(
                    error = %e,
                    "Document store unavailable, serving passport from legacy metafield"
                );
                return Ok(self.remote.fetch_passport(customer_id).await?);
            }
            Err(e) => return Err(e.into()),
        };

        // Steady-state fast path: once a document exists the legacy source
        // is never contacted again for this customer.
        if let Some(passport) = existing {
            return Ok(passport);
        }

        let legacy = match self.remote.fetch_passport(customer_id).await {
            Ok(passport) => passport,
            Err(e) => {
                // A dead legacy platform must not break reads for customers
                // who simply have no data yet.
                warn!(error = %e, "Legacy passport read failed, treating as no legacy data");
                Passport::default()
            }
        };

        if allow_migration && !legacy.is_empty() {
            info!(
                roasts = legacy.len(),
                "Migrating legacy passport into document store"
            );
            self.store.upsert_migrated(customer_id, &legacy).await?;
        }

        Ok(legacy)
    }

    /// Write a customer's whole passport to the document store.
    ///
    /// No legacy-write fallback: the metafield is read-only once migration
    /// begins, so an unavailable store is fatal here.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` on any store failure.
    #[instrument(skip(self, passport), fields(customer_id = %customer_id))]
    pub async fn save_passport(
        &self,
        customer_id: &CustomerId,
        passport: &Passport,
    ) -> Result<(), ServiceError> {
        self.store.upsert_passport(customer_id, passport).await?;
        Ok(())
    }

    /// Apply a save or reset to one roast's entries and persist the result.
    ///
    /// The passport is loaded with migration disabled: an edit must not
    /// race an in-flight migration upsert of the same customer. The
    /// targeted roast is normalized before the edit, so a legacy flat
    /// record is upgraded as part of its first save.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` if the load or the persist fails.
    #[instrument(skip(self, action), fields(customer_id = %customer_id, roast_handle = %roast_handle))]
    pub async fn apply_entry_action(
        &self,
        customer_id: &CustomerId,
        roast_handle: &str,
        action: EntryAction,
    ) -> Result<EntryOutcome, ServiceError> {
        let mut passport = self.get_passport(customer_id, false).await?;
        let now = Utc::now();
        let mut roast = normalize(passport.roast(roast_handle), now);

        let outcome = match action {
            EntryAction::Save { entry_id, draft } => {
                let entry_id = roast.save_entry(entry_id.as_deref(), &draft, now);
                EntryOutcome::Saved { entry_id }
            }
            EntryAction::Reset { entry_id } => {
                // Resetting an entry that was never saved is still success.
                roast.reset_entry(entry_id.as_deref());
                EntryOutcome::Reset
            }
        };

        passport.set_roast(roast_handle, serde_json::to_value(&roast)?);
        self.save_passport(customer_id, &passport).await?;

        Ok(outcome)
    }
}
