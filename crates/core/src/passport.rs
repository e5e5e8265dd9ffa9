//! The passport: one customer's whole tasting journal.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A customer's tasting passport, mapping roast handles to roast records.
///
/// The passport is stored and shipped as one JSON object. Individual roast
/// records stay as raw [`Value`]s because pre-migration data may still be in
/// the legacy flat shape; a roast is only normalized when it is edited (see
/// [`crate::normalize`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Passport(serde_json::Map<String, Value>);

impl Passport {
    /// Create an empty passport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this passport contains any roasts at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of roasts in the passport.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get the stored record for one roast, in whatever shape it was saved.
    #[must_use]
    pub fn roast(&self, handle: &str) -> Option<&Value> {
        self.0.get(handle)
    }

    /// Replace (or create) the record for one roast.
    pub fn set_roast(&mut self, handle: impl Into<String>, roast: Value) {
        self.0.insert(handle.into(), roast);
    }
}
