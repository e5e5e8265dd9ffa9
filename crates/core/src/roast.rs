//! Roast records and the shape normalizer.
//!
//! A roast record has gone through two on-disk shapes. The original
//! storefront widget stored a single flat object per roast (one tasting,
//! fields at the top level). The current shape wraps an ordered list of
//! tastings: `{ "entries": [...] }`. [`normalize`] upgrades whatever was
//! stored into the current shape; everything that edits a roast goes
//! through it first.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single tasting record.
///
/// All fields are optional on the wire; absent strings deserialize to `""`,
/// absent booleans to `false` and an absent rating to `0`, so partial legacy
/// data never turns into nulls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique within one roast's entries. Client-supplied, or generated
    /// from the creation timestamp.
    #[serde(default)]
    pub id: String,
    /// RFC 3339 creation time. Immutable after creation.
    #[serde(default)]
    pub created_at: String,
    /// RFC 3339 time of the last mutation.
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub brew_method: String,
    #[serde(default)]
    pub grind_notes: String,
    #[serde(default)]
    pub grinder_setting: String,
    #[serde(default)]
    pub brew_recipe: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub grinding_from_whole_bean: bool,
    #[serde(default)]
    pub rating: f64,
}

impl Entry {
    /// Create a fresh entry from sanitized draft fields.
    ///
    /// `created_at` and `updated_at` start out equal.
    #[must_use]
    pub fn create(id: String, draft: &EntryDraft, now: DateTime<Utc>) -> Self {
        let stamp = rfc3339(now);
        Self {
            id,
            created_at: stamp.clone(),
            updated_at: stamp,
            brew_method: draft.brew_method.clone(),
            grind_notes: draft.grind_notes.clone(),
            grinder_setting: draft.grinder_setting.clone(),
            brew_recipe: draft.brew_recipe.clone(),
            notes: draft.notes.clone(),
            outcome: draft.outcome.clone(),
            grinding_from_whole_bean: draft.grinding_from_whole_bean,
            rating: draft.rating,
        }
    }

    /// Replace every mutable field with the draft's values, keeping `id` and
    /// `created_at`, and stamp `updated_at`.
    pub fn merge(&mut self, draft: &EntryDraft, now: DateTime<Utc>) {
        self.brew_method = draft.brew_method.clone();
        self.grind_notes = draft.grind_notes.clone();
        self.grinder_setting = draft.grinder_setting.clone();
        self.brew_recipe = draft.brew_recipe.clone();
        self.notes = draft.notes.clone();
        self.outcome = draft.outcome.clone();
        self.grinding_from_whole_bean = draft.grinding_from_whole_bean;
        self.rating = draft.rating;
        self.updated_at = rfc3339(now);
    }
}

/// Sanitized incoming entry fields.
///
/// Every request field is defaulted here, in one place, so a partial payload
/// can never introduce nulls into stored data - the create and update paths
/// both consume the same draft.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryDraft {
    pub brew_method: String,
    pub grind_notes: String,
    pub grinder_setting: String,
    pub brew_recipe: String,
    pub notes: String,
    pub outcome: String,
    pub grinding_from_whole_bean: bool,
    pub rating: f64,
}

/// A roast record in the canonical shape.
///
/// Invariant: `entries` is always present as a sequence once normalized,
/// even if empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roast {
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Roast {
    /// Save a tasting into this roast.
    ///
    /// If `entry_id` matches an existing entry it is updated in place
    /// (same position, `id` and `created_at` preserved). Otherwise a new
    /// entry is appended, using the supplied id or one generated from `now`.
    ///
    /// Returns the id of the saved entry.
    pub fn save_entry(
        &mut self,
        entry_id: Option<&str>,
        draft: &EntryDraft,
        now: DateTime<Utc>,
    ) -> String {
        if let Some(id) = entry_id
            && let Some(existing) = self.entries.iter_mut().find(|e| e.id == id)
        {
            existing.merge(draft, now);
            return id.to_string();
        }

        let id = entry_id.map_or_else(|| timestamp_id(now), str::to_string);
        self.entries.push(Entry::create(id.clone(), draft, now));
        id
    }

    /// Remove the entry with the given id from the sequence.
    ///
    /// Resetting an entry that was never saved is not an error; returns
    /// whether anything was removed.
    pub fn reset_entry(&mut self, entry_id: Option<&str>) -> bool {
        let Some(id) = entry_id else {
            return false;
        };
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }
}

/// The two shapes a stored roast record can take.
///
/// Detection is by the shape of the `entries` field: an object carrying an
/// `entries` array is the current shape, anything else is read as a legacy
/// flat entry.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRoast {
    /// Current shape: `{ "entries": [...] }`.
    Modern(Vec<Entry>),
    /// Legacy flat shape: entry fields at the top level, id and timestamps
    /// not guaranteed.
    Legacy(Entry),
}

impl RawRoast {
    /// Classify a stored value. `None` means no record at all.
    #[must_use]
    pub fn classify(raw: &Value) -> Option<Self> {
        match raw {
            Value::Null => None,
            Value::Object(fields) => match fields.get("entries") {
                Some(Value::Array(items)) => Some(Self::Modern(
                    items.iter().cloned().map(lenient_entry).collect(),
                )),
                _ => Some(Self::Legacy(legacy_entry(fields))),
            },
            // A scalar where a roast record should be: no fields to pick up.
            _ => Some(Self::Legacy(Entry::default())),
        }
    }
}

/// Convert an arbitrary stored roast record into the canonical shape.
///
/// Total over its input domain: absent and null records become an empty
/// roast, a legacy flat record becomes a single-entry roast with `id` and
/// timestamps backfilled from `now` (`updated_at` falls back to
/// `created_at`), and a record already in the current shape is copied
/// through. Never fails, never touches the input.
#[must_use]
pub fn normalize(raw: Option<&Value>, now: DateTime<Utc>) -> Roast {
    match raw.and_then(RawRoast::classify) {
        None => Roast::default(),
        Some(RawRoast::Modern(entries)) => Roast { entries },
        Some(RawRoast::Legacy(mut entry)) => {
            if entry.id.is_empty() {
                entry.id = timestamp_id(now);
            }
            if entry.created_at.is_empty() {
                entry.created_at = rfc3339(now);
            }
            if entry.updated_at.is_empty() {
                entry.updated_at = entry.created_at.clone();
            }
            Roast {
                entries: vec![entry],
            }
        }
    }
}

/// Read one entry leniently: a malformed element collapses to a defaulted
/// entry rather than failing, so the sequence keeps its length.
fn lenient_entry(value: Value) -> Entry {
    serde_json::from_value(value).unwrap_or_default()
}

/// Pick entry fields out of a legacy flat object, defaulting anything
/// absent or mistyped.
fn legacy_entry(fields: &serde_json::Map<String, Value>) -> Entry {
    let text = |key: &str| -> String {
        fields
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Entry {
        id: text("id"),
        created_at: text("created_at"),
        updated_at: text("updated_at"),
        brew_method: text("brew_method"),
        grind_notes: text("grind_notes"),
        grinder_setting: text("grinder_setting"),
        brew_recipe: text("brew_recipe"),
        notes: text("notes"),
        outcome: text("outcome"),
        grinding_from_whole_bean: fields
            .get("grinding_from_whole_bean")
            .and_then(Value::as_bool)
            .unwrap_or_default(),
        rating: fields
            .get("rating")
            .and_then(Value::as_f64)
            .unwrap_or_default(),
    }
}

/// Entry id generated at creation: the millisecond timestamp as a string.
fn timestamp_id(now: DateTime<Utc>) -> String {
    now.timestamp_millis().to_string()
}

fn rfc3339(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}
