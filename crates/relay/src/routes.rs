//! HTTP route handlers for the passport relay.
//!
//! # Route Structure
//!
//! ```text
//! GET  /apps/alfie-tracker/passport-data?customer_id=<id> - Fetch a passport
//! POST /save                                              - Save/update/reset one tasting entry
//! GET  /                                                  - Readiness probe (lives in main.rs)
//! OPTIONS *                                               - CORS preflight (handled by the CORS layer)
//! ```
//!
//! The handlers are thin: validate the required fields, hand off to the
//! passport service, shape the JSON reply.

use alfie_passport_core::{CustomerId, EntryDraft, Passport};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::RelayConfig;
use crate::error::{AppError, Result};
use crate::service::{EntryAction, EntryOutcome};
use crate::state::AppState;

/// Build the relay's routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/apps/alfie-tracker/passport-data", get(passport_data))
        .route("/save", post(save_entry))
}

/// CORS layer restricted to the configured storefront origins.
///
/// An origin is echoed back only on an exact match against the allow-list;
/// preflight requests are answered by the layer with no body.
pub fn cors_layer(config: &RelayConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// ============================================================================
// Fetch passport
// ============================================================================

#[derive(Debug, Deserialize)]
struct PassportQuery {
    customer_id: Option<String>,
}

/// GET /apps/alfie-tracker/passport-data
///
/// Returns the customer's whole passport. The first read for a customer may
/// migrate their legacy metafield data into the document store as a side
/// effect.
async fn passport_data(
    State(state): State<AppState>,
    Query(query): Query<PassportQuery>,
) -> Result<Json<Passport>> {
    let customer_id = query
        .customer_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("customer_id is required".to_string()))?;

    let passport = state
        .service()
        .get_passport(&CustomerId::new(customer_id), true)
        .await?;

    Ok(Json(passport))
}

// ============================================================================
// Save / update / reset one entry
// ============================================================================

/// Request body for `/save`.
///
/// Everything except `customer_id` and `roast_handle` is optional; the
/// entry fields are sanitized into an [`EntryDraft`] in one place so a
/// partial payload never introduces nulls into stored data.
#[derive(Debug, Default, Deserialize)]
struct SaveRequest {
    /// The storefront widget sends this as a JSON number or string.
    #[serde(default, deserialize_with = "lenient_string")]
    customer_id: Option<String>,
    roast_handle: Option<String>,
    entry_id: Option<String>,
    /// `"reset"` removes the entry; anything else saves.
    action: Option<String>,
    rating: Option<f64>,
    brew_method: Option<String>,
    grinding_from_whole_bean: Option<bool>,
    grind_notes: Option<String>,
    grinder_setting: Option<String>,
    brew_recipe: Option<String>,
    notes: Option<String>,
    outcome: Option<String>,
}

impl SaveRequest {
    /// The single sanitation step: absent strings become `""`, absent
    /// booleans `false`, an absent rating `0`.
    fn draft(&self) -> EntryDraft {
        EntryDraft {
            brew_method: self.brew_method.clone().unwrap_or_default(),
            grind_notes: self.grind_notes.clone().unwrap_or_default(),
            grinder_setting: self.grinder_setting.clone().unwrap_or_default(),
            brew_recipe: self.brew_recipe.clone().unwrap_or_default(),
            notes: self.notes.clone().unwrap_or_default(),
            outcome: self.outcome.clone().unwrap_or_default(),
            grinding_from_whole_bean: self.grinding_from_whole_bean.unwrap_or_default(),
            rating: self.rating.unwrap_or_default(),
        }
    }

    fn action(&self) -> EntryAction {
        if self.action.as_deref() == Some("reset") {
            EntryAction::Reset {
                entry_id: self.entry_id.clone(),
            }
        } else {
            EntryAction::Save {
                entry_id: self.entry_id.clone(),
                draft: self.draft(),
            }
        }
    }
}

/// Response body for `/save`.
#[derive(Debug, Serialize)]
struct SaveResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reset: Option<bool>,
}

impl SaveResponse {
    fn saved(entry_id: String) -> Self {
        Self {
            ok: true,
            entry_id: Some(entry_id),
            reset: None,
        }
    }

    const fn reset() -> Self {
        Self {
            ok: true,
            entry_id: None,
            reset: Some(true),
        }
    }
}

/// POST /save
async fn save_entry(
    State(state): State<AppState>,
    Json(request): Json<SaveRequest>,
) -> Result<Json<SaveResponse>> {
    let customer_id = request
        .customer_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("customer_id is required".to_string()))?;
    let roast_handle = request
        .roast_handle
        .clone()
        .filter(|handle| !handle.is_empty())
        .ok_or_else(|| AppError::Validation("roast_handle is required".to_string()))?;

    let outcome = state
        .service()
        .apply_entry_action(&CustomerId::new(customer_id), &roast_handle, request.action())
        .await?;

    Ok(Json(match outcome {
        EntryOutcome::Saved { entry_id } => SaveResponse::saved(entry_id),
        EntryOutcome::Reset => SaveResponse::reset(),
    }))
}

/// Accept a JSON string or number where a string id is expected.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_save_request_accepts_numeric_customer_id() {
        let request: SaveRequest = serde_json::from_value(json!({
            "customer_id": 6549243166_u64,
            "roast_handle": "ethiopia-guji"
        }))
        .unwrap();

        assert_eq!(request.customer_id.as_deref(), Some("6549243166"));
    }

    #[test]
    fn test_save_request_accepts_string_customer_id() {
        let request: SaveRequest = serde_json::from_value(json!({
            "customer_id": "6549243166",
            "roast_handle": "ethiopia-guji"
        }))
        .unwrap();

        assert_eq!(request.customer_id.as_deref(), Some("6549243166"));
    }

    #[test]
    fn test_draft_defaults_absent_fields() {
        let request: SaveRequest = serde_json::from_value(json!({
            "customer_id": "1",
            "roast_handle": "kenya-aa",
            "notes": "jammy"
        }))
        .unwrap();

        let draft = request.draft();
        assert_eq!(draft.notes, "jammy");
        assert_eq!(draft.brew_method, "");
        assert!(!draft.grinding_from_whole_bean);
        assert!((draft.rating - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_action_reset_only_on_exact_keyword() {
        let reset: SaveRequest = serde_json::from_value(json!({
            "customer_id": "1",
            "roast_handle": "kenya-aa",
            "action": "reset",
            "entry_id": "abc"
        }))
        .unwrap();
        assert_eq!(
            reset.action(),
            EntryAction::Reset {
                entry_id: Some("abc".to_string())
            }
        );

        let save: SaveRequest = serde_json::from_value(json!({
            "customer_id": "1",
            "roast_handle": "kenya-aa",
            "action": "save"
        }))
        .unwrap();
        assert!(matches!(save.action(), EntryAction::Save { .. }));
    }

    #[test]
    fn test_save_response_shapes() {
        let saved = serde_json::to_value(SaveResponse::saved("123".to_string())).unwrap();
        assert_eq!(saved, json!({ "ok": true, "entry_id": "123" }));

        let reset = serde_json::to_value(SaveResponse::reset()).unwrap();
        assert_eq!(reset, json!({ "ok": true, "reset": true }));
    }
}
