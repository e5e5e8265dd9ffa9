//! Integration tests for the passport read and entry save/reset flow.
//!
//! These tests require:
//! - A running `PostgreSQL` database
//! - The relay running (cargo run -p alfie-passport-relay)
//!
//! Run with: cargo test -p alfie-passport-integration-tests -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL for the relay (configurable via environment).
fn relay_base_url() -> String {
    std::env::var("RELAY_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

fn client() -> Client {
    Client::new()
}

/// A customer id that has no legacy data and no document yet.
fn fresh_customer_id() -> String {
    format!("it-{}", Uuid::new_v4().simple())
}

/// Test helper: fetch a customer's passport as JSON.
async fn fetch_passport(client: &Client, customer_id: &str) -> Value {
    let base_url = relay_base_url();
    let resp = client
        .get(format!("{base_url}/apps/alfie-tracker/passport-data"))
        .query(&[("customer_id", customer_id)])
        .send()
        .await
        .expect("Failed to fetch passport");

    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.expect("Failed to parse passport JSON")
}

/// Test helper: POST a save body and return (status, body).
async fn post_save(client: &Client, body: Value) -> (StatusCode, Value) {
    let base_url = relay_base_url();
    let resp = client
        .post(format!("{base_url}/save"))
        .json(&body)
        .send()
        .await
        .expect("Failed to POST /save");

    let status = resp.status();
    let body = resp.json().await.expect("Failed to parse save response");
    (status, body)
}

// ============================================================================
// Readiness
// ============================================================================

#[tokio::test]
#[ignore = "Requires running relay and database"]
async fn test_readiness_probe() {
    let resp = client()
        .get(relay_base_url())
        .send()
        .await
        .expect("Failed to probe readiness");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("Failed to read body"), "ok");
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
#[ignore = "Requires running relay and database"]
async fn test_passport_read_requires_customer_id() {
    let base_url = relay_base_url();
    let resp = client()
        .get(format!("{base_url}/apps/alfie-tracker/passport-data"))
        .send()
        .await
        .expect("Failed to fetch passport");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Failed to parse error body");
    assert_eq!(body["ok"], json!(false));
}

#[tokio::test]
#[ignore = "Requires running relay and database"]
async fn test_save_requires_customer_id_and_roast_handle() {
    let (status, body) = post_save(&client(), json!({ "roast_handle": "kenya-aa" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], json!(false));

    let (status, body) = post_save(&client(), json!({ "customer_id": "123" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], json!(false));
}

// ============================================================================
// Read
// ============================================================================

#[tokio::test]
#[ignore = "Requires running relay and database"]
async fn test_unknown_customer_reads_as_empty_passport() {
    let passport = fetch_passport(&client(), &fresh_customer_id()).await;
    assert_eq!(passport, json!({}));

    // The wire shape deserializes into the shared type as an empty passport.
    let typed: alfie_passport_core::Passport =
        serde_json::from_value(passport).expect("wire passport must match the shared type");
    assert!(typed.is_empty());
}

// ============================================================================
// Save / update / reset
// ============================================================================

#[tokio::test]
#[ignore = "Requires running relay and database"]
async fn test_save_creates_then_updates_then_resets() {
    let client = client();
    let customer_id = fresh_customer_id();
    let roast_handle = "ethiopia-guji";

    // Create: no entry_id supplied, the relay assigns one.
    let (status, body) = post_save(
        &client,
        json!({
            "customer_id": customer_id,
            "roast_handle": roast_handle,
            "brew_method": "V60",
            "rating": 3,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    let entry_id = body["entry_id"]
        .as_str()
        .expect("save response must carry entry_id")
        .to_string();

    let passport = fetch_passport(&client, &customer_id).await;
    let entries = passport[roast_handle]["entries"]
        .as_array()
        .expect("roast must be normalized");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], json!(entry_id));
    assert_eq!(entries[0]["brew_method"], json!("V60"));
    assert_eq!(entries[0]["created_at"], entries[0]["updated_at"]);

    // Update: reuse the returned entry_id; length must not change.
    let (status, body) = post_save(
        &client,
        json!({
            "customer_id": customer_id,
            "roast_handle": roast_handle,
            "entry_id": entry_id,
            "brew_method": "aeropress",
            "rating": 4,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entry_id"], json!(entry_id));

    let passport = fetch_passport(&client, &customer_id).await;
    let entries = passport[roast_handle]["entries"]
        .as_array()
        .expect("roast must stay normalized");
    assert_eq!(entries.len(), 1, "update must not append");
    assert_eq!(entries[0]["id"], json!(entry_id));
    assert_eq!(entries[0]["brew_method"], json!("aeropress"));
    assert_ne!(entries[0]["updated_at"], entries[0]["created_at"]);

    // Reset: the entry disappears from the sequence entirely.
    let (status, body) = post_save(
        &client,
        json!({
            "customer_id": customer_id,
            "roast_handle": roast_handle,
            "entry_id": entry_id,
            "action": "reset",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "reset": true }));

    let passport = fetch_passport(&client, &customer_id).await;
    let entries = passport[roast_handle]["entries"]
        .as_array()
        .expect("roast must stay normalized");
    assert!(entries.is_empty());
}

#[tokio::test]
#[ignore = "Requires running relay and database"]
async fn test_reset_of_never_saved_entry_is_success() {
    let client = client();
    let customer_id = fresh_customer_id();

    let (status, body) = post_save(
        &client,
        json!({
            "customer_id": customer_id,
            "roast_handle": "kenya-aa",
            "entry_id": "never-saved",
            "action": "reset",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "reset": true }));
}

#[tokio::test]
#[ignore = "Requires running relay and database"]
async fn test_numeric_customer_id_is_accepted() {
    let (status, body) = post_save(
        &client(),
        json!({
            "customer_id": 9_876_543_210_u64,
            "roast_handle": "kenya-aa",
            "notes": "sent as a number",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
}

// ============================================================================
// CORS
// ============================================================================

#[tokio::test]
#[ignore = "Requires running relay and database"]
async fn test_disallowed_origin_gets_no_cors_headers() {
    let base_url = relay_base_url();
    let resp = client()
        .get(format!("{base_url}/apps/alfie-tracker/passport-data"))
        .query(&[("customer_id", "123")])
        .header("Origin", "https://not-the-storefront.example")
        .send()
        .await
        .expect("Failed to fetch passport");

    assert!(
        resp.headers()
            .get("access-control-allow-origin")
            .is_none(),
        "unlisted origins must not be echoed back"
    );
}
