//! Integration tests for the Alfie passport relay.
//!
//! # Running Tests
//!
//! ```bash
//! # Start Postgres, then the relay
//! cargo run -p alfie-passport-relay
//!
//! # Run integration tests
//! cargo test -p alfie-passport-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `passport_flow` - Read endpoint, save/update/reset protocol, validation
//! - `migration` - Migration-on-read behavior (needs seeded Shopify data)
//!
//! All tests are `#[ignore]`d by default: they need a running relay, a
//! reachable database, and (for the migration tests) real Shopify
//! credentials.
