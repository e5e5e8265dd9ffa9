//! Shopify Admin API client for the legacy passport metafield.
//!
//! The passport used to live in a single string-valued customer metafield.
//! Post-cutover the relay only reads from it (the migration source); the
//! write path is kept as the documented pre-cutover surface.

pub mod metafields;

pub use metafields::MetafieldClient;

use thiserror::Error;

/// Errors from the Shopify Admin API.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The HTTP request itself failed (DNS, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Shopify answered with a non-success status.
    #[error("Shopify API returned HTTP {0}")]
    Transport(u16),

    /// Shopify answered 200 but reported an application-level error
    /// (GraphQL errors, mutation user errors, or an unusable response body).
    #[error("Shopify API error: {0}")]
    Api(String),
}
