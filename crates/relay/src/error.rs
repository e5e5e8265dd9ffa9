//! Unified error handling with Sentry integration.
//!
//! Every request handler returns `Result<T, AppError>`; failures are caught
//! here at the boundary and rendered as `{ "ok": false, "error": ... }`.
//! Only the error message crosses the boundary - never internals or stack
//! traces.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::service::ServiceError;

/// Application-level error type for the relay.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required request field is missing or empty.
    #[error("{0}")]
    Validation(String),

    /// Passport service failure (store, remote, or serialization).
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// JSON error body shared by every failed response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server-side failures to Sentry; validation noise stays out.
        if matches!(self, Self::Service(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody {
            ok: false,
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;

    #[test]
    fn test_validation_error_is_bad_request() {
        let response = AppError::Validation("customer_id is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_service_error_is_internal() {
        let err = AppError::Service(ServiceError::Store(StoreError::DataCorruption(
            "bad blob".to_string(),
        )));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_display_carries_the_message() {
        let err = AppError::Validation("roast_handle is required".to_string());
        assert_eq!(err.to_string(), "roast_handle is required");

        let err = AppError::Service(ServiceError::Store(StoreError::DataCorruption(
            "bad blob".to_string(),
        )));
        assert_eq!(err.to_string(), "data corruption: bad blob");
    }
}
