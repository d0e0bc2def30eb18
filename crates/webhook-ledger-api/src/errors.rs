//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, warn};
use webhook_ledger_core::StorageError;

/// Request errors with HTTP status code mapping
///
/// - `401 Unauthorized`: the delivery's signature did not verify
/// - `400 Bad Request`: the body or query string could not be parsed
/// - `500 Internal Server Error`: the event database failed
///
/// Every error renders as `{ "detail", "status", "timestamp" }`. Storage
/// failures are logged in full server-side; the client only sees a generic
/// message.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    /// Missing, malformed or mismatched `X-Hub-Signature-256`
    ///
    /// Maps to: `401 Unauthorized`. Nothing is stored.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed body that is not a JSON document
    ///
    /// Maps to: `400 Bad Request`. Nothing is stored.
    #[error("Invalid JSON payload")]
    InvalidJson(#[source] serde_json::Error),

    /// Query string rejected by the extractor, e.g. `limit=-1`
    ///
    /// Maps to: `400 Bad Request`
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    /// Insert, lookup or update failed
    ///
    /// Maps to: `500 Internal Server Error`. The request's session has been
    /// rolled back by the time this is rendered.
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl WebhookHandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::InvalidJson(_) | Self::InvalidQuery { .. } => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            Self::InvalidSignature => {
                warn!("Rejected webhook with invalid signature");
                self.to_string()
            }
            Self::InvalidJson(e) => {
                warn!(error = %e, "Rejected webhook with invalid JSON payload");
                self.to_string()
            }
            Self::InvalidQuery { .. } => self.to_string(),
            Self::Storage(e) => {
                // Log detailed error server-side but return generic message to client
                error!(error = %e, "Event storage failed");
                "Internal server error occurred. Please try again later.".to_string()
            }
        };

        let body = serde_json::json!({
            "detail": detail,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },
}
