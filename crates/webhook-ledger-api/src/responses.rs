//! Response types and query parameters for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use webhook_ledger_core::webhook_event;

/// Page size used when `limit` is not given.
pub const DEFAULT_EVENT_LIMIT: u64 = 10;

/// Welcome response for `GET /`
#[derive(Debug, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// Webhook ingestion response
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
    pub event_id: i32,
}

impl WebhookResponse {
    pub fn success(event_id: i32) -> Self {
        Self {
            status: "success".to_string(),
            event_id,
        }
    }
}

/// One stored delivery as returned by `GET /webhooks/events`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: i32,
    pub event_type: String,
    pub delivery_id: Option<String>,
    pub signature: Option<String>,
    pub payload: serde_json::Value,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<webhook_event::Model> for EventRecord {
    fn from(model: webhook_event::Model) -> Self {
        Self {
            id: model.id,
            event_type: model.event_type,
            delivery_id: model.delivery_id,
            signature: model.signature,
            payload: model.payload,
            processed: model.processed,
            created_at: model.created_at,
        }
    }
}

/// Query parameters for event listing
#[derive(Debug, Deserialize)]
pub struct EventListParams {
    pub limit: Option<u64>,
}

impl EventListParams {
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_EVENT_LIMIT)
    }
}
