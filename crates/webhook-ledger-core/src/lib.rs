//! # Webhook-Ledger Core
//!
//! Domain logic for the webhook-ledger receiver:
//!
//! - [`settings`]: process settings loaded from the environment
//! - [`signature`]: `X-Hub-Signature-256` HMAC verification
//! - [`storage`]: the `webhook_events` table, connection pool and scoped sessions
//! - [`dispatch`]: per-event-type handling of stored deliveries
//!
//! Nothing in this crate reads global state. The [`settings::Settings`] value
//! built at startup is handed to every component that needs part of it.

pub mod dispatch;
pub mod settings;
pub mod signature;
pub mod storage;

pub use dispatch::{DispatchOutcome, EventDispatcher, EventHandler, HandlerError};
pub use settings::{Settings, SettingsError, WebhookSecret, DEFAULT_MAX_BODY_SIZE};
pub use signature::{sign, SignatureVerifier, SIGNATURE_PREFIX};
pub use storage::{
    webhook_event, Database, DatabaseSettings, NewWebhookEvent, Session, StorageError,
    WebhookEvents,
};

/// Header carrying the provider's event category, e.g. `push`.
pub const EVENT_TYPE_HEADER: &str = "x-github-event";

/// Header carrying the provider's per-delivery idempotency token.
pub const DELIVERY_ID_HEADER: &str = "x-github-delivery";

/// Header carrying the `sha256=<hex>` payload signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
