//! # Webhook-Ledger HTTP Service
//!
//! HTTP server for receiving GitHub webhooks, recording them in the event
//! ledger and dispatching them to per-type handlers.
//!
//! This service provides:
//! - `GET /`: welcome message
//! - `GET /webhooks/events`: most recent deliveries, newest first
//! - `POST /webhooks/github`: signed webhook ingestion

mod errors;
mod responses;

pub use errors::{ServiceError, WebhookHandlerError};
pub use responses::{
    EventListParams, EventRecord, WebhookResponse, WelcomeResponse, DEFAULT_EVENT_LIMIT,
};

use axum::{
    extract::{rejection::QueryRejection, DefaultBodyLimit, Query, State},
    http::HeaderMap,
    middleware,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};
use webhook_ledger_core::{
    Database, EventDispatcher, NewWebhookEvent, Settings, SignatureVerifier, StorageError,
    WebhookEvents, DEFAULT_MAX_BODY_SIZE, DELIVERY_ID_HEADER, EVENT_TYPE_HEADER,
    SIGNATURE_HEADER,
};

/// Header used to correlate log lines for one request.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

const WELCOME_MESSAGE: &str = "Welcome to the webhook-ledger receiver!";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Event database and connection pool
    pub database: Database,

    /// Checks `X-Hub-Signature-256` against the shared secret
    pub verifier: Arc<SignatureVerifier>,

    /// Runs per-type handlers on stored events
    pub dispatcher: Arc<EventDispatcher>,

    /// Largest webhook body accepted, in bytes
    pub max_body_size: usize,
}

impl AppState {
    /// Create new application state
    pub fn new(
        database: Database,
        verifier: SignatureVerifier,
        dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            database,
            verifier: Arc::new(verifier),
            dispatcher: Arc::new(dispatcher),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Replace the webhook body size limit.
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// State with the default handlers and the secret from `settings`.
    pub fn from_settings(settings: &Settings, database: Database) -> Self {
        Self::new(
            database,
            SignatureVerifier::new(settings.webhook_secret.clone()),
            EventDispatcher::with_default_handlers(),
        )
        .with_max_body_size(settings.max_body_size)
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let webhook_routes = Router::new()
        .route(
            "/webhooks/github",
            post(handle_github_webhook).layer(DefaultBodyLimit::max(state.max_body_size)),
        )
        .route("/webhooks/events", get(list_events));

    Router::new()
        .route("/", get(handle_root))
        .merge(webhook_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server on `settings.bind_address()` and serve until SIGINT or
/// SIGTERM.
///
/// In-flight requests are allowed to finish after the signal arrives.
pub async fn start_server(settings: &Settings, state: AppState) -> Result<(), ServiceError> {
    let app = create_router(state);

    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn handle_root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: WELCOME_MESSAGE.to_string(),
    })
}

/// List the most recent deliveries, newest first.
#[instrument(skip(state, params))]
async fn list_events(
    State(state): State<AppState>,
    params: Result<Query<EventListParams>, QueryRejection>,
) -> Result<Json<Vec<EventRecord>>, WebhookHandlerError> {
    let Query(params) = params.map_err(|rejection| WebhookHandlerError::InvalidQuery {
        message: rejection.body_text(),
    })?;

    let events = WebhookEvents::list_recent(state.database.connection(), params.limit())
        .await
        .map_err(StorageError::from)?;

    Ok(Json(events.into_iter().map(EventRecord::from).collect()))
}

/// Handle GitHub webhook requests
///
/// 1. Verify the signature over the raw body (401 on failure)
/// 2. Parse the body as JSON (400 on failure)
/// 3. Insert the event and commit
/// 4. Dispatch the stored event before responding
///
/// Nothing is stored when steps 1 or 2 fail.
#[instrument(skip(state, headers, body), fields(event_type, delivery_id))]
pub async fn handle_github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, WebhookHandlerError> {
    let event_type = header_text(&headers, EVENT_TYPE_HEADER);
    let delivery_id = header_text(&headers, DELIVERY_ID_HEADER);
    let signature = header_text(&headers, SIGNATURE_HEADER);

    let span = tracing::Span::current();
    if let Some(event_type) = &event_type {
        span.record("event_type", event_type.as_str());
    }
    if let Some(delivery_id) = &delivery_id {
        span.record("delivery_id", delivery_id.as_str());
    }

    if !state.verifier.verify(&body, signature.as_deref()) {
        return Err(WebhookHandlerError::InvalidSignature);
    }

    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(WebhookHandlerError::InvalidJson)?;

    let session = state.database.session().await?;
    let inserted = WebhookEvents::insert(
        session.connection(),
        NewWebhookEvent {
            event_type,
            delivery_id,
            signature,
            payload,
        },
    )
    .await
    .map_err(StorageError::from);
    let stored = session.finish(inserted).await?;

    info!(event_id = stored.id, "Webhook event stored");

    let outcome = state.dispatcher.dispatch(&state.database, stored.id).await?;
    if !outcome.marks_processed() {
        warn!(event_id = stored.id, ?outcome, "Webhook event left unprocessed");
    }

    Ok(Json(WebhookResponse::success(stored.id)))
}

/// Header value as text. UTF-8 is kept as is; any other bytes are read as
/// Latin-1, so a present header is never dropped.
fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    let bytes = headers.get(name)?.as_bytes();
    Some(match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation ID tracking
///
/// Reuses the caller's `x-correlation-id` or generates one, records it on the
/// request span and echoes it on the response.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, header_value);
    }

    let status = response.status();
    if status.is_server_error() {
        error!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
