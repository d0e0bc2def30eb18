//! Common test utilities for webhook-ledger-api integration tests
//!
//! Every test gets its own in-memory SQLite database. The pool is capped at
//! one connection so all requests see the same database.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use tower::ServiceExt;
use webhook_ledger_api::{create_router, AppState};
use webhook_ledger_core::{
    sign, webhook_event, Database, DatabaseSettings, EventDispatcher, SignatureVerifier,
    WebhookEvents, WebhookSecret, DELIVERY_ID_HEADER, EVENT_TYPE_HEADER, SIGNATURE_HEADER,
};

pub const TEST_SECRET: &str = "test_webhook_secret_value";

pub struct TestApp {
    pub database: Database,
    pub router: Router,
}

#[allow(dead_code)]
impl TestApp {
    /// App with the default handlers.
    pub async fn new() -> Self {
        Self::with_dispatcher(EventDispatcher::with_default_handlers()).await
    }

    pub async fn with_dispatcher(dispatcher: EventDispatcher) -> Self {
        let database = create_test_database().await;
        let state = AppState::new(
            database.clone(),
            SignatureVerifier::new(WebhookSecret::new(TEST_SECRET)),
            dispatcher,
        );

        Self {
            database,
            router: create_router(state),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// POST a correctly signed delivery.
    pub async fn deliver(&self, event_type: &str, delivery_id: &str, body: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri("/webhooks/github")
            .header(EVENT_TYPE_HEADER, event_type)
            .header(DELIVERY_ID_HEADER, delivery_id)
            .header(SIGNATURE_HEADER, sign_body(body))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// All stored rows, newest first.
    pub async fn stored_events(&self) -> Vec<webhook_event::Model> {
        WebhookEvents::list_recent(self.database.connection(), 1_000)
            .await
            .unwrap()
    }
}

#[allow(dead_code)]
pub async fn create_test_database() -> Database {
    let mut settings = DatabaseSettings::new("sqlite::memory:");
    settings.pool_size = 1;
    settings.max_overflow = 0;
    settings.echo = false;

    let database = Database::connect(&settings).await.unwrap();
    database.ensure_schema().await.unwrap();
    database
}

#[allow(dead_code)]
pub fn sign_body(body: &str) -> String {
    sign(&WebhookSecret::new(TEST_SECRET), body.as_bytes())
}

#[allow(dead_code)]
pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub async fn assert_error(response: Response, status: StatusCode, detail: &str) {
    assert_eq!(response.status(), status);
    let body = json_body(response).await;
    assert_eq!(body["detail"], detail);
    assert_eq!(body["status"], status.as_u16());
}
