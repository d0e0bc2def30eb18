//! Per-event-type handling of stored deliveries.
//!
//! The [`EventDispatcher`] maps event type strings to [`EventHandler`]s. Types
//! without an entry are accepted and only flagged as processed.
//!
//! Dispatch policy:
//!
//! | Situation | Effect | `processed` |
//! |---|---|---|
//! | handler found, succeeds | [`DispatchOutcome::Handled`] | set |
//! | no handler for the type | [`DispatchOutcome::Unhandled`] | set |
//! | event id not in the table | [`DispatchOutcome::Missing`], logged | n/a |
//! | handler returns an error | [`DispatchOutcome::HandlerFailed`], logged, session rolled back | unset |
//! | database error | [`StorageError`] returned to the caller | unchanged |

mod handlers;

pub use handlers::{
    IssueSummary, IssuesHandler, PullRequestHandler, PullRequestSummary, PushHandler, PushSummary,
};

use crate::storage::{webhook_event, Database, Session, StorageError, WebhookEvents};
use async_trait::async_trait;
use sea_orm::DbErr;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Application-provided processing for one event type.
///
/// Handlers run synchronously inside the ingestion request, after the event
/// has been committed and before the HTTP response is sent.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &webhook_event::Model) -> Result<(), HandlerError>;
}

/// Handler errors
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Expected a JSON object payload, got {found}")]
    UnexpectedPayload { found: String },

    #[error("Handler failed: {message}")]
    Failed { message: String },
}

/// Result of dispatching one stored event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled { event_type: String },
    Unhandled { event_type: String },
    Missing,
    HandlerFailed { event_type: String },
}

impl DispatchOutcome {
    /// Whether this outcome leaves the event flagged as processed.
    pub fn marks_processed(&self) -> bool {
        matches!(self, Self::Handled { .. } | Self::Unhandled { .. })
    }
}

#[derive(Debug, thiserror::Error)]
enum DispatchError {
    #[error("Handler for '{event_type}' failed: {source}")]
    Handler {
        event_type: String,
        #[source]
        source: HandlerError,
    },

    #[error(transparent)]
    Storage(#[from] DbErr),
}

/// Lookup table from event type to handler.
#[derive(Clone)]
pub struct EventDispatcher {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::with_default_handlers()
    }
}

impl EventDispatcher {
    /// A dispatcher that handles nothing; every event is only flagged.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Handlers for `push`, `pull_request` and `issues`.
    pub fn with_default_handlers() -> Self {
        let mut dispatcher = Self::empty();
        dispatcher.register("push", Arc::new(PushHandler));
        dispatcher.register("pull_request", Arc::new(PullRequestHandler));
        dispatcher.register("issues", Arc::new(IssuesHandler));
        dispatcher
    }

    /// Add or replace the handler for `event_type`, returning the one replaced.
    pub fn register(
        &mut self,
        event_type: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Option<Arc<dyn EventHandler>> {
        self.handlers.insert(event_type.into(), handler)
    }

    /// Event types with a registered handler, sorted.
    pub fn handled_event_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Re-read event `event_id`, run its handler and flag it as processed.
    ///
    /// Runs in its own session. See the module documentation for the policy
    /// applied to missing events and failing handlers.
    #[instrument(skip(self, database))]
    pub async fn dispatch(
        &self,
        database: &Database,
        event_id: i32,
    ) -> Result<DispatchOutcome, StorageError> {
        let session = database.session().await?;
        let result = self.dispatch_in(&session, event_id).await;

        match session.finish(result).await {
            Ok(outcome) => Ok(outcome),
            Err(DispatchError::Handler { event_type, source }) => {
                error!(
                    event_id,
                    event_type = %event_type,
                    error = %source,
                    "Error processing webhook event"
                );
                Ok(DispatchOutcome::HandlerFailed { event_type })
            }
            Err(DispatchError::Storage(e)) => Err(StorageError::Database(e)),
        }
    }

    async fn dispatch_in(
        &self,
        session: &Session,
        event_id: i32,
    ) -> Result<DispatchOutcome, DispatchError> {
        let Some(event) = WebhookEvents::find_by_id(session.connection(), event_id).await? else {
            warn!(event_id, "Webhook event not found; nothing to dispatch");
            return Ok(DispatchOutcome::Missing);
        };

        let event_type = event.event_type.clone();
        let outcome = match self.handlers.get(&event_type) {
            Some(handler) => {
                handler
                    .handle(&event)
                    .await
                    .map_err(|source| DispatchError::Handler {
                        event_type: event_type.clone(),
                        source,
                    })?;
                DispatchOutcome::Handled { event_type }
            }
            None => {
                debug!(event_id, event_type = %event_type, "No handler registered");
                DispatchOutcome::Unhandled { event_type }
            }
        };

        WebhookEvents::mark_processed(session.connection(), event).await?;
        info!(event_id, "Webhook event processed");
        Ok(outcome)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handled_event_types())
            .finish()
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
