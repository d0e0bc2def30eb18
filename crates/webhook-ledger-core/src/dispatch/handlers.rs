//! Built-in handlers for `push`, `pull_request` and `issues` events.
//!
//! Each handler pulls a few fields out of the stored payload and logs a
//! one-line summary. Missing fields render as `None`; they never fail the
//! handler. A payload that is not a JSON object does.

use super::{EventHandler, HandlerError};
use crate::storage::webhook_event;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use tracing::info;

fn as_object(payload: &Value) -> Result<&Map<String, Value>, HandlerError> {
    payload
        .as_object()
        .ok_or_else(|| HandlerError::UnexpectedPayload {
            found: json_kind(payload).to_string(),
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render a payload field for a log line: strings bare, other values as JSON.
fn field_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn repository_name(payload: &Map<String, Value>) -> Option<String> {
    field_text(payload.get("repository").and_then(|r| r.get("full_name")))
}

struct Shown<'a>(&'a Option<String>);

impl fmt::Display for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => f.write_str(value),
            None => f.write_str("None"),
        }
    }
}

// ============================================================================
// push
// ============================================================================

/// Fields of interest in a `push` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSummary {
    pub repository: Option<String>,
    pub git_ref: Option<String>,
    pub commit_count: usize,
}

impl PushSummary {
    pub fn from_payload(payload: &Value) -> Result<Self, HandlerError> {
        let payload = as_object(payload)?;
        Ok(Self {
            repository: repository_name(payload),
            git_ref: field_text(payload.get("ref")),
            commit_count: payload
                .get("commits")
                .and_then(Value::as_array)
                .map_or(0, Vec::len),
        })
    }
}

impl fmt::Display for PushSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Push to {} on {} with {} commits",
            Shown(&self.repository),
            Shown(&self.git_ref),
            self.commit_count
        )
    }
}

pub struct PushHandler;

#[async_trait]
impl EventHandler for PushHandler {
    async fn handle(&self, event: &webhook_event::Model) -> Result<(), HandlerError> {
        let summary = PushSummary::from_payload(&event.payload)?;
        info!(event_id = event.id, "{}", summary);
        Ok(())
    }
}

// ============================================================================
// pull_request
// ============================================================================

/// Fields of interest in a `pull_request` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSummary {
    pub action: Option<String>,
    pub number: Option<String>,
    pub repository: Option<String>,
}

impl PullRequestSummary {
    pub fn from_payload(payload: &Value) -> Result<Self, HandlerError> {
        let payload = as_object(payload)?;
        Ok(Self {
            action: field_text(payload.get("action")),
            number: field_text(payload.get("number")),
            repository: repository_name(payload),
        })
    }
}

impl fmt::Display for PullRequestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pull request #{} {} in {}",
            Shown(&self.number),
            Shown(&self.action),
            Shown(&self.repository)
        )
    }
}

pub struct PullRequestHandler;

#[async_trait]
impl EventHandler for PullRequestHandler {
    async fn handle(&self, event: &webhook_event::Model) -> Result<(), HandlerError> {
        let summary = PullRequestSummary::from_payload(&event.payload)?;
        info!(event_id = event.id, "{}", summary);
        Ok(())
    }
}

// ============================================================================
// issues
// ============================================================================

/// Fields of interest in an `issues` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSummary {
    pub action: Option<String>,
    pub number: Option<String>,
    pub repository: Option<String>,
}

impl IssueSummary {
    pub fn from_payload(payload: &Value) -> Result<Self, HandlerError> {
        let payload = as_object(payload)?;
        Ok(Self {
            action: field_text(payload.get("action")),
            number: field_text(payload.get("issue").and_then(|i| i.get("number"))),
            repository: repository_name(payload),
        })
    }
}

impl fmt::Display for IssueSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Issue #{} {} in {}",
            Shown(&self.number),
            Shown(&self.action),
            Shown(&self.repository)
        )
    }
}

pub struct IssuesHandler;

#[async_trait]
impl EventHandler for IssuesHandler {
    async fn handle(&self, event: &webhook_event::Model) -> Result<(), HandlerError> {
        let summary = IssueSummary::from_payload(&event.payload)?;
        info!(event_id = event.id, "{}", summary);
        Ok(())
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
