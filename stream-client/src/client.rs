//! Opens the SSE stream, decodes frames into [`StreamEvent`]s, and drives
//! the per-task event loop: tool calls are dispatched and their results
//! posted back, `change` directives are applied, and a terminal event ends
//! the loop.

use crate::errors::{Error, Result};
use crate::{change, dispatch};
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use std::pin::Pin;
use tool_executor::{ApprovalPolicy, ToolExecutor};
use uuid::Uuid;

const PROTOCOL_VERSION: &str = "3.0";

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallPayload {
    pub call_id: String,
    pub tool: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default)]
    pub require_approval: bool,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Edit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeDirective {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub path: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub replace: Option<String>,
}

#[derive(Debug, Clone)]
pub enum StreamEvent {
    Status(Value),
    Thinking(Value),
    Plan(Value),
    Content(Value),
    ToolCall(ToolCallPayload),
    ToolDone(Value),
    Change(ChangeDirective),
    Complete(Value),
    Cancelled(Value),
    Error(Value),
    Unknown(String, Value),
}

pub fn is_terminal(event: &StreamEvent) -> bool {
    matches!(event, StreamEvent::Complete(_) | StreamEvent::Cancelled(_) | StreamEvent::Error(_))
}

fn parse_event(event_type: &str, data: &str) -> Result<StreamEvent> {
    let value: Value = serde_json::from_str(data)?;
    Ok(match event_type {
        "status" => StreamEvent::Status(value),
        "thinking" => StreamEvent::Thinking(value),
        "plan" => StreamEvent::Plan(value),
        "content" => StreamEvent::Content(value),
        "tool_call" | "tool_request" => StreamEvent::ToolCall(serde_json::from_value(value)?),
        "tool_done" => StreamEvent::ToolDone(value),
        "change" => StreamEvent::Change(serde_json::from_value(value)?),
        "complete" => StreamEvent::Complete(value),
        "cancelled" => StreamEvent::Cancelled(value),
        "error" => StreamEvent::Error(value),
        other => StreamEvent::Unknown(other.to_string(), value),
    })
}

pub type EventStream = Pin<Box<dyn Stream<Item = std::result::Result<Event, EventStreamError<reqwest::Error>>> + Send>>;

pub struct OpenedStream {
    pub task_id: String,
    pub events: EventStream,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Complete(Value),
    Cancelled(Value),
    Error(Value),
}

/// Callbacks the caller wires up for the parts this crate intentionally
/// doesn't own: forwarding informational events to a UI, and gating
/// mutating tool calls behind an approval decision.
pub struct RunOptions<'a> {
    pub executor: &'a ToolExecutor,
    pub approval: &'a dyn ApprovalPolicy,
    pub on_event: &'a (dyn Fn(&StreamEvent) + Send + Sync),
}

pub struct StreamClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    openrouter_key: String,
}

impl StreamClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, openrouter_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
            openrouter_key: openrouter_key.into(),
        }
    }

    fn headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", self.token).parse().expect("bearer token is valid header value"),
        );
        headers.insert("X-OpenRouter-Key", self.openrouter_key.parse().expect("openrouter key is valid header value"));
        headers.insert(reqwest::header::ACCEPT, "text/event-stream".parse().unwrap());
        headers.insert(reqwest::header::CONTENT_TYPE, "application/json".parse().unwrap());
        headers.insert("X-Tarang-Protocol-Version", PROTOCOL_VERSION.parse().unwrap());
        headers
    }

    /// Opens the stream; the caller is expected to read the `task-id`
    /// response header out-of-band if the server sets one, otherwise the
    /// first `status` event typically carries it in its payload.
    pub async fn open(&self, instruction: &str, context: Value) -> Result<OpenedStream> {
        let response = self
            .http
            .post(format!("{}/v3/execute", self.base_url))
            .headers(self.headers())
            .json(&json!({ "instruction": instruction, "context": context }))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => return Err(Error::Unauthorized),
            other => {
                let status = other.as_u16();
                let body = response.text().await.unwrap_or_default();
                let excerpt: String = body.chars().take(500).collect();
                return Err(Error::OpenFailed { status, body: excerpt });
            }
        }

        let task_id = response
            .headers()
            .get("task-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let events: EventStream = Box::pin(response.bytes_stream().eventsource());
        Ok(OpenedStream { task_id, events })
    }

    pub async fn cancel(&self, task_id: &str) -> Result<()> {
        self.http
            .post(format!("{}/v3/cancel/{task_id}", self.base_url))
            .headers(self.headers())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn callback(&self, task_id: &str, call_id: &str, result: Value) -> Result<()> {
        self.http
            .post(format!("{}/v3/callback", self.base_url))
            .headers(self.headers())
            .json(&json!({ "task_id": task_id, "call_id": call_id, "result": result }))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::CallbackFailed(e.to_string()))?;
        Ok(())
    }

    /// Drives one task's event loop to a terminal event. Tool calls and
    /// change directives are applied as they arrive; a disconnect before a
    /// terminal event surfaces as [`Error::Disconnected`] so the caller can
    /// mark the execution state paused and stop, per the failure semantics
    /// of a dropped stream.
    pub async fn run_task(&self, task_id: &str, mut opened: OpenedStream, opts: &RunOptions<'_>) -> Result<RunOutcome> {
        loop {
            let frame = match opened.events.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => return Err(Error::Disconnected(e.to_string())),
                None => return Err(Error::Disconnected("stream closed before a terminal event".to_string())),
            };

            let event = parse_event(&frame.event, &frame.data)?;
            (opts.on_event)(&event);

            match event {
                StreamEvent::ToolCall(call) => {
                    dispatch::handle_tool_call(self, task_id, opts.executor, opts.approval, &call).await?;
                }
                StreamEvent::Change(directive) => {
                    let result = change::apply_change(opts.executor, &directive).await;
                    if let Err(e) = &result {
                        tracing::warn!(path = %directive.path, error = %e, "failed to apply change directive");
                    }
                }
                StreamEvent::Complete(value) => return Ok(RunOutcome::Complete(value)),
                StreamEvent::Cancelled(value) => return Ok(RunOutcome::Cancelled(value)),
                StreamEvent::Error(value) => return Ok(RunOutcome::Error(value)),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_call_alias() {
        let data = r#"{"call_id":"c1","tool":"read_file","args":{"file_path":"a.py"},"require_approval":false,"description":"read a.py"}"#;
        let event = parse_event("tool_request", data).unwrap();
        match event {
            StreamEvent::ToolCall(call) => {
                assert_eq!(call.call_id, "c1");
                assert_eq!(call.tool, "read_file");
                assert!(!call.require_approval);
            }
            other => panic!("expected ToolCall, got {other:?}"),
        }
    }

    #[test]
    fn unknown_event_type_is_preserved() {
        let event = parse_event("heartbeat", "{}").unwrap();
        assert!(matches!(event, StreamEvent::Unknown(ref t, _) if t == "heartbeat"));
    }

    #[test]
    fn terminal_events_are_identified() {
        assert!(is_terminal(&StreamEvent::Complete(json!({}))));
        assert!(is_terminal(&StreamEvent::Cancelled(json!({}))));
        assert!(is_terminal(&StreamEvent::Error(json!({}))));
        assert!(!is_terminal(&StreamEvent::Status(json!({}))));
    }

    #[test]
    fn change_directive_parses_edit_fields() {
        let data = r#"{"type":"edit","path":"a.py","search":"x","replace":"y"}"#;
        let event = parse_event("change", data).unwrap();
        match event {
            StreamEvent::Change(directive) => {
                assert_eq!(directive.kind, ChangeKind::Edit);
                assert_eq!(directive.search.as_deref(), Some("x"));
            }
            other => panic!("expected Change, got {other:?}"),
        }
    }
}
