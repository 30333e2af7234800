//! Events emitted by the worker on its output stream.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message attached to the synthetic reply produced when a synchronous
/// request times out.
pub const TIMEOUT_MESSAGE: &str = "Timeout";

/// Status value carried by failure events.
pub const STATUS_ERROR: &str = "error";

/// Status value carried by successful replies.
pub const STATUS_SUCCESS: &str = "success";

/// Discriminant of an [`Event`], serialised as the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Informational worker log line.
    Log,
    /// Per-file status transition.
    Status,
    /// Upload or command result.
    Result,
    /// Failure report.
    Error,
    /// Bare success acknowledgement.
    Success,
    /// Structured data reply.
    Data,
    /// A job finished processing all of its files.
    BatchComplete,
    /// Any event type this bridge does not know about.
    #[serde(other)]
    Other,
}

impl EventKind {
    /// Returns `true` for kinds that satisfy a pending synchronous request.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Result | Self::Data | Self::Error | Self::Success)
    }
}

/// A single event decoded from the worker.
///
/// Only `type` is mandatory; the remaining fields are populated depending on
/// the kind. `file` is the correlation key for per-file events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thumb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl Event {
    /// Creates an event of the given kind with every optional field empty.
    #[must_use]
    pub const fn new(kind: EventKind) -> Self {
        Self {
            kind,
            file: None,
            status: None,
            url: None,
            thumb: None,
            msg: None,
            data: None,
        }
    }

    /// Creates a per-file `status` event.
    #[must_use]
    pub fn status(file: impl Into<String>, status: impl Into<String>) -> Self {
        Self::new(EventKind::Status)
            .with_file(file)
            .with_status(status)
    }

    /// Creates an `error` event with `status=error` and the given message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventKind::Error)
            .with_status(STATUS_ERROR)
            .with_msg(message)
    }

    /// The reply substituted when a synchronous request times out.
    #[must_use]
    pub fn timeout() -> Self {
        Self::error(TIMEOUT_MESSAGE)
    }

    /// Attaches the correlating file path.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Attaches a status value.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Attaches the uploaded image URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attaches the thumbnail URL.
    #[must_use]
    pub fn with_thumb(mut self, thumb: impl Into<String>) -> Self {
        self.thumb = Some(thumb.into());
        self
    }

    /// Attaches a human-readable message.
    #[must_use]
    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    /// Attaches structured data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns the correlating file path.
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Returns the status value.
    #[must_use]
    pub fn status_text(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Returns the uploaded image URL.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Returns the thumbnail URL.
    #[must_use]
    pub fn thumb(&self) -> Option<&str> {
        self.thumb.as_deref()
    }

    /// Returns the message.
    #[must_use]
    pub fn msg(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    /// Returns the structured data payload.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Returns `true` when `status` equals `success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_text() == Some(STATUS_SUCCESS)
    }

    /// Returns `true` when this is the synthetic timeout reply.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind == EventKind::Error
            && self.status_text() == Some(STATUS_ERROR)
            && self.msg() == Some(TIMEOUT_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case(EventKind::Result, true)]
    #[case(EventKind::Data, true)]
    #[case(EventKind::Error, true)]
    #[case(EventKind::Success, true)]
    #[case(EventKind::Status, false)]
    #[case(EventKind::Log, false)]
    #[case(EventKind::BatchComplete, false)]
    #[case(EventKind::Other, false)]
    fn terminal_kinds(#[case] kind: EventKind, #[case] terminal: bool) {
        assert_eq!(kind.is_terminal(), terminal);
    }

    #[test]
    fn unknown_types_map_to_other() {
        let event: Event =
            serde_json::from_value(json!({"type": "viper_post", "msg": "hi"})).expect("decodes");
        assert_eq!(event.kind(), EventKind::Other);
        assert_eq!(event.msg(), Some("hi"));
    }

    #[test]
    fn batch_complete_uses_snake_case() {
        let event: Event =
            serde_json::from_value(json!({"type": "batch_complete", "status": "done"}))
                .expect("decodes");
        assert_eq!(event.kind(), EventKind::BatchComplete);
    }

    #[test]
    fn timeout_reply_is_recognisable() {
        let reply = Event::timeout();
        assert!(reply.is_timeout());
        assert!(!reply.is_success());
        let encoded = serde_json::to_value(&reply).expect("encodes");
        assert_eq!(
            encoded,
            json!({"type": "error", "status": "error", "msg": "Timeout"})
        );
    }

    #[test]
    fn absent_fields_are_not_serialised() {
        let encoded = serde_json::to_value(Event::status("/a.jpg", "Done")).expect("encodes");
        assert_eq!(
            encoded,
            json!({"type": "status", "file": "/a.jpg", "status": "Done"})
        );
    }
}
