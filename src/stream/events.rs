//! Event types decoded from the chat message stream.

use serde::{Deserialize, Serialize};

/// Event type carrying a chunk of answer text.
pub const TEXT_EVENT: &str = "text";

/// Prefix of event types that report an upstream failure (`error:<Kind>`).
pub const ERROR_EVENT_PREFIX: &str = "error";

/// A single event streamed by the backend while it answers a message.
///
/// Each event is one JSON object on its own line:
/// `{"type": "text", "value": "Hel"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamedEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub value: String,
}

/// Classification of a [`StreamedEvent`] by its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind<'a> {
    /// A chunk of the answer to append to what is already displayed
    Text,
    /// The backend failed; carries the error class after `error:` (may be empty)
    Error(&'a str),
    /// Anything else; passed through untouched
    Other(&'a str),
}

impl StreamedEvent {
    /// Create a new event.
    pub fn new(event_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            value: value.into(),
        }
    }

    /// Shorthand for a `text` event.
    pub fn text(value: impl Into<String>) -> Self {
        Self::new(TEXT_EVENT, value)
    }

    /// Classify this event by its type.
    pub fn kind(&self) -> EventKind<'_> {
        if self.event_type == TEXT_EVENT {
            return EventKind::Text;
        }
        if let Some(rest) = self.event_type.strip_prefix(ERROR_EVENT_PREFIX) {
            // `error:A:B` names class `A`; anything after a second colon is dropped.
            let class = rest.split(':').nth(1).unwrap_or("");
            return EventKind::Error(class);
        }
        EventKind::Other(&self.event_type)
    }

    /// Returns true if this event reports an upstream failure.
    pub fn is_error(&self) -> bool {
        matches!(self.kind(), EventKind::Error(_))
    }
}
