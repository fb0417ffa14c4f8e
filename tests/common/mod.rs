//! Common test utilities for integration tests.
//!
//! Fixtures for backend payloads and streamed answer bodies.

#![allow(dead_code)]

use serde_json::{json, Value};

/// Token used by authenticated mock servers.
pub fn test_token() -> String {
    "test-access-token-12345".to_string()
}

/// Encode events the way the backend streams them: one JSON object per
/// line, every line after the first prefixed with a comma.
pub fn stream_body(events: &[(&str, &str)]) -> String {
    events
        .iter()
        .enumerate()
        .map(|(i, (event_type, value))| {
            let comma = if i == 0 { "" } else { "," };
            let object = json!({ "type": event_type, "value": value });
            format!("{comma}{object}\n")
        })
        .collect()
}

/// A chat session payload as returned by `GET /api/chats/{id}`.
pub fn chat_session_json(id: &str, history: Value) -> Value {
    json!({
        "chat_session_id": id,
        "user": "jan@example.com",
        "created": "2024-05-01T12:30:00",
        "summary": null,
        "history": history,
    })
}
