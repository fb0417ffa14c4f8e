use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_null_default, deserialize_timestamp};

/// Session id the backend answers with a freshly created chat.
pub const NEW_CHAT_ID: &str = "_NEW_";

/// Who wrote a message in a chat history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Ai,
    /// Client-side only: a failed answer rendered in place of the reply
    Error,
    #[serde(other)]
    Unknown,
}

impl Author {
    pub fn as_str(&self) -> &'static str {
        match self {
            Author::User => "user",
            Author::Ai => "ai",
            Author::Error => "error",
            Author::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File attached to a chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageFile {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub name: String,
    pub mime_type: String,
    /// Storage location assigned by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A single entry of a chat history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author: Author,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub files: Vec<ChatMessageFile>,
}

impl ChatMessage {
    /// Create a message with text content and no files.
    pub fn new(author: Author, content: impl Into<String>) -> Self {
        Self {
            author,
            content: Some(content.into()),
            files: Vec::new(),
        }
    }

    /// Text content, or "" when absent.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Chat list entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSessionHeader {
    pub chat_session_id: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub user: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// A chat with its full history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    #[serde(flatten)]
    pub header: ChatSessionHeader,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl ChatSession {
    /// Session id shortcut.
    pub fn id(&self) -> &str {
        &self.header.chat_session_id
    }

    /// Last message of the history, if any.
    pub fn last(&self) -> Option<&ChatMessage> {
        self.history.last()
    }
}
