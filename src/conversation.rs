//! Chat history bookkeeping for one open conversation.
//!
//! Mirrors what a chat view does with a streamed answer: the question and an
//! empty `ai` placeholder are pushed up front, `text` events grow the
//! placeholder, an `error` event replaces it with a formatted error message.

use tracing::debug;

use crate::models::{Author, ChatMessage, ChatMessageFile, ChatSession};
use crate::stream::{EventKind, StreamedEvent};

/// Effect of one streamed event on the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnUpdate {
    /// Text appended to the answer
    Appended(String),
    /// The answer was replaced by an error message with this content
    Failed(String),
    /// Nothing changed
    Ignored,
}

/// Render an upstream error the way it is stored in the history.
pub fn format_error_block(kind: &str, value: &str) -> String {
    format!("### {kind}\n\n```\n{value}\n```")
}

/// An open chat plus the state of the answer being streamed into it.
#[derive(Debug, Clone)]
pub struct Conversation {
    session: ChatSession,
    in_flight: bool,
    dirty: bool,
}

impl Conversation {
    pub fn new(session: ChatSession) -> Self {
        Self {
            session,
            in_flight: false,
            dirty: false,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn id(&self) -> &str {
        self.session.id()
    }

    /// True while an answer is being streamed.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// True when the local history diverged from the stored one and must be
    /// saved before the next message is sent.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record that the history was saved.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Start a new question/answer turn.
    ///
    /// Pushes the question (with its files) and an empty answer placeholder,
    /// and returns the message to post. Only the text is sent; attachments
    /// are uploaded separately. Blank questions are refused.
    pub fn begin_turn(
        &mut self,
        content: &str,
        files: Vec<ChatMessageFile>,
    ) -> Option<ChatMessage> {
        if content.trim().is_empty() {
            return None;
        }

        let mut question = ChatMessage::new(Author::User, content);
        question.files = files;
        self.session.history.push(question);
        self.session.history.push(ChatMessage::new(Author::Ai, ""));
        self.in_flight = true;

        Some(ChatMessage::new(Author::User, content))
    }

    /// Apply one streamed event to the answer in flight.
    pub fn apply(&mut self, event: &StreamedEvent) -> TurnUpdate {
        if !self.in_flight {
            return TurnUpdate::Ignored;
        }

        match event.kind() {
            EventKind::Text => match self.session.history.last_mut() {
                Some(last) if last.author == Author::Ai => {
                    last.content
                        .get_or_insert_with(String::new)
                        .push_str(&event.value);
                    TurnUpdate::Appended(event.value.clone())
                }
                _ => TurnUpdate::Ignored,
            },
            EventKind::Error(kind) => {
                debug!(kind, "Answer failed upstream");
                if self.last_author() == Some(&Author::Ai) {
                    self.session.history.pop();
                }
                let content = format_error_block(kind, &event.value);
                self.session
                    .history
                    .push(ChatMessage::new(Author::Error, content.clone()));
                self.in_flight = false;
                TurnUpdate::Failed(content)
            }
            EventKind::Other(event_type) => {
                debug!(event_type, "Ignoring stream event");
                TurnUpdate::Ignored
            }
        }
    }

    /// The answer stream ended.
    pub fn complete(&mut self) {
        self.in_flight = false;
    }

    /// Abandon the turn in flight.
    ///
    /// Removes the answer placeholder and the question, and returns the
    /// question text so it can be edited and sent again. The history is
    /// marked dirty.
    pub fn cancel(&mut self) -> Option<String> {
        self.in_flight = false;
        if self.last_author() == Some(&Author::Ai) {
            self.session.history.pop();
        }
        let question = match self.last_author() {
            Some(Author::User) => self.session.history.pop(),
            _ => None,
        };
        self.dirty = true;
        question.map(|m| m.text().to_string())
    }

    /// Rewind the history to edit the message at `index`.
    ///
    /// Drops that message and everything after it, and returns its trimmed
    /// text and files. The history is marked dirty.
    pub fn edit_from(&mut self, index: usize) -> Option<(String, Vec<ChatMessageFile>)> {
        let message = self.session.history.get(index)?;
        let content = message.text().trim().to_string();
        let files = message.files.clone();

        self.session.history.truncate(index);
        self.in_flight = false;
        self.dirty = true;
        Some((content, files))
    }

    fn last_author(&self) -> Option<&Author> {
        self.session.last().map(|m| &m.author)
    }
}
