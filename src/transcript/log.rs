//! Chat transcript storage
//!
//! Append-only log of what the user and assistant said during a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// What a transcript entry represents. Only `Chat` entries are forwarded to
/// text generation as history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Greeting,
    Intro,
    Question,
    Answer,
    Advisory,
    Validation,
    Chat,
    Notice,
}

/// A single transcript entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub message: String,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, message: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            message: message.into(),
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn user(message: impl Into<String>, kind: MessageKind) -> Self {
        Self::new(Role::User, message, kind)
    }

    pub fn assistant(message: impl Into<String>, kind: MessageKind) -> Self {
        Self::new(Role::Assistant, message, kind)
    }
}

/// Conversation transcript for one wizard session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterate over conversational entries only
    pub fn chat_messages(&self) -> impl DoubleEndedIterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.kind == MessageKind::Chat)
    }

    /// Plain-text rendering, useful for terminals and logs
    pub fn get_formatted(&self) -> String {
        let mut out = String::new();

        for msg in &self.messages {
            let role_str = match msg.role {
                Role::User => "You",
                Role::Assistant => "PrepCoach",
            };
            out.push_str(&format!("{}: {}\n\n", role_str, msg.message));
        }

        out
    }
}
