//! Conversation Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Identity;

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The texting user.
    User,
    /// The assistant reply.
    Assistant,
}

/// A single immutable message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Who wrote the message.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// When the message was recorded.
    pub created_at: DateTime<Utc>,
}

impl ConversationMessage {
    /// Create a user message stamped with the given time.
    pub fn user(content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at,
        }
    }

    /// Create an assistant message stamped with the given time.
    pub fn assistant(content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at,
        }
    }
}

/// Bounded per-identity message log, oldest message first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub identity: Identity,
    pub messages: Vec<ConversationMessage>,
    pub last_updated: DateTime<Utc>,
}

impl ConversationSession {
    /// An empty session for `identity`.
    pub fn empty(identity: Identity, now: DateTime<Utc>) -> Self {
        Self {
            identity,
            messages: Vec::new(),
            last_updated: now,
        }
    }

    /// Append a message, dropping the oldest entries beyond `max_window`.
    pub fn push_bounded(&mut self, message: ConversationMessage, max_window: usize) {
        self.messages.push(message);
        if self.messages.len() > max_window {
            let overflow = self.messages.len() - max_window;
            self.messages.drain(..overflow);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
