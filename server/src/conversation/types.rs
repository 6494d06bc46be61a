//! Conversation store types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors raised by the conversation store and its backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Corrupt session record at {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode session: {0}")]
    Encode(#[source] serde_json::Error),
}

impl From<fred::error::Error> for StoreError {
    fn from(err: fred::error::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Read-only summary of one identity's history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationStats {
    pub message_count: usize,
    pub exists: bool,
    pub last_updated: Option<DateTime<Utc>>,
}
