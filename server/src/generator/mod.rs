//! Reply Generation
//!
//! The conversational engine is an external collaborator: it receives the
//! sender's ordered history plus the new message and returns reply text, or
//! fails. Callers must bound its latency themselves.

pub mod capabilities;
pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use textline_common::{ConversationMessage, Identity};
use thiserror::Error;

pub use capabilities::{Capability, CapabilityError, CapabilityRegistry, CapabilitySummary};
pub use openai::OpenAiGenerator;

/// Input for one generated reply.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub identity: Identity,
    /// Prior turns, oldest first. Does not include `message`.
    pub history: Vec<ConversationMessage>,
    pub message: String,
}

/// Static description of a generator, used by the status command.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorInfo {
    pub provider: String,
    pub model: String,
    pub capabilities: Vec<CapabilitySummary>,
}

/// Generator errors.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Generator is not configured: {0}")]
    NotConfigured(&'static str),
    #[error("Generator request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Generator API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Malformed generator output: {0}")]
    Malformed(String),
    #[error("Generator exceeded {0} tool rounds")]
    ToolRounds(usize),
    #[error("Generator timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GeneratorError>;

    fn describe(&self) -> GeneratorInfo;
}
