//! Capability overview for the model.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Capability, CapabilityError, CapabilitySummary};

pub const NAME: &str = "help";
pub const DESCRIPTION: &str =
    "Describe what the assistant can do. Use when the user asks about capabilities or needs help.";

pub struct Help {
    summaries: Vec<CapabilitySummary>,
}

impl Help {
    pub const fn new(summaries: Vec<CapabilitySummary>) -> Self {
        Self { summaries }
    }
}

#[async_trait]
impl Capability for Help {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn invoke(&self, _args: Value) -> Result<String, CapabilityError> {
        let mut text = String::from("I can chat and answer questions. Tools available:");
        for summary in self.summaries.iter().filter(|s| s.name != NAME) {
            text.push_str(&format!("\n- {}: {}", summary.name, summary.description));
        }
        text.push_str("\nI remember our recent conversation, so you can refer back to it.");
        Ok(text)
    }
}
