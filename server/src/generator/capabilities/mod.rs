//! Generator Capabilities
//!
//! Named helpers the generator may call while composing a reply. Each one is
//! advertised to the model as a function tool; failures are turned into text
//! for the model rather than failing the reply.

pub mod calculator;
pub mod clock;
pub mod help;
pub mod weather;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub use calculator::Calculator;
pub use clock::Clock;
pub use help::Help;
pub use weather::Weather;

use crate::config::GeneratorConfig;

/// Capability errors.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Calculation(#[from] calculator::CalcError),
    #[error("Unknown capability: {0}")]
    Unknown(String),
}

#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;

    async fn invoke(&self, args: Value) -> Result<String, CapabilityError>;
}

/// Name and description of a registered capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilitySummary {
    pub name: String,
    pub description: String,
}

/// Ordered set of capabilities offered to the generator.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: Vec<Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock, calculator, weather (when a key is configured) and help.
    pub fn standard(config: &GeneratorConfig, http: reqwest::Client) -> Self {
        let mut registry = Self::new();
        registry.register(Clock);
        registry.register(Calculator);
        if let Some(ref key) = config.openweather_api_key {
            registry.register(Weather::new(http, key.clone()));
        } else {
            debug!("Weather capability disabled (no API key)");
        }

        let mut summaries = registry.summaries();
        summaries.push(CapabilitySummary {
            name: help::NAME.into(),
            description: help::DESCRIPTION.into(),
        });
        registry.register(Help::new(summaries));
        registry
    }

    pub fn register(&mut self, capability: impl Capability + 'static) {
        self.capabilities.push(Arc::new(capability));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.capabilities.iter().find(|c| c.name() == name)
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn summaries(&self) -> Vec<CapabilitySummary> {
        self.capabilities
            .iter()
            .map(|c| CapabilitySummary {
                name: c.name().into(),
                description: c.description().into(),
            })
            .collect()
    }

    /// Function-tool definitions in chat completions format.
    pub fn tool_definitions(&self) -> Vec<Value> {
        self.capabilities
            .iter()
            .map(|c| {
                json!({
                    "type": "function",
                    "function": {
                        "name": c.name(),
                        "description": c.description(),
                        "parameters": c.parameters(),
                    }
                })
            })
            .collect()
    }

    pub async fn invoke(&self, name: &str, args: Value) -> Result<String, CapabilityError> {
        let capability = self
            .get(name)
            .ok_or_else(|| CapabilityError::Unknown(name.to_string()))?;
        capability.invoke(args).await
    }

    /// Invoke a tool call with raw JSON arguments, rendering any failure as
    /// text for the model.
    pub async fn invoke_tool(&self, name: &str, raw_arguments: &str) -> String {
        let args = if raw_arguments.trim().is_empty() {
            Ok(json!({}))
        } else {
            serde_json::from_str(raw_arguments)
                .map_err(|e| CapabilityError::InvalidArguments(e.to_string()))
        };

        let result = match args {
            Ok(args) => self.invoke(name, args).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(output) => output,
            Err(e) => {
                warn!(capability = name, error = %e, "Capability call failed");
                format!("Error: {e}")
            }
        }
    }
}

/// Pull a required string argument out of a tool call.
pub(crate) fn string_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, CapabilityError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CapabilityError::InvalidArguments(format!("missing `{key}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_standard_registry_without_weather() {
        let config = Config::default_for_test();
        let registry = CapabilityRegistry::standard(&config.generator, reqwest::Client::new());

        let names: Vec<_> = registry.summaries().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["get_current_time", "calculator", "help"]);
    }

    #[test]
    fn test_standard_registry_with_weather() {
        let mut config = Config::default_for_test();
        config.generator.openweather_api_key = Some("key".into());
        let registry = CapabilityRegistry::standard(&config.generator, reqwest::Client::new());

        assert_eq!(registry.len(), 4);
        assert!(registry.get("get_weather").is_some());
    }

    #[test]
    fn test_tool_definitions_shape() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Calculator);
        let tools = registry.tool_definitions();

        assert_eq!(tools[0]["type"], "function");
        assert_eq!(tools[0]["function"]["name"], "calculator");
        assert_eq!(tools[0]["function"]["parameters"]["type"], "object");
    }

    #[tokio::test]
    async fn test_invoke_tool_renders_errors() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Calculator);

        assert_eq!(
            registry
                .invoke_tool("calculator", r#"{"expression":"2 + 3"}"#)
                .await,
            "2 + 3 = 5"
        );
        assert!(registry
            .invoke_tool("calculator", "not json")
            .await
            .starts_with("Error: Invalid arguments"));
        assert_eq!(
            registry.invoke_tool("search", "{}").await,
            "Error: Unknown capability: search"
        );
    }
}
