//! OpenAI-compatible chat completions generator.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use textline_common::Role;
use tracing::{debug, warn};

use super::{CapabilityRegistry, GenerationRequest, GeneratorError, GeneratorInfo, ReplyGenerator};
use crate::config::Config;

/// Upper bound on model/tool round trips for one reply.
pub const MAX_TOOL_ROUNDS: usize = 5;

/// Number of most recent history messages sent as context.
pub const HISTORY_CONTEXT_MESSAGES: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn tool_result(call_id: String, output: String) -> Self {
        Self {
            role: "tool".into(),
            content: Some(output),
            tool_calls: None,
            tool_call_id: Some(call_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: FunctionCall,
}

fn function_kind() -> String {
    "function".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

/// Generator backed by any `/chat/completions` endpoint.
pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
    capabilities: CapabilityRegistry,
}

impl OpenAiGenerator {
    pub fn new(
        config: &Config,
        capabilities: CapabilityRegistry,
        client: Client,
    ) -> Result<Self, GeneratorError> {
        let api_key = config
            .generator
            .api_key
            .clone()
            .ok_or(GeneratorError::NotConfigured("missing API key"))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                config.generator.base_url.trim_end_matches('/')
            ),
            api_key,
            model: config.generator.model.clone(),
            temperature: config.generator.temperature,
            max_tokens: config.generator.max_tokens,
            system_prompt: system_prompt(&config.agent_name, &config.agent_personality),
            capabilities,
        })
    }

    fn initial_messages(&self, request: &GenerationRequest) -> Vec<WireMessage> {
        let skip = request
            .history
            .len()
            .saturating_sub(HISTORY_CONTEXT_MESSAGES);

        let mut messages = Vec::with_capacity(HISTORY_CONTEXT_MESSAGES + 2);
        messages.push(WireMessage::text("system", self.system_prompt.clone()));
        for message in request.history.iter().skip(skip) {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            messages.push(WireMessage::text(role, message.content.clone()));
        }
        messages.push(WireMessage::text("user", request.message.clone()));
        messages
    }

    async fn complete(&self, messages: &[WireMessage]) -> Result<WireMessage, GeneratorError> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: self.capabilities.tool_definitions(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| GeneratorError::Malformed(format!("invalid response body: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| GeneratorError::Malformed("response has no choices".into()))
    }
}

#[async_trait]
impl ReplyGenerator for OpenAiGenerator {
    #[tracing::instrument(skip(self, request), fields(identity = %request.identity.masked(), model = %self.model))]
    async fn generate(&self, request: GenerationRequest) -> Result<String, GeneratorError> {
        let mut messages = self.initial_messages(&request);

        for round in 1..=MAX_TOOL_ROUNDS {
            let reply = self.complete(&messages).await?;

            let calls = reply.tool_calls.clone().unwrap_or_default();
            if calls.is_empty() {
                return reply
                    .content
                    .map(|text| text.trim().to_string())
                    .filter(|text| !text.is_empty())
                    .ok_or_else(|| GeneratorError::Malformed("empty reply".into()));
            }

            debug!(round, calls = calls.len(), "Executing tool calls");
            messages.push(reply);
            for call in calls {
                let output = self
                    .capabilities
                    .invoke_tool(&call.function.name, &call.function.arguments)
                    .await;
                messages.push(WireMessage::tool_result(call.id, output));
            }
        }

        warn!(rounds = MAX_TOOL_ROUNDS, "Tool round limit reached");
        Err(GeneratorError::ToolRounds(MAX_TOOL_ROUNDS))
    }

    fn describe(&self) -> GeneratorInfo {
        GeneratorInfo {
            provider: "openai".into(),
            model: self.model.clone(),
            capabilities: self.capabilities.summaries(),
        }
    }
}

fn system_prompt(agent_name: &str, personality: &str) -> String {
    format!(
        "You are {agent_name}, an AI assistant people reach by text message. \
         You are {personality}.\n\n\
         SMS constraints:\n\
         - Keep replies concise, under 160 characters when possible\n\
         - Use plain conversational language without markdown\n\
         - Be helpful and direct\n\n\
         Use the available tools when they help answer the question."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use textline_common::{ConversationMessage, Identity};

    fn generator() -> OpenAiGenerator {
        let config = Config::default_for_test();
        OpenAiGenerator::new(&config, CapabilityRegistry::default(), Client::new()).unwrap()
    }

    #[test]
    fn test_requires_api_key() {
        let mut config = Config::default_for_test();
        config.generator.api_key = None;
        let result = OpenAiGenerator::new(&config, CapabilityRegistry::default(), Client::new());
        assert!(matches!(result, Err(GeneratorError::NotConfigured(_))));
    }

    #[test]
    fn test_initial_messages_limit_history() {
        let generator = generator();
        let now = Utc::now();
        let history = (0..15)
            .map(|i| {
                if i % 2 == 0 {
                    ConversationMessage::user(format!("u{i}"), now)
                } else {
                    ConversationMessage::assistant(format!("a{i}"), now)
                }
            })
            .collect();

        let request = GenerationRequest {
            identity: Identity::normalize("+15550100").unwrap(),
            history,
            message: "latest".into(),
        };
        let messages = generator.initial_messages(&request);

        // system + 10 history + new message
        assert_eq!(messages.len(), 12);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content.as_deref(), Some("a5"));
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[11].content.as_deref(), Some("latest"));
    }

    #[test]
    fn test_system_prompt_mentions_persona() {
        let prompt = system_prompt("Test Agent", "calm");
        assert!(prompt.contains("You are Test Agent"));
        assert!(prompt.contains("You are calm."));
        assert!(prompt.contains("160 characters"));
    }

    #[test]
    fn test_parses_tool_call_response() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null,
            "tool_calls":[{"id":"call_1","type":"function",
            "function":{"name":"calculator","arguments":"{\"expression\":\"2+2\"}"}}]}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let calls = parsed.choices[0].message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "calculator");
        assert_eq!(calls[0].kind, "function");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let mut config = Config::default_for_test();
        config.generator.base_url = "https://api.example.com/v1/".into();
        let generator =
            OpenAiGenerator::new(&config, CapabilityRegistry::default(), Client::new()).unwrap();
        assert_eq!(generator.endpoint, "https://api.example.com/v1/chat/completions");
    }
}
