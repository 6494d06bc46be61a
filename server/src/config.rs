//! Server Configuration
//!
//! Loads configuration from environment variables. The value is built once in
//! `main` and shared as `Arc<Config>` through [`crate::api::AppState`].

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::ratelimit::RateLimitConfig;

/// Smallest outbound segment length that still fits the numbering prefix,
/// some content and the truncation notice.
pub const MIN_SMS_LENGTH: usize = 60;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error("{0}")]
    Invalid(String),
}

/// Conversation history settings.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Redis connection URL; `None` keeps history in process memory
    pub redis_url: Option<String>,
    /// Key namespace for stored sessions
    pub key_prefix: String,
    /// Maximum messages kept per identity
    pub max_window: usize,
    /// Idle time after which a session is considered absent
    pub ttl_hours: u32,
    /// Period of the optional expired-session sweep (0 disables it)
    pub sweep_interval_secs: u64,
}

impl ConversationConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.ttl_hours))
    }
}

/// Settings for the external reply generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// API key for the OpenAI-compatible endpoint
    pub api_key: Option<String>,
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Upper bound on one generator call, enforced by the orchestrator
    pub timeout_secs: u64,
    /// Enables the weather capability
    pub openweather_api_key: Option<String>,
}

impl GeneratorConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080")
    pub bind_address: String,

    /// Twilio auth token, the webhook signing secret
    pub twilio_auth_token: Option<String>,

    /// Expected Twilio account SID (optional)
    pub twilio_account_sid: Option<String>,

    /// The number this service answers on (optional, informational)
    pub twilio_phone_number: Option<String>,

    /// Whether inbound webhook signatures are checked
    pub webhook_validation_enabled: bool,

    /// Exact public URL the provider signs (optional)
    pub public_webhook_url: Option<String>,

    /// Maximum characters per outbound message
    pub max_sms_length: usize,

    /// Maximum numbered messages per reply
    pub max_sms_segments: usize,

    /// Assistant display name
    pub agent_name: String,

    /// Assistant persona used in the generator prompt
    pub agent_personality: String,

    pub conversation: ConversationConfig,

    pub generator: GeneratorConfig,

    pub rate_limit: RateLimitConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_address = match env::var("BIND_ADDRESS") {
            Ok(addr) => addr,
            Err(_) => match env::var("PORT") {
                Ok(port) => format!("0.0.0.0:{}", port.trim()),
                Err(_) => "0.0.0.0:8080".into(),
            },
        };

        Ok(Self {
            bind_address,
            twilio_auth_token: non_empty_var("TWILIO_AUTH_TOKEN"),
            twilio_account_sid: non_empty_var("TWILIO_ACCOUNT_SID"),
            twilio_phone_number: non_empty_var("TWILIO_PHONE_NUMBER"),
            webhook_validation_enabled: parse_var("WEBHOOK_VALIDATION_ENABLED", true)?,
            public_webhook_url: non_empty_var("PUBLIC_WEBHOOK_URL"),
            max_sms_length: parse_var("MAX_SMS_LENGTH", 1600)?,
            max_sms_segments: parse_var("MAX_SMS_SEGMENTS", 3)?,
            agent_name: env::var("AGENT_NAME").unwrap_or_else(|_| "AI Assistant".into()),
            agent_personality: env::var("AGENT_PERSONALITY")
                .unwrap_or_else(|_| "helpful, friendly, and concise".into()),
            conversation: ConversationConfig {
                redis_url: non_empty_var("REDIS_URL"),
                key_prefix: env::var("CONVERSATION_KEY_PREFIX")
                    .unwrap_or_else(|_| "textline:conv".into()),
                max_window: parse_var("MAX_CONVERSATION_LENGTH", 20)?,
                ttl_hours: parse_var("CONVERSATION_TIMEOUT_HOURS", 24)?,
                sweep_interval_secs: parse_var("CONVERSATION_SWEEP_INTERVAL_SECS", 0)?,
            },
            generator: GeneratorConfig {
                api_key: non_empty_var("LLM_API_KEY").or_else(|| non_empty_var("OPENAI_API_KEY")),
                base_url: env::var("LLM_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
                model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".into()),
                temperature: parse_var("LLM_TEMPERATURE", 0.7)?,
                max_tokens: parse_var("LLM_MAX_TOKENS", 150)?,
                timeout_secs: parse_var("GENERATOR_TIMEOUT_SECS", 12)?,
                openweather_api_key: non_empty_var("OPENWEATHER_API_KEY"),
            },
            rate_limit: RateLimitConfig::from_env()?,
        })
    }

    /// Semantic checks run at startup and by the health endpoint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook_validation_enabled && self.twilio_auth_token.is_none() {
            return Err(ConfigError::Invalid(
                "TWILIO_AUTH_TOKEN must be set when webhook validation is enabled".into(),
            ));
        }

        if let Some(ref number) = self.twilio_phone_number {
            validate_phone_number(number)?;
        }

        if self.generator.api_key.is_none() {
            return Err(ConfigError::Invalid(
                "A generator credential must be configured (LLM_API_KEY or OPENAI_API_KEY)".into(),
            ));
        }

        if !(0.0..=2.0).contains(&self.generator.temperature) {
            return Err(ConfigError::Invalid(
                "LLM_TEMPERATURE must be between 0.0 and 2.0".into(),
            ));
        }

        if !(1..=4000).contains(&self.generator.max_tokens) {
            return Err(ConfigError::Invalid(
                "LLM_MAX_TOKENS must be between 1 and 4000".into(),
            ));
        }

        if self.generator.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "GENERATOR_TIMEOUT_SECS must be greater than 0".into(),
            ));
        }

        if self.max_sms_length < MIN_SMS_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "MAX_SMS_LENGTH must be at least {MIN_SMS_LENGTH}"
            )));
        }

        if self.max_sms_segments == 0 {
            return Err(ConfigError::Invalid(
                "MAX_SMS_SEGMENTS must be greater than 0".into(),
            ));
        }

        if self.conversation.max_window == 0 {
            return Err(ConfigError::Invalid(
                "MAX_CONVERSATION_LENGTH must be greater than 0".into(),
            ));
        }

        if self.conversation.ttl_hours == 0 {
            return Err(ConfigError::Invalid(
                "CONVERSATION_TIMEOUT_HOURS must be greater than 0".into(),
            ));
        }

        self.rate_limit.validate()
    }

    /// Create a default configuration for testing.
    ///
    /// Uses the in-memory history backend. Redis-backed tests point
    /// `REDIS_URL` at a local instance:
    /// `docker run -d --name textline-test-redis -p 6380:6379 redis:7`
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".into(),
            twilio_auth_token: Some("test-auth-token".into()),
            twilio_account_sid: None,
            twilio_phone_number: Some("+15005550006".into()),
            webhook_validation_enabled: true,
            public_webhook_url: Some("https://sms.example.com/sms".into()),
            max_sms_length: 1600,
            max_sms_segments: 3,
            agent_name: "Test Agent".into(),
            agent_personality: "helpful and testing".into(),
            conversation: ConversationConfig {
                redis_url: None,
                key_prefix: "test:conv".into(),
                max_window: 20,
                ttl_hours: 24,
                sweep_interval_secs: 0,
            },
            generator: GeneratorConfig {
                api_key: Some("test-key".into()),
                base_url: "http://127.0.0.1:9".into(),
                model: "gpt-3.5-turbo".into(),
                temperature: 0.7,
                max_tokens: 150,
                timeout_secs: 5,
                openweather_api_key: None,
            },
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Read a variable, treating an empty value as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, falling back to `default` when unset.
pub(crate) fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}

fn validate_phone_number(number: &str) -> Result<(), ConfigError> {
    if !number.starts_with('+') {
        return Err(ConfigError::Invalid(
            "TWILIO_PHONE_NUMBER must start with +".into(),
        ));
    }
    let digits = number.chars().filter(char::is_ascii_digit).count();
    if digits < 10 {
        return Err(ConfigError::Invalid(
            "TWILIO_PHONE_NUMBER must be at least 10 digits".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default_for_test().validate().is_ok());
    }

    #[test]
    fn test_missing_secret_rejected_when_validating() {
        let mut config = Config::default_for_test();
        config.twilio_auth_token = None;
        assert!(config.validate().is_err());

        config.webhook_validation_enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_generator_key_rejected() {
        let mut config = Config::default_for_test();
        config.generator.api_key = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bounds() {
        let mut config = Config::default_for_test();
        config.generator.temperature = 2.5;
        assert!(config.validate().is_err());

        let mut config = Config::default_for_test();
        config.generator.max_tokens = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default_for_test();
        config.max_sms_length = 40;
        assert!(config.validate().is_err());

        let mut config = Config::default_for_test();
        config.conversation.max_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_phone_number_format() {
        assert!(validate_phone_number("+15005550006").is_ok());
        assert!(validate_phone_number("15005550006").is_err());
        assert!(validate_phone_number("+1500").is_err());
    }

    #[test]
    fn test_ttl_conversion() {
        let config = Config::default_for_test();
        assert_eq!(config.conversation.ttl(), chrono::Duration::hours(24));
    }
}
