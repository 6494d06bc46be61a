//! Special inbound commands.
//!
//! Commands match the whole trimmed body, case-insensitively, and never reach
//! the reply generator.

use std::fmt;

use crate::conversation::ConversationStats;
use crate::generator::GeneratorInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Reset,
    Status,
    Info,
}

impl Command {
    pub fn parse(body: &str) -> Option<Self> {
        match body.trim().to_lowercase().as_str() {
            "help" | "/help" | "?" => Some(Self::Help),
            "reset" | "/reset" | "clear" => Some(Self::Reset),
            "status" | "/status" => Some(Self::Status),
            "info" | "/info" => Some(Self::Info),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Reset => "reset",
            Self::Status => "status",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn capability_label(name: &str) -> &str {
    match name {
        "get_current_time" => "current time and date",
        "get_weather" => "weather",
        "calculator" => "math",
        other => other,
    }
}

pub fn help_text(agent_name: &str, info: &GeneratorInfo) -> String {
    let labels: Vec<&str> = info
        .capabilities
        .iter()
        .filter(|c| c.name != "help")
        .map(|c| capability_label(&c.name))
        .collect();

    let mut text = format!("{agent_name} help. I can answer questions and chat");
    if !labels.is_empty() {
        text.push_str(", plus ");
        text.push_str(&labels.join(", "));
    }
    text.push_str(
        ". Commands: help (this message), reset (clear our conversation), \
         status (check my status), info (about me). Just text me naturally!",
    );
    text
}

pub fn status_text(agent_name: &str, info: &GeneratorInfo, stats: &ConversationStats) -> String {
    let memory = if stats.exists {
        format!("{} messages remembered", stats.message_count)
    } else {
        "no saved conversation".to_string()
    };
    format!(
        "{agent_name} status: online. Provider: {} ({}). Tools: {} available. Memory: {memory}. Ready to help!",
        info.provider,
        info.model,
        info.capabilities.len(),
    )
}

pub fn info_text(agent_name: &str, ttl_hours: u32) -> String {
    format!(
        "{agent_name}: an AI assistant you can text. Conversations are remembered for \
         {ttl_hours}h, then forgotten. Text reset any time to clear yours. How can I help you today?"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::CapabilitySummary;

    fn info() -> GeneratorInfo {
        GeneratorInfo {
            provider: "openai".into(),
            model: "gpt-test".into(),
            capabilities: ["get_current_time", "calculator", "help"]
                .into_iter()
                .map(|name| CapabilitySummary {
                    name: name.into(),
                    description: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Command::parse("help"), Some(Command::Help));
        assert_eq!(Command::parse(" /HELP "), Some(Command::Help));
        assert_eq!(Command::parse("?"), Some(Command::Help));
        assert_eq!(Command::parse("Reset"), Some(Command::Reset));
        assert_eq!(Command::parse("clear"), Some(Command::Reset));
        assert_eq!(Command::parse("/status"), Some(Command::Status));
        assert_eq!(Command::parse("INFO"), Some(Command::Info));
    }

    #[test]
    fn test_parse_requires_exact_match() {
        assert_eq!(Command::parse("help me"), None);
        assert_eq!(Command::parse("please reset"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_help_lists_capabilities() {
        let text = help_text("Test Agent", &info());
        assert!(text.starts_with("Test Agent help."));
        assert!(text.contains("current time and date, math"));
        assert!(text.contains("reset (clear our conversation)"));
    }

    #[test]
    fn test_status_reports_memory() {
        let stats = ConversationStats {
            message_count: 4,
            exists: true,
            last_updated: None,
        };
        let text = status_text("Test Agent", &info(), &stats);
        assert!(text.contains("Provider: openai (gpt-test)"));
        assert!(text.contains("Tools: 3 available"));
        assert!(text.contains("4 messages remembered"));

        let empty = status_text("Test Agent", &info(), &ConversationStats::default());
        assert!(empty.contains("no saved conversation"));
    }

    #[test]
    fn test_info_mentions_ttl() {
        assert!(info_text("Test Agent", 24).contains("remembered for 24h"));
    }
}
