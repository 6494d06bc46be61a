//! Rate limiting configuration.

use std::collections::HashSet;

use textline_common::Identity;

use crate::config::{parse_var, ConfigError};

/// Configuration for the rate limiting system.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    pub enabled: bool,
    /// Whether throttled senders get a generic notice (otherwise silence)
    pub notice_enabled: bool,
    /// Identities that bypass rate limiting
    pub allowlist: HashSet<Identity>,
    /// Per-window limits
    pub limits: RateLimits,
}

/// Limits for each sliding window.
#[derive(Debug, Clone)]
pub struct RateLimits {
    /// Short window, checked first
    pub per_minute: LimitConfig,
    /// Long window
    pub per_hour: LimitConfig,
}

/// Configuration for a single sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitConfig {
    /// Maximum requests allowed in the window
    pub requests: u32,
    /// Window duration in seconds
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            notice_enabled: true,
            allowlist: HashSet::new(),
            limits: RateLimits::default(),
        }
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            per_minute: LimitConfig {
                requests: 5,
                window_secs: 60,
            },
            per_hour: LimitConfig {
                requests: 50,
                window_secs: 3600,
            },
        }
    }
}

impl RateLimitConfig {
    /// Creates configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RATE_LIMIT_ENABLED`: Enable/disable rate limiting (default: true)
    /// - `RATE_LIMIT_NOTICE_ENABLED`: Reply with a throttling notice (default: true)
    /// - `RATE_LIMIT_ALLOWLIST`: Comma-separated sender addresses, normalized on load
    /// - `RATE_LIMIT_PER_USER_PER_MINUTE`: Requests per 60s (default: 5)
    /// - `RATE_LIMIT_PER_USER_PER_HOUR`: Requests per 3600s (default: 50)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            enabled: parse_var("RATE_LIMIT_ENABLED", true)?,
            notice_enabled: parse_var("RATE_LIMIT_NOTICE_ENABLED", true)?,
            ..Self::default()
        };

        if let Ok(val) = std::env::var("RATE_LIMIT_ALLOWLIST") {
            config.allowlist = parse_allowlist(&val);
        }

        config.limits.per_minute.requests = parse_var(
            "RATE_LIMIT_PER_USER_PER_MINUTE",
            config.limits.per_minute.requests,
        )?;
        config.limits.per_hour.requests = parse_var(
            "RATE_LIMIT_PER_USER_PER_HOUR",
            config.limits.per_hour.requests,
        )?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled
            && (self.limits.per_minute.requests == 0 || self.limits.per_hour.requests == 0)
        {
            return Err(ConfigError::Invalid(
                "Rate limits must be greater than 0 when rate limiting is enabled".into(),
            ));
        }
        Ok(())
    }
}

/// Parses a comma-separated allowlist. Entries are normalized the same way
/// as inbound senders; entries without digits are skipped.
fn parse_allowlist(val: &str) -> HashSet<Identity> {
    val.split(',').filter_map(Identity::normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert!(config.notice_enabled);
        assert!(config.allowlist.is_empty());
    }

    #[test]
    fn test_default_limits() {
        let limits = RateLimits::default();
        assert_eq!(limits.per_minute.requests, 5);
        assert_eq!(limits.per_minute.window_secs, 60);
        assert_eq!(limits.per_hour.requests, 50);
        assert_eq!(limits.per_hour.window_secs, 3600);
    }

    #[test]
    fn test_parse_allowlist() {
        let list = parse_allowlist(" +15550100, ,+15550101 ");
        assert_eq!(list.len(), 2);
        assert!(list.contains(&Identity::normalize("+15550100").unwrap()));
        assert!(list.contains(&Identity::normalize("+15550101").unwrap()));
    }

    #[test]
    fn test_allowlist_entries_are_normalized() {
        let list = parse_allowlist("+1 (555) 010-0100,555.010.0101,n/a");
        assert_eq!(list.len(), 2);
        assert!(list.contains(&Identity::normalize("+15550100100").unwrap()));
        assert!(list.contains(&Identity::normalize("5550100101").unwrap()));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let mut config = RateLimitConfig::default();
        config.limits.per_hour.requests = 0;
        assert!(config.validate().is_err());

        config.enabled = false;
        assert!(config.validate().is_ok());
    }
}
