//! Current date and time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::{Capability, CapabilityError};

pub struct Clock;

/// Human-readable rendering used in replies.
pub fn describe_time(now: DateTime<Utc>) -> String {
    format!("Current time: {}", now.format("%A, %B %d, %Y at %I:%M %p UTC"))
}

#[async_trait]
impl Capability for Clock {
    fn name(&self) -> &'static str {
        "get_current_time"
    }

    fn description(&self) -> &'static str {
        "Get the current date and time in UTC. Use when the user asks about the time, date or day of the week."
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn invoke(&self, _args: Value) -> Result<String, CapabilityError> {
        Ok(describe_time(Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_describe_time_format() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 15, 4, 0).unwrap();
        assert_eq!(
            describe_time(now),
            "Current time: Sunday, October 18, 2026 at 03:04 PM UTC"
        );
    }
}
