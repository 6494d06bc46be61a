//! Sender Identity

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized originating address of an inbound message.
///
/// The identity is the only partition key for history and rate-limit state,
/// so normalization is deterministic and idempotent: a `+` is kept only in
/// leading position and every other non-digit character is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Normalize a raw address such as `"+1 (555) 010-9999"`.
    ///
    /// Returns `None` when no digits remain.
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return None;
        }

        if trimmed.starts_with('+') {
            Some(Self(format!("+{digits}")))
        } else {
            Some(Self(digits))
        }
    }

    /// Borrow the normalized address.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address with all but the last four digits masked, for log output.
    pub fn masked(&self) -> String {
        let count = self.0.chars().count();
        if count <= 4 {
            return self.0.clone();
        }
        let visible: String = self.0.chars().skip(count - 4).collect();
        format!("***{visible}")
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
