//! Inbound body cleanup.

use tracing::debug;

/// Longest inbound body kept, in characters.
pub const MAX_BODY_CHARS: usize = 2000;

/// Strip control characters (other than newline, carriage return and tab),
/// trim, and cap the body at [`MAX_BODY_CHARS`].
pub fn sanitize_body(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect();
    let trimmed = cleaned.trim();

    let length = trimmed.chars().count();
    if length > MAX_BODY_CHARS {
        debug!(length, limit = MAX_BODY_CHARS, "Inbound body truncated");
        return trimmed
            .chars()
            .take(MAX_BODY_CHARS)
            .collect::<String>()
            .trim_end()
            .to_string();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_control_characters() {
        assert_eq!(sanitize_body("he\u{0}llo\u{7}"), "hello");
        assert_eq!(sanitize_body("line one\nline\ttwo"), "line one\nline\ttwo");
    }

    #[test]
    fn test_trims() {
        assert_eq!(sanitize_body("  \n hi \r\n"), "hi");
        assert_eq!(sanitize_body(" \u{1b} "), "");
    }

    #[test]
    fn test_caps_length() {
        let long = "é".repeat(MAX_BODY_CHARS + 50);
        assert_eq!(sanitize_body(&long).chars().count(), MAX_BODY_CHARS);
    }
}
