//! Outbound Reply Segments

use serde::{Deserialize, Serialize};

/// Whether a segment carries reply content or the truncation notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Content,
    Continuation,
}

/// One outbound message of a (possibly multi-part) reply.
///
/// `text` holds the content without its numbering prefix; use
/// [`ReplySegment::render`] for the wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplySegment {
    /// 1-based position among the emitted segments.
    pub index: usize,
    /// Number of numbered content segments in the reply.
    pub total: usize,
    pub text: String,
    pub kind: SegmentKind,
}

impl ReplySegment {
    /// Text as sent: `"(i/total) "` prefixed when the reply has several parts.
    pub fn render(&self) -> String {
        match self.kind {
            SegmentKind::Content if self.total > 1 => {
                format!("({}/{}) {}", self.index, self.total, self.text)
            }
            _ => self.text.clone(),
        }
    }
}
