//! Reply Segmenter
//!
//! Splits a reply into at most `cap` outbound messages of at most `max`
//! characters each, preferring sentence boundaries. Multi-part replies are
//! numbered `"(i/total) "`; when more chunks were produced than fit, a final
//! unnumbered notice says the reply was cut short.
//!
//! Lengths are counted in characters after whitespace normalization.

use textline_common::{ReplySegment, SegmentKind};

/// Appended when a reply needed more than `cap` segments.
pub const CONTINUATION_NOTICE: &str = "(Message truncated. Ask me to continue for the rest.)";

const SENTENCE_BREAK: &str = ". ";

/// Space always kept free for the numbering prefix.
const MIN_PREFIX_RESERVE: usize = 10;

/// Collapse every whitespace run to a single space and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Characters reserved for a `"(i/total) "` prefix when at most `cap`
/// segments are numbered.
pub fn prefix_reserve(cap: usize) -> usize {
    let digits = cap.to_string().len();
    (2 * digits + 4).max(MIN_PREFIX_RESERVE)
}

/// Split `text` into outbound segments.
///
/// The empty-message policy belongs to the caller: empty input yields one
/// empty segment.
pub fn segment(text: &str, max: usize, cap: usize) -> Vec<ReplySegment> {
    let cap = cap.max(1);
    let normalized = normalize_whitespace(text);

    if char_len(&normalized) <= max {
        return vec![ReplySegment {
            index: 1,
            total: 1,
            text: normalized,
            kind: SegmentKind::Content,
        }];
    }

    let budget = max.saturating_sub(prefix_reserve(cap)).max(1);
    let chunks: Vec<String> = pack_sentences(&normalized, budget)
        .into_iter()
        .flat_map(|chunk| hard_split(chunk, budget))
        .collect();

    let produced = chunks.len();
    let total = produced.min(cap);

    let mut segments: Vec<ReplySegment> = chunks
        .into_iter()
        .take(total)
        .enumerate()
        .map(|(i, text)| ReplySegment {
            index: i + 1,
            total,
            text,
            kind: SegmentKind::Content,
        })
        .collect();

    if produced > cap {
        segments.push(ReplySegment {
            index: total + 1,
            total,
            text: CONTINUATION_NOTICE.chars().take(max).collect(),
            kind: SegmentKind::Continuation,
        });
    }

    segments
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Greedily pack `". "`-terminated sentences into chunks of at most `budget`
/// characters. A chunk's trailing space does not count against the budget.
fn pack_sentences(text: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in text.split_inclusive(SENTENCE_BREAK) {
        let sentence_len = char_len(sentence);
        let measured = current_len + char_len(sentence.trim_end());

        if !current.is_empty() && measured > budget {
            chunks.push(current.trim_end().to_string());
            current.clear();
            current_len = 0;
        }

        current.push_str(sentence);
        current_len += sentence_len;
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim_end().to_string());
    }
    chunks
}

/// Cut a chunk that is still over budget into budget-sized pieces.
fn hard_split(chunk: String, budget: usize) -> Vec<String> {
    if char_len(&chunk) <= budget {
        return vec![chunk];
    }

    let chars: Vec<char> = chunk.chars().collect();
    chars
        .chunks(budget)
        .map(|piece| piece.iter().collect::<String>().trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}
