//! TwiML rendering.

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use quick_xml::escape::escape;
use textline_common::ReplySegment;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Rendered TwiML document, served as `application/xml`.
#[derive(Debug, Clone)]
pub struct Twiml(pub String);

impl IntoResponse for Twiml {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "application/xml")], self.0).into_response()
    }
}

/// One `<Message>` per segment, in order. No segments renders an empty
/// `<Response>`, which sends nothing back.
pub fn render(segments: &[ReplySegment]) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str("<Response>");
    for segment in segments {
        push_message(&mut xml, &segment.render());
    }
    xml.push_str("</Response>");
    xml
}

/// Document with a single message.
pub fn render_text(text: &str) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str("<Response>");
    push_message(&mut xml, text);
    xml.push_str("</Response>");
    xml
}

fn push_message(xml: &mut String, text: &str) {
    xml.push_str("<Message>");
    xml.push_str(&escape(text));
    xml.push_str("</Message>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use textline_common::SegmentKind;

    fn seg(index: usize, total: usize, text: &str) -> ReplySegment {
        ReplySegment {
            index,
            total,
            text: text.into(),
            kind: SegmentKind::Content,
        }
    }

    #[test]
    fn test_escapes_markup() {
        assert_eq!(
            render_text("1 < 2 & \"quotes\""),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>1 &lt; 2 &amp; &quot;quotes&quot;</Message></Response>"
        );
    }

    #[test]
    fn test_one_message_per_segment() {
        let xml = render(&[seg(1, 2, "first"), seg(2, 2, "second")]);
        assert!(xml.ends_with(
            "<Response><Message>(1/2) first</Message><Message>(2/2) second</Message></Response>"
        ));
    }

    #[test]
    fn test_empty_response() {
        assert_eq!(
            render(&[]),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response></Response>"
        );
    }
}
