//! Property tests for the reply formatter.
//!
//! Replies are generated from known segments so the expected visible text is
//! known up front: formatting may drop syntax, never content.

use super::{DEFAULT_CONTACT_URL, Line, RenderToken, format};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Segment {
    Plain(String),
    Button(String),
    Warning(String),
    Highlight(String),
    Guidance(String),
    Contact(Option<String>),
}

impl Segment {
    fn source(&self) -> String {
        match self {
            Segment::Plain(text) => text.clone(),
            Segment::Button(text) => format!("**{text}**"),
            Segment::Warning(text) => format!("[[{text}]]"),
            Segment::Highlight(text) => format!("{{{{{text}}}}}"),
            Segment::Guidance(text) => format!("(({text}))"),
            Segment::Contact(Some(label)) => format!("[{label}]({DEFAULT_CONTACT_URL})"),
            Segment::Contact(None) => DEFAULT_CONTACT_URL.to_string(),
        }
    }

    fn visible(&self) -> &str {
        match self {
            Segment::Plain(text)
            | Segment::Button(text)
            | Segment::Warning(text)
            | Segment::Highlight(text)
            | Segment::Guidance(text) => text,
            Segment::Contact(Some(label)) => label,
            Segment::Contact(None) => DEFAULT_CONTACT_URL,
        }
    }
}

/// Plain text never starts or ends with whitespace and carries no markup characters.
fn arb_plain() -> impl Strategy<Value = String> {
    "[a-z0-9\u{4e00}-\u{4e20}]([a-z0-9 \u{4e00}-\u{4e20}]{0,6}[a-z0-9\u{4e00}-\u{4e20}])?"
}

fn arb_body() -> impl Strategy<Value = String> {
    "[a-z0-9 \u{4e00}-\u{4e20}]{0,8}"
}

fn arb_segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        3 => arb_plain().prop_map(Segment::Plain),
        1 => arb_body().prop_map(Segment::Button),
        1 => arb_body().prop_map(Segment::Warning),
        1 => arb_body().prop_map(Segment::Highlight),
        1 => arb_body().prop_map(Segment::Guidance),
        1 => proptest::option::of(arb_body()).prop_map(Segment::Contact),
    ]
}

fn arb_line() -> impl Strategy<Value = (bool, Vec<Segment>)> {
    (any::<bool>(), prop::collection::vec(arb_segment(), 0..6))
}

proptest! {
    #[test]
    fn formatting_is_lossless_for_content(lines in prop::collection::vec(arb_line(), 1..6)) {
        let mut source = Vec::new();
        let mut expected = Vec::new();
        for (bullet, segments) in &lines {
            let body: String = segments.iter().map(Segment::source).collect();
            let visible: String = segments.iter().map(Segment::visible).collect();
            if *bullet && !segments.is_empty() {
                source.push(format!("- {body}"));
            } else {
                source.push(body);
            }
            expected.push(visible);
        }

        let formatted = format(&source.join("\n"));
        prop_assert_eq!(formatted.len(), lines.len());
        for ((line, (bullet, segments)), visible) in formatted.iter().zip(&lines).zip(&expected) {
            prop_assert_eq!(&line.visible_text(), visible);
            if segments.is_empty() {
                prop_assert_eq!(line, &Line::Spacer);
            } else {
                prop_assert_eq!(line.is_bullet(), *bullet);
            }
        }
    }

    #[test]
    fn every_segment_maps_to_one_token(segment in arb_segment()) {
        let lines = format(&segment.source());
        prop_assert_eq!(lines.len(), 1);
        let tokens = lines[0].tokens();
        prop_assert!(tokens.len() <= 1);
        match (&segment, tokens.first()) {
            (Segment::Button(k), Some(RenderToken::Button(t))) => prop_assert_eq!(k, t),
            (Segment::Warning(k), Some(RenderToken::Warning(t))) => prop_assert_eq!(k, t),
            (Segment::Highlight(k), Some(RenderToken::Highlight(t))) => prop_assert_eq!(k, t),
            (Segment::Guidance(k), Some(RenderToken::Guidance(t))) => prop_assert_eq!(k, t),
            (Segment::Contact(label), Some(RenderToken::ContactLink { label: got, .. })) => {
                prop_assert_eq!(label, got)
            }
            (Segment::Plain(k), Some(RenderToken::Text(t))) => prop_assert_eq!(k, t),
            (segment, token) => prop_assert!(false, "{segment:?} became {token:?}"),
        }
    }

    #[test]
    fn arbitrary_input_never_panics(input in any::<String>()) {
        let lines = format(&input);
        prop_assert_eq!(lines.len(), input.split('\n').count());
    }
}
