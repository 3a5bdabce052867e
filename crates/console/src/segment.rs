//! Response segmentation - splits an AI response into plain text and fenced
//! code blocks so each block can be copied or inserted on its own.

use regex::Regex;
use std::sync::OnceLock;

const FENCE: &str = "```";

/// One unit of a parsed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text { body: String },
    /// `language` is empty when the fence carried no tag
    Code { language: String, body: String },
}

impl Segment {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    pub fn code(language: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Code {
            language: language.into(),
            body: body.into(),
        }
    }
}

/// Opening fence, optional ASCII word tag, optional newline, then a
/// non-greedy body up to the closing fence.
fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)```([0-9A-Za-z_]*)\n?(.*?)```").expect("fence pattern is a valid regex")
    })
}

/// Parse a raw response into ordered segments.
///
/// A response without any fence marker is a single text segment, verbatim.
/// Otherwise text and code alternate in source order. Leading text that is
/// only whitespace is dropped, as is zero-length text between or after
/// fences; all other text is kept exactly.
pub fn segment(response: &str) -> Vec<Segment> {
    if !response.contains(FENCE) {
        return vec![Segment::text(response)];
    }

    let mut segments = Vec::new();
    let mut cursor = 0;
    let mut leading = true;

    for caps in fence_pattern().captures_iter(response) {
        let Some(fence) = caps.get(0) else {
            continue;
        };

        push_text(&mut segments, &response[cursor..fence.start()], leading);
        leading = false;

        let language = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str());
        segments.push(Segment::code(language, body));

        cursor = fence.end();
    }

    push_text(&mut segments, &response[cursor..], leading);
    segments
}

fn push_text(segments: &mut Vec<Segment>, text: &str, leading: bool) {
    let keep = if leading {
        !text.trim().is_empty()
    } else {
        !text.is_empty()
    };
    if keep {
        segments.push(Segment::text(text));
    }
}
