// src/render.rs
//! Splits assistant text into plain and fenced-code segments.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

// Non-greedy so adjacent fenced blocks stay separate.
static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(.*?)```").expect("valid fence regex"));

// Optional language tag, then the line break that ends the fence line.
static LANG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9]*)\r?\n").expect("valid language regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Segment {
    Text {
        body: String,
    },
    Code {
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        body: String,
    },
}

impl Segment {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    pub fn code(language: Option<&str>, body: impl Into<String>) -> Self {
        Self::Code {
            language: language.map(str::to_string),
            body: body.into(),
        }
    }
}

/// Split `content` into text and code segments.
///
/// Text between two code spans is kept even when empty; empty text before the
/// first or after the last code span is dropped. Content without a complete
/// fence pair comes back as a single text segment.
pub fn render(content: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut cursor = 0;
    let mut saw_code = false;

    for cap in FENCE_RE.captures_iter(content) {
        let (Some(whole), Some(inner)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let before = &content[cursor..whole.start()];
        if saw_code || !before.is_empty() {
            out.push(Segment::text(before));
        }
        out.push(parse_code(inner.as_str()));
        saw_code = true;
        cursor = whole.end();
    }

    let rest = &content[cursor..];
    if !saw_code || !rest.is_empty() {
        out.push(Segment::text(rest));
    }
    out
}

fn parse_code(inner: &str) -> Segment {
    match LANG_RE.captures(inner) {
        Some(cap) => {
            let tag = cap.get(1).map(|m| m.as_str()).filter(|t| !t.is_empty());
            let header_len = cap.get(0).map_or(0, |m| m.end());
            Segment::code(tag, &inner[header_len..])
        }
        // Single-line fence such as ```inline```: no tag, keep everything.
        None => Segment::code(None, inner),
    }
}

/// HTML for the chat panel: paragraphs with preserved whitespace and labeled code blocks.
pub fn to_html(segments: &[Segment]) -> String {
    let mut html = String::new();
    for seg in segments {
        match seg {
            Segment::Text { body } => {
                html.push_str(r#"<p style="white-space: pre-wrap">"#);
                html.push_str(&html_escape::encode_text(body));
                html.push_str("</p>");
            }
            Segment::Code { language, body } => {
                html.push_str(r#"<div class="code-block">"#);
                match language {
                    Some(lang) => {
                        let lang = html_escape::encode_double_quoted_attribute(lang);
                        html.push_str(&format!(
                            r#"<div class="code-label">{lang}</div><pre><code class="language-{lang}">"#
                        ));
                    }
                    None => html.push_str("<pre><code>"),
                }
                html.push_str(&html_escape::encode_text(body));
                html.push_str("</code></pre></div>");
            }
        }
    }
    html
}
