//! Rich text to HTML.
//!
//! This module is the one place where post content crosses from structured
//! CMS data into markup that pages embed without escaping. Everything a page
//! injects verbatim must be a [`TrustedHtml`], and [`render_rich_text`] is the
//! only way to build one. The text of every fragment is escaped here; only
//! the element structure and the allowed inline tags are produced raw.
//!
//! ## Mapping
//!
//! | Fragment type | Element |
//! |---|---|
//! | `paragraph`, unknown | `<p>` |
//! | `heading1`..`heading6` | `<h1>`..`<h6>` |
//! | `list-item` | `<li>` inside `<ul>` |
//! | `o-list-item` | `<li>` inside `<ol>` |
//! | `preformatted` | `<pre>` |
//!
//! Consecutive list items share one list element. Spans become `<strong>`,
//! `<em>` and `<a href>`; links to anything other than http(s), mailto or a
//! site-relative path are rendered as plain text.

use crate::types::{FragmentKind, RichTextFragment, Span, SpanKind};
use maud::{Render, html};

/// HTML that pages may embed without escaping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustedHtml(String);

impl TrustedHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Render for TrustedHtml {
    fn render_to(&self, buffer: &mut String) {
        buffer.push_str(&self.0);
    }
}

/// Render a block body to trusted HTML.
pub fn render_rich_text(fragments: &[RichTextFragment]) -> TrustedHtml {
    let mut out = String::new();
    let mut open_list: Option<&'static str> = None;

    for fragment in fragments {
        let list = list_tag(fragment.kind);
        if open_list != list {
            if let Some(tag) = open_list {
                out.push_str(&format!("</{tag}>"));
            }
            if let Some(tag) = list {
                out.push_str(&format!("<{tag}>"));
            }
            open_list = list;
        }

        let tag = element_tag(fragment.kind);
        let mut inline = render_inline(&fragment.text, &fragment.spans);
        if fragment.kind != FragmentKind::Preformatted {
            inline = inline.replace('\n', "<br />");
        }
        out.push_str(&format!("<{tag}>{inline}</{tag}>"));
    }

    if let Some(tag) = open_list {
        out.push_str(&format!("</{tag}>"));
    }
    TrustedHtml(out)
}

fn list_tag(kind: FragmentKind) -> Option<&'static str> {
    match kind {
        FragmentKind::ListItem => Some("ul"),
        FragmentKind::OListItem => Some("ol"),
        _ => None,
    }
}

fn element_tag(kind: FragmentKind) -> &'static str {
    match kind {
        FragmentKind::Paragraph | FragmentKind::Other => "p",
        FragmentKind::Heading1 => "h1",
        FragmentKind::Heading2 => "h2",
        FragmentKind::Heading3 => "h3",
        FragmentKind::Heading4 => "h4",
        FragmentKind::Heading5 => "h5",
        FragmentKind::Heading6 => "h6",
        FragmentKind::ListItem | FragmentKind::OListItem => "li",
        FragmentKind::Preformatted => "pre",
    }
}

fn escape(text: &str) -> String {
    html! { (text) }.into_string()
}

fn is_safe_url(url: &str) -> bool {
    let url = url.trim().to_ascii_lowercase();
    ["http://", "https://", "mailto:", "/", "#"]
        .iter()
        .any(|prefix| url.starts_with(prefix))
}

/// Split `text` at every span boundary and wrap each segment in the tags of
/// the spans covering it. Span offsets are character indices.
fn render_inline(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut spans: Vec<&Span> = spans
        .iter()
        .filter(|s| s.start < s.end && s.start < len)
        .collect();
    if spans.is_empty() {
        return escape(text);
    }
    // Outer spans open first: earlier start, then longer range.
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut bounds: Vec<usize> = vec![0, len];
    for span in &spans {
        bounds.push(span.start);
        bounds.push(span.end.min(len));
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut out = String::new();
    for window in bounds.windows(2) {
        let (from, to) = (window[0], window[1]);
        let segment: String = chars[from..to].iter().collect();
        let active: Vec<&Span> = spans
            .iter()
            .copied()
            .filter(|s| s.start <= from && s.end.min(len) >= to)
            .collect();

        let mut closing = Vec::new();
        for span in &active {
            if let Some((open, close)) = span_tags(span) {
                out.push_str(&open);
                closing.push(close);
            }
        }
        out.push_str(&escape(&segment));
        for close in closing.iter().rev() {
            out.push_str(close);
        }
    }
    out
}

fn span_tags(span: &Span) -> Option<(String, &'static str)> {
    match span.kind {
        SpanKind::Strong => Some(("<strong>".to_string(), "</strong>")),
        SpanKind::Em => Some(("<em>".to_string(), "</em>")),
        SpanKind::Hyperlink => {
            let url = span.data.as_ref()?.url.as_deref()?;
            if !is_safe_url(url) {
                return None;
            }
            Some((format!(r#"<a href="{}">"#, escape(url)), "</a>"))
        }
        SpanKind::Other => None,
    }
}
