//! Text sanitization for extracted posting fields
//!
//! Titles, company names and anchor texts are collapsed to a single line;
//! descriptions keep their paragraph breaks but lose invisible characters
//! and runs of blank lines.

use regex::Regex;
use scraper::{Html, Node};
use std::sync::LazyLock;

static INLINE_SPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

static ANY_SPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static MULTI_NEWLINE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Clean a multi-line block of text such as a job description
///
/// ```
/// use jobharvest::parser::sanitize::sanitize_text;
///
/// let clean = sanitize_text("  Great\u{200B} role  \n\n\n\n  Apply now ");
/// assert_eq!(clean, "Great role\n\nApply now");
/// ```
pub fn sanitize_text(text: &str) -> String {
    let stripped = strip_invisible(text).replace('\r', "").replace('\u{a0}', " ");
    let spaced = INLINE_SPACE_REGEX.replace_all(&stripped, " ");
    let trimmed = spaced
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");

    MULTI_NEWLINE_REGEX
        .replace_all(&trimmed, "\n\n")
        .trim()
        .to_string()
}

/// Collapse text to one line with single spaces
///
/// ```
/// use jobharvest::parser::sanitize::collapse_inline;
///
/// assert_eq!(collapse_inline("\n  Graduate\n   Analyst  "), "Graduate Analyst");
/// ```
pub fn collapse_inline(text: &str) -> String {
    let stripped = strip_invisible(text);
    ANY_SPACE_REGEX.replace_all(&stripped, " ").trim().to_string()
}

/// Drop zero-width marks, the BOM and control characters other than newline and tab
pub fn strip_invisible(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(*c, '\u{200B}'..='\u{200F}' | '\u{2028}'..='\u{202F}' | '\u{FEFF}')
        })
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
        .collect()
}

/// Plain text of an HTML fragment such as an API description
///
/// Tags are dropped, entities are decoded once and block-level elements
/// start a new line.
///
/// ```
/// use jobharvest::parser::sanitize::markup_to_text;
///
/// assert_eq!(markup_to_text("Join our <b>team</b> &amp; grow"), "Join our team & grow");
/// ```
pub fn markup_to_text(fragment: &str) -> String {
    let html = Html::parse_fragment(fragment);
    let mut text = String::with_capacity(fragment.len());

    for node in html.root_element().descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if is_block(e.name()) => text.push('\n'),
            _ => {}
        }
    }
    sanitize_text(&text)
}

fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "br" | "p" | "div" | "li" | "ul" | "ol" | "tr" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
    )
}

/// Check if text contains anything but whitespace
pub fn has_content(text: &str) -> bool {
    !text.trim().is_empty()
}

/// Length in characters, not bytes
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
