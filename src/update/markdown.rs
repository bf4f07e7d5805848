//! Release-note formatting.
//!
//! A fixed chain of text substitutions covering level-3 headers, bold, list
//! items and line breaks. The output is not escaped; notes come from the
//! site's own version descriptor.

use std::sync::LazyLock;

use regex::Regex;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^### (.*)$").expect("valid regex"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*)\*\*").expect("valid regex"));
static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^- (.*)$").expect("valid regex"));
static ITEM_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(<li>.*</li>)").expect("valid regex"));
static LIST_JOIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</ul>\s*<ul>").expect("valid regex"));

/// Converts release notes to HTML.
pub fn format_release_notes(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let html = HEADER_RE.replace_all(text, "<h3>${1}</h3>");
    let html = BOLD_RE.replace_all(&html, "<strong>${1}</strong>");
    let html = ITEM_RE.replace_all(&html, "<li>${1}</li>");
    let html = ITEM_LINE_RE.replace_all(&html, "<ul>${1}</ul>");
    let html = LIST_JOIN_RE.replace_all(&html, "");
    html.replace('\n', "<br>")
}
