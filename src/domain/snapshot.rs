//! Base snapshot sanitization for replay.
//!
//! The stored `page_html` is reduced to its body content, whitespace is
//! normalized, and the result is wrapped in a fixed document shell that
//! forbids scripts and disables pointer interaction.

use std::sync::LazyLock;

use regex::Regex;

static BODY_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*?)</body\s*>").ok());
static HORIZONTAL_WS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[ \t\x0B\x0C]+").ok());
static BLANK_LINES_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n)+").ok());

/// Document shell head: fixed encoding, no scripts, no pointer interaction.
const SHELL_HEAD: &str = concat!(
    "<!DOCTYPE html>\n<html>\n<head>\n",
    "<meta charset=\"utf-8\">\n",
    "<meta http-equiv=\"Content-Security-Policy\" ",
    "content=\"default-src 'self' data: blob: 'unsafe-inline'; script-src 'none'\">\n",
    "<style>\n",
    "a, button, input, select, textarea, label, summary, details, ",
    "[onclick], [role=\"button\"], [role=\"link\"], [tabindex] {\n",
    "  cursor: default !important;\n",
    "  pointer-events: none !important;\n",
    "}\n",
    "</style>\n",
    "</head>\n<body>\n",
);
const SHELL_TAIL: &str = "\n</body>\n</html>\n";

/// Returns the content of the first `<body>`…`</body>` pair, or the whole
/// snapshot when no body element is present.
#[must_use]
pub fn extract_body(html: &str) -> &str {
    BODY_RE
        .as_ref()
        .and_then(|re| re.captures(html))
        .and_then(|caps| caps.get(1))
        .map_or(html, |m| m.as_str())
}

/// Collapses horizontal whitespace runs to one space and blank-line runs to
/// one newline, then trims.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let spaced = match HORIZONTAL_WS_RE.as_ref() {
        Some(re) => re.replace_all(&unified, " ").into_owned(),
        None => unified,
    };
    let lined = match BLANK_LINES_RE.as_ref() {
        Some(re) => re.replace_all(&spaced, "\n").into_owned(),
        None => spaced,
    };
    lined.trim().to_string()
}

/// Decodes the basic HTML entities in a single left-to-right pass.
///
/// `&amp;lt;` becomes `&lt;`, not `<`: decoded output is never re-scanned.
#[must_use]
pub fn unescape_entities(text: &str) -> String {
    const ENTITIES: &[(&str, char)] = &[
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#39;", '\''),
        ("&#x27;", '\''),
        ("&apos;", '\''),
        ("&amp;", '&'),
    ];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        let (before, from_amp) = rest.split_at(pos);
        out.push_str(before);
        match ENTITIES.iter().find(|(entity, _)| from_amp.starts_with(entity)) {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = from_amp.get(entity.len()..).unwrap_or("");
            }
            None => {
                out.push('&');
                rest = from_amp.get(1..).unwrap_or("");
            }
        }
    }
    out.push_str(rest);
    out
}

/// Wraps sanitized body content in the non-interactive replay shell.
#[must_use]
pub fn wrap_in_shell(body: &str) -> String {
    let mut doc = String::with_capacity(SHELL_HEAD.len() + body.len() + SHELL_TAIL.len());
    doc.push_str(SHELL_HEAD);
    doc.push_str(body);
    doc.push_str(SHELL_TAIL);
    doc
}

/// Full sanitization pipeline for a stored snapshot.
///
/// With `unescape` set, entities are decoded once before the body is
/// located. A missing snapshot yields an empty shell.
#[must_use]
pub fn sanitize_snapshot(html: Option<&str>, unescape: bool) -> String {
    let raw = html.unwrap_or("");
    let decoded;
    let source = if unescape {
        decoded = unescape_entities(raw);
        decoded.as_str()
    } else {
        raw
    };
    wrap_in_shell(&normalize_whitespace(extract_body(source)))
}
