//! Locating and parsing JSON objects embedded in inline `<script>` text.

use std::sync::LazyLock;

use regex::Regex;

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("valid regex"));

/// Find the JSON object that follows the first match of `marker` in `source`.
///
/// Whitespace after the marker is skipped; the next character must be `{`.
/// Returns the slice from that brace through the brace that balances it.
/// Braces inside string literals are ignored. Returns `None` when the marker
/// is absent, no object follows it, or the input ends before the object
/// closes.
#[must_use]
pub fn locate<'a>(source: &'a str, marker: &Regex) -> Option<&'a str> {
    let found = marker.find(source)?;
    let rest = source[found.end()..].trim_start();
    extract_balanced_object(rest)
}

/// Returns the shortest prefix of `s` that forms a complete `{…}` object.
///
/// Scans character by character tracking brace depth, respecting string
/// literals and escape sequences.
pub(crate) fn extract_balanced_object(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escape = false;
    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if in_string {
            match c {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse an embedded JSON object, tolerating the damage inline page data
/// usually carries.
///
/// Tries, in order: a strict parse, a parse with trailing commas removed, and
/// a parse after decoding common HTML entities. Returns `None` when all three
/// fail.
#[must_use]
pub fn parse_embedded_json(raw: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str(raw) {
        return Some(value);
    }

    let without_commas = TRAILING_COMMA_RE.replace_all(raw, "$1");
    if let Ok(value) = serde_json::from_str(&without_commas) {
        return Some(value);
    }

    let decoded = decode_html_entities(&without_commas);
    match serde_json::from_str(&decoded) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, len = raw.len(), "embedded JSON did not parse");
            None
        }
    }
}

/// Decode the handful of entities that show up inside attribute-embedded JSON.
///
/// `&amp;` is decoded last so `&amp;quot;` yields `&quot;` and not `"`.
#[must_use]
pub fn decode_html_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
