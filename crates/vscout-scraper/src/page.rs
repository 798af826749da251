//! Page-level facts read once per document: the current product identifier,
//! the canonical origin and the product title.

use std::sync::LazyLock;

use regex::Regex;

use crate::client::extract_origin;

static INPUT_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b[^>]*>").expect("valid regex"));
static LINK_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>").expect("valid regex"));
static PRODUCT_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span\b[^>]*\bid=["']productTitle["'][^>]*>(.*?)</span>"#)
        .expect("valid regex")
});
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\b([a-z][a-z0-9_.:-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

/// Identifier of the product the page itself describes.
///
/// Looks for `<input id="ASIN" value="…">` first, then
/// `<input name="ASIN.0" value="…">`. Attribute order does not matter.
#[must_use]
pub fn current_asin(html: &str) -> Option<String> {
    input_value_where(html, "id", "ASIN").or_else(|| input_value_where(html, "name", "ASIN.0"))
}

fn input_value_where(html: &str, key: &str, expected: &str) -> Option<String> {
    INPUT_TAG_RE.find_iter(html).find_map(|tag| {
        let tag = tag.as_str();
        if extract_attr(tag, key).as_deref() != Some(expected) {
            return None;
        }
        extract_attr(tag, "value").filter(|v| !v.is_empty())
    })
}

/// Origin (`scheme://host`) of the page's `<link rel="canonical">`, if any.
#[must_use]
pub fn canonical_origin(html: &str) -> Option<String> {
    LINK_TAG_RE.find_iter(html).find_map(|tag| {
        let tag = tag.as_str();
        let rel = extract_attr(tag, "rel")?;
        if !rel.eq_ignore_ascii_case("canonical") {
            return None;
        }
        let href = extract_attr(tag, "href")?;
        extract_origin(&href)
    })
}

/// Text of the `#productTitle` element with whitespace collapsed.
#[must_use]
pub fn product_title(html: &str) -> Option<String> {
    let inner = PRODUCT_TITLE_RE.captures(html)?.get(1)?.as_str();
    let text = crate::locate::decode_html_entities(inner);
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Origin used to build variant URLs: canonical link, then the caller's
/// context URL, then `default_origin`.
#[must_use]
pub fn resolve_base_url(html: &str, context_url: Option<&str>, default_origin: &str) -> String {
    canonical_origin(html)
        .or_else(|| context_url.and_then(extract_origin))
        .unwrap_or_else(|| default_origin.trim_end_matches('/').to_string())
}

/// Value of attribute `attr` in a single tag, matched case-insensitively.
pub(crate) fn extract_attr(tag: &str, attr: &str) -> Option<String> {
    ATTR_RE.captures_iter(tag).find_map(|c| {
        let name = c.get(1)?.as_str();
        if !name.eq_ignore_ascii_case(attr) {
            return None;
        }
        c.get(2)
            .or_else(|| c.get(3))
            .map(|m| m.as_str().trim().to_string())
    })
}
