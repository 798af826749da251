//! URL origin and domain helpers.

/// Scheme+host origin of an absolute `http(s)` URL.
///
/// `"https://www.amazon.de/Widget/dp/B0X?th=1"` → `"https://www.amazon.de"`.
/// Returns `None` for relative, malformed or non-HTTP URLs.
#[must_use]
pub fn extract_origin(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    Some(parsed.origin().ascii_serialization())
}

/// Hostname of a URL for use in error messages, falling back to the input.
pub(crate) fn extract_domain(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}
