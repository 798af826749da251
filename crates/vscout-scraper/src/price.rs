//! Product price extraction from raw page HTML.
//!
//! Rules are tried in order and the first capture containing a digit wins.
//! Currency symbols are kept exactly as they appear on the page.

use std::sync::LazyLock;

use regex::Regex;
use vscout_core::NOT_AVAILABLE;

static WHOLE_FRACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<span[^>]*class=["'][^"']*\ba-price-whole\b[^"']*["'][^>]*>\s*([\d.,]+).{0,200}?<span[^>]*class=["'][^"']*\ba-price-fraction\b[^"']*["'][^>]*>\s*(\d+)\s*<"#,
    )
    .expect("valid regex")
});

static OFFSCREEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span[^>]*class=["'][^"']*\ba-offscreen\b[^"']*["'][^>]*>([^<]+)<"#)
        .expect("valid regex")
});

static AOK_OFFSCREEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span[^>]*class=["'][^"']*\baok-offscreen\b[^"']*["'][^>]*>([^<]+)<"#)
        .expect("valid regex")
});

static PRICEBLOCK_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["ourprice", "dealprice", "saleprice"]
        .iter()
        .map(|id| {
            Regex::new(&format!(
                r#"(?is)id=["']priceblock_{id}["'][^>]*>([^<]+)<"#
            ))
            .expect("valid priceblock regex")
        })
        .collect()
});

static PRICE_AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""priceAmount"\s*:\s*([\d.]+)"#).expect("valid regex"));

static PRICE_STRING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""price"\s*:\s*"([^"]+)""#).expect("valid regex"));

/// Extract the displayed product price from `html`.
///
/// Returns [`NOT_AVAILABLE`] when no rule yields a value containing a digit.
#[must_use]
pub fn extract_price(html: &str) -> String {
    if let Some(price) = whole_and_fraction(html) {
        return price;
    }

    let single_capture_rules = [&*OFFSCREEN_RE, &*AOK_OFFSCREEN_RE]
        .into_iter()
        .chain(PRICEBLOCK_RES.iter())
        .chain([&*PRICE_AMOUNT_RE, &*PRICE_STRING_RE]);

    for rule in single_capture_rules {
        let hit = rule
            .captures_iter(html)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .find(|text| has_digit(text));
        if let Some(text) = hit {
            return text.to_string();
        }
    }

    NOT_AVAILABLE.to_string()
}

fn whole_and_fraction(html: &str) -> Option<String> {
    WHOLE_FRACTION_RE.captures_iter(html).find_map(|c| {
        let whole = c.get(1)?.as_str().trim_end_matches(['.', ',']);
        let fraction = c.get(2)?.as_str();
        has_digit(whole).then(|| format!("{whole}.{fraction}"))
    })
}

fn has_digit(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
}

/// Numeric value of a price string, keeping only digits and `.`.
///
/// `"$1,299.99"` → `Some(1299.99)`; sentinel text yields `None`.
#[must_use]
pub fn parse_price_value(price: &str) -> Option<f64> {
    let cleaned: String = price
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse::<f64>().ok()
}
