//! Twister layout: per-dimension selection lists in an `a-state` script.
//!
//! Each dimension lists its values with a selection state and, for values
//! that resolve to a single SKU, a default identifier. Variants are the
//! single-axis deviations from the currently selected combination.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use vscout_core::{Dimensions, UNKNOWN_DIMENSION_VALUE};

use super::{RawVariant, VariantStrategy};
use crate::locate::{extract_balanced_object, locate, parse_embedded_json};
use crate::page::extract_attr;

const STATE_KEY: &str = "desktop-twister-sort-filter-data";
const SORTED_DIMS_KEY: &str = "sortedDimValuesForAllDims";
const SELECTED_STATE: &str = "SELECTED";

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script>").expect("valid regex")
});
static SORTED_DIMS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"sortedDimValuesForAllDims"?\s*:"#).expect("valid regex")
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DimensionValue {
    #[serde(default)]
    dimension_value_display_text: Option<String>,
    #[serde(default)]
    dimension_value_state: Option<String>,
    #[serde(default)]
    default_asin: Option<String>,
}

impl DimensionValue {
    fn display_text(&self) -> String {
        self.dimension_value_display_text
            .clone()
            .unwrap_or_else(|| UNKNOWN_DIMENSION_VALUE.to_string())
    }
}

pub struct TwisterStrategy;

impl VariantStrategy for TwisterStrategy {
    fn name(&self) -> &'static str {
        "twister"
    }

    fn label(&self) -> &'static str {
        "Twister Plus Method"
    }

    fn note(&self) -> Option<&'static str> {
        Some("Some combinations may require page visits to reveal.")
    }

    fn try_parse(&self, html: &str) -> Option<Vec<RawVariant>> {
        for cap in SCRIPT_RE.captures_iter(html) {
            let attrs = cap.get(1).map_or("", |m| m.as_str());
            let is_twister_state = extract_attr(attrs, "data-a-state")
                .is_some_and(|state| state.contains(STATE_KEY));
            if !is_twister_state {
                continue;
            }
            let body = cap.get(2).map_or("", |m| m.as_str());
            let Some(dims) = sorted_dimensions(body) else {
                tracing::debug!("twister state script without usable dimension lists");
                continue;
            };
            let variants = expand_single_axis(&dims);
            if !variants.is_empty() {
                return Some(variants);
            }
        }
        None
    }
}

/// Parse the dimension → value-records object out of the script body.
fn sorted_dimensions(body: &str) -> Option<Vec<(String, Vec<DimensionValue>)>> {
    let state = extract_balanced_object(body.trim_start()).and_then(parse_embedded_json);
    let sorted = match state.as_ref().and_then(|s| s.get(SORTED_DIMS_KEY)) {
        Some(v) => v.clone(),
        None => parse_embedded_json(locate(body, &SORTED_DIMS_RE)?)?,
    };
    let Value::Object(map) = sorted else {
        return None;
    };

    let dims = map
        .into_iter()
        .map(|(dim, records)| {
            let values = match records {
                Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value::<DimensionValue>(item).ok())
                    .collect(),
                _ => Vec::new(),
            };
            (dim, values)
        })
        .collect();
    Some(dims)
}

fn expand_single_axis(dims: &[(String, Vec<DimensionValue>)]) -> Vec<RawVariant> {
    let baseline: Vec<Option<String>> = dims
        .iter()
        .map(|(_, values)| {
            values
                .iter()
                .find(|v| v.dimension_value_state.as_deref() == Some(SELECTED_STATE))
                .map(DimensionValue::display_text)
        })
        .collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut variants = Vec::new();

    for (target, (_, values)) in dims.iter().enumerate() {
        for value in values {
            let Some(asin) = value.default_asin.as_deref().filter(|a| !a.is_empty()) else {
                continue;
            };
            if !seen.insert(asin) {
                continue;
            }
            let dimensions: Dimensions = dims
                .iter()
                .zip(&baseline)
                .enumerate()
                .map(|(pos, ((dim, _), base))| {
                    let text = if pos == target {
                        value.display_text()
                    } else {
                        base.clone()
                            .unwrap_or_else(|| UNKNOWN_DIMENSION_VALUE.to_string())
                    };
                    (dim.clone(), text)
                })
                .collect();
            variants.push(RawVariant {
                asin: asin.to_string(),
                dimensions,
            });
        }
    }

    variants
}
