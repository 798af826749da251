//! Classic layout: a dimension-value table plus an identifier → index map.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use vscout_core::{Dimensions, UNKNOWN_DIMENSION_VALUE};

use super::{RawVariant, VariantStrategy};
use crate::locate::{locate, parse_embedded_json};

static DISPLAY_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"dimensionValuesDisplayData"?\s*:"#).expect("valid regex")
});
static VARIATION_VALUES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bvariationValues"?\s*:"#).expect("valid regex"));
static INDEX_MAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"asinToDimensionIndexMap"?\s*:"#).expect("valid regex"));

pub struct ClassicStrategy;

impl VariantStrategy for ClassicStrategy {
    fn name(&self) -> &'static str {
        "classic"
    }

    fn label(&self) -> &'static str {
        "Classic Method"
    }

    fn try_parse(&self, html: &str) -> Option<Vec<RawVariant>> {
        let table_raw =
            locate(html, &DISPLAY_DATA_RE).or_else(|| locate(html, &VARIATION_VALUES_RE))?;
        let map_raw = locate(html, &INDEX_MAP_RE)?;

        let table = parse_embedded_json(table_raw)?;
        let index_map = parse_embedded_json(map_raw)?;
        let (Value::Object(table), Value::Object(index_map)) = (table, index_map) else {
            return None;
        };

        let variants: Vec<RawVariant> = index_map
            .iter()
            .map(|(asin, indices)| RawVariant {
                asin: asin.clone(),
                dimensions: resolve_dimensions(&table, indices),
            })
            .collect();

        tracing::debug!(
            dimensions = table.len(),
            variants = variants.len(),
            "classic variant table parsed"
        );
        (!variants.is_empty()).then_some(variants)
    }
}

/// Resolve `values[dim][indices[pos]]` for each dimension in table order.
fn resolve_dimensions(table: &serde_json::Map<String, Value>, indices: &Value) -> Dimensions {
    let indices = indices.as_array();
    table
        .iter()
        .enumerate()
        .map(|(pos, (dim, values))| {
            let value = indices
                .and_then(|idx| idx.get(pos))
                .and_then(Value::as_u64)
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| values.as_array()?.get(i))
                .and_then(display_text)
                .unwrap_or_else(|| UNKNOWN_DIMENSION_VALUE.to_string());
            (dim.clone(), value)
        })
        .collect()
}

fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
