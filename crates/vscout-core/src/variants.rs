//! Variant listings extracted from a product page, and the per-extraction
//! result envelope.
//!
//! The serialized shape is a flat camelCase JSON object so results produced
//! by a remote relay and results produced locally are interchangeable.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Price text returned by the price extractor when a document has no price.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder for a dimension value that could not be resolved.
pub const UNKNOWN_DIMENSION_VALUE: &str = "Unknown";

const REQUIRES_FETCH_TEXT: &str = "Requires Page Visit";
const UNAVAILABLE_TEXT: &str = "Unavailable";
const FETCH_FAILED_TEXT: &str = "Fetch Failed";

/// Price state of a single variant.
///
/// Serialized as plain text: either the literal price (currency symbol kept
/// as found on the page) or one of the sentinel strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VariantPrice {
    /// Price text as it appeared on the page, e.g. `"$10.00"`.
    Known(String),
    /// The variant's own page has not been visited yet.
    RequiresFetch,
    /// The variant's page was fetched but carried no price.
    Unavailable,
    /// Fetching the variant's page errored or timed out.
    FetchFailed,
}

impl VariantPrice {
    /// Maps price-extractor output onto a price state: `"N/A"` becomes
    /// [`VariantPrice::Unavailable`].
    #[must_use]
    pub fn from_extracted(price: &str) -> Self {
        if price == NOT_AVAILABLE {
            Self::Unavailable
        } else {
            Self::Known(price.to_string())
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::RequiresFetch)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(text) => text,
            Self::RequiresFetch => REQUIRES_FETCH_TEXT,
            Self::Unavailable => UNAVAILABLE_TEXT,
            Self::FetchFailed => FETCH_FAILED_TEXT,
        }
    }
}

impl From<String> for VariantPrice {
    fn from(text: String) -> Self {
        match text.as_str() {
            // Older relay builds wrote "Requires Fetch".
            REQUIRES_FETCH_TEXT | "Requires Fetch" => Self::RequiresFetch,
            UNAVAILABLE_TEXT => Self::Unavailable,
            FETCH_FAILED_TEXT => Self::FetchFailed,
            _ => Self::Known(text),
        }
    }
}

impl From<VariantPrice> for String {
    fn from(price: VariantPrice) -> Self {
        match price {
            VariantPrice::Known(text) => text,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for VariantPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered mapping from dimension name (e.g. `"Color"`) to display value.
///
/// Order is the dimension-declaration order of the source data and survives
/// serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dimensions(Vec<(String, String)>);

impl Dimensions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`. An existing entry keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Display values joined with `" / "` in dimension order.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.values().collect::<Vec<_>>().join(" / ")
    }
}

impl FromIterator<(String, String)> for Dimensions {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut dims = Self::new();
        for (name, value) in iter {
            dims.insert(name, value);
        }
        dims
    }
}

impl Serialize for Dimensions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Dimensions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DimensionsVisitor;

        impl<'de> Visitor<'de> for DimensionsVisitor {
            type Value = Dimensions;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of dimension names to display values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Dimensions, A::Error> {
                let mut dims = Dimensions::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    dims.insert(name, value);
                }
                Ok(dims)
            }
        }

        deserializer.deserialize_map(DimensionsVisitor)
    }
}

/// One purchasable SKU discovered on a product page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Dimension display values joined with `" / "`, e.g. `"Red / Large"`.
    pub name: String,
    /// The site's product identifier for this SKU.
    pub asin: String,
    pub price: VariantPrice,
    /// `{origin}/dp/{asin}`.
    pub url: String,
    #[serde(default)]
    pub dimensions: Dimensions,
}

impl Variant {
    /// Builds a variant whose name is derived from `dimensions` and whose URL
    /// is `{base_url}/dp/{asin}`. The price starts as
    /// [`VariantPrice::RequiresFetch`].
    #[must_use]
    pub fn new(asin: impl Into<String>, dimensions: Dimensions, base_url: &str) -> Self {
        let asin = asin.into();
        Self {
            name: dimensions.display_name(),
            url: format!("{}/dp/{asin}", base_url.trim_end_matches('/')),
            asin,
            price: VariantPrice::RequiresFetch,
            dimensions,
        }
    }
}

/// Outcome of one extraction attempt against one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapingResult {
    pub success: bool,
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// Price of the base document; `"N/A"` when none was found.
    #[serde(default = "not_available")]
    pub parent_price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<String>,
    /// Name of the strategy that produced `variants`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    /// Identifier of the product the document itself describes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_asin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_at: Option<DateTime<Utc>>,
}

impl ScrapingResult {
    /// Number of variants still waiting for a backfill fetch.
    #[must_use]
    pub fn pending_price_count(&self) -> usize {
        self.variants.iter().filter(|v| v.price.is_pending()).count()
    }

    /// Dimension names in display order, taken from the first variant.
    #[must_use]
    pub fn dimension_keys(&self) -> Vec<&str> {
        self.variants
            .first()
            .map(|v| v.dimensions.keys().collect())
            .unwrap_or_default()
    }
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}
