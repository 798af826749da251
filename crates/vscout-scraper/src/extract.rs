//! Extraction orchestrator: page facts once, then strategies in order.

use chrono::Utc;
use vscout_core::{ScrapingResult, Variant, VariantPrice, NOT_AVAILABLE};

use crate::page::{current_asin, product_title, resolve_base_url};
use crate::price::extract_price;
use crate::strategy::{default_strategies, VariantStrategy};

pub const DEFAULT_ORIGIN: &str = "https://www.amazon.com";

const NO_VARIANTS_MESSAGE: &str = "Could not find variant map (checked 'dimensionValuesDisplayData' and 'desktop-twister-sort-filter-data'). This might be a single item page.";

/// Runs an ordered list of [`VariantStrategy`]s against one document.
pub struct Extractor {
    strategies: Vec<Box<dyn VariantStrategy>>,
    default_origin: String,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DEFAULT_ORIGIN)
    }
}

impl Extractor {
    /// Extractor with the default strategy order.
    #[must_use]
    pub fn new(default_origin: &str) -> Self {
        Self::with_strategies(default_strategies(), default_origin)
    }

    #[must_use]
    pub fn with_strategies(strategies: Vec<Box<dyn VariantStrategy>>, default_origin: &str) -> Self {
        Self {
            strategies,
            default_origin: default_origin.trim_end_matches('/').to_string(),
        }
    }

    /// Extract variants from `html`. Never fails: when no strategy applies
    /// the result has `success == false` and an explanatory message.
    ///
    /// `context_url` is the address the document came from, used for variant
    /// URLs when the page carries no canonical link.
    #[must_use]
    pub fn extract(&self, html: &str, context_url: Option<&str>) -> ScrapingResult {
        let parent_price = extract_price(html);
        let current = current_asin(html);
        let title = product_title(html);
        let base_url = resolve_base_url(html, context_url, &self.default_origin);

        let mut result = ScrapingResult {
            success: false,
            variants: Vec::new(),
            parent_price,
            message: None,
            debug_info: None,
            strategy: None,
            current_asin: current,
            title,
            extracted_at: Some(Utc::now()),
        };

        for strategy in &self.strategies {
            let Some(raw) = strategy.try_parse(html) else {
                tracing::debug!(strategy = strategy.name(), "strategy not applicable");
                continue;
            };

            result.variants = raw
                .into_iter()
                .map(|r| {
                    let mut variant = Variant::new(r.asin, r.dimensions, &base_url);
                    if result.current_asin.as_deref() == Some(variant.asin.as_str())
                        && result.parent_price != NOT_AVAILABLE
                    {
                        variant.price = VariantPrice::Known(result.parent_price.clone());
                    }
                    variant
                })
                .collect();

            let mut message = format!(
                "Found {} variants ({}).",
                result.variants.len(),
                strategy.label()
            );
            if let Some(note) = strategy.note() {
                message.push_str(" Note: ");
                message.push_str(note);
            }

            tracing::debug!(
                strategy = strategy.name(),
                variants = result.variants.len(),
                "strategy matched"
            );
            result.success = true;
            result.strategy = Some(strategy.name().to_string());
            result.message = Some(message);
            return result;
        }

        result.message = Some(NO_VARIANTS_MESSAGE.to_string());
        result
    }
}

/// Extract with the default strategies and origin.
#[must_use]
pub fn extract(html: &str, context_url: Option<&str>) -> ScrapingResult {
    Extractor::default().extract(html, context_url)
}
