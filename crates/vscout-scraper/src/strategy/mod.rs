//! Variant-data strategies, tried in priority order by the extractor.
//!
//! Each strategy recognises one embedded data shape and normalises it into
//! [`RawVariant`]s. A strategy that cannot find or parse its shape returns
//! `None` and the next one is tried; results are never merged.

mod classic;
mod twister;

pub use classic::ClassicStrategy;
pub use twister::TwisterStrategy;

use vscout_core::Dimensions;

/// Identifier plus ordered dimension values, before URL and price are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVariant {
    pub asin: String,
    pub dimensions: Dimensions,
}

/// One method of locating and normalising embedded variant data.
pub trait VariantStrategy: Send + Sync {
    /// Short stable name, reported as `ScrapingResult::strategy`.
    fn name(&self) -> &'static str;

    /// Human-readable label used in the success message.
    fn label(&self) -> &'static str;

    /// Extra note appended to the success message.
    fn note(&self) -> Option<&'static str> {
        None
    }

    /// Returns the variants found in `html`, or `None` when this strategy
    /// does not apply or yields zero variants.
    fn try_parse(&self, html: &str) -> Option<Vec<RawVariant>>;
}

/// The default strategy order: classic, then twister.
#[must_use]
pub fn default_strategies() -> Vec<Box<dyn VariantStrategy>> {
    vec![Box::new(ClassicStrategy), Box::new(TwisterStrategy)]
}
