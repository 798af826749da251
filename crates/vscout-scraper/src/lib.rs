pub mod backfill;
pub mod client;
pub mod error;
pub mod extract;
pub mod locate;
pub mod page;
pub mod price;
pub(crate) mod rate_limit;
pub mod strategy;

pub use backfill::{
    backfill, BackfillMode, BackfillOptions, BackfillProgress, BackfillReport, PageBody,
    PageFetcher, RunCounter, RunToken,
};
pub use client::{extract_origin, pick_user_agent, VariantClient};
pub use error::ScraperError;
pub use extract::{extract, Extractor, DEFAULT_ORIGIN};
pub use price::{extract_price, parse_price_value};
pub use strategy::{RawVariant, VariantStrategy};
