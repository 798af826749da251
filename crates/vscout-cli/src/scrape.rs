//! `extract` and `scrape` command handlers.

use std::path::Path;

use anyhow::Context;
use clap::{Args, ValueEnum};
use vscout_core::{AppConfig, ScrapingResult, Variant};
use vscout_scraper::{
    backfill, parse_price_value, BackfillOptions, BackfillProgress, Extractor, RunCounter,
    VariantClient,
};

/// Backfill tuning shared by both commands.
#[derive(Debug, Clone, Args)]
pub(crate) struct BackfillArgs {
    /// Visit variant pages one at a time with a pause between them
    #[arg(long)]
    pub sequential: bool,

    /// Fetch at most N variant pages (default from VSCOUT_BACKFILL_MAX_COUNT)
    #[arg(long, value_name = "N")]
    pub max_fetch: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SortKey {
    Name,
    Asin,
    /// Ascending by numeric price; sentinel prices last
    Price,
}

pub(crate) async fn run_extract(
    config: &AppConfig,
    file: &Path,
    url: Option<&str>,
    backfill: Option<&BackfillArgs>,
) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let extractor = Extractor::new(&config.default_origin);
    let mut result = extractor.extract(&html, url);
    tracing::info!(
        file = %file.display(),
        success = result.success,
        variants = result.variants.len(),
        dimensions = ?result.dimension_keys(),
        "extraction finished"
    );

    if let Some(args) = backfill {
        let client = VariantClient::from_config(config)?;
        run_backfill(config, &client, &mut result.variants, args).await;
    }

    print_result(&result)
}

pub(crate) async fn run_scrape(
    config: &AppConfig,
    url: &str,
    backfill: Option<&BackfillArgs>,
    sort: Option<SortKey>,
) -> anyhow::Result<()> {
    let client = VariantClient::from_config(config)?;
    let extractor = Extractor::new(&config.default_origin);

    let mut result = client
        .scrape(url, &extractor)
        .await
        .with_context(|| format!("failed to fetch {url}"))?;
    tracing::info!(
        url,
        success = result.success,
        variants = result.variants.len(),
        strategy = result.strategy.as_deref().unwrap_or("none"),
        dimensions = ?result.dimension_keys(),
        "extraction finished"
    );

    if let Some(args) = backfill {
        run_backfill(config, &client, &mut result.variants, args).await;
    }
    if let Some(key) = sort {
        sort_variants(&mut result.variants, key);
    }

    print_result(&result)
}

async fn run_backfill(
    config: &AppConfig,
    client: &VariantClient,
    variants: &mut [Variant],
    args: &BackfillArgs,
) {
    let mut options = BackfillOptions::from_config(config, args.sequential);
    if let Some(max) = args.max_fetch {
        options.max_count = max;
    }

    let counter = RunCounter::new();
    let token = counter.begin();

    // Ctrl-C stops the run; prices already written are kept.
    let interrupt = tokio::spawn({
        let counter = counter.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("interrupted, stopping backfill");
                counter.invalidate();
            }
        }
    });

    let verbose = args.sequential;
    let report = backfill(variants, client, &options, &token, |p: &BackfillProgress| {
        if verbose {
            eprintln!("[{}/{}] {} -> {}", p.completed, p.total, p.asin, p.price);
        }
    })
    .await;
    interrupt.abort();

    if report.cancelled {
        tracing::warn!(
            written = report.resolved + report.unavailable + report.failed,
            attempted = report.attempted,
            "backfill cancelled"
        );
    }
}

/// Sort variants in place. Sorting is stable; by price, variants without a
/// numeric price keep their relative order after all priced ones.
pub(crate) fn sort_variants(variants: &mut [Variant], key: SortKey) {
    match key {
        SortKey::Name => variants.sort_by(|a, b| a.name.cmp(&b.name)),
        SortKey::Asin => variants.sort_by(|a, b| a.asin.cmp(&b.asin)),
        SortKey::Price => variants.sort_by(|a, b| {
            let pa = parse_price_value(a.price.as_str());
            let pb = parse_price_value(b.price.as_str());
            match (pa, pb) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        }),
    }
}

fn print_result(result: &ScrapingResult) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use vscout_core::{Dimensions, VariantPrice};

    use super::*;

    fn variant(asin: &str, name: &str, price: VariantPrice) -> Variant {
        let mut dims = Dimensions::new();
        dims.insert("Style", name);
        let mut v = Variant::new(asin, dims, "https://www.amazon.com");
        v.price = price;
        v
    }

    fn known(p: &str) -> VariantPrice {
        VariantPrice::Known(p.to_string())
    }

    #[test]
    fn price_sort_puts_sentinels_last() {
        let mut variants = vec![
            variant("A1", "a", VariantPrice::FetchFailed),
            variant("A2", "b", known("$1,200.00")),
            variant("A3", "c", VariantPrice::RequiresFetch),
            variant("A4", "d", known("$9.99")),
            variant("A5", "e", VariantPrice::Unavailable),
        ];
        sort_variants(&mut variants, SortKey::Price);
        let order: Vec<_> = variants.iter().map(|v| v.asin.as_str()).collect();
        assert_eq!(order, vec!["A4", "A2", "A1", "A3", "A5"]);
    }

    #[test]
    fn name_and_asin_sorts() {
        let mut variants = vec![
            variant("B2", "Red", known("$1")),
            variant("A9", "Blue", known("$1")),
        ];
        sort_variants(&mut variants, SortKey::Name);
        assert_eq!(variants[0].name, "Blue");
        sort_variants(&mut variants, SortKey::Asin);
        assert_eq!(variants[0].asin, "A9");
    }
}
