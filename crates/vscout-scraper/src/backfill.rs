//! Price backfill: fetch each pending variant's own page and read its price.
//!
//! Two modes share one engine. Concurrent mode fans out up to a limit and
//! waits for every fetch; sequential mode visits one page at a time with a
//! fixed pause and reports progress after each. Both honour a [`RunToken`]:
//! once the owning [`RunCounter`] moves on, late results are discarded.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use vscout_core::{AppConfig, ScrapingResult, Variant, VariantPrice};

use crate::error::ScraperError;
use crate::price::extract_price;

pub const DEFAULT_MAX_COUNT: usize = 48;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Body of a fetched variant page.
#[derive(Debug, Clone)]
pub enum PageBody {
    Html(String),
    /// A relay that already ran extraction returned its result.
    Result(Box<ScrapingResult>),
}

/// Source of variant pages for the backfill engine.
pub trait PageFetcher: Send + Sync {
    fn fetch_page(&self, url: &str)
        -> impl Future<Output = Result<PageBody, ScraperError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillMode {
    /// At most `limit` fetches in flight; `0` means all at once.
    Concurrent { limit: usize },
    /// One fetch at a time with `delay` between items.
    Sequential { delay: Duration },
}

#[derive(Debug, Clone)]
pub struct BackfillOptions {
    pub max_count: usize,
    pub timeout: Duration,
    pub mode: BackfillMode,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            max_count: DEFAULT_MAX_COUNT,
            timeout: DEFAULT_TIMEOUT,
            mode: BackfillMode::Concurrent { limit: 0 },
        }
    }
}

impl BackfillOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig, sequential: bool) -> Self {
        let mode = if sequential {
            BackfillMode::Sequential {
                delay: Duration::from_millis(config.backfill_delay_ms),
            }
        } else {
            BackfillMode::Concurrent {
                limit: config.backfill_concurrency,
            }
        };
        Self {
            max_count: config.backfill_max_count,
            timeout: Duration::from_secs(config.backfill_timeout_secs),
            mode,
        }
    }
}

/// Monotonic run counter. Each [`RunCounter::begin`] hands out a token that
/// stays current until the next `begin` or [`RunCounter::invalidate`].
///
/// The counter is a `watch` channel so a running backfill wakes as soon as
/// its token goes stale instead of waiting for in-flight fetches.
#[derive(Debug, Clone)]
pub struct RunCounter(Arc<watch::Sender<u64>>);

impl Default for RunCounter {
    fn default() -> Self {
        Self(Arc::new(watch::Sender::new(0)))
    }
}

impl RunCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn begin(&self) -> RunToken {
        let mut id = 0;
        self.0.send_modify(|run| {
            *run += 1;
            id = *run;
        });
        RunToken {
            run: self.0.subscribe(),
            id,
        }
    }

    /// Makes every outstanding token stale.
    pub fn invalidate(&self) {
        self.0.send_modify(|run| *run += 1);
    }
}

#[derive(Debug, Clone)]
pub struct RunToken {
    run: watch::Receiver<u64>,
    id: u64,
}

impl RunToken {
    #[must_use]
    pub fn is_current(&self) -> bool {
        *self.run.borrow() == self.id
    }

    /// Resolves once the token is no longer current. Never resolves if the
    /// counter is dropped while the token is still current.
    pub async fn stale(&self) {
        let mut run = self.run.clone();
        let id = self.id;
        let closed = run.wait_for(|current| *current != id).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Emitted after each variant's price is written.
#[derive(Debug, Clone)]
pub struct BackfillProgress {
    pub completed: usize,
    pub total: usize,
    pub index: usize,
    pub asin: String,
    pub price: VariantPrice,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Variants selected for fetching.
    pub attempted: usize,
    pub resolved: usize,
    pub unavailable: usize,
    pub failed: usize,
    /// The run token went stale before every selected variant was written.
    pub cancelled: bool,
}

impl BackfillReport {
    fn record(&mut self, price: &VariantPrice) {
        match price {
            VariantPrice::Known(_) => self.resolved += 1,
            VariantPrice::Unavailable => self.unavailable += 1,
            VariantPrice::FetchFailed | VariantPrice::RequiresFetch => self.failed += 1,
        }
    }
}

/// Fill in prices for variants still marked [`VariantPrice::RequiresFetch`].
///
/// At most `options.max_count` variants are fetched, in list order. Each
/// fetch has its own timeout; a failure or timeout marks only that variant
/// [`VariantPrice::FetchFailed`]. Only the `price` field of selected variants
/// is written, and only while `token` is current. When the token goes stale
/// the call returns at once and fetches still in flight are dropped.
pub async fn backfill<F, P>(
    variants: &mut [Variant],
    fetcher: &F,
    options: &BackfillOptions,
    token: &RunToken,
    mut on_progress: P,
) -> BackfillReport
where
    F: PageFetcher,
    P: FnMut(&BackfillProgress),
{
    let targets: Vec<(usize, String)> = variants
        .iter()
        .enumerate()
        .filter(|(_, v)| v.price.is_pending())
        .take(options.max_count)
        .map(|(i, v)| (i, v.url.clone()))
        .collect();

    let total = targets.len();
    let mut report = BackfillReport {
        attempted: total,
        ..BackfillReport::default()
    };
    if total == 0 {
        return report;
    }

    let timeout = options.timeout;
    let mut completed = 0usize;
    let mut apply = |idx: usize, price: VariantPrice, report: &mut BackfillReport| {
        completed += 1;
        report.record(&price);
        let variant = &mut variants[idx];
        variant.price = price;
        on_progress(&BackfillProgress {
            completed,
            total,
            index: idx,
            asin: variant.asin.clone(),
            price: variant.price.clone(),
        });
    };

    match options.mode {
        BackfillMode::Concurrent { limit } => {
            let limit = if limit == 0 { total } else { limit };
            let mut results = stream::iter(targets)
                .map(|(idx, url)| async move { (idx, fetch_price(fetcher, &url, timeout).await) })
                .buffer_unordered(limit);
            let stale = token.stale();
            tokio::pin!(stale);

            loop {
                tokio::select! {
                    biased;
                    () = &mut stale => {
                        report.cancelled = true;
                        break;
                    }
                    next = results.next() => {
                        let Some((idx, price)) = next else { break };
                        if !token.is_current() {
                            report.cancelled = true;
                            break;
                        }
                        apply(idx, price, &mut report);
                    }
                }
            }
        }
        BackfillMode::Sequential { delay } => {
            for (n, (idx, url)) in targets.into_iter().enumerate() {
                if n > 0 && !delay.is_zero() {
                    tokio::select! {
                        biased;
                        () = token.stale() => {
                            report.cancelled = true;
                            break;
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                if !token.is_current() {
                    report.cancelled = true;
                    break;
                }
                let price = tokio::select! {
                    biased;
                    () = token.stale() => {
                        report.cancelled = true;
                        break;
                    }
                    price = fetch_price(fetcher, &url, timeout) => price,
                };
                if !token.is_current() {
                    report.cancelled = true;
                    break;
                }
                apply(idx, price, &mut report);
            }
        }
    }

    tracing::info!(
        attempted = report.attempted,
        resolved = report.resolved,
        unavailable = report.unavailable,
        failed = report.failed,
        cancelled = report.cancelled,
        "price backfill finished"
    );
    report
}

async fn fetch_price<F: PageFetcher>(fetcher: &F, url: &str, timeout: Duration) -> VariantPrice {
    match tokio::time::timeout(timeout, fetcher.fetch_page(url)).await {
        Ok(Ok(PageBody::Html(html))) => VariantPrice::from_extracted(&extract_price(&html)),
        Ok(Ok(PageBody::Result(result))) => VariantPrice::from_extracted(&result.parent_price),
        Ok(Err(e)) => {
            tracing::warn!(url, error = %e, "variant page fetch failed");
            VariantPrice::FetchFailed
        }
        Err(_) => {
            tracing::warn!(url, timeout_secs = timeout.as_secs_f64(), "variant page fetch timed out");
            VariantPrice::FetchFailed
        }
    }
}

#[cfg(test)]
#[path = "backfill_test.rs"]
mod tests;
