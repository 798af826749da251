use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use vscout_core::Dimensions;

use super::*;

fn pending_variants(n: usize) -> Vec<Variant> {
    (0..n)
        .map(|i| {
            let mut dims = Dimensions::new();
            dims.insert("Size", format!("S{i}"));
            Variant::new(format!("A{i}"), dims, "https://shop.test")
        })
        .collect()
}

/// Serves `$<n>.00` for every URL except those listed as failing or empty.
#[derive(Default)]
struct MockFetcher {
    calls: AtomicUsize,
    fail: HashSet<String>,
    no_price: HashSet<String>,
    hang: HashSet<String>,
    /// Invalidate this counter when the n-th call (1-based) is made.
    cancel_on: Option<(usize, RunCounter)>,
}

impl PageFetcher for MockFetcher {
    async fn fetch_page(&self, url: &str) -> Result<PageBody, ScraperError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, counter)) = &self.cancel_on {
            if *at == n {
                counter.invalidate();
            }
        }
        if self.hang.contains(url) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.fail.contains(url) {
            return Err(ScraperError::UnexpectedStatus {
                status: 500,
                url: url.to_string(),
            });
        }
        if self.no_price.contains(url) {
            return Ok(PageBody::Html("<html>out of stock</html>".to_string()));
        }
        let asin = url.rsplit('/').next().unwrap_or_default();
        Ok(PageBody::Html(format!(
            r#"<span class="a-offscreen">${}.00</span>"#,
            &asin[1..]
        )))
    }
}

fn concurrent(limit: usize) -> BackfillOptions {
    BackfillOptions {
        mode: BackfillMode::Concurrent { limit },
        ..BackfillOptions::default()
    }
}

#[tokio::test]
async fn fetches_at_most_max_count() {
    let mut variants = pending_variants(100);
    let fetcher = MockFetcher::default();
    let token = RunCounter::new().begin();

    let report = backfill(&mut variants, &fetcher, &concurrent(0), &token, |_| {}).await;

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 48);
    assert_eq!(report.attempted, 48);
    assert_eq!(report.resolved, 48);
    assert!(variants[..48].iter().all(|v| !v.price.is_pending()));
    assert_eq!(
        variants[48..].iter().filter(|v| v.price.is_pending()).count(),
        52
    );
    assert_eq!(variants[3].price, VariantPrice::Known("$3.00".to_string()));
}

#[tokio::test]
async fn one_failure_does_not_affect_the_others() {
    let mut variants = pending_variants(10);
    let fetcher = MockFetcher {
        fail: HashSet::from(["https://shop.test/dp/A6".to_string()]),
        ..MockFetcher::default()
    };
    let token = RunCounter::new().begin();

    let report = backfill(&mut variants, &fetcher, &concurrent(3), &token, |_| {}).await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.resolved, 9);
    assert_eq!(variants[6].price, VariantPrice::FetchFailed);
    for (i, v) in variants.iter().enumerate().filter(|(i, _)| *i != 6) {
        assert_eq!(v.price, VariantPrice::Known(format!("${i}.00")));
    }
}

#[tokio::test]
async fn page_without_price_is_unavailable() {
    let mut variants = pending_variants(2);
    let fetcher = MockFetcher {
        no_price: HashSet::from(["https://shop.test/dp/A1".to_string()]),
        ..MockFetcher::default()
    };
    let token = RunCounter::new().begin();

    let report = backfill(&mut variants, &fetcher, &concurrent(0), &token, |_| {}).await;

    assert_eq!(report.unavailable, 1);
    assert_eq!(variants[1].price, VariantPrice::Unavailable);
}

#[tokio::test]
async fn timeout_marks_fetch_failed() {
    let mut variants = pending_variants(3);
    let fetcher = MockFetcher {
        hang: HashSet::from(["https://shop.test/dp/A0".to_string()]),
        ..MockFetcher::default()
    };
    let options = BackfillOptions {
        timeout: Duration::from_millis(50),
        ..concurrent(0)
    };
    let token = RunCounter::new().begin();

    let report = backfill(&mut variants, &fetcher, &options, &token, |_| {}).await;

    assert_eq!(variants[0].price, VariantPrice::FetchFailed);
    assert_eq!(report.failed, 1);
    assert_eq!(report.resolved, 2);
}

#[tokio::test]
async fn already_priced_variants_are_skipped() {
    let mut variants = pending_variants(3);
    variants[0].price = VariantPrice::Known("$99.00".to_string());
    variants[2].price = VariantPrice::Unavailable;
    let fetcher = MockFetcher::default();
    let token = RunCounter::new().begin();

    let report = backfill(&mut variants, &fetcher, &concurrent(0), &token, |_| {}).await;

    assert_eq!(report.attempted, 1);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(variants[0].price, VariantPrice::Known("$99.00".to_string()));
    assert_eq!(variants[1].price, VariantPrice::Known("$1.00".to_string()));
}

#[tokio::test]
async fn json_result_body_uses_parent_price() {
    struct RelayFetcher;

    impl PageFetcher for RelayFetcher {
        async fn fetch_page(&self, _url: &str) -> Result<PageBody, ScraperError> {
            let result: ScrapingResult =
                serde_json::from_str(r#"{"success": false, "parentPrice": "£5.25"}"#).unwrap();
            Ok(PageBody::Result(Box::new(result)))
        }
    }

    let mut variants = pending_variants(1);
    let token = RunCounter::new().begin();
    backfill(&mut variants, &RelayFetcher, &concurrent(0), &token, |_| {}).await;
    assert_eq!(variants[0].price, VariantPrice::Known("£5.25".to_string()));
}

#[tokio::test]
async fn sequential_reports_progress_in_order() {
    let mut variants = pending_variants(4);
    let fetcher = MockFetcher::default();
    let options = BackfillOptions {
        mode: BackfillMode::Sequential {
            delay: Duration::from_millis(1),
        },
        ..BackfillOptions::default()
    };
    let token = RunCounter::new().begin();
    let seen = Mutex::new(Vec::new());

    let report = backfill(&mut variants, &fetcher, &options, &token, |p| {
        seen.lock().unwrap().push((p.completed, p.total, p.index));
    })
    .await;

    assert!(!report.cancelled);
    assert_eq!(
        seen.into_inner().unwrap(),
        vec![(1, 4, 0), (2, 4, 1), (3, 4, 2), (4, 4, 3)]
    );
}

#[tokio::test]
async fn invalidated_run_discards_late_results() {
    let counter = RunCounter::new();
    let token = counter.begin();
    let mut variants = pending_variants(6);
    let fetcher = MockFetcher {
        cancel_on: Some((3, counter.clone())),
        ..MockFetcher::default()
    };
    let options = BackfillOptions {
        mode: BackfillMode::Sequential {
            delay: Duration::ZERO,
        },
        ..BackfillOptions::default()
    };

    let report = backfill(&mut variants, &fetcher, &options, &token, |_| {}).await;

    assert!(report.cancelled);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.resolved, 2);
    assert!(!variants[0].price.is_pending());
    assert!(!variants[1].price.is_pending());
    assert!(variants[2..].iter().all(|v| v.price.is_pending()));
}

fn all_hanging(n: usize) -> MockFetcher {
    MockFetcher {
        hang: (0..n).map(|i| format!("https://shop.test/dp/A{i}")).collect(),
        ..MockFetcher::default()
    }
}

#[tokio::test]
async fn concurrent_run_stops_while_fetches_are_in_flight() {
    let counter = RunCounter::new();
    let token = counter.begin();
    let mut variants = pending_variants(3);
    let fetcher = all_hanging(3);
    let options = BackfillOptions {
        timeout: Duration::from_secs(10),
        ..concurrent(0)
    };

    let canceller = tokio::spawn({
        let counter = counter.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            counter.invalidate();
        }
    });

    let started = tokio::time::Instant::now();
    let report = backfill(&mut variants, &fetcher, &options, &token, |_| {}).await;
    canceller.await.unwrap();

    assert!(report.cancelled);
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "backfill kept running for {:?} after invalidate",
        started.elapsed()
    );
    assert_eq!(report.resolved + report.unavailable + report.failed, 0);
    assert!(variants.iter().all(|v| v.price.is_pending()));
}

#[tokio::test]
async fn sequential_run_stops_during_a_hanging_fetch() {
    let counter = RunCounter::new();
    let token = counter.begin();
    let mut variants = pending_variants(2);
    let fetcher = all_hanging(2);
    let options = BackfillOptions {
        timeout: Duration::from_secs(10),
        mode: BackfillMode::Sequential {
            delay: Duration::ZERO,
        },
        ..BackfillOptions::default()
    };

    let canceller = tokio::spawn({
        let counter = counter.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            counter.invalidate();
        }
    });

    let started = tokio::time::Instant::now();
    let report = backfill(&mut variants, &fetcher, &options, &token, |_| {}).await;
    canceller.await.unwrap();

    assert!(report.cancelled);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert!(variants.iter().all(|v| v.price.is_pending()));
}

#[tokio::test]
async fn token_stays_current_after_counter_is_dropped() {
    let token = RunCounter::new().begin();
    assert!(token.is_current());

    let mut variants = pending_variants(2);
    let report = backfill(
        &mut variants,
        &MockFetcher::default(),
        &concurrent(0),
        &token,
        |_| {},
    )
    .await;

    assert!(!report.cancelled);
    assert_eq!(report.resolved, 2);
}

#[test]
fn begin_supersedes_previous_token() {
    let counter = RunCounter::new();
    let first = counter.begin();
    assert!(first.is_current());
    let second = counter.begin();
    assert!(!first.is_current());
    assert!(second.is_current());
    counter.invalidate();
    assert!(!second.is_current());
}
