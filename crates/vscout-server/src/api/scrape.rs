//! Fetch-and-extract endpoints.

use axum::{
    body::Bytes,
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use vscout_core::ScrapingResult;
use vscout_scraper::{backfill, RunCounter, ScraperError};

use crate::middleware::RequestId;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct ScrapeQuery {
    pub url: Option<String>,
}

/// `GET /api/scrape?url=…`: fetch the page, extract variants and backfill
/// missing prices concurrently before responding.
pub(super) async fn scrape(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ScrapeQuery>,
) -> Result<Json<ScrapingResult>, ApiError> {
    let Some(url) = query
        .url
        .map(|u| u.trim().to_owned())
        .filter(|u| !u.is_empty())
    else {
        return Err(ApiError::new(req_id.0, "bad_request", "URL parameter is required"));
    };

    let mut result = state
        .client
        .scrape(&url, &state.extractor)
        .await
        .map_err(|e| map_scraper_error(&req_id.0, &url, &e))?;

    if result.success && result.pending_price_count() > 0 {
        let token = RunCounter::new().begin();
        let report = backfill(
            &mut result.variants,
            state.client.as_ref(),
            &state.backfill,
            &token,
            |_| {},
        )
        .await;
        tracing::debug!(url = %url, attempted = report.attempted, "backfill complete");
    }

    if result.debug_info.is_none() {
        result.debug_info = Some(format!(
            "vscout-server {} request {}",
            env!("CARGO_PKG_VERSION"),
            req_id.0
        ));
    }
    Ok(Json(result))
}

/// `POST /api/extract?url=…` with the page HTML as the body: extraction only.
/// Bytes that are not valid UTF-8 are replaced rather than rejected.
pub(super) async fn extract(
    State(state): State<AppState>,
    Query(query): Query<ScrapeQuery>,
    body: Bytes,
) -> Json<ScrapingResult> {
    let html = String::from_utf8_lossy(&body);
    let context = query.url.as_deref().filter(|u| !u.trim().is_empty());
    Json(state.extractor.extract(&html, context))
}

fn map_scraper_error(request_id: &str, url: &str, error: &ScraperError) -> ApiError {
    if let ScraperError::InvalidTargetUrl { .. } = error {
        return ApiError::new(request_id, "bad_request", error.to_string());
    }
    tracing::warn!(url, error = %error, "upstream fetch failed");
    ApiError::new(request_id, "upstream_error", error.to_string())
}
