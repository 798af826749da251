//! HTTP client for product and variant pages.

mod origin;
mod user_agent;

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{self, HeaderMap};
use reqwest::{Client, StatusCode};
use vscout_core::{AppConfig, ScrapingResult};

use crate::backfill::{PageBody, PageFetcher};
use crate::error::ScraperError;
use crate::extract::Extractor;
use crate::rate_limit::retry_with_backoff;

pub use origin::extract_origin;
pub use user_agent::pick_user_agent;

#[cfg(test)]
use origin::extract_domain;

/// Relayed HTML shorter than this is an error page from the relay itself.
pub(crate) const MIN_RELAYED_HTML_BYTES: usize = 500;

/// Characters left unescaped when a target URL is appended to a relay
/// prefix; matches `encodeURIComponent`.
const RELAY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Fetches product pages with browser-like headers, a rotating user-agent,
/// an optional relay prefix and retry on transient errors.
///
/// A `503` is treated as a usable page since the site often serves full
/// product HTML with it. JSON responses are read as a pre-parsed
/// [`ScrapingResult`].
pub struct VariantClient {
    client: Client,
    user_agents: Vec<String>,
    relay_url: Option<String>,
    timeout_secs: u64,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl VariantClient {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agents: Vec<String>,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            user_agents,
            relay_url: None,
            timeout_secs,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Client configured from [`AppConfig`], relay included.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, ScraperError> {
        let client = Self::new(
            config.fetch_timeout_secs,
            config.user_agents.clone(),
            config.max_retries,
            config.retry_backoff_base_secs,
        )?;
        Ok(client.with_relay(config.relay_url.clone()))
    }

    /// Route every fetch through `relay`: the request goes to
    /// `relay + percent-encoded target`.
    #[must_use]
    pub fn with_relay(mut self, relay: Option<String>) -> Self {
        self.relay_url = relay;
        self
    }

    /// Fetch `url`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidTargetUrl`]: `url` is not an absolute http(s) URL.
    /// - [`ScraperError::RateLimited`], [`ScraperError::NotFound`],
    ///   [`ScraperError::UnexpectedStatus`]: non-2xx status other than 503.
    /// - [`ScraperError::Timeout`], [`ScraperError::Http`]: transport failure.
    /// - [`ScraperError::RelayFailed`]: the relay reported an error or returned
    ///   a stub page.
    /// - [`ScraperError::Deserialize`]: a JSON body is not a `ScrapingResult`.
    pub async fn fetch(&self, url: &str) -> Result<PageBody, ScraperError> {
        let referer = extract_origin(url).ok_or_else(|| ScraperError::InvalidTargetUrl {
            url: url.to_owned(),
            reason: "expected an absolute http:// or https:// URL".to_owned(),
        })?;
        let request_url = self.request_url(url);
        let via_relay = self.relay_url.is_some();

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let request_url = request_url.clone();
            let referer = referer.clone();
            async move {
                self.fetch_once(url, &request_url, &referer, via_relay)
                    .await
            }
        })
        .await
    }

    /// Fetch `url` and extract variants from it. A relay that already ran
    /// extraction has its result passed through unchanged.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`VariantClient::fetch`].
    pub async fn scrape(
        &self,
        url: &str,
        extractor: &Extractor,
    ) -> Result<ScrapingResult, ScraperError> {
        match self.fetch(url).await? {
            PageBody::Html(html) => Ok(extractor.extract(&html, Some(url))),
            PageBody::Result(result) => Ok(*result),
        }
    }

    async fn fetch_once(
        &self,
        target: &str,
        request_url: &str,
        referer: &str,
        via_relay: bool,
    ) -> Result<PageBody, ScraperError> {
        let user_agent = pick_user_agent(&self.user_agents, &mut rand::rng()).to_owned();

        let response = self
            .client
            .get(request_url)
            .headers(browser_headers())
            .header(header::USER_AGENT, user_agent)
            .header(header::REFERER, referer)
            .send()
            .await
            .map_err(|e| self.transport_error(target, e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ScraperError::RateLimited {
                domain: origin::extract_domain(target),
                retry_after_secs,
            });
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ScraperError::NotFound {
                url: target.to_owned(),
            });
        }
        if !status.is_success() && status != StatusCode::SERVICE_UNAVAILABLE {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: target.to_owned(),
            });
        }
        if status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::debug!(url = target, "503 response, reading body anyway");
        }

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(target, e))?;

        if is_json {
            return parse_result_body(target, &body).map(|r| PageBody::Result(Box::new(r)));
        }

        if via_relay && body.len() < MIN_RELAYED_HTML_BYTES {
            return Err(ScraperError::RelayFailed {
                url: target.to_owned(),
                reason: format!("relay returned only {} bytes of HTML", body.len()),
            });
        }

        Ok(PageBody::Html(body))
    }

    fn request_url(&self, target: &str) -> String {
        match &self.relay_url {
            Some(relay) => format!("{relay}{}", utf8_percent_encode(target, RELAY_COMPONENT)),
            None => target.to_owned(),
        }
    }

    fn transport_error(&self, url: &str, err: reqwest::Error) -> ScraperError {
        if err.is_timeout() {
            ScraperError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            ScraperError::Http(err)
        }
    }
}

impl PageFetcher for VariantClient {
    async fn fetch_page(&self, url: &str) -> Result<PageBody, ScraperError> {
        self.fetch(url).await
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, header::HeaderValue::from_static("no-cache"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        header::HeaderValue::from_static("1"),
    );
    headers
}

/// Read a JSON body as a `ScrapingResult`. A body carrying an `"error"`
/// field is the relay reporting failure.
fn parse_result_body(url: &str, body: &str) -> Result<ScrapingResult, ScraperError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ScraperError::Deserialize {
            context: format!("JSON response for {url}"),
            source: e,
        })?;

    if let Some(error) = value.get("error") {
        let reason = error
            .as_str()
            .map_or_else(|| error.to_string(), str::to_owned);
        return Err(ScraperError::RelayFailed {
            url: url.to_owned(),
            reason,
        });
    }

    serde_json::from_value(value).map_err(|e| ScraperError::Deserialize {
        context: format!("scraping result for {url}"),
        source: e,
    })
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
