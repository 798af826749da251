use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid target URL \"{url}\": {reason}")]
    InvalidTargetUrl { url: String, reason: String },

    #[error("relay could not deliver {url}: {reason}")]
    RelayFailed { url: String, reason: String },

    #[error("request for {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },
}
