use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl Environment {
    /// Colored log output in development only.
    #[must_use]
    pub fn ansi_logs(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Origin used for variant URLs when the page has no canonical link and
    /// the caller supplied no context URL.
    pub default_origin: String,
    /// Timeout for fetching a primary product document.
    pub fetch_timeout_secs: u64,
    /// Independent timeout for each backfill subrequest.
    pub backfill_timeout_secs: u64,
    /// Upper bound on backfill subrequests per extraction.
    pub backfill_max_count: usize,
    /// Concurrent backfill fetches in flight; `0` means all at once.
    pub backfill_concurrency: usize,
    /// Pause between items in sequential backfill mode.
    pub backfill_delay_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    pub user_agents: Vec<String>,
    pub relay_url: Option<String>,
    /// Largest request body the server accepts for posted page HTML.
    pub max_body_bytes: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("default_origin", &self.default_origin)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("backfill_timeout_secs", &self.backfill_timeout_secs)
            .field("backfill_max_count", &self.backfill_max_count)
            .field("backfill_concurrency", &self.backfill_concurrency)
            .field("backfill_delay_ms", &self.backfill_delay_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .field("user_agents", &self.user_agents.len())
            .field("relay_url", &self.relay_url.as_ref().map(|_| "[redacted]"))
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}
