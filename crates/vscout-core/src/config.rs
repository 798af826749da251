use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Desktop browser user-agents rotated across page fetches when
/// `VSCOUT_USER_AGENTS` is not set.
pub const DEFAULT_USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup, no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("VSCOUT_ENV", "development"))?;

    let bind_addr = or_default("VSCOUT_BIND_ADDR", "0.0.0.0:8787")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("VSCOUT_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("VSCOUT_LOG_LEVEL", "info");

    let default_origin = or_default("VSCOUT_DEFAULT_ORIGIN", "https://www.amazon.com")
        .trim_end_matches('/')
        .to_string();
    if !is_http_url(&default_origin) {
        return Err(invalid(
            "VSCOUT_DEFAULT_ORIGIN",
            format!("\"{default_origin}\" must start with http:// or https://"),
        ));
    }

    let fetch_timeout_secs = parse_u64("VSCOUT_FETCH_TIMEOUT_SECS", "15")?;
    let backfill_timeout_secs = parse_u64("VSCOUT_BACKFILL_TIMEOUT_SECS", "8")?;
    if fetch_timeout_secs == 0 || backfill_timeout_secs == 0 {
        let var = if fetch_timeout_secs == 0 {
            "VSCOUT_FETCH_TIMEOUT_SECS"
        } else {
            "VSCOUT_BACKFILL_TIMEOUT_SECS"
        };
        return Err(invalid(var, "timeout must be greater than zero".to_string()));
    }

    let backfill_max_count = parse_usize("VSCOUT_BACKFILL_MAX_COUNT", "48")?;
    let backfill_concurrency = parse_usize("VSCOUT_BACKFILL_CONCURRENCY", "0")?;
    let backfill_delay_ms = parse_u64("VSCOUT_BACKFILL_DELAY_MS", "1000")?;
    let max_retries = parse_u32("VSCOUT_MAX_RETRIES", "0")?;
    let retry_backoff_base_secs = parse_u64("VSCOUT_RETRY_BACKOFF_BASE_SECS", "1")?;
    let max_body_bytes = parse_usize("VSCOUT_MAX_BODY_BYTES", "16777216")?;
    if max_body_bytes == 0 {
        return Err(invalid(
            "VSCOUT_MAX_BODY_BYTES",
            "body limit must be greater than zero".to_string(),
        ));
    }

    let user_agents = match lookup("VSCOUT_USER_AGENTS") {
        Ok(raw) => {
            let agents: Vec<String> = raw
                .split('|')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect();
            if agents.is_empty() {
                return Err(invalid(
                    "VSCOUT_USER_AGENTS",
                    "expected at least one '|'-separated user agent".to_string(),
                ));
            }
            agents
        }
        Err(_) => DEFAULT_USER_AGENTS.iter().map(|s| (*s).to_string()).collect(),
    };

    let relay_url = lookup("VSCOUT_RELAY_URL")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if let Some(relay) = relay_url.as_deref() {
        if !is_http_url(relay) {
            return Err(invalid(
                "VSCOUT_RELAY_URL",
                "relay must be an absolute http(s) URL prefix".to_string(),
            ));
        }
    }

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        default_origin,
        fetch_timeout_secs,
        backfill_timeout_secs,
        backfill_max_count,
        backfill_concurrency,
        backfill_delay_ms,
        max_retries,
        retry_backoff_base_secs,
        user_agents,
        relay_url,
        max_body_bytes,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "VSCOUT_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
