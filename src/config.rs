//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Engine tuning: polling cadence, delays, retry policy and HTTP limits.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often the scheduler scans the store for eligible tasks.
    pub poll_interval: Duration,
    /// Pause after a successful visit, in milliseconds (inclusive range).
    pub visit_delay_ms: (u64, u64),
    /// Pause after a failed visit before retrying.
    pub retry_delay: Duration,
    /// A task fails once its retained error count exceeds this.
    pub max_errors: usize,
    /// Pause before each sub-page fetch, in milliseconds (inclusive range).
    pub page_delay_ms: (u64, u64),
    /// How many sub-pages a visit browses (inclusive range, capped by links found).
    pub sub_pages: (usize, usize),
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Maximum redirects followed per request.
    pub max_redirects: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            visit_delay_ms: (1000, 5000),
            retry_delay: Duration::from_millis(5000),
            max_errors: 10,
            page_delay_ms: (500, 3000),
            sub_pages: (2, 5),
            request_timeout: Duration::from_secs(10),
            max_redirects: 5,
        }
    }
}

impl EngineConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let poll_interval =
            env_secs("VISIT_SIM_POLL_INTERVAL_SECS")?.unwrap_or(defaults.poll_interval);
        let visit_delay_ms = env_range(
            "VISIT_SIM_VISIT_DELAY_MIN_MS",
            "VISIT_SIM_VISIT_DELAY_MAX_MS",
            defaults.visit_delay_ms,
        )?;
        let retry_delay = env_parse("VISIT_SIM_RETRY_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_delay);
        let max_errors = env_parse("VISIT_SIM_MAX_ERRORS")?.unwrap_or(defaults.max_errors);
        let page_delay_ms = env_range(
            "VISIT_SIM_PAGE_DELAY_MIN_MS",
            "VISIT_SIM_PAGE_DELAY_MAX_MS",
            defaults.page_delay_ms,
        )?;
        let request_timeout =
            env_secs("VISIT_SIM_REQUEST_TIMEOUT_SECS")?.unwrap_or(defaults.request_timeout);
        let max_redirects =
            env_parse("VISIT_SIM_MAX_REDIRECTS")?.unwrap_or(defaults.max_redirects);

        Ok(Self {
            poll_interval,
            visit_delay_ms,
            retry_delay,
            max_errors,
            page_delay_ms,
            sub_pages: defaults.sub_pages,
            request_timeout,
            max_redirects,
        })
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory for daily-rolling log files. Stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            log_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env_parse("VISIT_SIM_PORT")?.unwrap_or(Self::default().port);
        let log_dir = std::env::var("VISIT_SIM_LOG_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        Ok(Self { port, log_dir })
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
}

/// A whole number of seconds that must be non-zero.
fn env_secs(key: &str) -> Result<Option<Duration>, ConfigError> {
    env_parse(key)?.map(|secs| nonzero_secs(key, secs)).transpose()
}

fn nonzero_secs(key: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be at least 1 second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn env_range(min_key: &str, max_key: &str, default: (u64, u64)) -> Result<(u64, u64), ConfigError> {
    let min = env_parse(min_key)?.unwrap_or(default.0);
    let max = env_parse(max_key)?.unwrap_or(default.1);
    check_range(max_key, min, max)
}

fn check_range(key: &str, min: u64, max: u64) -> Result<(u64, u64), ConfigError> {
    if min > max {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("maximum {max} is below minimum {min}"),
        });
    }
    Ok((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.visit_delay_ms, (1000, 5000));
        assert_eq!(config.retry_delay, Duration::from_secs(5));
        assert_eq!(config.max_errors, 10);
        assert_eq!(config.page_delay_ms, (500, 3000));
        assert_eq!(config.sub_pages, (2, 5));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn parse_value_reports_key() {
        let err = parse_value::<u64>("VISIT_SIM_MAX_ERRORS", "ten").unwrap_err();
        assert!(err.to_string().contains("VISIT_SIM_MAX_ERRORS"));
        assert_eq!(parse_value::<u64>("K", " 42 ").unwrap(), 42);
    }

    #[test]
    fn zero_seconds_rejected() {
        let err = nonzero_secs("VISIT_SIM_POLL_INTERVAL_SECS", 0).unwrap_err();
        assert!(err.to_string().contains("VISIT_SIM_POLL_INTERVAL_SECS"));
        assert_eq!(
            nonzero_secs("VISIT_SIM_REQUEST_TIMEOUT_SECS", 3).unwrap(),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn from_env_rejects_zero_poll_interval() {
        // Only this test touches these variables.
        unsafe { std::env::set_var("VISIT_SIM_POLL_INTERVAL_SECS", "0") };
        let result = EngineConfig::from_env();
        unsafe { std::env::remove_var("VISIT_SIM_POLL_INTERVAL_SECS") };

        match result {
            Err(ConfigError::InvalidValue { key, .. }) => {
                assert_eq!(key, "VISIT_SIM_POLL_INTERVAL_SECS")
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn inverted_range_rejected() {
        assert!(check_range("K", 10, 5).is_err());
        assert_eq!(check_range("K", 5, 5).unwrap(), (5, 5));
    }
}
