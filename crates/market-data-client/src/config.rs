use analysis_core::StockDataError;
use std::sync::Arc;
use std::time::Duration;

use crate::rate_limiter::CooldownLimiter;
use crate::retry::RetryPolicy;
use crate::yahoo::{DEFAULT_BASE_URL, DEFAULT_SESSION_URL};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) stock-analyzer/0.1";

/// Settings for building providers and their shared limiter.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Minimum start-to-start gap between upstream calls
    pub cooldown_period: Duration,
    pub retry: RetryPolicy,
    /// Per-attempt bound; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
    pub base_url: String,
    /// Page hit once per session to obtain Yahoo's consent cookie
    pub session_url: String,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            cooldown_period: Duration::from_secs(2),
            retry: RetryPolicy::default(),
            request_timeout: Some(Duration::from_secs(30)),
            base_url: DEFAULT_BASE_URL.to_string(),
            session_url: DEFAULT_SESSION_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    /// Reads `COOLDOWN_PERIOD`, `MAX_RETRIES`, `RETRY_BASE_DELAY`,
    /// `RETRY_MAX_DELAY`, `REQUEST_TIMEOUT` (seconds; `0` disables the
    /// timeout), `YAHOO_BASE_URL`, `YAHOO_SESSION_URL` and `HTTP_USER_AGENT`.
    /// Unset variables keep their defaults; unparsable or out-of-range ones
    /// are a `Config` error.
    pub fn from_env() -> Result<Self, StockDataError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, StockDataError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = seconds(&lookup, "COOLDOWN_PERIOD")? {
            config.cooldown_period = secs;
        }
        if let Some(raw) = lookup("MAX_RETRIES") {
            let attempts: u32 = raw
                .trim()
                .parse()
                .map_err(|_| StockDataError::Config(format!("MAX_RETRIES must be a whole number, got '{}'", raw)))?;
            config.retry.max_retries = attempts.max(1);
        }
        if let Some(secs) = seconds(&lookup, "RETRY_BASE_DELAY")? {
            config.retry.base_delay = secs;
        }
        if let Some(secs) = seconds(&lookup, "RETRY_MAX_DELAY")? {
            config.retry.max_delay = secs;
        }
        if let Some(secs) = seconds(&lookup, "REQUEST_TIMEOUT")? {
            config.request_timeout = (!secs.is_zero()).then_some(secs);
        }
        if let Some(url) = lookup("YAHOO_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        if let Some(url) = lookup("YAHOO_SESSION_URL").filter(|v| !v.trim().is_empty()) {
            config.session_url = url.trim().to_string();
        }
        if let Some(agent) = lookup("HTTP_USER_AGENT").filter(|v| !v.trim().is_empty()) {
            config.user_agent = agent;
        }

        Ok(config)
    }

    /// A limiter with this config's cooldown; share it across providers.
    pub fn limiter(&self) -> Arc<CooldownLimiter> {
        Arc::new(CooldownLimiter::new(self.cooldown_period))
    }
}

fn seconds<F>(lookup: &F, key: &str) -> Result<Option<Duration>, StockDataError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| StockDataError::Config(format!("{} must be a number of seconds, got '{}'", key, raw)))?;
    if !value.is_finite() || value < 0.0 {
        return Err(StockDataError::Config(format!("{} must be non-negative, got {}", key, value)));
    }
    Duration::try_from_secs_f64(value)
        .map(Some)
        .map_err(|e| StockDataError::Config(format!("{} out of range ({}): {}", key, raw.trim(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = FetchConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, FetchConfig::default());
        assert_eq!(config.cooldown_period, Duration::from_secs(2));
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_overrides() {
        let config = FetchConfig::from_lookup(lookup_from(&[
            ("COOLDOWN_PERIOD", "0.5"),
            ("MAX_RETRIES", "5"),
            ("RETRY_BASE_DELAY", "2"),
            ("REQUEST_TIMEOUT", "0"),
        ]))
        .unwrap();

        assert_eq!(config.cooldown_period, Duration::from_millis(500));
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay, Duration::from_secs(2));
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            FetchConfig::from_lookup(lookup_from(&[("COOLDOWN_PERIOD", "soon")])),
            Err(StockDataError::Config(_))
        ));
        assert!(FetchConfig::from_lookup(lookup_from(&[("COOLDOWN_PERIOD", "-1")])).is_err());
        assert!(FetchConfig::from_lookup(lookup_from(&[("MAX_RETRIES", "2.5")])).is_err());
    }

    #[test]
    fn test_oversized_durations_rejected() {
        for key in ["COOLDOWN_PERIOD", "RETRY_BASE_DELAY", "RETRY_MAX_DELAY", "REQUEST_TIMEOUT"] {
            assert!(
                matches!(
                    FetchConfig::from_lookup(lookup_from(&[(key, "1e30")])),
                    Err(StockDataError::Config(_))
                ),
                "{} accepted an oversized value",
                key
            );
        }
    }
}
