use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::cli::Cli;
use crate::derive::GOVERNANCE_ASSET;
use crate::price::PriceSnapshot;
use crate::services::metrics_api::RetryPolicy;

pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 250;
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone)]
pub struct Config {
    pub metrics_url: String,
    pub prices: PriceSnapshot,
    pub request_timeout_seconds: u64,
    /// `0` keeps a successful fetch for the lifetime of the process.
    pub cache_ttl_seconds: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub poll_interval_seconds: u64,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key/value lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let metrics_url = lookup("METRICS_URL").ok_or("METRICS_URL is required")?;

        let prices = lookup("ASSET_PRICES").ok_or("ASSET_PRICES is required")?;
        let prices = PriceSnapshot::parse(&prices).map_err(|err| err.to_string())?;

        let request_timeout_seconds = parse_or(
            &lookup,
            "REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )?;
        let cache_ttl_seconds = parse_or(&lookup, "CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS)?;
        let max_retries = parse_or(&lookup, "MAX_RETRIES", DEFAULT_MAX_RETRIES)?;
        let retry_base_delay_ms =
            parse_or(&lookup, "RETRY_BASE_DELAY_MS", DEFAULT_RETRY_BASE_DELAY_MS)?;
        let poll_interval_seconds =
            parse_or(&lookup, "POLL_INTERVAL_SECONDS", DEFAULT_POLL_INTERVAL_SECONDS)?;

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|_| "BIND_ADDR must be a valid socket address")?;

        let config = Self {
            metrics_url,
            prices,
            request_timeout_seconds,
            cache_ttl_seconds,
            max_retries,
            retry_base_delay_ms,
            poll_interval_seconds,
            bind_addr,
        };
        config.validate()?;
        Ok(config)
    }

    /// Command-line flags take precedence over environment values.
    pub fn apply_cli(&mut self, cli: &Cli) -> Result<(), String> {
        if let Some(url) = &cli.metrics_url {
            self.metrics_url = url.clone();
        }
        if let Some(prices) = &cli.prices {
            self.prices = PriceSnapshot::parse(prices).map_err(|err| err.to_string())?;
        }
        if let Some(ttl) = cli.cache_ttl {
            self.cache_ttl_seconds = ttl;
        }
        if let Some(interval) = cli.poll_interval {
            self.poll_interval_seconds = interval;
        }
        if let Some(bind) = cli.bind {
            self.bind_addr = bind;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), String> {
        if !self.metrics_url.starts_with("http://") && !self.metrics_url.starts_with("https://") {
            return Err(format!("METRICS_URL must be an http(s) URL: {}", self.metrics_url));
        }
        if !self.prices.contains(GOVERNANCE_ASSET) {
            return Err(format!("ASSET_PRICES must include a price for '{}'", GOVERNANCE_ASSET));
        }
        if self.request_timeout_seconds == 0 {
            return Err("REQUEST_TIMEOUT_SECONDS must be greater than zero".to_string());
        }
        if self.poll_interval_seconds == 0 {
            return Err("POLL_INTERVAL_SECONDS must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        match self.cache_ttl_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("METRICS_URL", "https://metrics.example.com/api/v3/staking-metrics"),
            ("ASSET_PRICES", "icp=4.25"),
        ]
    }

    #[test]
    fn minimal_env_uses_defaults() {
        let config = Config::from_lookup(lookup_from(&minimal())).unwrap();

        assert_eq!(config.prices.get("icp"), Some(4.25));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(300)));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
    }

    #[test]
    fn missing_metrics_url_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("ASSET_PRICES", "icp=1")])).unwrap_err();
        assert!(err.contains("METRICS_URL"));
    }

    #[test]
    fn prices_without_governance_asset_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("METRICS_URL", "https://metrics.example.com"),
            ("ASSET_PRICES", "btc=60000"),
        ]))
        .unwrap_err();
        assert!(err.contains("icp"));
    }

    #[test]
    fn zero_cache_ttl_means_session_lifetime() {
        let mut pairs = minimal();
        pairs.push(("CACHE_TTL_SECONDS", "0"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.cache_ttl(), None);
    }

    #[test]
    fn non_numeric_timeout_is_rejected() {
        let mut pairs = minimal();
        pairs.push(("REQUEST_TIMEOUT_SECONDS", "soon"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.contains("REQUEST_TIMEOUT_SECONDS"));
    }

    #[test]
    fn non_http_url_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("METRICS_URL", "ftp://metrics.example.com"),
            ("ASSET_PRICES", "icp=1"),
        ]))
        .unwrap_err();
        assert!(err.contains("http"));
    }

    #[test]
    fn cli_flags_override_env() {
        let mut config = Config::from_lookup(lookup_from(&minimal())).unwrap();
        let cli = Cli {
            metrics_url: Some("http://localhost:9000/metrics".into()),
            prices: Some("icp=7.5".into()),
            cache_ttl: Some(30),
            poll_interval: None,
            bind: None,
            once: false,
            print_metrics: false,
        };

        config.apply_cli(&cli).unwrap();

        assert_eq!(config.metrics_url, "http://localhost:9000/metrics");
        assert_eq!(config.prices.get("icp"), Some(7.5));
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(30)));
    }
}
