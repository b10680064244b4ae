//! Configuration Module
//!
//! Builds the component option records from environment variables.
//! Only the binary reads the environment; the library takes plain records.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::Datelike;

use crate::breaker::CircuitBreakerConfig;
use crate::cache::CacheConfig;
use crate::client::{ClientConfig, MAX_YEAR, MIN_YEAR};
use crate::error::ConfigError;
use crate::throttle::ThrottleConfig;

/// Everything the binary needs to build a [`DatasetClient`](crate::client::DatasetClient).
#[derive(Debug, Clone)]
pub struct Config {
    pub client: ClientConfig,
    pub cache: CacheConfig,
    pub breaker: CircuitBreakerConfig,
    pub throttle: ThrottleConfig,
    /// Years loaded into the cache at startup
    pub prefetch_years: Vec<i32>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DATASET_BASE_URL` - Dataset host (default: the public CDN mirror)
    /// - `REQUEST_TIMEOUT_MS` - Per-attempt HTTP timeout (default: 10000)
    /// - `CACHE_MAX_SIZE` - Cached years (default: 100)
    /// - `CACHE_TTL_SECS` - Default entry TTL (default: 3600)
    /// - `CACHE_CLEANUP_INTERVAL_SECS` - Expired-entry sweep, 0 disables it (default: 300)
    /// - `BREAKER_FAILURE_THRESHOLD` - Failures that open the circuit (default: 5)
    /// - `BREAKER_RECOVERY_TIMEOUT_MS` - Open period before a probe (default: 60000)
    /// - `THROTTLE_MAX_RPS` - Dispatch rate (default: 10)
    /// - `THROTTLE_MAX_QUEUE` - Queue capacity (default: 100)
    /// - `THROTTLE_BACKPRESSURE` - Wait for queue space instead of rejecting (default: false)
    /// - `PREFETCH_YEARS` - Comma-separated years (default: current year, clamped to the dataset)
    ///
    /// Unparseable values are reported, not silently replaced.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let client = ClientConfig {
            base_url: env::var("DATASET_BASE_URL").unwrap_or(defaults.client.base_url),
            request_timeout: Duration::from_millis(var_or(
                "REQUEST_TIMEOUT_MS",
                defaults.client.request_timeout.as_millis() as u64,
            )?),
            ..defaults.client
        };

        let cleanup_secs: u64 = var_or(
            "CACHE_CLEANUP_INTERVAL_SECS",
            defaults.cache.cleanup_interval.as_secs(),
        )?;
        let cache = CacheConfig {
            max_size: var_or("CACHE_MAX_SIZE", defaults.cache.max_size)?,
            default_ttl: Duration::from_secs(var_or(
                "CACHE_TTL_SECS",
                defaults.cache.default_ttl.as_secs(),
            )?),
            auto_cleanup: cleanup_secs > 0,
            cleanup_interval: Duration::from_secs(cleanup_secs.max(1)),
        };

        let breaker = CircuitBreakerConfig::new(
            var_or("BREAKER_FAILURE_THRESHOLD", defaults.breaker.failure_threshold)?,
            Duration::from_millis(var_or(
                "BREAKER_RECOVERY_TIMEOUT_MS",
                defaults.breaker.recovery_timeout.as_millis() as u64,
            )?),
        )
        .with_classifier();

        let throttle = ThrottleConfig {
            max_requests_per_second: var_or(
                "THROTTLE_MAX_RPS",
                defaults.throttle.max_requests_per_second,
            )?,
            max_queue_size: var_or("THROTTLE_MAX_QUEUE", defaults.throttle.max_queue_size)?,
            enable_backpressure: var_or(
                "THROTTLE_BACKPRESSURE",
                defaults.throttle.enable_backpressure,
            )?,
            ..defaults.throttle
        };

        let prefetch_years = match env::var("PREFETCH_YEARS") {
            Ok(raw) => parse_years(&raw)?,
            Err(_) => defaults.prefetch_years,
        };

        Ok(Self {
            client,
            cache,
            breaker,
            throttle,
            prefetch_years,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            cache: CacheConfig {
                auto_cleanup: true,
                ..CacheConfig::default()
            },
            breaker: CircuitBreakerConfig::default().with_classifier(),
            throttle: ThrottleConfig::default(),
            prefetch_years: vec![current_year()],
        }
    }
}

fn current_year() -> i32 {
    chrono::Utc::now().year().clamp(MIN_YEAR, MAX_YEAR)
}

fn var_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => {
            let parsed = value.trim().parse();
            parsed.map_err(|_| ConfigError::InvalidEnv { name, value })
        }
        Err(_) => Ok(default),
    }
}

fn parse_years(raw: &str) -> Result<Vec<i32>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "PREFETCH_YEARS",
                value: raw.to_string(),
            })
        })
        .collect()
}
