//! Protected client for the yearly calendar dataset.
//!
//! Every fetch goes cache → circuit breaker → throttler → retry loop →
//! HTTP GET. The breaker only sees the retry loop's final outcome.

use std::time::Duration;

use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::breaker::{BreakerError, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats};
use crate::cache::{CacheConfig, CacheStats, SmartCache};
use crate::client::{HolidayRecord, YearDataset};
use crate::error::{ConfigError, FetchError, Result};
use crate::retry::retry_classified;
use crate::throttle::{RequestThrottler, ThrottleConfig, ThrottleError, ThrottleStats};

// == Dataset Range ==
/// First year the dataset publishes.
pub const MIN_YEAR: i32 = 2017;
/// Last year the dataset publishes.
pub const MAX_YEAR: i32 = 2025;

pub const DEFAULT_BASE_URL: &str = "https://cdn.jsdelivr.net/gh/ruyut/TaiwanCalendar/data";

// == Client Config ==
/// HTTP settings for [`DatasetClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Per-attempt budget covering connect, send and body read
    pub request_timeout: Duration,
    /// Upper bound on retries; the error classification may allow fewer
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }
}

pub fn cache_key(year: i32) -> String {
    format!("holidays_{}", year)
}

// == Dataset Client ==
pub struct DatasetClient {
    http: reqwest::Client,
    config: ClientConfig,
    cache: SmartCache<YearDataset>,
    breaker: CircuitBreaker,
    throttler: RequestThrottler,
}

impl DatasetClient {
    /// Builds the client and its three guards.
    ///
    /// With `cache.auto_cleanup` set this must run inside a tokio runtime.
    pub fn new(
        config: ClientConfig,
        cache: CacheConfig,
        breaker: CircuitBreakerConfig,
        throttle: ThrottleConfig,
    ) -> std::result::Result<Self, ConfigError> {
        if config.request_timeout.is_zero() {
            return Err(ConfigError::invalid("request_timeout", "must be greater than 0"));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            config,
            cache: SmartCache::new(cache)?,
            breaker: CircuitBreaker::new(breaker)?,
            throttler: RequestThrottler::new(throttle)?,
        })
    }

    /// Returns the records for `year`, from cache when fresh.
    pub async fn holidays_for_year(&self, year: i32) -> Result<YearDataset> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(FetchError::InvalidYear {
                year,
                min: MIN_YEAR,
                max: MAX_YEAR,
            });
        }

        let key = cache_key(year);
        if let Some(records) = self.cache.get(&key) {
            debug!(year, "Dataset cache hit");
            return Ok(records);
        }

        let body = self.fetch_protected(year).await?;
        let records = YearDataset::new(validate_records(body)?);
        self.cache.set(key, records.clone(), None);

        info!(year, records = records.len(), "Dataset loaded");
        Ok(records)
    }

    /// Looks up one `YYYYMMDD` date; `None` when the dataset has no such day.
    pub async fn check_holiday(&self, date: &str) -> Result<Option<HolidayRecord>> {
        let year = date_year(date)?;
        let records = self.holidays_for_year(year).await?;
        Ok(records.iter().find(|record| record.date == date).cloned())
    }

    /// Records dated within `start..=end`, sorted by date.
    ///
    /// Both bounds are `YYYYMMDD`. Each spanned year is loaded through
    /// [`holidays_for_year`](Self::holidays_for_year), so a range crossing
    /// a year boundary costs one protected fetch per uncached year.
    pub async fn holidays_in_range(&self, start: &str, end: &str) -> Result<Vec<HolidayRecord>> {
        let first_year = date_year(start)?;
        let last_year = date_year(end)?;
        if start > end {
            return Err(FetchError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let mut in_range = Vec::new();
        for year in first_year..=last_year {
            let records = self.holidays_for_year(year).await?;
            in_range.extend(
                records
                    .iter()
                    .filter(|record| record.date.as_str() >= start && record.date.as_str() <= end)
                    .cloned(),
            );
        }
        in_range.sort_by(|a, b| a.date.cmp(&b.date));

        debug!(start, end, records = in_range.len(), "Range lookup");
        Ok(in_range)
    }

    /// Loads every year in `years`, continuing past failures.
    pub async fn prefetch(&self, years: &[i32]) -> Vec<(i32, Result<usize>)> {
        let mut outcomes = Vec::with_capacity(years.len());
        for &year in years {
            let outcome = self.holidays_for_year(year).await.map(|records| records.len());
            if let Err(e) = &outcome {
                warn!(year, error = %e, "Prefetch failed");
            }
            outcomes.push((year, outcome));
        }
        outcomes
    }

    async fn fetch_protected(&self, year: i32) -> Result<Value> {
        let url = format!("{}/{}.json", self.config.base_url.trim_end_matches('/'), year);
        let http = self.http.clone();
        let timeout = self.config.request_timeout;
        let max_retries = self.config.max_retries;

        let outcome = self
            .breaker
            .execute(move || async move {
                self.throttler
                    .throttle(move || async move {
                        retry_classified(Some(max_retries), |attempt| {
                            fetch_once(&http, &url, timeout, attempt)
                        })
                        .await
                    })
                    .await
                    .map_err(|e| match e {
                        ThrottleError::Rejected(rejection) => FetchError::Throttled(rejection),
                        ThrottleError::Operation(e) => e,
                    })
            })
            .await;

        outcome.map_err(|e| match e {
            BreakerError::Open { stats } => {
                warn!(year, retry_after_ms = stats.retry_after_ms, "Circuit open, skipping fetch");
                FetchError::CircuitOpen(stats)
            }
            BreakerError::Operation(e) => e,
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn breaker_stats(&self) -> CircuitBreakerStats {
        self.breaker.stats()
    }

    pub fn throttle_stats(&self) -> ThrottleStats {
        self.throttler.stats()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Rejects queued fetches, stops the cache timer and drops cached years.
    pub fn shutdown(&self) {
        self.throttler.stop();
        self.cache.destroy();
        info!("Dataset client shut down");
    }
}

// == Fetch ==
async fn fetch_once(
    http: &reqwest::Client,
    url: &str,
    timeout: Duration,
    attempt: u32,
) -> Result<Value> {
    debug!(url, attempt, "Requesting dataset");

    let transport = |e: reqwest::Error| {
        if e.is_timeout() {
            FetchError::Timeout(timeout)
        } else {
            FetchError::Transport(e)
        }
    };

    let response = http
        .get(url)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(transport)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }

    let bytes = response.bytes().await.map_err(transport)?;
    serde_json::from_slice(&bytes).map_err(|e| FetchError::Parse(e.to_string()))
}

// == Validation ==
fn is_compact_date(date: &str) -> bool {
    date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit())
}

fn date_year(date: &str) -> Result<i32> {
    if !is_compact_date(date) {
        return Err(FetchError::InvalidDate(date.to_string()));
    }
    date[..4]
        .parse()
        .map_err(|_| FetchError::InvalidDate(date.to_string()))
}

/// Checks each record's shape before decoding.
///
/// Expects an array of objects with an 8-digit `date`, string `week` and
/// `description`, and a boolean `isHoliday`.
pub fn validate_records(body: Value) -> Result<Vec<HolidayRecord>> {
    let items = match &body {
        Value::Array(items) => items,
        _ => return Err(FetchError::Parse("expected a JSON array".to_string())),
    };

    for (i, item) in items.iter().enumerate() {
        let record = item
            .as_object()
            .ok_or_else(|| FetchError::Validation(format!("record {} is not an object", i)))?;

        for field in ["date", "week", "isHoliday", "description"] {
            if !record.contains_key(field) {
                return Err(FetchError::Validation(format!(
                    "record {} is missing field `{}`",
                    i, field
                )));
            }
        }

        let date_ok = record["date"].as_str().map(is_compact_date).unwrap_or(false);
        if !date_ok {
            return Err(FetchError::Validation(format!(
                "record {} has a `date` that is not YYYYMMDD",
                i
            )));
        }
        if !record["week"].is_string() {
            return Err(FetchError::Validation(format!("record {} has a non-string `week`", i)));
        }
        if !record["isHoliday"].is_boolean() {
            return Err(FetchError::Validation(format!(
                "record {} has a non-boolean `isHoliday`",
                i
            )));
        }
        if !record["description"].is_string() {
            return Err(FetchError::Validation(format!(
                "record {} has a non-string `description`",
                i
            )));
        }
    }

    serde_json::from_value(body).map_err(|e| FetchError::Parse(e.to_string()))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(date: &str) -> Value {
        json!({"date": date, "week": "一", "isHoliday": false, "description": ""})
    }

    #[test]
    fn test_validate_accepts_well_formed_records() {
        let records = validate_records(json!([record("20240101"), record("20240102")])).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].date, "20240102");
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        assert!(matches!(
            validate_records(json!({"date": "20240101"})),
            Err(FetchError::Parse(_))
        ));
        assert!(matches!(
            validate_records(json!([record("2024-01-01")])),
            Err(FetchError::Validation(_))
        ));
        assert!(matches!(
            validate_records(json!([{"date": "20240101", "week": "一", "description": ""}])),
            Err(FetchError::Validation(_))
        ));
        assert!(matches!(
            validate_records(json!([{"date": "20240101", "week": "一", "isHoliday": "yes", "description": ""}])),
            Err(FetchError::Validation(_))
        ));
    }

    #[test]
    fn test_date_year_requires_compact_dates() {
        assert_eq!(date_year("20241231").unwrap(), 2024);
        assert!(matches!(date_year("2024-12-31"), Err(FetchError::InvalidDate(_))));
        assert!(matches!(date_year("2024123"), Err(FetchError::InvalidDate(_))));
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key(2024), "holidays_2024");
    }

    #[tokio::test]
    async fn test_out_of_range_year_never_fetches() {
        let client = DatasetClient::new(
            ClientConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                ..ClientConfig::default()
            },
            CacheConfig::default(),
            CircuitBreakerConfig::default(),
            ThrottleConfig::default(),
        )
        .unwrap();

        let err = client.holidays_for_year(2016).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidYear { year: 2016, .. }));
        assert_eq!(client.breaker_stats().total_requests, 0);
        assert_eq!(client.throttle_stats().total_requests, 0);
    }
}
