//! Classification value types.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

// == Category ==
/// How a failure should be treated by callers and the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Transient, retry with back-off
    Temporary,
    /// Caller or input fault, never retry
    Permanent,
    /// Resource exhaustion, never retry, alert
    Critical,
    /// Normal validation rejection, invisible to the breaker
    Expected,
}

// == Severity ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

// == Error Kind ==
/// Canonical source of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "NETWORK_ERROR")]
    Network,
    #[serde(rename = "API_ERROR")]
    Api,
    #[serde(rename = "PARSE_ERROR")]
    Parse,
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    #[serde(rename = "TIMEOUT_ERROR")]
    Timeout,
    #[serde(rename = "SYSTEM_ERROR")]
    System,
    #[serde(rename = "UNKNOWN_ERROR")]
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::Api => "API_ERROR",
            ErrorKind::Parse => "PARSE_ERROR",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Timeout => "TIMEOUT_ERROR",
            ErrorKind::System => "SYSTEM_ERROR",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Retry Strategy ==
/// Retry budget attached to every classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetryStrategy {
    pub should_retry: bool,
    /// Retries after the first attempt
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
}

impl RetryStrategy {
    pub(crate) const fn new(
        max_retries: u32,
        retry_delay_ms: u64,
        backoff_multiplier: f64,
        max_delay_ms: u64,
    ) -> Self {
        Self {
            should_retry: true,
            max_retries,
            retry_delay: Duration::from_millis(retry_delay_ms),
            backoff_multiplier,
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    pub const fn no_retry() -> Self {
        Self {
            should_retry: false,
            max_retries: 0,
            retry_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Back-off before retry number `attempt` (0-based), capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let millis = self.retry_delay.as_secs_f64() * 1000.0 * factor;
        let max_millis = self.max_delay.as_secs_f64() * 1000.0;
        Duration::from_secs_f64(millis.min(max_millis).max(0.0) / 1000.0)
    }
}

// == Classification ==
/// Outcome of [`ErrorClassifier::classify`](super::ErrorClassifier::classify).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorClassification {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub kind: ErrorKind,
    pub retry_strategy: RetryStrategy,
    pub needs_alert: bool,
    pub description: String,
}
