//! Error types for the guard
//!
//! Construction-time configuration errors and the dataset client's error enum.
//! The breaker and throttler define their own error kinds next to their code.

use std::time::Duration;

use thiserror::Error;

use crate::breaker::CircuitBreakerStats;
use crate::throttle::ThrottleRejection;

// == Config Error ==
/// Raised when a component is built from an invalid option record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// An option value is out of its allowed range
    #[error("Invalid option `{field}`: {reason}")]
    InvalidOption { field: &'static str, reason: String },

    /// Auto-cleanup needs a tokio runtime to spawn its timer
    #[error("Auto-cleanup requires a running tokio runtime")]
    NoRuntime,

    /// An environment variable could not be parsed
    #[error("Environment variable {name} has invalid value {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidOption {
            field,
            reason: reason.into(),
        }
    }
}

// == Fetch Error ==
/// Errors surfaced by the dataset client.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Requested year lies outside the published dataset
    #[error("Year {year} is invalid: supported range is {min}-{max}")]
    InvalidYear { year: i32, min: i32, max: i32 },

    /// A lookup date is not an 8-digit `YYYYMMDD` string
    #[error("Invalid date {0:?}: expected YYYYMMDD")]
    InvalidDate(String),

    /// A range whose start is after its end
    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },

    /// The dataset host answered with a non-success status
    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    /// Connection-level failure
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// No response within the configured request timeout
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    /// Body was not the expected JSON shape
    #[error("Failed to parse dataset: {0}")]
    Parse(String),

    /// Body parsed but a record is malformed
    #[error("Dataset validation failed: {0}")]
    Validation(String),

    /// The breaker rejected the call without touching the network
    #[error("Circuit breaker is open ({} failures)", .0.failure_count)]
    CircuitOpen(CircuitBreakerStats),

    /// The throttler rejected the call
    #[error(transparent)]
    Throttled(#[from] ThrottleRejection),
}

// == Result Type Alias ==
/// Convenience Result type for the dataset client.
pub type Result<T> = std::result::Result<T, FetchError>;
