//! Calendar Guard - protected remote calls for a calendar dataset
//!
//! Provides a circuit breaker, a paced request throttler, an LRU/TTL cache
//! and an error classifier, plus a dataset client wiring them together.

pub mod breaker;
pub mod cache;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod retry;
mod sync;
pub mod tasks;
pub mod throttle;

pub use breaker::{BreakerError, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
pub use cache::{CacheConfig, CacheStats, SmartCache};
pub use classify::{ErrorCategory, ErrorClassification, ErrorClassifier, ErrorSeverity, RetryStrategy};
pub use client::{ClientConfig, DatasetClient, HolidayRecord};
pub use config::Config;
pub use error::{ConfigError, FetchError};
pub use retry::retry_classified;
pub use throttle::{RequestThrottler, ThrottleConfig, ThrottleError, ThrottleRejection, ThrottleStats};
