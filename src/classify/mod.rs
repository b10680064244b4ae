//! Error classification driving retry and breaker decisions.

mod classifier;
mod types;

pub use classifier::ErrorClassifier;
pub use types::{ErrorCategory, ErrorClassification, ErrorKind, ErrorSeverity, RetryStrategy};
