//! Maps failures to a category, severity and retry budget.

use std::error::Error;
use std::io;

use crate::classify::{ErrorCategory, ErrorClassification, ErrorKind, ErrorSeverity, RetryStrategy};
use crate::error::FetchError;

// == Status Tables ==
/// Status codes worth retrying.
const HTTP_TEMPORARY_STATUSES: [u16; 7] = [408, 429, 502, 503, 504, 507, 509];

/// Status codes that will not change on retry.
const HTTP_PERMANENT_STATUSES: [u16; 12] =
    [400, 401, 403, 404, 405, 406, 409, 410, 413, 414, 415, 422];

const NETWORK_CODES: [&str; 4] = ["ECONNRESET", "ENOTFOUND", "ECONNREFUSED", "ETIMEDOUT"];
const SYSTEM_MARKERS: [&str; 3] = ["memory", "EMFILE", "ENOMEM"];

// == Error Classifier ==
/// Stateless error classifier.
///
/// Structured errors found on the `source()` chain (`io::Error`,
/// `reqwest::Error`, `serde_json::Error`, [`FetchError`]) are matched by
/// kind first. Anything else falls back to matching the top-level message,
/// checked in priority order: network, HTTP, parse, validation, timeout,
/// system, then a conservative default.
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn classify(error: &(dyn Error + 'static)) -> ErrorClassification {
        let mut current = Some(error);
        while let Some(err) = current {
            if let Some(classification) = Self::classify_structured(err) {
                return classification;
            }
            current = err.source();
        }
        Self::classify_message(&error.to_string())
    }

    /// True when the error is a normal validation rejection.
    ///
    /// Usable directly as a breaker's expected-error predicate.
    pub fn is_expected(error: &(dyn Error + 'static)) -> bool {
        Self::classify(error).category == ErrorCategory::Expected
    }

    fn classify_structured(error: &(dyn Error + 'static)) -> Option<ErrorClassification> {
        if let Some(err) = error.downcast_ref::<FetchError>() {
            return match err {
                FetchError::Http { status, .. } => Some(Self::http(*status)),
                FetchError::Timeout(_) => Some(Self::timeout()),
                FetchError::Parse(_) => Some(Self::parse()),
                FetchError::Validation(_)
                | FetchError::InvalidYear { .. }
                | FetchError::InvalidDate(_)
                | FetchError::InvalidRange { .. } => Some(Self::validation()),
                // Transport defers to its reqwest source; rejections by
                // the guard itself fall back to their messages.
                FetchError::Transport(_) | FetchError::CircuitOpen(_) | FetchError::Throttled(_) => {
                    None
                }
            };
        }

        if let Some(err) = error.downcast_ref::<reqwest::Error>() {
            if err.is_timeout() {
                return Some(Self::timeout());
            }
            if err.is_connect() {
                return Some(Self::network());
            }
            if let Some(status) = err.status() {
                return Some(Self::http(status.as_u16()));
            }
            if err.is_decode() {
                return Some(Self::parse());
            }
            return None;
        }

        if error.downcast_ref::<serde_json::Error>().is_some() {
            return Some(Self::parse());
        }

        if let Some(err) = error.downcast_ref::<io::Error>() {
            return match err.kind() {
                io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::NotConnected
                | io::ErrorKind::AddrNotAvailable
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::TimedOut => Some(Self::network()),
                io::ErrorKind::OutOfMemory => Some(Self::system()),
                _ => None,
            };
        }

        None
    }

    fn classify_message(message: &str) -> ErrorClassification {
        if NETWORK_CODES.iter().any(|code| message.contains(code)) {
            return Self::network();
        }
        if message.contains("HTTP") || starts_with_status(message) {
            return Self::http(first_status(message).unwrap_or(500));
        }
        if message.contains("parse") || message.contains("JSON") {
            return Self::parse();
        }
        if message.contains("validation") || message.contains("invalid") {
            return Self::validation();
        }
        if message.contains("timeout") {
            return Self::timeout();
        }
        if SYSTEM_MARKERS.iter().any(|marker| message.contains(marker)) {
            return Self::system();
        }
        Self::unknown()
    }

    fn network() -> ErrorClassification {
        ErrorClassification {
            category: ErrorCategory::Temporary,
            severity: ErrorSeverity::Medium,
            kind: ErrorKind::Network,
            retry_strategy: RetryStrategy::new(3, 1000, 2.0, 10_000),
            needs_alert: false,
            description: "Network connection error, retrying".to_string(),
        }
    }

    fn http(status: u16) -> ErrorClassification {
        if HTTP_TEMPORARY_STATUSES.contains(&status) {
            let (retries, delay) = if status == 429 { (2, 5000) } else { (3, 2000) };
            return ErrorClassification {
                category: ErrorCategory::Temporary,
                severity: if status >= 500 {
                    ErrorSeverity::High
                } else {
                    ErrorSeverity::Medium
                },
                kind: ErrorKind::Api,
                retry_strategy: RetryStrategy::new(retries, delay, 2.0, 30_000),
                needs_alert: status >= 500,
                description: format!("HTTP {} error, retrying", status),
            };
        }

        if HTTP_PERMANENT_STATUSES.contains(&status) {
            return ErrorClassification {
                category: ErrorCategory::Permanent,
                severity: ErrorSeverity::Medium,
                kind: ErrorKind::Api,
                retry_strategy: RetryStrategy::no_retry(),
                needs_alert: false,
                description: format!("HTTP {} error, not retrying", status),
            };
        }

        if status >= 500 {
            return ErrorClassification {
                category: ErrorCategory::Temporary,
                severity: ErrorSeverity::High,
                kind: ErrorKind::Api,
                retry_strategy: RetryStrategy::new(2, 3000, 2.0, 15_000),
                needs_alert: true,
                description: format!("HTTP {} server error, retrying", status),
            };
        }

        Self::unknown()
    }

    fn parse() -> ErrorClassification {
        ErrorClassification {
            category: ErrorCategory::Temporary,
            severity: ErrorSeverity::Medium,
            kind: ErrorKind::Parse,
            retry_strategy: RetryStrategy::new(1, 1000, 1.0, 1000),
            needs_alert: false,
            description: "Failed to parse data, possibly transient".to_string(),
        }
    }

    fn validation() -> ErrorClassification {
        ErrorClassification {
            category: ErrorCategory::Expected,
            severity: ErrorSeverity::Low,
            kind: ErrorKind::Validation,
            retry_strategy: RetryStrategy::no_retry(),
            needs_alert: false,
            description: "Input validation failed, check the arguments".to_string(),
        }
    }

    fn timeout() -> ErrorClassification {
        ErrorClassification {
            category: ErrorCategory::Temporary,
            severity: ErrorSeverity::Medium,
            kind: ErrorKind::Timeout,
            retry_strategy: RetryStrategy::new(2, 2000, 2.0, 8000),
            needs_alert: false,
            description: "Request timed out, retrying".to_string(),
        }
    }

    fn system() -> ErrorClassification {
        ErrorClassification {
            category: ErrorCategory::Critical,
            severity: ErrorSeverity::Critical,
            kind: ErrorKind::System,
            retry_strategy: RetryStrategy::no_retry(),
            needs_alert: true,
            description: "System resource error, needs attention".to_string(),
        }
    }

    fn unknown() -> ErrorClassification {
        ErrorClassification {
            category: ErrorCategory::Temporary,
            severity: ErrorSeverity::Medium,
            kind: ErrorKind::Unknown,
            retry_strategy: RetryStrategy::new(1, 1000, 1.0, 1000),
            needs_alert: false,
            description: "Unknown error, retrying once".to_string(),
        }
    }
}

// == Status Helpers ==
fn starts_with_status(message: &str) -> bool {
    message.len() >= 3 && message.as_bytes()[..3].iter().all(u8::is_ascii_digit)
}

/// First run of three consecutive digits.
fn first_status(message: &str) -> Option<u16> {
    message
        .as_bytes()
        .windows(3)
        .find(|w| w.iter().all(u8::is_ascii_digit))
        .and_then(|w| std::str::from_utf8(w).ok())
        .and_then(|s| s.parse().ok())
}
