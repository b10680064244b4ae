//! Circuit breaker configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::classify::ErrorClassifier;
use crate::error::ConfigError;

// == Expected Error Predicate ==
/// Decides whether a failure is an expected business-logic error.
///
/// Expected errors are returned to the caller but never count against the breaker.
pub type ExpectedErrorPredicate = Arc<dyn Fn(&(dyn std::error::Error + 'static)) -> bool + Send + Sync>;

// == Breaker Config ==
/// Configuration for a [`CircuitBreaker`](super::CircuitBreaker).
#[derive(Clone)]
pub struct CircuitBreakerConfig {
    /// Counted failures that open the circuit
    pub failure_threshold: u32,
    /// Time the circuit stays open before a probe is allowed
    pub recovery_timeout: Duration,
    /// Observation window reported in stats; not used for decisions
    pub monitoring_period: Duration,
    /// Cap on concurrent calls admitted while half-open. `None` admits every caller.
    pub half_open_max_probes: Option<u32>,
    /// Failures matching this predicate do not count
    pub is_expected_error: Option<ExpectedErrorPredicate>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            monitoring_period: Duration::from_secs(10),
            half_open_max_probes: None,
            is_expected_error: None,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            ..Self::default()
        }
    }

    /// Sets the expected-error predicate.
    pub fn with_expected_error<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&(dyn std::error::Error + 'static)) -> bool + Send + Sync + 'static,
    {
        self.is_expected_error = Some(Arc::new(predicate));
        self
    }

    /// Treats errors the classifier marks as EXPECTED as invisible to the breaker.
    pub fn with_classifier(self) -> Self {
        self.with_expected_error(ErrorClassifier::is_expected)
    }

    pub fn with_half_open_max_probes(mut self, probes: u32) -> Self {
        self.half_open_max_probes = Some(probes);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::invalid(
                "failure_threshold",
                "must be greater than 0",
            ));
        }
        if self.recovery_timeout.is_zero() {
            return Err(ConfigError::invalid(
                "recovery_timeout",
                "must be greater than 0",
            ));
        }
        if self.half_open_max_probes == Some(0) {
            return Err(ConfigError::invalid(
                "half_open_max_probes",
                "must be greater than 0 when set",
            ));
        }
        Ok(())
    }

    pub(crate) fn is_expected(&self, error: &(dyn std::error::Error + 'static)) -> bool {
        self.is_expected_error
            .as_ref()
            .map(|predicate| predicate(error))
            .unwrap_or(false)
    }
}

impl fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("failure_threshold", &self.failure_threshold)
            .field("recovery_timeout", &self.recovery_timeout)
            .field("monitoring_period", &self.monitoring_period)
            .field("half_open_max_probes", &self.half_open_max_probes)
            .field("is_expected_error", &self.is_expected_error.is_some())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        assert!(CircuitBreakerConfig::default().validate().is_ok());
        assert!(CircuitBreakerConfig::new(0, Duration::from_secs(1))
            .validate()
            .is_err());
        assert!(CircuitBreakerConfig::new(3, Duration::ZERO).validate().is_err());
        assert!(CircuitBreakerConfig::new(3, Duration::from_secs(1))
            .with_half_open_max_probes(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_predicate_defaults_to_counting_everything() {
        let config = CircuitBreakerConfig::default();
        let err = std::io::Error::new(std::io::ErrorKind::Other, "invalid input");
        assert!(!config.is_expected(&err));

        let config = config.with_classifier();
        assert!(config.is_expected(&err));
    }
}
