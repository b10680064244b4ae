//! Circuit breaker implementation.

use std::future::Future;
use std::sync::Mutex;

use chrono::Utc;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::breaker::config::CircuitBreakerConfig;
use crate::breaker::state::{BreakerState, CircuitBreakerStats, CircuitState};
use crate::error::ConfigError;
use crate::sync::lock;

// == Breaker Error ==
/// Error returned by [`CircuitBreaker::execute`].
#[derive(Error, Debug)]
pub enum BreakerError<E> {
    /// Rejected without invoking the operation
    #[error("Circuit breaker is {}", .stats.state)]
    Open { stats: CircuitBreakerStats },

    /// The operation ran and failed
    #[error(transparent)]
    Operation(E),
}

impl<E> BreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open { .. })
    }

    /// Stats snapshot for an open-circuit rejection.
    pub fn stats(&self) -> Option<&CircuitBreakerStats> {
        match self {
            BreakerError::Open { stats } => Some(stats),
            BreakerError::Operation(_) => None,
        }
    }
}

// == Circuit Breaker ==
/// A circuit breaker around arbitrary async operations.
///
/// # States
///
/// - **Closed**: calls pass through, counted failures accumulate.
/// - **Open**: calls are rejected immediately until `recovery_timeout` elapses.
/// - **Half-Open**: calls are let through; one success closes the circuit,
///   one counted failure reopens it.
///
/// State transitions happen under a lock that is never held across the
/// wrapped operation, so a transition is never split by a suspension point.
///
/// # Example
///
/// ```rust,ignore
/// let breaker = CircuitBreaker::new(CircuitBreakerConfig::new(3, Duration::from_secs(30)))?;
/// let body = breaker.execute(|| fetch(url)).await?;
/// ```
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

// == Probe Slot ==
/// Releases a half-open probe slot if the call ends without settling it.
struct ProbeSlot<'a> {
    state: &'a Mutex<BreakerState>,
    epoch: u64,
}

impl Drop for ProbeSlot<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        if state.state == CircuitState::HalfOpen && state.half_open_epoch == self.epoch {
            state.probes_in_flight = state.probes_in_flight.saturating_sub(1);
        }
    }
}

impl CircuitBreaker {
    /// Creates a breaker, rejecting a zero threshold or recovery timeout.
    pub fn new(config: CircuitBreakerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: Mutex::new(BreakerState::closed()),
        })
    }

    /// Runs `operation` under the breaker.
    ///
    /// While the circuit is open and the recovery deadline has not passed,
    /// `operation` is never invoked and [`BreakerError::Open`] is returned.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        let _probe = self.admit().map_err(|stats| BreakerError::Open { stats })?;

        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(error) => {
                self.on_failure(&error);
                Err(BreakerError::Operation(error))
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        lock(&self.state).state
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        lock(&self.state).snapshot(Instant::now())
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Closes the circuit and zeroes the failure and success counters.
    pub fn force_reset(&self) {
        let mut state = lock(&self.state);
        state.reset();
        state.success_count = 0;
        info!("Circuit breaker manually reset");
    }

    /// Opens the circuit and arms the recovery deadline.
    pub fn force_open(&self) {
        lock(&self.state).trip(Instant::now(), self.config.recovery_timeout);
        warn!("Circuit breaker manually opened");
    }

    fn admit(&self) -> Result<Option<ProbeSlot<'_>>, CircuitBreakerStats> {
        let now = Instant::now();
        let mut state = lock(&self.state);
        state.total_requests += 1;

        if state.state == CircuitState::Open {
            match state.next_attempt_at {
                Some(deadline) if now < deadline => {
                    debug!("Circuit open, rejecting call");
                    return Err(state.snapshot(now));
                }
                _ => {
                    state.state = CircuitState::HalfOpen;
                    state.next_attempt_at = None;
                    state.half_open_epoch += 1;
                    state.probes_in_flight = 0;
                    info!("Circuit breaker half-open, probing");
                }
            }
        }

        if state.state == CircuitState::HalfOpen {
            if let Some(max_probes) = self.config.half_open_max_probes {
                if state.probes_in_flight >= max_probes {
                    debug!("Half-open probe limit reached, rejecting call");
                    return Err(state.snapshot(now));
                }
                state.probes_in_flight += 1;
                return Ok(Some(ProbeSlot {
                    state: &self.state,
                    epoch: state.half_open_epoch,
                }));
            }
        }

        Ok(None)
    }

    fn on_success(&self) {
        let mut state = lock(&self.state);
        state.success_count += 1;

        if state.state == CircuitState::HalfOpen {
            state.reset();
            info!("Circuit breaker closed after successful probe");
        }
    }

    fn on_failure(&self, error: &(dyn std::error::Error + 'static)) {
        if self.config.is_expected(error) {
            debug!(error = %error, "Expected error, not counted by circuit breaker");
            return;
        }

        let now = Instant::now();
        let mut state = lock(&self.state);
        state.failure_count += 1;
        state.last_failure_at = Some(Utc::now());

        if state.state == CircuitState::HalfOpen
            || state.failure_count >= self.config.failure_threshold
        {
            state.trip(now, self.config.recovery_timeout);
            warn!(
                failures = state.failure_count,
                recovery_ms = self.config.recovery_timeout.as_millis() as u64,
                error = %error,
                "Circuit breaker opened"
            );
        }
    }
}
