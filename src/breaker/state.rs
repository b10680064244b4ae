//! Circuit breaker state and stats.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

// == Circuit State ==
/// Position in the breaker's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls pass through, failures are counted
    Closed,
    /// Calls are rejected until the recovery timeout elapses
    Open,
    /// Recovery timeout elapsed; the next outcome decides
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Mutable state of one breaker, only touched under its lock.
#[derive(Debug, Clone)]
pub(crate) struct BreakerState {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u64,
    pub total_requests: u64,
    /// Armed only while `state == Open`
    pub next_attempt_at: Option<Instant>,
    pub last_failure_at: Option<DateTime<Utc>>,
    /// Calls admitted while half-open and not yet settled
    pub probes_in_flight: u32,
    /// Bumped on every entry into HALF_OPEN
    pub half_open_epoch: u64,
}

impl BreakerState {
    pub fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            total_requests: 0,
            next_attempt_at: None,
            last_failure_at: None,
            probes_in_flight: 0,
            half_open_epoch: 0,
        }
    }

    /// Back to CLOSED with the failure streak cleared.
    pub fn reset(&mut self) {
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.next_attempt_at = None;
        self.probes_in_flight = 0;
    }

    pub fn trip(&mut self, now: Instant, recovery_timeout: Duration) {
        self.state = CircuitState::Open;
        self.next_attempt_at = Some(now + recovery_timeout);
        self.probes_in_flight = 0;
    }

    pub fn snapshot(&self, now: Instant) -> CircuitBreakerStats {
        CircuitBreakerStats {
            state: self.state,
            failure_count: self.failure_count,
            success_count: self.success_count,
            total_requests: self.total_requests,
            retry_after_ms: self
                .next_attempt_at
                .map(|at| at.saturating_duration_since(now).as_millis() as u64)
                .unwrap_or(0),
            next_attempt_at: self.next_attempt_at,
            last_failure_at: self.last_failure_at,
        }
    }
}

// == Breaker Stats ==
/// Snapshot of a breaker, also attached to open-circuit rejections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u64,
    pub total_requests: u64,
    /// Time left until a probe is allowed, 0 when not armed
    pub retry_after_ms: u64,
    #[serde(skip)]
    pub next_attempt_at: Option<Instant>,
    pub last_failure_at: Option<DateTime<Utc>>,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(CircuitState::Closed.to_string(), "CLOSED");
        assert_eq!(CircuitState::HalfOpen.to_string(), "HALF_OPEN");
    }

    #[tokio::test(start_paused = true)]
    async fn test_trip_arms_and_reset_disarms() {
        let mut state = BreakerState::closed();
        let now = Instant::now();

        state.trip(now, Duration::from_secs(30));
        let stats = state.snapshot(now);
        assert_eq!(stats.state, CircuitState::Open);
        assert_eq!(stats.retry_after_ms, 30_000);

        state.reset();
        let stats = state.snapshot(now);
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.retry_after_ms, 0);
        assert!(stats.next_attempt_at.is_none());
    }

    #[test]
    fn test_stats_serialize_state_name() {
        let stats = BreakerState::closed().snapshot(Instant::now());
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["state"], "CLOSED");
        assert!(json.get("next_attempt_at").is_none());
    }
}
