//! Throttler configuration.

use std::time::Duration;

use crate::error::ConfigError;

// == Constants ==
/// Interval between backpressure checks for queue headroom.
pub const BACKPRESSURE_POLL_INTERVAL: Duration = Duration::from_millis(100);

// == Throttle Config ==
/// Construction options for a [`RequestThrottler`](super::RequestThrottler).
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleConfig {
    /// Dispatch rate; consecutive starts are `1000 / rate` ms apart
    pub max_requests_per_second: f64,
    /// Queued (not yet dispatched) items allowed at once
    pub max_queue_size: usize,
    /// Budget for waiting in the queue and for backpressure waits
    pub request_timeout: Duration,
    /// Wait for headroom instead of rejecting when the queue is full
    pub enable_backpressure: bool,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_requests_per_second: 10.0,
            max_queue_size: 100,
            request_timeout: Duration::from_secs(30),
            enable_backpressure: false,
        }
    }
}

impl ThrottleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_requests_per_second.is_finite() || self.max_requests_per_second <= 0.0 {
            return Err(ConfigError::invalid(
                "max_requests_per_second",
                "must be a positive number",
            ));
        }
        if self.max_queue_size == 0 {
            return Err(ConfigError::invalid("max_queue_size", "must be greater than 0"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid("request_timeout", "must be greater than 0"));
        }
        Ok(())
    }

    /// Minimum gap between the starts of two dispatches.
    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.max_requests_per_second)
    }
}
