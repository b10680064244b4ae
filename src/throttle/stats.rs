//! Throttler statistics.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

// == Constants ==
/// Number of response-time samples kept for the rolling mean.
pub const RESPONSE_TIME_WINDOW: usize = 100;

// == Throttle Stats ==
/// Snapshot of a throttler, also attached to its rejections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThrottleStats {
    pub current_queue_size: usize,
    pub active_requests: usize,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub dropped_requests: u64,
    /// Mean over the last [`RESPONSE_TIME_WINDOW`] settled calls, in ms
    pub average_response_time: f64,
}

/// Rolling window of response times.
#[derive(Debug, Default)]
pub(crate) struct ResponseTimes {
    samples: VecDeque<Duration>,
}

impl ResponseTimes {
    pub fn record(&mut self, elapsed: Duration) {
        if self.samples.len() == RESPONSE_TIME_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(elapsed);
    }

    pub fn mean_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: f64 = self.samples.iter().map(|d| d.as_secs_f64() * 1000.0).sum();
        total / self.samples.len() as f64
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_of_empty_window() {
        assert_eq!(ResponseTimes::default().mean_ms(), 0.0);
    }

    #[test]
    fn test_window_keeps_last_samples() {
        let mut times = ResponseTimes::default();
        for _ in 0..RESPONSE_TIME_WINDOW {
            times.record(Duration::from_millis(1000));
        }
        for _ in 0..RESPONSE_TIME_WINDOW {
            times.record(Duration::from_millis(10));
        }
        assert!((times.mean_ms() - 10.0).abs() < 1e-9);

        times.record(Duration::from_millis(110));
        assert!((times.mean_ms() - 11.0).abs() < 1e-9);
    }
}
