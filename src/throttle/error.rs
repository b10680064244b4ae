//! Throttler error kinds.

use thiserror::Error;

use crate::throttle::ThrottleStats;

// == Rejection ==
/// Reasons the throttler refused or abandoned a request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThrottleRejection {
    /// Queue at capacity with backpressure disabled
    #[error("Request queue is full ({} queued)", .0.current_queue_size)]
    QueueFull(ThrottleStats),

    /// Backpressure wait for queue headroom ran out
    #[error("Timeout waiting for queue space")]
    QueueTimeout(ThrottleStats),

    /// Item aged past `request_timeout` before dispatch
    #[error("Request timeout while queued")]
    RequestTimeout(ThrottleStats),

    /// Queue was cleared or the throttler stopped before dispatch
    #[error("Queue cleared")]
    QueueCleared(ThrottleStats),

    /// The throttler stopped while the caller waited for queue space
    #[error("Throttler stopped")]
    Stopped,
}

impl ThrottleRejection {
    pub fn stats(&self) -> Option<&ThrottleStats> {
        match self {
            ThrottleRejection::QueueFull(stats)
            | ThrottleRejection::QueueTimeout(stats)
            | ThrottleRejection::RequestTimeout(stats)
            | ThrottleRejection::QueueCleared(stats) => Some(stats),
            ThrottleRejection::Stopped => None,
        }
    }
}

// == Throttle Error ==
/// Error returned by [`RequestThrottler::throttle`](super::RequestThrottler::throttle).
#[derive(Error, Debug)]
pub enum ThrottleError<E> {
    /// The throttler refused the request; the work never ran
    #[error(transparent)]
    Rejected(#[from] ThrottleRejection),

    /// The work ran and failed
    #[error(transparent)]
    Operation(E),
}

impl<E> ThrottleError<E> {
    pub fn rejection(&self) -> Option<&ThrottleRejection> {
        match self {
            ThrottleError::Rejected(rejection) => Some(rejection),
            ThrottleError::Operation(_) => None,
        }
    }
}
