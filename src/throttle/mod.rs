//! Request throttling: paced dispatch, bounded queue and backpressure.

mod config;
mod error;
mod stats;
mod throttler;

pub use config::{ThrottleConfig, BACKPRESSURE_POLL_INTERVAL};
pub use error::{ThrottleError, ThrottleRejection};
pub use stats::{ThrottleStats, RESPONSE_TIME_WINDOW};
pub use throttler::RequestThrottler;
