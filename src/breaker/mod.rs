//! Circuit breaker for protected remote calls.
//!
//! CLOSED --(N counted failures)--> OPEN --(recovery timeout)--> HALF_OPEN
//! --(success)--> CLOSED, and HALF_OPEN --(any counted failure)--> OPEN.

mod breaker;
mod config;
mod state;

pub use breaker::{BreakerError, CircuitBreaker};
pub use config::{CircuitBreakerConfig, ExpectedErrorPredicate};
pub use state::{CircuitBreakerStats, CircuitState};
