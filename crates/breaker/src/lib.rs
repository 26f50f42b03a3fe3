//! Circuit breaker for downstream dependency calls.
//!
//! One [`CircuitBreaker`] instance guards one downstream dependency and is
//! shared across all requests to it. After a configured number of
//! consecutive failures the breaker opens and rejects calls without touching
//! the network; after a cooldown it lets exactly one probe through to decide
//! whether the dependency has recovered.

pub mod breaker;
pub mod error;
pub mod state;

pub use breaker::{BreakerConfig, CircuitBreaker, Classify};
pub use error::BreakerError;
pub use state::BreakerState;
