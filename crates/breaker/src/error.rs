//! Breaker error type.

use thiserror::Error;

/// Result of a breaker-guarded call that did not succeed.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker is open (or a half-open probe is already in flight) and
    /// the call was rejected without reaching the dependency.
    #[error("{service} circuit breaker is open")]
    Rejected {
        /// Name of the guarded dependency.
        service: &'static str,
    },

    /// The call went through and the dependency returned an error.
    #[error(transparent)]
    Inner(E),
}

impl<E> BreakerError<E> {
    /// Returns true if the call never reached the dependency.
    pub fn is_rejected(&self) -> bool {
        matches!(self, BreakerError::Rejected { .. })
    }
}
