//! Gateway error taxonomy.

use clients::ClientError;
use common::PeriodError;
use thiserror::Error;

/// Errors surfaced by the orchestrator and the read aggregator.
///
/// This is the closed set the HTTP layer maps to response statuses. Every
/// dependency error arrives here already classified by the client adapters.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed request: unparsable dates or a non-positive duration.
    /// No side effect was made.
    #[error("invalid request: {0}")]
    InvalidInput(String),

    /// The caller's credential was rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// A downstream dependency is unreachable, timing out, or shedding
    /// load behind an open breaker. Safe to retry later.
    #[error("{service} Service unavailable")]
    DependencyUnavailable { service: &'static str },

    /// A downstream resource does not exist.
    #[error("{service} resource not found")]
    ResourceNotFound { service: &'static str },

    /// A saga for the same request id has not reached a terminal state yet;
    /// concurrent duplicates are rejected rather than queued.
    #[error("a booking for this request id is already in progress")]
    SagaInProgress,

    /// A later saga step failed and the completed steps were rolled back.
    /// Compensation outcomes are logged, never surfaced here.
    #[error("booking failed at step '{step}'; completed steps were rolled back")]
    SagaCompensated { step: &'static str },

    /// Unexpected internal fault (undecodable downstream response,
    /// inconsistent saga record).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ClientError> for GatewayError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unavailable { service, .. } => {
                GatewayError::DependencyUnavailable { service }
            }
            // An unexpected status means the dependency is misbehaving;
            // treat it like unavailability so the caller may retry.
            ClientError::Protocol { service, .. } => {
                GatewayError::DependencyUnavailable { service }
            }
            ClientError::NotFound { service } => GatewayError::ResourceNotFound { service },
            ClientError::Unauthorized => GatewayError::Unauthorized,
            ClientError::Decode { service } => {
                GatewayError::Internal(format!("{service} returned an undecodable response"))
            }
        }
    }
}

impl From<PeriodError> for GatewayError {
    fn from(err: PeriodError) -> Self {
        GatewayError::InvalidInput(err.to_string())
    }
}
