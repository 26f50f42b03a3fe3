//! Closed error set returned by all downstream client adapters.
//!
//! The orchestrator and aggregator branch on these kinds instead of
//! inspecting transport details at every call site.

use breaker::{BreakerError, Classify};
use thiserror::Error;

/// Error returned by a downstream client adapter.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The dependency could not be reached: connection failure, timeout,
    /// 5xx, or its circuit breaker rejected the call.
    #[error("{service} service unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },

    /// The dependency answered 404 for the requested resource.
    #[error("{service} resource not found")]
    NotFound { service: &'static str },

    /// The dependency rejected the caller's credential.
    #[error("unauthorized")]
    Unauthorized,

    /// The dependency answered with a status the adapter does not expect.
    #[error("{service} returned unexpected status {status}")]
    Protocol { service: &'static str, status: u16 },

    /// The dependency answered 2xx but the body could not be decoded.
    #[error("{service} returned an undecodable response")]
    Decode { service: &'static str },
}

impl ClientError {
    /// Name of the dependency that produced this error, when known.
    pub fn service(&self) -> Option<&'static str> {
        match self {
            ClientError::Unavailable { service, .. }
            | ClientError::NotFound { service }
            | ClientError::Protocol { service, .. }
            | ClientError::Decode { service } => Some(service),
            ClientError::Unauthorized => None,
        }
    }
}

impl Classify for ClientError {
    fn is_breaker_failure(&self) -> bool {
        // 404 and 401 are valid business outcomes; a single missing
        // resource must never open the breaker.
        matches!(
            self,
            ClientError::Unavailable { .. } | ClientError::Protocol { .. }
        )
    }
}

impl From<BreakerError<ClientError>> for ClientError {
    fn from(err: BreakerError<ClientError>) -> Self {
        match err {
            BreakerError::Rejected { service } => ClientError::Unavailable {
                service,
                reason: "circuit breaker open".to_string(),
            },
            BreakerError::Inner(e) => e,
        }
    }
}
