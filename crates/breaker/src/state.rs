//! Breaker state machine.

/// The state of a circuit breaker.
///
/// State transitions:
/// ```text
/// Closed ──(threshold failures)──► Open ──(reset timeout)──► HalfOpen
///   ▲                               ▲                            │
///   └───────(probe success)─────────┼────────(probe failure)─────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BreakerState {
    /// Calls pass through; consecutive failures are counted.
    #[default]
    Closed,

    /// Calls are rejected immediately until the reset timeout elapses.
    Open,

    /// Exactly one probe call is allowed through.
    HalfOpen,
}

impl BreakerState {
    /// Returns true if calls are admitted without a timer check.
    pub fn admits_calls(&self) -> bool {
        matches!(self, BreakerState::Closed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half-open",
        }
    }
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
