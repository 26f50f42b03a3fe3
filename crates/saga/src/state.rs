//! Saga state machine.

use serde::{Deserialize, Serialize};

/// The state of a create-rental saga.
///
/// State transitions:
/// ```text
/// Started ──► PaymentCreated ──► RentalCreated ──► Completed
///    │               │                 │
///    └───────────────┴─────────────────┴──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    /// The saga record exists; no side effect has been made yet.
    #[default]
    Started,

    /// The payment has been charged.
    PaymentCreated,

    /// The rental record has been created.
    RentalCreated,

    /// All three side effects exist (terminal state).
    Completed,

    /// The attempt failed; completed steps were compensated (terminal state).
    Failed,
}

impl SagaState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaState::Completed | SagaState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Started => "Started",
            SagaState::PaymentCreated => "PaymentCreated",
            SagaState::RentalCreated => "RentalCreated",
            SagaState::Completed => "Completed",
            SagaState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
