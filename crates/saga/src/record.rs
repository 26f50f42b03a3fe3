//! Saga progress record.

use chrono::{DateTime, Utc};
use common::{CarId, PaymentId, RentalId, RentalPeriod, RequestId};
use serde::{Deserialize, Serialize};

use crate::state::SagaState;

/// Progress of one create-rental saga, keyed by its idempotency key.
///
/// Created on first receipt of a request for the key and mutated only by
/// the orchestrator as steps complete. Identifiers produced by completed
/// steps are recorded so they can be compensated or replayed later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaRecord {
    pub request_id: RequestId,
    pub car_id: CarId,
    pub period: RentalPeriod,
    pub total_price: i64,
    pub state: SagaState,
    pub payment_id: Option<PaymentId>,
    pub rental_id: Option<RentalId>,
    /// Set when the record reaches a terminal state; drives retention.
    pub finished_at: Option<DateTime<Utc>>,
}

impl SagaRecord {
    /// Creates a fresh record in the `Started` state.
    pub fn started(
        request_id: RequestId,
        car_id: CarId,
        period: RentalPeriod,
        total_price: i64,
    ) -> Self {
        Self {
            request_id,
            car_id,
            period,
            total_price,
            state: SagaState::Started,
            payment_id: None,
            rental_id: None,
            finished_at: None,
        }
    }

    /// Records the charged payment.
    pub fn payment_created(&mut self, payment_id: PaymentId) {
        self.state = SagaState::PaymentCreated;
        self.payment_id = Some(payment_id);
    }

    /// Records the created rental.
    pub fn rental_created(&mut self, rental_id: RentalId) {
        self.state = SagaState::RentalCreated;
        self.rental_id = Some(rental_id);
    }

    /// Marks the saga completed.
    pub fn complete(&mut self) {
        self.state = SagaState::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// Marks the saga failed.
    pub fn fail(&mut self) {
        self.state = SagaState::Failed;
        self.finished_at = Some(Utc::now());
    }

    /// Returns true if no further mutation is allowed.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
