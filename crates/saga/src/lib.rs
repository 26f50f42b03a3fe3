//! Create-rental saga orchestration for the gateway.
//!
//! Booking a rental spans three independently-owned services with no shared
//! transaction: charge a payment, create the rental record, reserve the car.
//! This crate drives that sequence as a saga with per-step compensations,
//! de-duplicates retried requests through an idempotency store, and composes
//! the read-side view of a rental from the same downstream services.
//!
//! If a step fails, the side effects of previously completed steps are
//! cancelled best-effort; the client always receives the error of the step
//! that failed, never the compensation's own outcome.

pub mod aggregator;
pub mod error;
pub mod orchestrator;
pub mod record;
pub mod state;
pub mod store;

pub use aggregator::{CarSummary, RentalReader, RentalSummary};
pub use error::GatewayError;
pub use orchestrator::{BookingRequest, BookingView, RentalSaga};
pub use record::SagaRecord;
pub use state::SagaState;
pub use store::{BeginOutcome, InMemorySagaStore, SagaStore};
