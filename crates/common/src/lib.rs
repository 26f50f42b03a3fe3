//! Shared types for the car-rental gateway.
//!
//! Typed identifiers for the three downstream resources, the validated
//! rental period, resource status enums, and the authentication types
//! carried through every request.

pub mod auth;
pub mod ids;
pub mod period;
pub mod status;

pub use auth::{BearerToken, Principal};
pub use ids::{CarId, PaymentId, RentalId, RequestId};
pub use period::{PeriodError, RentalPeriod};
pub use status::{PaymentStatus, RentalStatus};
