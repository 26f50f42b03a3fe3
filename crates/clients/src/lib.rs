//! Typed downstream client adapters.
//!
//! Each downstream dependency (cars, payments, rentals, identity) is
//! described by an async trait. Production implementations speak HTTP
//! through a per-dependency circuit breaker; in-memory implementations with
//! failure switches back the test suites.

pub mod cars;
pub mod error;
pub mod http;
pub mod identity;
pub mod payments;
pub mod rentals;
pub mod views;

pub use cars::{CarsService, InMemoryCarsService};
pub use error::ClientError;
pub use http::{HttpCarsService, HttpIdentityService, HttpPaymentsService, HttpRentalsService};
pub use identity::{IdentityService, StaticIdentityService};
pub use payments::{InMemoryPaymentsService, PaymentsService};
pub use rentals::{InMemoryRentalsService, NewRental, RentalsService};
pub use views::{CarPage, CarView, PaymentView, RentalView};
