//! HTTP route handlers.

pub mod cars;
pub mod health;
pub mod metrics;
pub mod rentals;
