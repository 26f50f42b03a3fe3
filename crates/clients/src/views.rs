//! Read-only views returned by the downstream services.
//!
//! The gateway never persists these; it decodes them off the wire and
//! composes them per response. Field names follow the downstream services'
//! camelCase JSON contract.

use chrono::NaiveDate;
use common::{CarId, PaymentId, PaymentStatus, RentalId, RentalStatus};
use serde::{Deserialize, Serialize};

/// A car as reported by the car catalog service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarView {
    pub car_uid: CarId,
    pub brand: String,
    pub model: String,
    pub registration_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<i32>,
    /// Price per rental day.
    pub price: i64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub car_type: Option<String>,
    pub available: bool,
}

impl CarView {
    /// Creates an available car with a fresh identifier.
    pub fn new(
        brand: impl Into<String>,
        model: impl Into<String>,
        registration_number: impl Into<String>,
        price: i64,
    ) -> Self {
        Self {
            car_uid: CarId::new(),
            brand: brand.into(),
            model: model.into(),
            registration_number: registration_number.into(),
            power: None,
            price,
            car_type: None,
            available: true,
        }
    }
}

/// One page of the car catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarPage {
    pub page: u32,
    pub page_size: u32,
    pub total_elements: u64,
    pub items: Vec<CarView>,
}

/// A payment as reported by the payment service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub payment_uid: PaymentId,
    pub status: PaymentStatus,
    pub price: i64,
}

/// A rental record as reported by the rental service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalView {
    pub rental_uid: RentalId,
    pub payment_uid: PaymentId,
    pub car_uid: CarId,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub status: RentalStatus,
}
