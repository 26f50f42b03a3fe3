//! Read-side aggregation of rental, car and payment views.

use chrono::NaiveDate;
use clients::{CarView, CarsService, PaymentView, PaymentsService, RentalView, RentalsService};
use common::{BearerToken, CarId, PaymentStatus, RentalId, RentalStatus};
use serde::Serialize;

use crate::error::GatewayError;

/// The car fields exposed in aggregated rental views.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarSummary {
    pub car_uid: CarId,
    pub brand: String,
    pub model: String,
    pub registration_number: String,
}

impl From<CarView> for CarSummary {
    fn from(car: CarView) -> Self {
        Self {
            car_uid: car.car_uid,
            brand: car.brand,
            model: car.model,
            registration_number: car.registration_number,
        }
    }
}

/// One rental composed with its car and payment views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalSummary {
    pub rental_uid: RentalId,
    pub status: RentalStatus,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub car: CarSummary,
    pub payment: PaymentView,
}

/// Composes rental views for the read endpoints.
///
/// A rental read never fails because the payment service is down: the
/// payment part degrades to a placeholder instead. Car fetches are part of
/// the primary resource and do propagate errors.
pub struct RentalReader<C, P, R> {
    cars: C,
    payments: P,
    rentals: R,
}

impl<C, P, R> RentalReader<C, P, R>
where
    C: CarsService,
    P: PaymentsService,
    R: RentalsService,
{
    pub fn new(cars: C, payments: P, rentals: R) -> Self {
        Self {
            cars,
            payments,
            rentals,
        }
    }

    /// Returns the aggregated view of one rental.
    #[tracing::instrument(skip(self, token))]
    pub async fn get_rental(
        &self,
        token: &BearerToken,
        rental_id: RentalId,
    ) -> Result<RentalSummary, GatewayError> {
        let rental = self.rentals.get_rental(rental_id, token).await?;
        self.compose(token, rental).await
    }

    /// Returns the aggregated views of all the caller's rentals.
    ///
    /// Payment degradation applies per item independently.
    #[tracing::instrument(skip(self, token))]
    pub async fn list_rentals(
        &self,
        token: &BearerToken,
    ) -> Result<Vec<RentalSummary>, GatewayError> {
        let rentals = self.rentals.list_rentals(token).await?;
        let mut summaries = Vec::with_capacity(rentals.len());
        for rental in rentals {
            summaries.push(self.compose(token, rental).await?);
        }
        Ok(summaries)
    }

    async fn compose(
        &self,
        token: &BearerToken,
        rental: RentalView,
    ) -> Result<RentalSummary, GatewayError> {
        let car = self.cars.get_car(rental.car_uid, token).await?;
        let payment = self.payment_view(token, &rental).await;
        Ok(RentalSummary {
            rental_uid: rental.rental_uid,
            status: rental.status,
            date_from: rental.date_from,
            date_to: rental.date_to,
            car: car.into(),
            payment,
        })
    }

    /// Fetches the payment, degrading instead of failing.
    ///
    /// A canceled rental's payment may already be gone; it is reported as
    /// `CANCELED` either way, carrying the fetched price when one was
    /// obtained. For live rentals an unreachable payment service yields an
    /// `UNKNOWN`/price-0 placeholder.
    async fn payment_view(&self, token: &BearerToken, rental: &RentalView) -> PaymentView {
        match self.payments.get_payment(rental.payment_uid, token).await {
            Ok(payment) if rental.status == RentalStatus::Canceled => PaymentView {
                payment_uid: payment.payment_uid,
                status: PaymentStatus::Canceled,
                price: payment.price,
            },
            Ok(payment) => payment,
            Err(e) => {
                tracing::warn!(
                    payment_uid = %rental.payment_uid,
                    error = %e,
                    "payment view degraded"
                );
                PaymentView {
                    payment_uid: rental.payment_uid,
                    status: if rental.status == RentalStatus::Canceled {
                        PaymentStatus::Canceled
                    } else {
                        PaymentStatus::Unknown
                    },
                    price: 0,
                }
            }
        }
    }
}
