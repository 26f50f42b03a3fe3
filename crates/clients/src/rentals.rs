//! Rental record service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{BearerToken, CarId, PaymentId, RentalId, RentalStatus};
use serde::Serialize;

use crate::error::ClientError;
use crate::views::RentalView;

pub(crate) const SERVICE: &str = "Rental";

/// Payload for creating a rental record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRental {
    pub car_uid: CarId,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub payment_uid: PaymentId,
}

/// Operations the gateway performs against the rental service.
#[async_trait]
pub trait RentalsService: Send + Sync {
    /// Creates a rental record referencing an existing payment.
    async fn create_rental(
        &self,
        rental: &NewRental,
        token: &BearerToken,
    ) -> Result<RentalId, ClientError>;

    /// Fetches one rental owned by the caller.
    async fn get_rental(
        &self,
        id: RentalId,
        token: &BearerToken,
    ) -> Result<RentalView, ClientError>;

    /// Lists the caller's rentals.
    async fn list_rentals(&self, token: &BearerToken) -> Result<Vec<RentalView>, ClientError>;

    /// Marks a rental finished.
    async fn finish_rental(&self, id: RentalId, token: &BearerToken) -> Result<(), ClientError>;

    /// Cancels a rental.
    async fn cancel_rental(&self, id: RentalId, token: &BearerToken) -> Result<(), ClientError>;
}

#[async_trait]
impl<T: RentalsService + ?Sized> RentalsService for Arc<T> {
    async fn create_rental(
        &self,
        rental: &NewRental,
        token: &BearerToken,
    ) -> Result<RentalId, ClientError> {
        (**self).create_rental(rental, token).await
    }

    async fn get_rental(
        &self,
        id: RentalId,
        token: &BearerToken,
    ) -> Result<RentalView, ClientError> {
        (**self).get_rental(id, token).await
    }

    async fn list_rentals(&self, token: &BearerToken) -> Result<Vec<RentalView>, ClientError> {
        (**self).list_rentals(token).await
    }

    async fn finish_rental(&self, id: RentalId, token: &BearerToken) -> Result<(), ClientError> {
        (**self).finish_rental(id, token).await
    }

    async fn cancel_rental(&self, id: RentalId, token: &BearerToken) -> Result<(), ClientError> {
        (**self).cancel_rental(id, token).await
    }
}

#[derive(Debug, Default)]
struct InMemoryRentalsState {
    // owner token -> rentals keyed by id
    rentals: HashMap<RentalId, (String, RentalView)>,
    unavailable: bool,
    fail_on_create: bool,
}

/// In-memory rental service for testing.
///
/// Ownership is tracked by the raw bearer token: listing returns only the
/// rentals created with the same token.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRentalsService {
    state: Arc<RwLock<InMemoryRentalsState>>,
}

impl InMemoryRentalsService {
    /// Creates a new in-memory rental service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with a transport-style error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unwrap().unavailable = unavailable;
    }

    /// Makes only create calls fail with a transport-style error.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Returns the stored rental, if any.
    pub fn rental(&self, id: RentalId) -> Option<RentalView> {
        self.state
            .read()
            .unwrap()
            .rentals
            .get(&id)
            .map(|(_, r)| r.clone())
    }

    /// Number of rentals currently in `IN_PROGRESS` status.
    pub fn in_progress_count(&self) -> usize {
        self.state
            .read()
            .unwrap()
            .rentals
            .values()
            .filter(|(_, r)| r.status == RentalStatus::InProgress)
            .count()
    }

    fn check_available(state: &InMemoryRentalsState) -> Result<(), ClientError> {
        if state.unavailable {
            return Err(ClientError::Unavailable {
                service: SERVICE,
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    fn set_status(&self, id: RentalId, status: RentalStatus) -> Result<(), ClientError> {
        let mut state = self.state.write().unwrap();
        Self::check_available(&state)?;
        match state.rentals.get_mut(&id) {
            Some((_, rental)) => {
                rental.status = status;
                Ok(())
            }
            None => Err(ClientError::NotFound { service: SERVICE }),
        }
    }
}

#[async_trait]
impl RentalsService for InMemoryRentalsService {
    async fn create_rental(
        &self,
        rental: &NewRental,
        token: &BearerToken,
    ) -> Result<RentalId, ClientError> {
        let mut state = self.state.write().unwrap();
        Self::check_available(&state)?;
        if state.fail_on_create {
            return Err(ClientError::Unavailable {
                service: SERVICE,
                reason: "connection reset".to_string(),
            });
        }
        let view = RentalView {
            rental_uid: RentalId::new(),
            payment_uid: rental.payment_uid,
            car_uid: rental.car_uid,
            date_from: rental.date_from,
            date_to: rental.date_to,
            status: RentalStatus::InProgress,
        };
        let id = view.rental_uid;
        state
            .rentals
            .insert(id, (token.as_str().to_string(), view));
        Ok(id)
    }

    async fn get_rental(
        &self,
        id: RentalId,
        _token: &BearerToken,
    ) -> Result<RentalView, ClientError> {
        let state = self.state.read().unwrap();
        Self::check_available(&state)?;
        state
            .rentals
            .get(&id)
            .map(|(_, r)| r.clone())
            .ok_or(ClientError::NotFound { service: SERVICE })
    }

    async fn list_rentals(&self, token: &BearerToken) -> Result<Vec<RentalView>, ClientError> {
        let state = self.state.read().unwrap();
        Self::check_available(&state)?;
        let mut rentals: Vec<RentalView> = state
            .rentals
            .values()
            .filter(|(owner, _)| owner == token.as_str())
            .map(|(_, r)| r.clone())
            .collect();
        rentals.sort_by_key(|r| r.rental_uid.as_uuid());
        Ok(rentals)
    }

    async fn finish_rental(&self, id: RentalId, _token: &BearerToken) -> Result<(), ClientError> {
        self.set_status(id, RentalStatus::Finished)
    }

    async fn cancel_rental(&self, id: RentalId, _token: &BearerToken) -> Result<(), ClientError> {
        self.set_status(id, RentalStatus::Canceled)
    }
}
