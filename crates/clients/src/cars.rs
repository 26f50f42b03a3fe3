//! Car catalog service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{BearerToken, CarId};

use crate::error::ClientError;
use crate::views::{CarPage, CarView};

pub(crate) const SERVICE: &str = "Cars";

/// Operations the gateway performs against the car catalog service.
#[async_trait]
pub trait CarsService: Send + Sync {
    /// Fetches a single car.
    async fn get_car(&self, id: CarId, token: &BearerToken) -> Result<CarView, ClientError>;

    /// Lists a page of the catalog. `show_all` includes reserved cars.
    async fn list_cars(
        &self,
        page: u32,
        size: u32,
        show_all: bool,
        token: &BearerToken,
    ) -> Result<CarPage, ClientError>;

    /// Marks a car reserved.
    async fn reserve(&self, id: CarId, token: &BearerToken) -> Result<(), ClientError>;

    /// Releases a previously reserved car.
    async fn release(&self, id: CarId, token: &BearerToken) -> Result<(), ClientError>;
}

#[async_trait]
impl<T: CarsService + ?Sized> CarsService for Arc<T> {
    async fn get_car(&self, id: CarId, token: &BearerToken) -> Result<CarView, ClientError> {
        (**self).get_car(id, token).await
    }

    async fn list_cars(
        &self,
        page: u32,
        size: u32,
        show_all: bool,
        token: &BearerToken,
    ) -> Result<CarPage, ClientError> {
        (**self).list_cars(page, size, show_all, token).await
    }

    async fn reserve(&self, id: CarId, token: &BearerToken) -> Result<(), ClientError> {
        (**self).reserve(id, token).await
    }

    async fn release(&self, id: CarId, token: &BearerToken) -> Result<(), ClientError> {
        (**self).release(id, token).await
    }
}

#[derive(Debug, Default)]
struct InMemoryCarsState {
    cars: HashMap<CarId, CarView>,
    unavailable: bool,
    fail_on_reserve: bool,
    get_calls: u32,
}

/// In-memory car catalog for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCarsService {
    state: Arc<RwLock<InMemoryCarsState>>,
}

impl InMemoryCarsService {
    /// Creates an empty in-memory catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a car and returns its identifier.
    pub fn add_car(&self, car: CarView) -> CarId {
        let id = car.car_uid;
        self.state.write().unwrap().cars.insert(id, car);
        id
    }

    /// Makes every call fail with a transport-style error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unwrap().unavailable = unavailable;
    }

    /// Makes only reserve calls fail with a transport-style error.
    pub fn set_fail_on_reserve(&self, fail: bool) {
        self.state.write().unwrap().fail_on_reserve = fail;
    }

    /// Returns true if the car exists and is currently reserved.
    pub fn is_reserved(&self, id: CarId) -> bool {
        self.state
            .read()
            .unwrap()
            .cars
            .get(&id)
            .is_some_and(|c| !c.available)
    }

    /// Number of `get_car` calls observed.
    pub fn get_call_count(&self) -> u32 {
        self.state.read().unwrap().get_calls
    }

    fn check_available(state: &InMemoryCarsState) -> Result<(), ClientError> {
        if state.unavailable {
            return Err(ClientError::Unavailable {
                service: SERVICE,
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CarsService for InMemoryCarsService {
    async fn get_car(&self, id: CarId, _token: &BearerToken) -> Result<CarView, ClientError> {
        let mut state = self.state.write().unwrap();
        state.get_calls += 1;
        Self::check_available(&state)?;
        state
            .cars
            .get(&id)
            .cloned()
            .ok_or(ClientError::NotFound { service: SERVICE })
    }

    async fn list_cars(
        &self,
        page: u32,
        size: u32,
        show_all: bool,
        _token: &BearerToken,
    ) -> Result<CarPage, ClientError> {
        let state = self.state.read().unwrap();
        Self::check_available(&state)?;
        let mut all: Vec<CarView> = state
            .cars
            .values()
            .filter(|c| show_all || c.available)
            .cloned()
            .collect();
        all.sort_by_key(|c| c.car_uid.as_uuid());
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(((page.max(1) - 1) * size) as usize)
            .take(size as usize)
            .collect();
        Ok(CarPage {
            page,
            page_size: size,
            total_elements: total,
            items,
        })
    }

    async fn reserve(&self, id: CarId, _token: &BearerToken) -> Result<(), ClientError> {
        let mut state = self.state.write().unwrap();
        Self::check_available(&state)?;
        if state.fail_on_reserve {
            return Err(ClientError::Unavailable {
                service: SERVICE,
                reason: "connection reset".to_string(),
            });
        }
        match state.cars.get_mut(&id) {
            Some(car) => {
                car.available = false;
                Ok(())
            }
            None => Err(ClientError::NotFound { service: SERVICE }),
        }
    }

    async fn release(&self, id: CarId, _token: &BearerToken) -> Result<(), ClientError> {
        let mut state = self.state.write().unwrap();
        Self::check_available(&state)?;
        match state.cars.get_mut(&id) {
            Some(car) => {
                car.available = true;
                Ok(())
            }
            None => Err(ClientError::NotFound { service: SERVICE }),
        }
    }
}
