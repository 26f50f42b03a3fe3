//! HTTP implementations of the downstream service traits.
//!
//! Every adapter holds a shared `reqwest::Client` (the call timeout is
//! configured on the client), the dependency's base URL, and that
//! dependency's circuit breaker. The caller's bearer credential is forwarded
//! unchanged on every request.

use std::sync::Arc;

use async_trait::async_trait;
use breaker::CircuitBreaker;
use common::{BearerToken, CarId, PaymentId, Principal, RentalId};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::cars::CarsService;
use crate::error::ClientError;
use crate::identity::IdentityService;
use crate::payments::PaymentsService;
use crate::rentals::{NewRental, RentalsService};
use crate::views::{CarPage, CarView, PaymentView, RentalView};
use crate::{cars, identity, payments, rentals};

/// Maps a reqwest transport/decoding error into the closed client set.
fn transport(service: &'static str, err: reqwest::Error) -> ClientError {
    if err.is_decode() {
        tracing::warn!(service, error = %err, "failed to decode downstream response");
        ClientError::Decode { service }
    } else {
        tracing::warn!(service, error = %err, "downstream request failed");
        ClientError::Unavailable {
            service,
            reason: err.to_string(),
        }
    }
}

/// Converts non-2xx statuses into the closed client set.
fn check_status(
    service: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else if status == StatusCode::NOT_FOUND {
        Err(ClientError::NotFound { service })
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(ClientError::Unauthorized)
    } else {
        tracing::warn!(service, status = status.as_u16(), "downstream returned an unexpected status");
        Err(ClientError::Protocol {
            service,
            status: status.as_u16(),
        })
    }
}

fn trim_base(url: impl Into<String>) -> String {
    url.into().trim_end_matches('/').to_string()
}

/// HTTP adapter for the car catalog service.
pub struct HttpCarsService {
    base_url: String,
    http: reqwest::Client,
    breaker: Arc<CircuitBreaker>,
}

impl HttpCarsService {
    pub fn new(
        base_url: impl Into<String>,
        http: reqwest::Client,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            base_url: trim_base(base_url),
            http,
            breaker,
        }
    }
}

#[async_trait]
impl CarsService for HttpCarsService {
    async fn get_car(&self, id: CarId, token: &BearerToken) -> Result<CarView, ClientError> {
        let url = format!("{}/api/v1/cars/{id}", self.base_url);
        self.breaker
            .call(|| async {
                let resp = self
                    .http
                    .get(&url)
                    .bearer_auth(token.as_str())
                    .send()
                    .await
                    .map_err(|e| transport(cars::SERVICE, e))?;
                check_status(cars::SERVICE, resp)?
                    .json()
                    .await
                    .map_err(|e| transport(cars::SERVICE, e))
            })
            .await
            .map_err(Into::into)
    }

    async fn list_cars(
        &self,
        page: u32,
        size: u32,
        show_all: bool,
        token: &BearerToken,
    ) -> Result<CarPage, ClientError> {
        let url = format!("{}/api/v1/cars", self.base_url);
        self.breaker
            .call(|| async {
                let resp = self
                    .http
                    .get(&url)
                    .query(&[
                        ("page", page.to_string()),
                        ("size", size.to_string()),
                        ("showAll", show_all.to_string()),
                    ])
                    .bearer_auth(token.as_str())
                    .send()
                    .await
                    .map_err(|e| transport(cars::SERVICE, e))?;
                check_status(cars::SERVICE, resp)?
                    .json()
                    .await
                    .map_err(|e| transport(cars::SERVICE, e))
            })
            .await
            .map_err(Into::into)
    }

    async fn reserve(&self, id: CarId, token: &BearerToken) -> Result<(), ClientError> {
        let url = format!("{}/api/v1/cars/{id}/reserve", self.base_url);
        self.breaker
            .call(|| async {
                let resp = self
                    .http
                    .put(&url)
                    .bearer_auth(token.as_str())
                    .send()
                    .await
                    .map_err(|e| transport(cars::SERVICE, e))?;
                check_status(cars::SERVICE, resp).map(|_| ())
            })
            .await
            .map_err(Into::into)
    }

    async fn release(&self, id: CarId, token: &BearerToken) -> Result<(), ClientError> {
        let url = format!("{}/api/v1/cars/{id}/release", self.base_url);
        self.breaker
            .call(|| async {
                let resp = self
                    .http
                    .put(&url)
                    .bearer_auth(token.as_str())
                    .send()
                    .await
                    .map_err(|e| transport(cars::SERVICE, e))?;
                check_status(cars::SERVICE, resp).map(|_| ())
            })
            .await
            .map_err(Into::into)
    }
}

/// HTTP adapter for the payment service.
pub struct HttpPaymentsService {
    base_url: String,
    http: reqwest::Client,
    breaker: Arc<CircuitBreaker>,
}

impl HttpPaymentsService {
    pub fn new(
        base_url: impl Into<String>,
        http: reqwest::Client,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            base_url: trim_base(base_url),
            http,
            breaker,
        }
    }
}

#[async_trait]
impl PaymentsService for HttpPaymentsService {
    async fn create_payment(
        &self,
        price: i64,
        token: &BearerToken,
    ) -> Result<PaymentView, ClientError> {
        let url = format!("{}/api/v1/payment", self.base_url);
        self.breaker
            .call(|| async {
                let resp = self
                    .http
                    .post(&url)
                    .json(&serde_json::json!({ "price": price }))
                    .bearer_auth(token.as_str())
                    .send()
                    .await
                    .map_err(|e| transport(payments::SERVICE, e))?;
                check_status(payments::SERVICE, resp)?
                    .json()
                    .await
                    .map_err(|e| transport(payments::SERVICE, e))
            })
            .await
            .map_err(Into::into)
    }

    async fn get_payment(
        &self,
        id: PaymentId,
        token: &BearerToken,
    ) -> Result<PaymentView, ClientError> {
        let url = format!("{}/api/v1/payment/{id}", self.base_url);
        self.breaker
            .call(|| async {
                let resp = self
                    .http
                    .get(&url)
                    .bearer_auth(token.as_str())
                    .send()
                    .await
                    .map_err(|e| transport(payments::SERVICE, e))?;
                check_status(payments::SERVICE, resp)?
                    .json()
                    .await
                    .map_err(|e| transport(payments::SERVICE, e))
            })
            .await
            .map_err(Into::into)
    }

    async fn cancel_payment(&self, id: PaymentId, token: &BearerToken) -> Result<(), ClientError> {
        let url = format!("{}/api/v1/payment/{id}", self.base_url);
        self.breaker
            .call(|| async {
                let resp = self
                    .http
                    .delete(&url)
                    .bearer_auth(token.as_str())
                    .send()
                    .await
                    .map_err(|e| transport(payments::SERVICE, e))?;
                check_status(payments::SERVICE, resp).map(|_| ())
            })
            .await
            .map_err(Into::into)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RentalCreated {
    rental_uid: RentalId,
}

/// HTTP adapter for the rental service.
pub struct HttpRentalsService {
    base_url: String,
    http: reqwest::Client,
    breaker: Arc<CircuitBreaker>,
}

impl HttpRentalsService {
    pub fn new(
        base_url: impl Into<String>,
        http: reqwest::Client,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            base_url: trim_base(base_url),
            http,
            breaker,
        }
    }
}

#[async_trait]
impl RentalsService for HttpRentalsService {
    async fn create_rental(
        &self,
        rental: &NewRental,
        token: &BearerToken,
    ) -> Result<RentalId, ClientError> {
        let url = format!("{}/api/v1/rental", self.base_url);
        self.breaker
            .call(|| async {
                let resp = self
                    .http
                    .post(&url)
                    .json(rental)
                    .bearer_auth(token.as_str())
                    .send()
                    .await
                    .map_err(|e| transport(rentals::SERVICE, e))?;
                let created: RentalCreated = check_status(rentals::SERVICE, resp)?
                    .json()
                    .await
                    .map_err(|e| transport(rentals::SERVICE, e))?;
                Ok(created.rental_uid)
            })
            .await
            .map_err(Into::into)
    }

    async fn get_rental(
        &self,
        id: RentalId,
        token: &BearerToken,
    ) -> Result<RentalView, ClientError> {
        let url = format!("{}/api/v1/rental/{id}", self.base_url);
        self.breaker
            .call(|| async {
                let resp = self
                    .http
                    .get(&url)
                    .bearer_auth(token.as_str())
                    .send()
                    .await
                    .map_err(|e| transport(rentals::SERVICE, e))?;
                check_status(rentals::SERVICE, resp)?
                    .json()
                    .await
                    .map_err(|e| transport(rentals::SERVICE, e))
            })
            .await
            .map_err(Into::into)
    }

    async fn list_rentals(&self, token: &BearerToken) -> Result<Vec<RentalView>, ClientError> {
        let url = format!("{}/api/v1/rental", self.base_url);
        self.breaker
            .call(|| async {
                let resp = self
                    .http
                    .get(&url)
                    .bearer_auth(token.as_str())
                    .send()
                    .await
                    .map_err(|e| transport(rentals::SERVICE, e))?;
                check_status(rentals::SERVICE, resp)?
                    .json()
                    .await
                    .map_err(|e| transport(rentals::SERVICE, e))
            })
            .await
            .map_err(Into::into)
    }

    async fn finish_rental(&self, id: RentalId, token: &BearerToken) -> Result<(), ClientError> {
        let url = format!("{}/api/v1/rental/{id}/finish", self.base_url);
        self.breaker
            .call(|| async {
                let resp = self
                    .http
                    .post(&url)
                    .bearer_auth(token.as_str())
                    .send()
                    .await
                    .map_err(|e| transport(rentals::SERVICE, e))?;
                check_status(rentals::SERVICE, resp).map(|_| ())
            })
            .await
            .map_err(Into::into)
    }

    async fn cancel_rental(&self, id: RentalId, token: &BearerToken) -> Result<(), ClientError> {
        let url = format!("{}/api/v1/rental/{id}", self.base_url);
        self.breaker
            .call(|| async {
                let resp = self
                    .http
                    .delete(&url)
                    .bearer_auth(token.as_str())
                    .send()
                    .await
                    .map_err(|e| transport(rentals::SERVICE, e))?;
                check_status(rentals::SERVICE, resp).map(|_| ())
            })
            .await
            .map_err(Into::into)
    }
}

#[derive(Deserialize)]
struct UserInfoClaims {
    preferred_username: Option<String>,
    sub: Option<String>,
}

/// Identity adapter backed by the provider's `userinfo` endpoint.
///
/// The provider validates the token itself; the gateway only needs the
/// resolved username. No breaker: an unreachable identity provider fails
/// every request anyway, there is nothing to shed.
pub struct HttpIdentityService {
    userinfo_url: String,
    http: reqwest::Client,
}

impl HttpIdentityService {
    pub fn new(userinfo_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            userinfo_url: userinfo_url.into(),
            http,
        }
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn verify(&self, token: &BearerToken) -> Result<Principal, ClientError> {
        let resp = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| transport(identity::SERVICE, e))?;
        let claims: UserInfoClaims = check_status(identity::SERVICE, resp)?
            .json()
            .await
            .map_err(|e| transport(identity::SERVICE, e))?;
        claims
            .preferred_username
            .or(claims.sub)
            .map(Principal::new)
            .ok_or(ClientError::Decode {
                service: identity::SERVICE,
            })
    }
}
