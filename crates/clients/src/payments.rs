//! Payment service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{BearerToken, PaymentId, PaymentStatus};

use crate::error::ClientError;
use crate::views::PaymentView;

pub(crate) const SERVICE: &str = "Payment";

/// Operations the gateway performs against the payment service.
#[async_trait]
pub trait PaymentsService: Send + Sync {
    /// Creates a charge for the given price.
    async fn create_payment(
        &self,
        price: i64,
        token: &BearerToken,
    ) -> Result<PaymentView, ClientError>;

    /// Fetches a payment.
    async fn get_payment(
        &self,
        id: PaymentId,
        token: &BearerToken,
    ) -> Result<PaymentView, ClientError>;

    /// Cancels a payment. Cancelling an already-canceled payment is a no-op.
    async fn cancel_payment(&self, id: PaymentId, token: &BearerToken) -> Result<(), ClientError>;
}

#[async_trait]
impl<T: PaymentsService + ?Sized> PaymentsService for Arc<T> {
    async fn create_payment(
        &self,
        price: i64,
        token: &BearerToken,
    ) -> Result<PaymentView, ClientError> {
        (**self).create_payment(price, token).await
    }

    async fn get_payment(
        &self,
        id: PaymentId,
        token: &BearerToken,
    ) -> Result<PaymentView, ClientError> {
        (**self).get_payment(id, token).await
    }

    async fn cancel_payment(&self, id: PaymentId, token: &BearerToken) -> Result<(), ClientError> {
        (**self).cancel_payment(id, token).await
    }
}

#[derive(Debug, Default)]
struct InMemoryPaymentsState {
    payments: HashMap<PaymentId, PaymentView>,
    unavailable: bool,
    fail_on_create: bool,
    fail_on_cancel: bool,
}

/// In-memory payment service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentsService {
    state: Arc<RwLock<InMemoryPaymentsState>>,
}

impl InMemoryPaymentsService {
    /// Creates a new in-memory payment service.
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

    /// Makes only cancel calls fail, to exercise best-effort compensation.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state.write().unwrap().fail_on_cancel = fail;
    }

    /// Returns the stored payment, if any.
    pub fn payment(&self, id: PaymentId) -> Option<PaymentView> {
        self.state.read().unwrap().payments.get(&id).cloned()
    }

    /// Number of payments currently in `PAID` status.
    pub fn paid_count(&self) -> usize {
        self.state
            .read()
            .unwrap()
            .payments
            .values()
            .filter(|p| p.status == PaymentStatus::Paid)
            .count()
    }

    fn check_available(state: &InMemoryPaymentsState) -> Result<(), ClientError> {
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
impl PaymentsService for InMemoryPaymentsService {
    async fn create_payment(
        &self,
        price: i64,
        _token: &BearerToken,
    ) -> Result<PaymentView, ClientError> {
        let mut state = self.state.write().unwrap();
        Self::check_available(&state)?;
        if state.fail_on_create {
            return Err(ClientError::Unavailable {
                service: SERVICE,
                reason: "connection reset".to_string(),
            });
        }
        let payment = PaymentView {
            payment_uid: PaymentId::new(),
            status: PaymentStatus::Paid,
            price,
        };
        state.payments.insert(payment.payment_uid, payment.clone());
        Ok(payment)
    }

    async fn get_payment(
        &self,
        id: PaymentId,
        _token: &BearerToken,
    ) -> Result<PaymentView, ClientError> {
        let state = self.state.read().unwrap();
        Self::check_available(&state)?;
        state
            .payments
            .get(&id)
            .cloned()
            .ok_or(ClientError::NotFound { service: SERVICE })
    }

    async fn cancel_payment(&self, id: PaymentId, _token: &BearerToken) -> Result<(), ClientError> {
        let mut state = self.state.write().unwrap();
        Self::check_available(&state)?;
        if state.fail_on_cancel {
            return Err(ClientError::Unavailable {
                service: SERVICE,
                reason: "connection reset".to_string(),
            });
        }
        match state.payments.get_mut(&id) {
            Some(payment) => {
                payment.status = PaymentStatus::Canceled;
                Ok(())
            }
            None => Err(ClientError::NotFound { service: SERVICE }),
        }
    }
}
