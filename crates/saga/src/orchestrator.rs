//! Saga orchestrator for the create-rental transaction.

use chrono::NaiveDate;
use clients::{
    CarView, CarsService, ClientError, NewRental, PaymentView, PaymentsService, RentalsService,
};
use common::{BearerToken, CarId, PaymentId, RentalId, RentalPeriod, RentalStatus, RequestId};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::record::SagaRecord;
use crate::store::{BeginOutcome, SagaStore};

/// Step names used in logs and compensation errors.
const STEP_CREATE_PAYMENT: &str = "create_payment";
const STEP_CREATE_RENTAL: &str = "create_rental";
const STEP_RESERVE_CAR: &str = "reserve_car";

/// An inbound create-rental request. Dates arrive as strings and are
/// validated before any dependency call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub car_uid: CarId,
    pub date_from: String,
    pub date_to: String,
}

/// The composed result of a completed booking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub rental_uid: RentalId,
    pub status: RentalStatus,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub car: CarView,
    pub payment: PaymentView,
}

/// Orchestrates the create-rental saga and the finish/cancel flows.
///
/// The saga drives three sequential steps (charge payment → create rental →
/// reserve car), compensating completed steps in reverse when a later step
/// fails. Progress is tracked per idempotency key in the [`SagaStore`];
/// every attempt leaves its record in `Completed` or `Failed`. Once a key
/// is claimed the steps run on their own task, so a dropped request future
/// cannot leave the key claimed or a charged payment uncompensated.
#[derive(Clone)]
pub struct RentalSaga<C, P, R, S> {
    cars: C,
    payments: P,
    rentals: R,
    store: S,
}

impl<C, P, R, S> RentalSaga<C, P, R, S>
where
    C: CarsService + Clone + 'static,
    P: PaymentsService + Clone + 'static,
    R: RentalsService + Clone + 'static,
    S: SagaStore + Clone + 'static,
{
    /// Creates a new orchestrator over the three downstream adapters and
    /// the idempotency store.
    pub fn new(cars: C, payments: P, rentals: R, store: S) -> Self {
        Self {
            cars,
            payments,
            rentals,
            store,
        }
    }

    /// Executes the create-rental saga.
    ///
    /// A request without an id gets a generated one and always runs as a
    /// new saga. A request whose id already completed is answered from the
    /// recorded identifiers without re-executing any step; one whose id is
    /// still in flight is rejected with [`GatewayError::SagaInProgress`].
    #[tracing::instrument(skip(self, token, request), fields(car_uid = %request.car_uid))]
    pub async fn create_rental(
        &self,
        token: &BearerToken,
        request_id: Option<RequestId>,
        request: &BookingRequest,
    ) -> Result<BookingView, GatewayError> {
        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = std::time::Instant::now();

        // 1. Validate before touching any dependency.
        let period = RentalPeriod::parse(&request.date_from, &request.date_to)?;
        let request_id = request_id.unwrap_or_default();

        // 2. Price the rental off the car's daily rate.
        let car = self.cars.get_car(request.car_uid, token).await?;
        let total_price = car.price * period.duration_days();

        // 3. Claim the idempotency key.
        let record = SagaRecord::started(request_id, request.car_uid, period, total_price);
        match self.store.begin(record.clone()).await {
            BeginOutcome::New => {}
            BeginOutcome::InFlight => return Err(GatewayError::SagaInProgress),
            BeginOutcome::Finished(previous) => {
                tracing::info!(%request_id, "replaying completed saga");
                return self.replay(token, previous, car).await;
            }
        }

        // Steps run on their own task: even if this request future is
        // dropped mid-saga, the steps and their compensations finish and
        // the record reaches a terminal state.
        let runner = self.clone();
        let token = token.clone();
        let handle =
            tokio::spawn(async move { runner.run_steps(token, record, car, saga_start).await });
        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(GatewayError::Internal(format!("saga task failed: {e}"))),
        }
    }

    /// Executes the three saga steps, leaving the record terminal.
    async fn run_steps(
        &self,
        token: BearerToken,
        mut record: SagaRecord,
        car: CarView,
        saga_start: std::time::Instant,
    ) -> Result<BookingView, GatewayError> {
        let token = &token;
        let request_id = record.request_id;
        let car_uid = record.car_id;
        let period = record.period;
        let total_price = record.total_price;

        // 4. Charge the payment. Nothing to compensate on failure.
        tracing::info!(step = STEP_CREATE_PAYMENT, "saga step started");
        let payment = match self.payments.create_payment(total_price, token).await {
            Ok(payment) => payment,
            Err(e) => {
                return Err(self.abort(record, saga_start, STEP_CREATE_PAYMENT, e).await);
            }
        };
        record.payment_created(payment.payment_uid);
        self.store.update(record.clone()).await;

        // 5. Create the rental record referencing the payment.
        tracing::info!(step = STEP_CREATE_RENTAL, "saga step started");
        let new_rental = NewRental {
            car_uid,
            date_from: period.date_from(),
            date_to: period.date_to(),
            payment_uid: payment.payment_uid,
        };
        let rental_id = match self.rentals.create_rental(&new_rental, token).await {
            Ok(id) => id,
            Err(e) => {
                self.cancel_payment_best_effort(payment.payment_uid, token)
                    .await;
                return Err(self.abort(record, saga_start, STEP_CREATE_RENTAL, e).await);
            }
        };
        record.rental_created(rental_id);
        self.store.update(record.clone()).await;

        // 6. Reserve the car. Both earlier steps roll back independently.
        tracing::info!(step = STEP_RESERVE_CAR, "saga step started");
        if let Err(e) = self.cars.reserve(car_uid, token).await {
            self.cancel_rental_best_effort(rental_id, token).await;
            self.cancel_payment_best_effort(payment.payment_uid, token)
                .await;
            return Err(self.abort(record, saga_start, STEP_RESERVE_CAR, e).await);
        }

        // 7. Done.
        record.complete();
        self.store.update(record).await;

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);
        metrics::counter!("saga_completed").increment(1);
        tracing::info!(%request_id, %rental_id, duration, "saga completed");

        Ok(BookingView {
            rental_uid: rental_id,
            status: RentalStatus::InProgress,
            date_from: period.date_from(),
            date_to: period.date_to(),
            car,
            payment,
        })
    }

    /// Finishes a rental: release the car, then mark the rental finished.
    #[tracing::instrument(skip(self, token))]
    pub async fn finish_rental(
        &self,
        token: &BearerToken,
        rental_id: RentalId,
    ) -> Result<(), GatewayError> {
        let rental = self.rentals.get_rental(rental_id, token).await?;
        self.cars.release(rental.car_uid, token).await?;
        self.rentals.finish_rental(rental_id, token).await?;
        tracing::info!(%rental_id, "rental finished");
        Ok(())
    }

    /// Cancels a rental: cancel the payment best-effort, release the car,
    /// then cancel the rental record.
    #[tracing::instrument(skip(self, token))]
    pub async fn cancel_rental(
        &self,
        token: &BearerToken,
        rental_id: RentalId,
    ) -> Result<(), GatewayError> {
        let rental = self.rentals.get_rental(rental_id, token).await?;
        self.cancel_payment_best_effort(rental.payment_uid, token)
            .await;
        self.cars.release(rental.car_uid, token).await?;
        self.rentals.cancel_rental(rental_id, token).await?;
        tracing::info!(%rental_id, "rental canceled");
        Ok(())
    }

    /// Answers a retried request from a completed record without
    /// re-executing any step.
    async fn replay(
        &self,
        token: &BearerToken,
        record: SagaRecord,
        car: CarView,
    ) -> Result<BookingView, GatewayError> {
        let (payment_id, rental_id) = match (record.payment_id, record.rental_id) {
            (Some(p), Some(r)) => (p, r),
            _ => {
                return Err(GatewayError::Internal(
                    "completed saga record is missing identifiers".to_string(),
                ));
            }
        };
        let payment = self.payments.get_payment(payment_id, token).await?;
        Ok(BookingView {
            rental_uid: rental_id,
            status: RentalStatus::InProgress,
            date_from: record.period.date_from(),
            date_to: record.period.date_to(),
            car,
            payment,
        })
    }

    /// Marks the record failed and converts the failing step's error.
    ///
    /// The caller receives the triggering error: unavailability stays a
    /// retriable 503-class error; anything else after side effects were
    /// rolled back surfaces as [`GatewayError::SagaCompensated`].
    async fn abort(
        &self,
        mut record: SagaRecord,
        saga_start: std::time::Instant,
        step: &'static str,
        err: ClientError,
    ) -> GatewayError {
        record.fail();
        let request_id = record.request_id;
        self.store.update(record).await;

        metrics::histogram!("saga_duration_seconds").record(saga_start.elapsed().as_secs_f64());
        metrics::counter!("saga_failed").increment(1);
        tracing::warn!(%request_id, step, error = %err, "saga failed");

        match err {
            ClientError::Unavailable { service, .. } | ClientError::Protocol { service, .. } => {
                GatewayError::DependencyUnavailable { service }
            }
            _ if step == STEP_CREATE_PAYMENT => err.into(),
            _ => GatewayError::SagaCompensated { step },
        }
    }

    async fn cancel_payment_best_effort(&self, payment_id: PaymentId, token: &BearerToken) {
        if let Err(e) = self.payments.cancel_payment(payment_id, token).await {
            metrics::counter!("saga_compensation_failures_total", "step" => "cancel_payment")
                .increment(1);
            tracing::warn!(%payment_id, error = %e, "compensation failed: payment not canceled");
        }
    }

    async fn cancel_rental_best_effort(&self, rental_id: RentalId, token: &BearerToken) {
        if let Err(e) = self.rentals.cancel_rental(rental_id, token).await {
            metrics::counter!("saga_compensation_failures_total", "step" => "cancel_rental")
                .increment(1);
            tracing::warn!(%rental_id, error = %e, "compensation failed: rental not canceled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SagaState;
    use crate::store::InMemorySagaStore;
    use clients::{InMemoryCarsService, InMemoryPaymentsService, InMemoryRentalsService};
    use common::PaymentStatus;

    type TestSaga = RentalSaga<
        InMemoryCarsService,
        InMemoryPaymentsService,
        InMemoryRentalsService,
        InMemorySagaStore,
    >;

    struct Harness {
        saga: TestSaga,
        cars: InMemoryCarsService,
        payments: InMemoryPaymentsService,
        rentals: InMemoryRentalsService,
        store: InMemorySagaStore,
        car_id: CarId,
    }

    fn setup() -> Harness {
        let cars = InMemoryCarsService::new();
        let payments = InMemoryPaymentsService::new();
        let rentals = InMemoryRentalsService::new();
        let store = InMemorySagaStore::new();
        let car_id = cars.add_car(CarView::new("Kia", "Rio", "А123БВ", 1000));

        let saga = RentalSaga::new(cars.clone(), payments.clone(), rentals.clone(), store.clone());
        Harness {
            saga,
            cars,
            payments,
            rentals,
            store,
            car_id,
        }
    }

    fn token() -> BearerToken {
        BearerToken::new("alice-token")
    }

    fn booking(car_uid: CarId) -> BookingRequest {
        BookingRequest {
            car_uid,
            date_from: "2025-11-01".to_string(),
            date_to: "2025-11-05".to_string(),
        }
    }

    #[tokio::test]
    async fn happy_path_prices_by_duration() {
        let h = setup();
        let view = h
            .saga
            .create_rental(&token(), Some(RequestId::new()), &booking(h.car_id))
            .await
            .unwrap();

        // Four days at 1000/day.
        assert_eq!(view.payment.price, 4000);
        assert_eq!(view.status, RentalStatus::InProgress);
        assert_eq!(h.payments.paid_count(), 1);
        assert_eq!(h.rentals.in_progress_count(), 1);
        assert!(h.cars.is_reserved(h.car_id));
    }

    #[tokio::test]
    async fn invalid_dates_fail_before_any_dependency_call() {
        let h = setup();
        let request = BookingRequest {
            car_uid: h.car_id,
            date_from: "2025-11-05".to_string(),
            date_to: "2025-11-01".to_string(),
        };

        let err = h
            .saga
            .create_rental(&token(), Some(RequestId::new()), &request)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::InvalidInput(_)));
        assert_eq!(h.cars.get_call_count(), 0);
        assert_eq!(h.payments.paid_count(), 0);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn unknown_car_is_not_found() {
        let h = setup();
        let err = h
            .saga
            .create_rental(&token(), Some(RequestId::new()), &booking(CarId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ResourceNotFound { service: "Cars" }));
    }

    #[tokio::test]
    async fn payment_failure_leaves_no_side_effects() {
        let h = setup();
        h.payments.set_fail_on_create(true);
        let request_id = RequestId::new();

        let err = h
            .saga
            .create_rental(&token(), Some(request_id), &booking(h.car_id))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::DependencyUnavailable { service: "Payment" }
        ));
        assert_eq!(h.store.get(request_id).await.unwrap().state, SagaState::Failed);
        assert_eq!(h.rentals.in_progress_count(), 0);
        assert!(!h.cars.is_reserved(h.car_id));
    }

    #[tokio::test]
    async fn rental_failure_cancels_the_payment() {
        let h = setup();
        h.rentals.set_fail_on_create(true);
        let request_id = RequestId::new();

        let err = h
            .saga
            .create_rental(&token(), Some(request_id), &booking(h.car_id))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::DependencyUnavailable { service: "Rental" }
        ));
        let record = h.store.get(request_id).await.unwrap();
        assert_eq!(record.state, SagaState::Failed);

        let payment_id = record.payment_id.unwrap();
        assert_eq!(
            h.payments.payment(payment_id).unwrap().status,
            PaymentStatus::Canceled
        );
        assert!(!h.cars.is_reserved(h.car_id));
    }

    #[tokio::test]
    async fn reserve_failure_cancels_rental_and_payment() {
        let h = setup();
        h.cars.set_fail_on_reserve(true);
        let request_id = RequestId::new();

        let err = h
            .saga
            .create_rental(&token(), Some(request_id), &booking(h.car_id))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::DependencyUnavailable { service: "Cars" }
        ));
        let record = h.store.get(request_id).await.unwrap();
        assert_eq!(record.state, SagaState::Failed);
        assert_eq!(
            h.payments.payment(record.payment_id.unwrap()).unwrap().status,
            PaymentStatus::Canceled
        );
        assert_eq!(
            h.rentals.rental(record.rental_id.unwrap()).unwrap().status,
            RentalStatus::Canceled
        );
    }

    #[tokio::test]
    async fn compensation_failure_does_not_change_client_error() {
        let h = setup();
        h.cars.set_fail_on_reserve(true);
        h.payments.set_fail_on_cancel(true);

        let err = h
            .saga
            .create_rental(&token(), Some(RequestId::new()), &booking(h.car_id))
            .await
            .unwrap_err();

        // The reserve step's own error wins; the failed compensation is
        // only logged. The rental is still rolled back independently.
        assert!(matches!(
            err,
            GatewayError::DependencyUnavailable { service: "Cars" }
        ));
        assert_eq!(h.rentals.in_progress_count(), 0);
        assert_eq!(h.payments.paid_count(), 1);
    }

    #[tokio::test]
    async fn completed_saga_replays_without_new_side_effects() {
        let h = setup();
        let request_id = RequestId::new();

        let first = h
            .saga
            .create_rental(&token(), Some(request_id), &booking(h.car_id))
            .await
            .unwrap();
        let second = h
            .saga
            .create_rental(&token(), Some(request_id), &booking(h.car_id))
            .await
            .unwrap();

        assert_eq!(first.rental_uid, second.rental_uid);
        assert_eq!(first.payment.payment_uid, second.payment.payment_uid);
        assert_eq!(h.payments.paid_count(), 1);
        assert_eq!(h.rentals.in_progress_count(), 1);
    }

    #[tokio::test]
    async fn in_flight_duplicate_is_rejected() {
        let h = setup();
        let request_id = RequestId::new();
        let period = RentalPeriod::parse("2025-11-01", "2025-11-05").unwrap();

        // Simulate an attempt that claimed the key but has not finished.
        h.store
            .begin(SagaRecord::started(request_id, h.car_id, period, 4000))
            .await;

        let err = h
            .saga
            .create_rental(&token(), Some(request_id), &booking(h.car_id))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::SagaInProgress));
        assert_eq!(h.payments.paid_count(), 0);
    }

    #[tokio::test]
    async fn missing_request_id_always_runs_new_saga() {
        let h = setup();
        let first = h
            .saga
            .create_rental(&token(), None, &booking(h.car_id))
            .await
            .unwrap();
        h.cars.release(h.car_id, &token()).await.unwrap();
        let second = h
            .saga
            .create_rental(&token(), None, &booking(h.car_id))
            .await
            .unwrap();

        assert_ne!(first.rental_uid, second.rental_uid);
        assert_eq!(h.payments.paid_count(), 2);
    }

    #[tokio::test]
    async fn finish_rental_releases_car() {
        let h = setup();
        let view = h
            .saga
            .create_rental(&token(), None, &booking(h.car_id))
            .await
            .unwrap();

        h.saga.finish_rental(&token(), view.rental_uid).await.unwrap();

        assert!(!h.cars.is_reserved(h.car_id));
        assert_eq!(
            h.rentals.rental(view.rental_uid).unwrap().status,
            RentalStatus::Finished
        );
    }

    #[tokio::test]
    async fn cancel_rental_cancels_payment_and_releases_car() {
        let h = setup();
        let view = h
            .saga
            .create_rental(&token(), None, &booking(h.car_id))
            .await
            .unwrap();

        h.saga.cancel_rental(&token(), view.rental_uid).await.unwrap();

        assert!(!h.cars.is_reserved(h.car_id));
        assert_eq!(
            h.rentals.rental(view.rental_uid).unwrap().status,
            RentalStatus::Canceled
        );
        assert_eq!(
            h.payments.payment(view.payment.payment_uid).unwrap().status,
            PaymentStatus::Canceled
        );
    }

    #[tokio::test]
    async fn cancel_rental_survives_payment_service_outage() {
        let h = setup();
        let view = h
            .saga
            .create_rental(&token(), None, &booking(h.car_id))
            .await
            .unwrap();

        h.payments.set_fail_on_cancel(true);
        h.saga.cancel_rental(&token(), view.rental_uid).await.unwrap();

        assert_eq!(
            h.rentals.rental(view.rental_uid).unwrap().status,
            RentalStatus::Canceled
        );
    }

    #[tokio::test]
    async fn finish_unknown_rental_is_not_found() {
        let h = setup();
        let err = h
            .saga
            .finish_rental(&token(), RentalId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ResourceNotFound { .. }));
    }

    /// Payment service that stalls before charging, so a request future
    /// can be dropped while a step is still in flight.
    #[derive(Clone)]
    struct SlowPayments {
        inner: InMemoryPaymentsService,
        delay: std::time::Duration,
    }

    #[async_trait::async_trait]
    impl PaymentsService for SlowPayments {
        async fn create_payment(
            &self,
            price: i64,
            token: &BearerToken,
        ) -> Result<PaymentView, ClientError> {
            tokio::time::sleep(self.delay).await;
            self.inner.create_payment(price, token).await
        }

        async fn get_payment(
            &self,
            id: PaymentId,
            token: &BearerToken,
        ) -> Result<PaymentView, ClientError> {
            self.inner.get_payment(id, token).await
        }

        async fn cancel_payment(
            &self,
            id: PaymentId,
            token: &BearerToken,
        ) -> Result<(), ClientError> {
            self.inner.cancel_payment(id, token).await
        }
    }

    #[tokio::test]
    async fn dropped_request_still_drives_saga_to_completion() {
        let cars = InMemoryCarsService::new();
        let payments = InMemoryPaymentsService::new();
        let slow = SlowPayments {
            inner: payments.clone(),
            delay: std::time::Duration::from_millis(50),
        };
        let rentals = InMemoryRentalsService::new();
        let store = InMemorySagaStore::new();
        let car_id = cars.add_car(CarView::new("Kia", "Rio", "А123БВ", 1000));
        let saga = RentalSaga::new(cars.clone(), slow, rentals.clone(), store.clone());
        let request_id = RequestId::new();

        // Client disconnects: the request future is dropped while the
        // payment step is still running.
        let tok = token();
        let request = booking(car_id);
        let attempt = saga.create_rental(&tok, Some(request_id), &request);
        tokio::time::timeout(std::time::Duration::from_millis(10), attempt)
            .await
            .unwrap_err();

        // The steps keep running to a terminal state regardless.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        let record = store.get(request_id).await.unwrap();
        assert_eq!(record.state, SagaState::Completed);
        assert_eq!(payments.paid_count(), 1);
        assert_eq!(rentals.in_progress_count(), 1);
        assert!(cars.is_reserved(car_id));

        // The key is terminal, so a retry replays instead of wedging.
        let replay = saga
            .create_rental(&tok, Some(request_id), &request)
            .await
            .unwrap();
        assert_eq!(replay.rental_uid, record.rental_id.unwrap());
        assert_eq!(payments.paid_count(), 1);
    }
}
