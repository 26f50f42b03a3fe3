//! HTTP gateway in front of the car, rental and payment services.
//!
//! Exposes the booking API, authenticates callers against the identity
//! provider, and shields each downstream dependency behind its own circuit
//! breaker. Bookings run as a compensating saga; reads are composed from
//! the three services with graceful payment degradation.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use clients::{
    CarsService, IdentityService, InMemoryCarsService, InMemoryPaymentsService,
    InMemoryRentalsService, PaymentsService, RentalsService, StaticIdentityService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{InMemorySagaStore, RentalReader, RentalSaga, SagaStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

type DynCars = Arc<dyn CarsService>;
type DynPayments = Arc<dyn PaymentsService>;
type DynRentals = Arc<dyn RentalsService>;
type DynStore = Arc<dyn SagaStore>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub identity: Arc<dyn IdentityService>,
    pub cars: DynCars,
    pub saga: RentalSaga<DynCars, DynPayments, DynRentals, DynStore>,
    pub reader: RentalReader<DynCars, DynPayments, DynRentals>,
}

impl AppState {
    /// Wires the orchestrator and reader over one set of service adapters.
    pub fn new(
        identity: Arc<dyn IdentityService>,
        cars: DynCars,
        payments: DynPayments,
        rentals: DynRentals,
        store: DynStore,
    ) -> Self {
        let saga = RentalSaga::new(
            cars.clone(),
            payments.clone(),
            rentals.clone(),
            store.clone(),
        );
        let reader = RentalReader::new(cars.clone(), payments, rentals);
        Self {
            identity,
            cars,
            saga,
            reader,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/api/v1/cars", get(routes::cars::list))
        .route(
            "/api/v1/rental",
            get(routes::rentals::list).post(routes::rentals::create),
        )
        .route(
            "/api/v1/rental/{rental_uid}",
            get(routes::rentals::get).delete(routes::rentals::cancel),
        )
        .route(
            "/api/v1/rental/{rental_uid}/finish",
            post(routes::rentals::finish),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ))
        .with_state(state);

    Router::new()
        .route("/manage/health", get(routes::health::check))
        .merge(api)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// In-memory service doubles backing [`create_default_state`].
///
/// Handles stay with the caller so tests can seed cars, flip failure
/// switches and inspect downstream effects.
#[derive(Clone, Default)]
pub struct InMemoryBackends {
    pub identity: StaticIdentityService,
    pub cars: InMemoryCarsService,
    pub payments: InMemoryPaymentsService,
    pub rentals: InMemoryRentalsService,
    pub store: InMemorySagaStore,
}

/// Creates application state over fresh in-memory services.
pub fn create_default_state() -> (Arc<AppState>, InMemoryBackends) {
    let backends = InMemoryBackends::default();
    let state = Arc::new(AppState::new(
        Arc::new(backends.identity.clone()),
        Arc::new(backends.cars.clone()),
        Arc::new(backends.payments.clone()),
        Arc::new(backends.rentals.clone()),
        Arc::new(backends.store.clone()),
    ));
    (state, backends)
}
