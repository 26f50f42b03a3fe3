//! Gateway server entry point.

use std::sync::Arc;

use breaker::CircuitBreaker;
use clients::{HttpCarsService, HttpIdentityService, HttpPaymentsService, HttpRentalsService};
use gateway::AppState;
use gateway::config::Config;
use saga::InMemorySagaStore;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Build downstream adapters, one breaker per dependency
    let http = reqwest::Client::builder()
        .timeout(config.downstream_timeout())
        .build()
        .expect("failed to build HTTP client");

    let cars = HttpCarsService::new(
        config.cars_url.clone(),
        http.clone(),
        Arc::new(CircuitBreaker::new("Cars", config.breaker_config())),
    );
    let payments = HttpPaymentsService::new(
        config.payments_url.clone(),
        http.clone(),
        Arc::new(CircuitBreaker::new("Payment", config.breaker_config())),
    );
    let rentals = HttpRentalsService::new(
        config.rentals_url.clone(),
        http.clone(),
        Arc::new(CircuitBreaker::new("Rental", config.breaker_config())),
    );
    let identity = HttpIdentityService::new(config.identity_userinfo_url.clone(), http);

    // 4. Application state and router
    let state = Arc::new(AppState::new(
        Arc::new(identity),
        Arc::new(cars),
        Arc::new(payments),
        Arc::new(rentals),
        Arc::new(InMemorySagaStore::new()),
    ));
    let app = gateway::create_app(state, metrics_handle);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting gateway");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
