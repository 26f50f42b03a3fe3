//! Application configuration loaded from environment variables.

use std::time::Duration;

use breaker::BreakerConfig;

/// Gateway configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `8080`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `CAR_SERVICE_URL` — car catalog base URL (default: `http://localhost:8070`)
/// - `RENTAL_SERVICE_URL` — rental store base URL (default: `http://localhost:8060`)
/// - `PAYMENT_SERVICE_URL` — payment service base URL (default: `http://localhost:8050`)
/// - `IDENTITY_USERINFO_URL` — token verification endpoint (default:
///   `http://localhost:8090/userinfo`)
/// - `BREAKER_FAILURE_THRESHOLD` — consecutive failures that open a breaker
///   (default: `2`)
/// - `BREAKER_RESET_TIMEOUT_SECS` — open-to-half-open delay (default: `15`)
/// - `DOWNSTREAM_TIMEOUT_SECS` — per-request timeout for downstream calls
///   (default: `10`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub cars_url: String,
    pub rentals_url: String,
    pub payments_url: String,
    pub identity_userinfo_url: String,
    pub breaker_failure_threshold: u32,
    pub breaker_reset_timeout_secs: u64,
    pub downstream_timeout_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            cars_url: std::env::var("CAR_SERVICE_URL").unwrap_or(defaults.cars_url),
            rentals_url: std::env::var("RENTAL_SERVICE_URL").unwrap_or(defaults.rentals_url),
            payments_url: std::env::var("PAYMENT_SERVICE_URL").unwrap_or(defaults.payments_url),
            identity_userinfo_url: std::env::var("IDENTITY_USERINFO_URL")
                .unwrap_or(defaults.identity_userinfo_url),
            breaker_failure_threshold: std::env::var("BREAKER_FAILURE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.breaker_failure_threshold),
            breaker_reset_timeout_secs: std::env::var("BREAKER_RESET_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.breaker_reset_timeout_secs),
            downstream_timeout_secs: std::env::var("DOWNSTREAM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.downstream_timeout_secs),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Breaker settings shared by every downstream client.
    pub fn breaker_config(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.breaker_failure_threshold,
            reset_timeout: Duration::from_secs(self.breaker_reset_timeout_secs),
        }
    }

    /// Per-request timeout applied to the downstream HTTP client.
    pub fn downstream_timeout(&self) -> Duration {
        Duration::from_secs(self.downstream_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            cars_url: "http://localhost:8070".to_string(),
            rentals_url: "http://localhost:8060".to_string(),
            payments_url: "http://localhost:8050".to_string(),
            identity_userinfo_url: "http://localhost:8090/userinfo".to_string(),
            breaker_failure_threshold: 2,
            breaker_reset_timeout_secs: 15,
            downstream_timeout_secs: 10,
        }
    }
}
