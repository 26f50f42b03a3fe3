//! Circuit breaker implementation.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::BreakerError;
use crate::state::BreakerState;

/// Decides whether an error counts against the breaker.
///
/// Transport-level errors (connection refused, timeout) and unexpected
/// non-2xx responses are breaker failures. Business-valid responses such as
/// a 404 are not: a single missing resource must not trip the breaker.
pub trait Classify {
    /// Returns true if this error should increment the failure counter.
    fn is_breaker_failure(&self) -> bool;
}

/// Breaker tuning parameters.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,
    /// Time an open breaker waits before allowing one probe call.
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 2,
            reset_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Whether a call may proceed, and whether it holds the half-open probe slot.
enum Admission {
    Rejected,
    Admitted,
    Probe,
}

/// Holds the half-open probe slot until an outcome is recorded.
///
/// The probe future can disappear without reporting back: the caller may
/// drop it mid-flight, or `op` may panic. Dropping the slot while still
/// armed re-opens the breaker with a fresh timer, so the slot is never
/// leaked and the next probe window arrives on schedule.
struct ProbeSlot<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl ProbeSlot<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ProbeSlot<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.breaker.inner.lock().unwrap();
        if inner.state == BreakerState::HalfOpen && inner.probe_in_flight {
            tracing::warn!(
                service = self.breaker.service,
                "probe abandoned without an outcome"
            );
            CircuitBreaker::trip(self.breaker.service, &mut inner);
        }
    }
}

/// A circuit breaker guarding one downstream dependency.
///
/// All state lives behind a single mutex so the failure counter and state
/// transitions stay consistent under concurrent calls.
#[derive(Debug)]
pub struct CircuitBreaker {
    service: &'static str,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Creates a breaker for the named dependency.
    pub fn new(service: &'static str, config: BreakerConfig) -> Self {
        Self {
            service,
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Name of the guarded dependency.
    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Current breaker state, for observability.
    pub fn state(&self) -> BreakerState {
        self.inner.lock().unwrap().state
    }

    /// Runs `op` through the breaker.
    ///
    /// Rejected calls return [`BreakerError::Rejected`] without invoking
    /// `op`. Errors from `op` that classify as breaker failures count
    /// against the threshold; other errors are treated as proof the
    /// dependency is reachable and reset the counter, then pass through.
    pub async fn call<T, E, F, Fut>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        E: Classify,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let slot = match self.try_acquire() {
            Admission::Rejected => {
                metrics::counter!("breaker_rejected_total", "service" => self.service).increment(1);
                return Err(BreakerError::Rejected {
                    service: self.service,
                });
            }
            Admission::Admitted => None,
            Admission::Probe => Some(ProbeSlot {
                breaker: self,
                armed: true,
            }),
        };

        let result = op().await;
        if let Some(slot) = slot {
            slot.disarm();
        }

        match result {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) if e.is_breaker_failure() => {
                self.record_failure();
                Err(BreakerError::Inner(e))
            }
            Err(e) => {
                self.record_success();
                Err(BreakerError::Inner(e))
            }
        }
    }

    /// Admits or rejects a call, moving an expired open breaker to
    /// half-open. In half-open only the first caller gets the probe slot.
    fn try_acquire(&self) -> Admission {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::Closed => Admission::Admitted,
            BreakerState::Open => {
                let expired = inner
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.reset_timeout);
                if expired {
                    inner.state = BreakerState::HalfOpen;
                    inner.probe_in_flight = true;
                    tracing::info!(service = self.service, "circuit breaker half-open, probing");
                    Admission::Probe
                } else {
                    Admission::Rejected
                }
            }
            BreakerState::HalfOpen => {
                if inner.probe_in_flight {
                    Admission::Rejected
                } else {
                    inner.probe_in_flight = true;
                    Admission::Probe
                }
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != BreakerState::Closed {
            tracing::info!(service = self.service, "circuit breaker closed");
        }
        inner.state = BreakerState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::HalfOpen => Self::trip(self.service, &mut inner),
            BreakerState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    Self::trip(self.service, &mut inner);
                }
            }
            // A call admitted before the breaker opened may report its
            // failure late; the timer is already running.
            BreakerState::Open => {}
        }
    }

    fn trip(service: &'static str, inner: &mut Inner) {
        inner.state = BreakerState::Open;
        inner.consecutive_failures = 0;
        inner.opened_at = Some(Instant::now());
        inner.probe_in_flight = false;
        metrics::counter!("breaker_open_total", "service" => service).increment(1);
        tracing::warn!(service, "circuit breaker opened");
    }
}
