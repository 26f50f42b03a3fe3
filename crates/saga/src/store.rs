//! Idempotency store for saga records.
//!
//! The store is the only cross-request shared state of the orchestrator.
//! `begin` atomically claims a request id: the task that receives
//! [`BeginOutcome::New`] is the single writer for that key until the record
//! reaches a terminal state, which is what makes the idempotency guarantee
//! hold under concurrent duplicate submissions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::RequestId;

use crate::record::SagaRecord;

/// Result of attempting to claim a request id.
#[derive(Debug, Clone, PartialEq)]
pub enum BeginOutcome {
    /// The key was free (or held only an expired record); the caller owns
    /// the saga and must drive it to a terminal state.
    New,

    /// Another attempt for this key has not reached a terminal state yet.
    InFlight,

    /// A previous attempt completed; the snapshot carries its identifiers.
    Finished(SagaRecord),
}

/// Keyed storage for saga records.
///
/// Backed by an in-process map for single-instance deployments; the trait is
/// the seam for an external keyed store when the gateway scales out.
#[async_trait]
pub trait SagaStore: Send + Sync {
    /// Atomically claims `record.request_id`, storing `record` if the key
    /// was free. A `Failed` record releases the key: every side effect was
    /// compensated, so the request is safe to run again.
    async fn begin(&self, record: SagaRecord) -> BeginOutcome;

    /// Overwrites the record for its key. Only the claim owner calls this.
    async fn update(&self, record: SagaRecord);

    /// Returns the stored record, if any.
    async fn get(&self, id: RequestId) -> Option<SagaRecord>;
}

#[async_trait]
impl<T: SagaStore + ?Sized> SagaStore for Arc<T> {
    async fn begin(&self, record: SagaRecord) -> BeginOutcome {
        (**self).begin(record).await
    }

    async fn update(&self, record: SagaRecord) {
        (**self).update(record).await
    }

    async fn get(&self, id: RequestId) -> Option<SagaRecord> {
        (**self).get(id).await
    }
}

/// In-process saga store with TTL retention for terminal records.
///
/// Completed and failed records are kept for `retention` after they finish
/// and evicted lazily on access, so the map does not grow without bound.
#[derive(Debug, Clone)]
pub struct InMemorySagaStore {
    records: Arc<Mutex<HashMap<RequestId, SagaRecord>>>,
    retention: chrono::Duration,
}

impl InMemorySagaStore {
    /// Creates a store with the default 24-hour retention.
    pub fn new() -> Self {
        Self::with_retention(Duration::from_secs(24 * 60 * 60))
    }

    /// Creates a store that retains terminal records for `retention`.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            retention: chrono::Duration::from_std(retention)
                .unwrap_or_else(|_| chrono::Duration::MAX),
        }
    }

    /// Number of records currently held, for observability.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expired(&self, record: &SagaRecord) -> bool {
        record
            .finished_at
            .is_some_and(|at| chrono::Utc::now() - at >= self.retention)
    }
}

impl Default for InMemorySagaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SagaStore for InMemorySagaStore {
    async fn begin(&self, record: SagaRecord) -> BeginOutcome {
        let mut records = self.records.lock().unwrap();
        let key = record.request_id;

        if let Some(existing) = records.get(&key) {
            if existing.is_terminal() && self.expired(existing) {
                records.remove(&key);
            } else if !existing.is_terminal() {
                return BeginOutcome::InFlight;
            } else if existing.state == crate::state::SagaState::Completed {
                return BeginOutcome::Finished(existing.clone());
            } else {
                // Failed attempts were fully compensated; let the retry run.
                records.remove(&key);
            }
        }

        records.insert(key, record);
        BeginOutcome::New
    }

    async fn update(&self, record: SagaRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.request_id, record);
    }

    async fn get(&self, id: RequestId) -> Option<SagaRecord> {
        let mut records = self.records.lock().unwrap();
        if records.get(&id).is_some_and(|r| r.is_terminal() && self.expired(r)) {
            records.remove(&id);
            return None;
        }
        records.get(&id).cloned()
    }
}
