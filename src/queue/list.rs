//! Entry points for consumers that want the projected queue list of a room.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::projection::{count, project_at};
use super::types::{QueueResponse, QueueViewModel};
use crate::sync::{Refresher, Subscription, SynchronizationRegistry, TransportError};

/// REST prefix used when no other base route is configured.
pub const DEFAULT_BASE_ROUTE: &str = "/ws/rest/v1";

/// Resource key for the queue of `room` filtered by `status`.
///
/// Values are substituted verbatim; callers pass query-safe strings.
pub fn queue_resource_key(base_route: &str, room: &str, status: &str) -> String {
    format!(
        "{}/patientqueue?v=full&room={}&status={}",
        base_route, room, status
    )
}

/// Subscribe to the queue of one room/status pair.
pub fn patient_queues_list(
    registry: &SynchronizationRegistry,
    base_route: &str,
    room: &str,
    status: &str,
) -> PatientQueueList {
    patient_queue_request(registry, queue_resource_key(base_route, room, status))
}

/// Subscribe to a caller-built resource key.
pub fn patient_queue_request(
    registry: &SynchronizationRegistry,
    key: impl Into<String>,
) -> PatientQueueList {
    PatientQueueList {
        subscription: registry.subscribe(key),
    }
}

/// What a consumer renders from.
#[derive(Debug, Clone)]
pub struct QueueListResult {
    pub patient_queue_entries: Vec<QueueViewModel>,
    pub patient_queue_count: usize,
    pub is_loading: bool,
    pub is_error: Option<Arc<TransportError>>,
    pub is_validating: bool,
    pub mutate: Refresher,
}

/// A live subscription to a queue list. Dropping it unsubscribes.
#[derive(Debug)]
pub struct PatientQueueList {
    subscription: Subscription,
}

impl PatientQueueList {
    pub fn key(&self) -> &str {
        self.subscription.key()
    }

    /// Project the current payload, computing wait times against now.
    pub fn result(&self) -> QueueListResult {
        self.result_at(Utc::now())
    }

    pub fn result_at(&self, now: DateTime<Utc>) -> QueueListResult {
        let state = self.subscription.snapshot();
        let payload = state.payload.as_deref();

        QueueListResult {
            patient_queue_entries: payload.map(|p| project_at(&p.results, now)).unwrap_or_default(),
            patient_queue_count: count(payload),
            is_loading: state.is_loading,
            is_error: state.error,
            is_validating: state.is_validating,
            mutate: self.subscription.refresher(),
        }
    }

    /// Refresh now, outside the polling schedule.
    pub async fn mutate(&self) -> Option<Arc<QueueResponse>> {
        self.subscription.refresh().await
    }

    /// Wait for the next state transition of the underlying session.
    pub async fn changed(&mut self) {
        self.subscription.changed().await
    }

    /// Wait until the list has settled at least once, successfully or not.
    pub async fn settled(&mut self) -> QueueListResult {
        self.subscription
            .wait_for(|s| s.payload.is_some() || s.error.is_some())
            .await;
        self.result()
    }
}
