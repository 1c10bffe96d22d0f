//! In-memory transport for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::transport::Transport;
use super::types::TransportError;
use crate::queue::{QueueResponse, RawQueueRecord};

pub(crate) struct MockTransport {
    response: Mutex<QueueResponse>,
    failing: AtomicBool,
    delay: Duration,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockTransport {
    pub fn new(response: QueueResponse) -> Self {
        Self::with_delay(response, Duration::ZERO)
    }

    pub fn with_delay(response: QueueResponse, delay: Duration) -> Self {
        Self {
            response: Mutex::new(response),
            failing: AtomicBool::new(false),
            delay,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_response(&self, response: QueueResponse) {
        *self.response.lock().unwrap() = response;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn calls_for(&self, key: &str) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, key: &str) -> Result<QueueResponse, TransportError> {
        *self.calls.lock().unwrap().entry(key.to_string()).or_insert(0) += 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Other("connection reset".into()));
        }
        Ok(self.response.lock().unwrap().clone())
    }
}

/// Response holding one bare record per id.
pub(crate) fn response_with(ids: &[&str]) -> QueueResponse {
    QueueResponse {
        results: ids
            .iter()
            .map(|id| RawQueueRecord {
                uuid: Some(id.to_string()),
                ..Default::default()
            })
            .collect(),
    }
}
