//! Per-key synchronization session.
//!
//! A session owns the cached state for one resource key and serializes its
//! fetches: at most one request is in flight at any time. Interval ticks that
//! land while a fetch is running are dropped, and manual refreshes wait for the
//! running fetch and report its outcome instead of issuing another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{watch, Mutex, MutexGuard};

use super::transport::Transport;
use super::types::SessionState;
use crate::queue::QueueResponse;

pub(crate) struct Session {
    key: String,
    transport: Arc<dyn Transport>,
    state: watch::Sender<SessionState>,
    fetch_lock: Mutex<()>,
    /// Number of fetches that have settled, success or failure.
    completed: AtomicU64,
}

impl Session {
    pub fn new(key: String, transport: Arc<dyn Transport>) -> Self {
        let (state, _) = watch::channel(SessionState::loading());
        Self {
            key,
            transport,
            state,
            fetch_lock: Mutex::new(()),
            completed: AtomicU64::new(0),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Scheduled refresh. Skipped when a fetch is already in flight.
    pub async fn poll(&self) {
        match self.fetch_lock.try_lock() {
            Ok(guard) => self.fetch(guard).await,
            Err(_) => tracing::debug!("Fetch in flight for {}, skipping tick", self.key),
        }
    }

    /// Out-of-band refresh. Returns the cached payload once it settles.
    pub async fn refresh(&self) -> Option<Arc<QueueResponse>> {
        let seen = self.completed.load(Ordering::SeqCst);
        let guard = self.fetch_lock.lock().await;

        if self.completed.load(Ordering::SeqCst) == seen {
            self.fetch(guard).await;
        } else {
            tracing::debug!("Refresh of {} coalesced with a concurrent fetch", self.key);
        }

        self.state.borrow().payload.clone()
    }

    async fn fetch(&self, _guard: MutexGuard<'_, ()>) {
        self.state.send_modify(|s| {
            s.is_validating = true;
            s.is_loading = s.payload.is_none();
        });

        let start = Instant::now();
        let result = self.transport.fetch(&self.key).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                tracing::debug!(
                    "Fetched {} records for {} in {}ms",
                    response.results.len(),
                    self.key,
                    duration_ms
                );
                self.state.send_modify(|s| {
                    s.payload = Some(Arc::new(response));
                    s.error = None;
                    s.is_loading = false;
                    s.is_validating = false;
                });
            }
            Err(e) => {
                tracing::warn!("Fetch of {} failed after {}ms: {}", self.key, duration_ms, e);
                self.state.send_modify(|s| {
                    s.error = Some(Arc::new(e));
                    s.is_loading = false;
                    s.is_validating = false;
                });
            }
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}
