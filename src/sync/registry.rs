//! Registry of polling sessions keyed by resource key.
//!
//! Subscribing to a key creates its session on first use and starts a poller
//! that fetches immediately and then every [`REFRESH_INTERVAL`]. Further
//! subscriptions to the same key share that session. When the last
//! subscription is released the poller is aborted and the session dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use super::session::Session;
use super::transport::Transport;
use super::types::SessionState;
use crate::queue::QueueResponse;

/// Fixed polling period for every session.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(3000);

struct SessionEntry {
    session: Arc<Session>,
    subscribers: usize,
    poller: JoinHandle<()>,
}

struct RegistryInner {
    transport: Arc<dyn Transport>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl RegistryInner {
    fn release(&self, key: &str, id: Uuid) {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = sessions.get_mut(key) else {
            return;
        };

        entry.subscribers = entry.subscribers.saturating_sub(1);
        tracing::debug!(
            "Subscription {} released {}, {} remaining",
            id,
            key,
            entry.subscribers
        );

        if entry.subscribers == 0 {
            if let Some(entry) = sessions.remove(key) {
                entry.poller.abort();
                tracing::info!("Stopped polling {}", key);
            }
        }
    }
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        let sessions = self.sessions.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, entry) in sessions.drain() {
            entry.poller.abort();
        }
    }
}

/// Owns one synchronization session per resource key.
#[derive(Clone)]
pub struct SynchronizationRegistry {
    inner: Arc<RegistryInner>,
}

impl SynchronizationRegistry {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                transport,
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to `key`, starting its poller if this is the first subscriber.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe(&self, key: impl Into<String>) -> Subscription {
        let key = key.into();
        let id = Uuid::new_v4();

        let session = {
            let mut sessions = self
                .inner
                .sessions
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            match sessions.get_mut(&key) {
                Some(entry) => {
                    entry.subscribers += 1;
                    tracing::debug!(
                        "Subscription {} joined {}, {} subscribers",
                        id,
                        key,
                        entry.subscribers
                    );
                    entry.session.clone()
                }
                None => {
                    let session = Arc::new(Session::new(key.clone(), self.inner.transport.clone()));
                    let poller = spawn_poller(session.clone(), REFRESH_INTERVAL);
                    sessions.insert(
                        key.clone(),
                        SessionEntry {
                            session: session.clone(),
                            subscribers: 1,
                            poller,
                        },
                    );
                    tracing::info!("Started polling {} every {:?}", key, REFRESH_INTERVAL);
                    session
                }
            }
        };

        Subscription {
            id,
            receiver: session.watch(),
            key,
            session,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Release a subscription. Equivalent to dropping it.
    pub fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn subscriber_count(&self, key: &str) -> usize {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map_or(0, |entry| entry.subscribers)
    }
}

fn spawn_poller(session: Arc<Session>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            // Fetches run detached so a slow response never delays the schedule.
            let session = session.clone();
            tokio::spawn(async move { session.poll().await });
        }
    })
}

/// A consumer's handle on a shared session. Dropping it unsubscribes.
pub struct Subscription {
    id: Uuid,
    key: String,
    session: Arc<Session>,
    receiver: watch::Receiver<SessionState>,
    registry: Weak<RegistryInner>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current session state.
    pub fn snapshot(&self) -> SessionState {
        self.session.current()
    }

    /// Wait for the next state transition.
    ///
    /// The subscription holds its session, and with it the sending half of the
    /// state channel, so this only ever returns on a transition.
    pub async fn changed(&mut self) {
        let _ = self.receiver.changed().await;
    }

    /// Wait until the session state satisfies `predicate`.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&SessionState) -> bool,
    ) -> Option<SessionState> {
        self.receiver
            .wait_for(predicate)
            .await
            .ok()
            .map(|state| SessionState::clone(&state))
    }

    /// Fetch outside the interval schedule and return the resulting payload.
    pub async fn refresh(&self) -> Option<Arc<QueueResponse>> {
        self.session.refresh().await
    }

    pub fn refresher(&self) -> Refresher {
        Refresher {
            session: self.session.clone(),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.release(&self.key, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("key", &self.key)
            .finish()
    }
}

/// Cloneable trigger for out-of-band refreshes of one session.
#[derive(Clone)]
pub struct Refresher {
    session: Arc<Session>,
}

impl Refresher {
    pub fn key(&self) -> &str {
        self.session.key()
    }

    pub async fn refresh(&self) -> Option<Arc<QueueResponse>> {
        self.session.refresh().await
    }
}

impl std::fmt::Debug for Refresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refresher").field("key", &self.key()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::{response_with, MockTransport};

    const KEY: &str = "/ws/rest/v1/patientqueue?v=full&room=r1&status=pending";

    fn registry(transport: &Arc<MockTransport>) -> SynchronizationRegistry {
        SynchronizationRegistry::new(transport.clone())
    }

    fn after_ticks(ticks: u32) -> Duration {
        REFRESH_INTERVAL * ticks + Duration::from_millis(100)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_subscription_is_loading() {
        let transport = Arc::new(MockTransport::new(response_with(&["a"])));
        let registry = registry(&transport);

        let mut sub = registry.subscribe(KEY);
        let state = sub.snapshot();
        assert!(state.is_loading);
        assert!(state.payload.is_none());

        let state = sub.wait_for(|s| s.payload.is_some()).await.unwrap();
        assert!(!state.is_loading);
        assert!(state.error.is_none());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_fixed_interval() {
        let transport = Arc::new(MockTransport::new(response_with(&["a"])));
        let registry = registry(&transport);
        let _sub = registry.subscribe(KEY);

        tokio::time::sleep(after_ticks(3)).await;
        assert_eq!(transport.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_is_constant_across_failures() {
        let transport = Arc::new(MockTransport::new(response_with(&["a"])));
        transport.set_failing(true);
        let registry = registry(&transport);
        let _sub = registry.subscribe(KEY);

        tokio::time::sleep(after_ticks(3)).await;
        assert_eq!(transport.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_shares_one_session() {
        let transport = Arc::new(MockTransport::new(response_with(&["a"])));
        let registry = registry(&transport);

        let mut first = registry.subscribe(KEY);
        let mut second = registry.subscribe(KEY);
        assert_eq!(registry.session_count(), 1);
        assert_eq!(registry.subscriber_count(KEY), 2);

        tokio::time::sleep(after_ticks(2)).await;
        assert_eq!(transport.calls(), 3);

        let a = first.wait_for(|s| s.payload.is_some()).await.unwrap();
        let b = second.wait_for(|s| s.payload.is_some()).await.unwrap();
        assert!(Arc::ptr_eq(&a.payload.unwrap(), &b.payload.unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_keys_poll_independently() {
        let transport = Arc::new(MockTransport::new(response_with(&["a"])));
        let registry = registry(&transport);

        let _a = registry.subscribe("/a");
        let _b = registry.subscribe("/b");
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(registry.session_count(), 2);
        assert_eq!(transport.calls_for("/a"), 1);
        assert_eq!(transport.calls_for("/b"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_is_not_duplicated_by_ticks() {
        let transport = Arc::new(MockTransport::with_delay(
            response_with(&["a"]),
            Duration::from_millis(5000),
        ));
        let registry = registry(&transport);
        let _sub = registry.subscribe(KEY);

        // Fetches start at 0 and 6000; the ticks at 3000 and 9000 find one in flight.
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_stale_payload() {
        let transport = Arc::new(MockTransport::new(response_with(&["a", "b"])));
        let registry = registry(&transport);
        let mut sub = registry.subscribe(KEY);

        let fresh = sub.wait_for(|s| s.payload.is_some()).await.unwrap();
        transport.set_failing(true);

        let stale = sub.wait_for(|s| s.error.is_some()).await.unwrap();
        assert!(!stale.is_loading);
        assert!(Arc::ptr_eq(
            &fresh.payload.unwrap(),
            &stale.payload.unwrap()
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_before_first_success() {
        let transport = Arc::new(MockTransport::new(response_with(&["a"])));
        transport.set_failing(true);
        let registry = registry(&transport);
        let mut sub = registry.subscribe(KEY);

        let state = sub.wait_for(|s| s.error.is_some()).await.unwrap();
        assert!(state.payload.is_none());
        assert!(!state.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_returns_new_payload() {
        let transport = Arc::new(MockTransport::new(response_with(&["a"])));
        let registry = registry(&transport);
        let mut sub = registry.subscribe(KEY);
        sub.wait_for(|s| s.payload.is_some()).await.unwrap();

        transport.set_response(response_with(&["a", "b", "c"]));
        let payload = sub.refresh().await.unwrap();

        assert_eq!(payload.results.len(), 3);
        assert_eq!(transport.calls(), 2);
        assert!(!sub.snapshot().is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_right_after_subscribe_is_one_request() {
        let transport = Arc::new(MockTransport::with_delay(
            response_with(&["a"]),
            Duration::from_millis(500),
        ));
        let registry = registry(&transport);
        let sub = registry.subscribe(KEY);

        let payload = sub.refresh().await;
        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert!(payload.is_some());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_unsubscribe_stops_polling() {
        let transport = Arc::new(MockTransport::new(response_with(&["a"])));
        let registry = registry(&transport);

        let first = registry.subscribe(KEY);
        let mut second = registry.subscribe(KEY);
        second.wait_for(|s| s.payload.is_some()).await.unwrap();

        registry.unsubscribe(first);
        assert_eq!(registry.subscriber_count(KEY), 1);
        tokio::time::sleep(after_ticks(1)).await;
        assert_eq!(transport.calls(), 2);

        drop(second);
        assert_eq!(registry.session_count(), 0);
        tokio::time::sleep(after_ticks(5)).await;
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribe_starts_fresh_session() {
        let transport = Arc::new(MockTransport::new(response_with(&["a"])));
        let registry = registry(&transport);

        let mut sub = registry.subscribe(KEY);
        sub.wait_for(|s| s.payload.is_some()).await.unwrap();
        drop(sub);

        let sub = registry.subscribe(KEY);
        assert!(sub.snapshot().is_loading);
        assert!(sub.snapshot().payload.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_changed_resolves_on_each_transition() {
        let transport = Arc::new(MockTransport::new(response_with(&["a"])));
        let registry = registry(&transport);
        let mut sub = registry.subscribe(KEY);

        tokio::time::timeout(after_ticks(1), sub.changed()).await.unwrap();
        sub.wait_for(|state| !state.is_validating).await.unwrap();

        tokio::time::timeout(after_ticks(1), sub.changed()).await.unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_changed_outlives_the_registry() {
        let transport = Arc::new(MockTransport::new(response_with(&["a"])));
        let registry = registry(&transport);
        let mut sub = registry.subscribe(KEY);
        sub.wait_for(|state| state.payload.is_some() && !state.is_validating)
            .await
            .unwrap();

        let refresher = sub.refresher();
        drop(registry);

        let (_, payload) = tokio::join!(sub.changed(), refresher.refresh());
        assert!(payload.is_some());
        assert!(sub.snapshot().payload.is_some());
    }
}

