//! Lifecycle of the presence-service connection.
//!
//! Connect attempts never overlap: an in-flight flag turns a second
//! `connect()` into an immediate failure. Failed connects and failed
//! pushes drop to `Disconnected` and schedule a delayed reconnect, up to
//! the configured attempt cap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use playcord_core::config::ReconnectConfig;
use playcord_core::PresencePayload;

use crate::backoff::BackoffPolicy;
use crate::events::{record, SharedEventLog, SyncEvent};
use crate::link::PresenceLink;
use crate::timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
    ReconnectPending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    pub phase: ConnectionPhase,
    pub reconnect_attempts: u32,
    pub last_error: Option<String>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
            reconnect_attempts: 0,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub backoff: BackoffPolicy,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn from_config(cfg: &ReconnectConfig) -> Self {
        Self {
            backoff: BackoffPolicy::from_config(cfg),
            max_attempts: cfg.max_attempts,
        }
    }
}

pub struct ConnectionManager<L: PresenceLink> {
    link: L,
    state: Mutex<ConnectionState>,
    in_flight: AtomicBool,
    enabled: AtomicBool,
    /// Bumped on every successful connect.
    generation: watch::Sender<u64>,
    client_id: Mutex<String>,
    policy: Mutex<ReconnectPolicy>,
    reconnect_timer: Mutex<Option<CancellationToken>>,
    shutdown: CancellationToken,
    events: SharedEventLog,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<L: PresenceLink> ConnectionManager<L> {
    pub fn new(
        link: L,
        client_id: impl Into<String>,
        policy: ReconnectPolicy,
        events: SharedEventLog,
    ) -> Self {
        Self {
            link,
            state: Mutex::new(ConnectionState::default()),
            in_flight: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
            generation: watch::Sender::new(0),
            client_id: Mutex::new(client_id.into()),
            policy: Mutex::new(policy),
            reconnect_timer: Mutex::new(None),
            shutdown: CancellationToken::new(),
            events,
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.state).clone()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).phase == ConnectionPhase::Connected
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Changes whenever a new connection is established.
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Notified with the new generation after every successful connect.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    pub fn client_id(&self) -> String {
        lock(&self.client_id).clone()
    }

    pub fn set_policy(&self, policy: ReconnectPolicy) {
        *lock(&self.policy) = policy;
    }

    /// Connect unless already connected or a connect is in flight.
    pub async fn connect(self: &Arc<Self>) -> bool {
        if !self.is_enabled() || self.shutdown.is_cancelled() {
            return false;
        }
        if self.is_connected() {
            return true;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Presence connect already in flight");
            return false;
        }

        self.cancel_reconnect_timer();
        self.set_phase(ConnectionPhase::Connecting);

        let client_id = self.client_id();
        let result = self.link.connect(&client_id).await;

        let connected = match result {
            Ok(()) if !self.is_enabled() || self.shutdown.is_cancelled() => {
                self.link.close().await;
                self.set_phase(ConnectionPhase::Disconnected);
                false
            }
            Ok(()) => {
                {
                    let mut state = lock(&self.state);
                    state.phase = ConnectionPhase::Connected;
                    state.reconnect_attempts = 0;
                    state.last_error = None;
                }
                self.generation.send_modify(|g| *g += 1);
                tracing::info!(client_id = %client_id, "Connected to presence service");
                self.record_phase();
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Presence service not available");
                self.mark_disconnected(e.to_string());
                false
            }
        };
        self.in_flight.store(false, Ordering::SeqCst);

        if !connected {
            self.schedule_reconnect();
        }
        connected
    }

    /// Tear down any link, reset the attempt counter and connect again.
    pub async fn force_reconnect(self: &Arc<Self>) -> bool {
        self.cancel_reconnect_timer();
        self.link.close().await;
        {
            let mut state = lock(&self.state);
            state.phase = ConnectionPhase::Disconnected;
            state.reconnect_attempts = 0;
        }
        tracing::info!("Forcing presence reconnect");
        self.connect().await
    }

    /// Push a payload. Fails closed when disabled, disconnected or
    /// when the link has no authenticated user.
    pub async fn update(self: &Arc<Self>, payload: &PresencePayload) -> bool {
        if !self.is_enabled() || !self.is_connected() {
            return false;
        }
        if !self.link.is_authenticated() {
            tracing::debug!("Presence link has no authenticated user");
            return false;
        }
        match self.link.set_activity(payload).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to set presence");
                self.mark_disconnected(e.to_string());
                self.schedule_reconnect();
                false
            }
        }
    }

    /// Clear the remote presence. No-op when not connected.
    pub async fn clear(self: &Arc<Self>) -> bool {
        if !self.is_connected() {
            return false;
        }
        match self.link.clear_activity().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to clear presence");
                self.mark_disconnected(e.to_string());
                self.schedule_reconnect();
                false
            }
        }
    }

    /// Switch application id; reconnects right away when connected.
    pub async fn update_client_id(self: &Arc<Self>, client_id: String) -> bool {
        {
            let mut current = lock(&self.client_id);
            if *current == client_id {
                return false;
            }
            *current = client_id;
        }
        if self.is_connected() {
            tracing::info!("Client id changed, reconnecting");
            self.force_reconnect().await
        } else {
            false
        }
    }

    pub async fn set_enabled(self: &Arc<Self>, enabled: bool) {
        if self.enabled.swap(enabled, Ordering::SeqCst) == enabled {
            return;
        }
        if enabled {
            tracing::info!("Presence enabled");
            lock(&self.state).reconnect_attempts = 0;
            self.connect().await;
        } else {
            tracing::info!("Presence disabled");
            self.disconnect().await;
        }
    }

    /// Final teardown: no further connects or timers after this.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.disconnect().await;
    }

    async fn disconnect(&self) {
        self.cancel_reconnect_timer();
        if self.is_connected() {
            if let Err(e) = self.link.clear_activity().await {
                tracing::debug!(error = %e, "Presence not cleared on disconnect");
            }
        }
        self.link.close().await;
        {
            let mut state = lock(&self.state);
            state.phase = ConnectionPhase::Disconnected;
            state.reconnect_attempts = 0;
        }
        self.record_phase();
    }

    fn schedule_reconnect(self: &Arc<Self>) {
        if !self.is_enabled() || self.shutdown.is_cancelled() {
            return;
        }
        let policy = *lock(&self.policy);

        let attempt = {
            let mut state = lock(&self.state);
            if state.reconnect_attempts >= policy.max_attempts {
                state.phase = ConnectionPhase::Disconnected;
                None
            } else {
                state.reconnect_attempts += 1;
                state.phase = ConnectionPhase::ReconnectPending;
                Some(state.reconnect_attempts)
            }
        };
        self.record_phase();

        let Some(attempt) = attempt else {
            tracing::warn!(
                max_attempts = policy.max_attempts,
                "Giving up on presence service until reconnect is forced"
            );
            return;
        };

        let delay = policy.backoff.delay(attempt);
        tracing::debug!(attempt, ?delay, "Scheduling presence reconnect");

        let token = self.shutdown.child_token();
        if let Some(previous) = lock(&self.reconnect_timer).replace(token.clone()) {
            previous.cancel();
        }
        let this = Arc::clone(self);
        timer::after(&token, delay, async move {
            this.connect().await;
        });
    }

    fn cancel_reconnect_timer(&self) {
        if let Some(token) = lock(&self.reconnect_timer).take() {
            token.cancel();
        }
    }

    fn set_phase(&self, phase: ConnectionPhase) {
        lock(&self.state).phase = phase;
        self.record_phase();
    }

    fn mark_disconnected(&self, error: String) {
        record(
            &self.events,
            SyncEvent::Error {
                source: "presence".into(),
                message: error.clone(),
            },
        );
        {
            let mut state = lock(&self.state);
            state.phase = ConnectionPhase::Disconnected;
            state.last_error = Some(error);
        }
        self.record_phase();
    }

    fn record_phase(&self) {
        let state = self.state();
        record(
            &self.events,
            SyncEvent::ConnectionChanged {
                phase: state.phase,
                attempts: state.reconnect_attempts,
            },
        );
    }
}
