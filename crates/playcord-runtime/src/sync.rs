//! The polling loop: fetch → classify → compose → push.
//!
//! Two repeating timers drive ticks: a short burst of fast checks right
//! after `start()` (and again whenever the presence connection comes
//! back), and the steady-state interval. Ticks are serialized
//! through the pipeline lock, and a tick whose token was cancelled while
//! it waited on the network drops its result instead of applying it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use playcord_core::config::{DiscordConfig, SyncConfig};
use playcord_core::{compose, ActivityKind, PlaybackPhase, PresencePayload};
use playcord_detect::{unix_now, MediaKind, StatusCache, StatusSource};
use playcord_parse::classify;

use crate::artwork::{ArtworkResolver, PassthroughArtwork};
use crate::connection::ConnectionManager;
use crate::events::{record, SharedEventLog, SyncEvent};
use crate::link::PresenceLink;
use crate::timer;

/// Settings the scheduler reads on every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub sync: SyncConfig,
    pub presence: DiscordConfig,
}

/// Last outcome of the sync loop, for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncStateDto {
    pub last_title: Option<String>,
    pub activity: Option<ActivityKind>,
    pub status_message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new payload was pushed.
    Updated,
    /// Nothing changed since the last push or clear.
    Unchanged,
    Cleared,
    /// The presence service did not accept the update.
    NotPushed,
    /// The scheduler was stopped while this tick was in flight.
    Discarded,
}

#[derive(Default)]
struct Pipeline {
    cache: StatusCache,
    /// Connection generation and payload of the last successful push.
    last_pushed: Option<(u64, PresencePayload)>,
    /// Connection generation of the last successful clear.
    cleared_at: Option<u64>,
}

impl Pipeline {
    fn reset(&mut self) {
        self.cache.invalidate();
        self.last_pushed = None;
        self.cleared_at = None;
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SyncScheduler<S, L: PresenceLink, A = PassthroughArtwork> {
    source: Arc<S>,
    connection: Arc<ConnectionManager<L>>,
    artwork: A,
    config: RwLock<SchedulerConfig>,
    pipeline: tokio::sync::Mutex<Pipeline>,
    running: Mutex<Option<CancellationToken>>,
    state: Mutex<SyncStateDto>,
    events: SharedEventLog,
}

impl<S, L, A> SyncScheduler<S, L, A>
where
    S: StatusSource + Send + Sync + 'static,
    L: PresenceLink,
    A: ArtworkResolver,
{
    pub fn new(
        source: Arc<S>,
        connection: Arc<ConnectionManager<L>>,
        artwork: A,
        config: SchedulerConfig,
        events: SharedEventLog,
    ) -> Self {
        Self {
            source,
            connection,
            artwork,
            config: RwLock::new(config),
            pipeline: tokio::sync::Mutex::new(Pipeline::default()),
            running: Mutex::new(None),
            state: Mutex::new(SyncStateDto {
                status_message: "Ready".into(),
                ..Default::default()
            }),
            events,
        }
    }

    pub fn connection(&self) -> &Arc<ConnectionManager<L>> {
        &self.connection
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Takes effect on the next tick; cadence changes need a restart.
    pub fn set_config(&self, config: SchedulerConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    pub fn is_running(&self) -> bool {
        lock(&self.running).is_some()
    }

    pub fn sync_state(&self) -> SyncStateDto {
        lock(&self.state).clone()
    }

    /// Connect, then start the fast-check burst and the steady timer.
    /// Calling this while running is a successful no-op.
    pub async fn start(self: &Arc<Self>) -> bool {
        let token = {
            let mut running = lock(&self.running);
            if running.is_some() {
                return true;
            }
            let token = CancellationToken::new();
            *running = Some(token.clone());
            token
        };

        let sync = self.config().sync;
        tracing::info!(
            interval = ?sync.update_interval(),
            fast_checks = sync.fast_check_count,
            "Starting presence sync"
        );
        self.set_status_message("Running");

        let mut connected = self.connection.subscribe();
        if !self.connection.connect().await {
            tracing::debug!("Initial presence connect failed, reconnect scheduled");
        }
        // The initial connect is covered by the startup burst.
        connected.mark_unchanged();

        self.spawn_ticker(&token, sync.fast_check_interval(), Some(sync.fast_check_count), true);
        self.spawn_ticker(&token, sync.update_interval(), None, false);
        self.spawn_reconnect_bursts(&token, connected);
        true
    }

    /// Cancel both timers and clear the presence. Returns false when not
    /// running.
    pub async fn stop(&self) -> bool {
        let Some(token) = lock(&self.running).take() else {
            return false;
        };
        token.cancel();

        // Wait out any in-flight tick so its result cannot land after the clear.
        let mut pipeline = self.pipeline.lock().await;
        if !self.connection.clear().await {
            tracing::debug!("Presence not cleared on stop");
        }
        pipeline.reset();
        drop(pipeline);

        {
            let mut state = lock(&self.state);
            state.last_title = None;
            state.activity = None;
            state.status_message = "Stopped".into();
        }
        tracing::info!("Presence sync stopped");
        true
    }

    /// Run another fast-check burst each time the connection is regained.
    fn spawn_reconnect_bursts(
        self: &Arc<Self>,
        token: &CancellationToken,
        mut connected: watch::Receiver<u64>,
    ) {
        let this = Arc::clone(self);
        let token = token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    changed = connected.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let generation = *connected.borrow_and_update();
                let sync = this.config().sync;
                tracing::debug!(generation, "Presence connection regained, running fast checks");
                this.spawn_ticker(
                    &token,
                    sync.fast_check_interval(),
                    Some(sync.fast_check_count),
                    true,
                );
            }
        });
    }

    fn spawn_ticker(
        self: &Arc<Self>,
        token: &CancellationToken,
        period: std::time::Duration,
        limit: Option<u32>,
        force_update: bool,
    ) {
        let this = Arc::clone(self);
        let tick_token = token.clone();
        timer::every(token, period, limit, move || {
            let this = Arc::clone(&this);
            let token = tick_token.clone();
            async move {
                this.tick(&token, force_update).await;
            }
        });
    }

    /// Run one pass of the pipeline.
    pub async fn tick(&self, token: &CancellationToken, force_update: bool) -> TickOutcome {
        let mut pipeline = self.pipeline.lock().await;
        if token.is_cancelled() {
            return TickOutcome::Discarded;
        }

        let mut status = pipeline
            .cache
            .get_or_fetch(self.source.as_ref(), force_update)
            .await;
        if let Some(s) = status.as_mut() {
            if s.media.title.is_none() && !s.is_idle() {
                s.media.title = self.source.current_item_name().await;
            }
        }
        if token.is_cancelled() {
            return TickOutcome::Discarded;
        }

        let phase = PlaybackPhase::of(status.as_ref());
        let status = match status {
            Some(status) if phase.shows_presence() => status,
            _ => return self.clear_presence(&mut pipeline, phase).await,
        };
        record(
            &self.events,
            SyncEvent::StatusFetched {
                title: status.media.title.clone(),
                playing: phase == PlaybackPhase::Playing,
            },
        );

        let classification = match (&status.media_kind, status.media.title.as_deref()) {
            (MediaKind::Video, Some(title)) => {
                let c = classify(title);
                record(
                    &self.events,
                    SyncEvent::Classified {
                        raw_title: title.to_string(),
                        kind: c.kind(),
                    },
                );
                Some(c)
            }
            _ => None,
        };

        let artwork = self.artwork.resolve(&status, classification.as_ref()).await;
        let presence = self.config().presence;
        let Some(payload) = compose(
            &status,
            classification.as_ref(),
            &presence,
            &artwork,
            unix_now(),
        ) else {
            return self.clear_presence(&mut pipeline, phase).await;
        };

        if token.is_cancelled() {
            return TickOutcome::Discarded;
        }

        let generation = self.connection.generation();
        if let Some((pushed_gen, last)) = &pipeline.last_pushed {
            if *pushed_gen == generation && last.is_equivalent(&payload) {
                return TickOutcome::Unchanged;
            }
        }

        if !self.connection.update(&payload).await {
            pipeline.last_pushed = None;
            self.set_status_message("Presence service not connected");
            return TickOutcome::NotPushed;
        }

        tracing::info!(
            title = %payload.title_line,
            subtitle = %payload.subtitle_line,
            activity = ?payload.activity_kind,
            "Updated presence"
        );
        record(
            &self.events,
            SyncEvent::PresenceUpdated {
                title_line: payload.title_line.clone(),
                activity: payload.activity_kind,
            },
        );
        {
            let mut state = lock(&self.state);
            state.last_title = Some(payload.title_line.clone());
            state.activity = Some(payload.activity_kind);
            state.status_message = match phase {
                PlaybackPhase::Paused => "Paused".into(),
                _ => "Playing".into(),
            };
        }
        pipeline.cleared_at = None;
        pipeline.last_pushed = Some((generation, payload));
        TickOutcome::Updated
    }

    async fn clear_presence(&self, pipeline: &mut Pipeline, phase: PlaybackPhase) -> TickOutcome {
        let reason = match phase {
            PlaybackPhase::NoStatus => "no status data",
            _ => "player stopped",
        };
        {
            let mut state = lock(&self.state);
            state.last_title = None;
            state.activity = None;
            state.status_message = match phase {
                PlaybackPhase::NoStatus => "Player not reachable".into(),
                _ => "Nothing playing".into(),
            };
        }

        let generation = self.connection.generation();
        if pipeline.cleared_at == Some(generation) {
            return TickOutcome::Unchanged;
        }
        pipeline.last_pushed = None;
        if !self.connection.clear().await {
            return TickOutcome::NotPushed;
        }

        tracing::info!(reason, "Cleared presence");
        record(
            &self.events,
            SyncEvent::PresenceCleared {
                reason: reason.to_string(),
            },
        );
        pipeline.cleared_at = Some(generation);
        TickOutcome::Cleared
    }

    fn set_status_message(&self, message: &str) {
        lock(&self.state).status_message = message.to_string();
    }
}
