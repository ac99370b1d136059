pub mod artwork;
pub mod backoff;
pub mod connection;
pub mod events;
pub mod link;
pub mod sync;
pub mod timer;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;

use playcord_core::AppConfig;
use playcord_detect::{Diagnosis, VlcClient};

pub use artwork::{ArtworkResolver, PassthroughArtwork};
pub use backoff::BackoffPolicy;
pub use connection::{ConnectionManager, ConnectionPhase, ConnectionState, ReconnectPolicy};
pub use events::{EventEntry, SharedEventLog, SyncEvent};
pub use link::{DiscordIpcLink, LinkError, PresenceLink};
pub use sync::{SchedulerConfig, SyncScheduler, SyncStateDto, TickOutcome};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(String),
    #[error("presence link error: {0}")]
    Link(String),
}

type Scheduler<L> = SyncScheduler<VlcClient, L>;

/// Owns the configuration and every long-lived component of the bridge.
pub struct Runtime<L: PresenceLink = DiscordIpcLink> {
    config: RwLock<AppConfig>,
    /// Where `update_config` persists changes; `None` keeps them in memory.
    config_path: Option<PathBuf>,
    client: Arc<VlcClient>,
    scheduler: Arc<Scheduler<L>>,
    events: SharedEventLog,
}

impl Runtime<DiscordIpcLink> {
    pub fn new(config: AppConfig) -> Result<Self, RuntimeError> {
        let link = DiscordIpcLink::spawn(config.discord.connect_timeout())
            .map_err(|e| RuntimeError::Link(e.to_string()))?;
        Ok(Self::with_link(config, link))
    }
}

impl<L: PresenceLink> Runtime<L> {
    pub fn with_link(config: AppConfig, link: L) -> Self {
        let events = events::shared_event_log();
        let client = Arc::new(VlcClient::new(config.player.endpoint()));
        let connection = Arc::new(ConnectionManager::new(
            link,
            config.discord.client_id.clone(),
            ReconnectPolicy::from_config(&config.reconnect),
            events.clone(),
        ));
        let scheduler = Arc::new(SyncScheduler::new(
            client.clone(),
            connection,
            PassthroughArtwork,
            scheduler_config(&config),
            events.clone(),
        ));

        Self {
            config: RwLock::new(config),
            config_path: None,
            client,
            scheduler,
            events,
        }
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    fn connection(&self) -> &Arc<ConnectionManager<L>> {
        self.scheduler.connection()
    }

    /// Start syncing. Idempotent.
    pub async fn start(&self) -> bool {
        let enabled = self.config.read().await.discord.enabled;
        self.connection().set_enabled(enabled).await;
        self.scheduler.start().await
    }

    /// Stop syncing and clear the presence. Returns false when not running.
    pub async fn stop(&self) -> bool {
        self.scheduler.stop().await
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub async fn get_config(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Persist (when a path is set) and apply a new configuration.
    pub async fn update_config(&self, new_config: AppConfig) -> Result<(), RuntimeError> {
        if let Some(path) = &self.config_path {
            new_config
                .save_to(path)
                .map_err(|e| RuntimeError::Config(e.to_string()))?;
        }
        let old = std::mem::replace(&mut *self.config.write().await, new_config.clone());

        if old.player != new_config.player {
            tracing::info!(
                host = %new_config.player.host,
                port = new_config.player.http_port,
                "Player endpoint changed"
            );
            self.client.reconfigure(new_config.player.endpoint());
        }

        let connection = self.connection();
        connection.set_policy(ReconnectPolicy::from_config(&new_config.reconnect));
        connection.set_enabled(new_config.discord.enabled).await;
        connection
            .update_client_id(new_config.discord.client_id.clone())
            .await;

        self.scheduler.set_config(scheduler_config(&new_config));
        if old.sync != new_config.sync && self.is_running() {
            tracing::info!("Sync cadence changed, restarting");
            self.scheduler.stop().await;
            self.scheduler.start().await;
        }
        Ok(())
    }

    pub fn sync_state(&self) -> SyncStateDto {
        self.scheduler.sync_state()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection().state()
    }

    /// Retry the presence service now, resetting the attempt counter.
    pub async fn reconnect(&self) -> bool {
        self.connection().force_reconnect().await
    }

    pub fn events(&self) -> Vec<EventEntry> {
        self.events
            .lock()
            .map(|log| log.snapshot())
            .unwrap_or_default()
    }

    pub async fn check_player(&self) -> Diagnosis {
        self.client.check().await
    }

    /// Stop and close the presence link for good.
    pub async fn shutdown(&self) {
        self.scheduler.stop().await;
        self.connection().shutdown().await;
    }
}

fn scheduler_config(config: &AppConfig) -> SchedulerConfig {
    SchedulerConfig {
        sync: config.sync.clone(),
        presence: config.discord.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::testing::FakeLink;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        // No player: every tick sees "no status".
        config.player.http_enabled = false;
        config
    }

    fn link(runtime: &Runtime<FakeLink>) -> &FakeLink {
        runtime.connection().link()
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_stop_lifecycle() {
        let runtime = Runtime::with_link(config(), FakeLink::default());
        assert_eq!(runtime.sync_state().status_message, "Ready");

        assert!(runtime.start().await);
        assert!(runtime.is_running());
        assert_eq!(runtime.connection_state().phase, ConnectionPhase::Connected);

        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert_eq!(
            runtime.sync_state().status_message,
            "Player not reachable"
        );

        assert!(runtime.stop().await);
        assert!(!runtime.is_running());
        assert_eq!(runtime.sync_state().status_message, "Stopped");
        assert!(!runtime.stop().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_with_presence_disabled_does_not_connect() {
        let mut cfg = config();
        cfg.discord.enabled = false;
        let runtime = Runtime::with_link(cfg, FakeLink::default());

        assert!(runtime.start().await);
        assert_eq!(FakeLink::count(&link(&runtime).connects), 0);
        runtime.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_id_change_reconnects() {
        let runtime = Runtime::with_link(config(), FakeLink::default());
        runtime.start().await;

        let mut cfg = runtime.get_config().await;
        cfg.discord.client_id = "42".into();
        runtime.update_config(cfg).await.unwrap();

        assert_eq!(FakeLink::count(&link(&runtime).connects), 2);
        assert_eq!(
            link(&runtime).client_ids.lock().unwrap().last().map(String::as_str),
            Some("42")
        );
        assert_eq!(runtime.get_config().await.discord.client_id, "42");
        runtime.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_presence_disconnects() {
        let runtime = Runtime::with_link(config(), FakeLink::default());
        runtime.start().await;

        let mut cfg = runtime.get_config().await;
        cfg.discord.enabled = false;
        runtime.update_config(cfg).await.unwrap();

        assert_eq!(
            runtime.connection_state().phase,
            ConnectionPhase::Disconnected
        );
        assert!(!link(&runtime).is_authenticated());
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_update_config_persists_and_reconfigures_player() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let runtime = Runtime::with_link(config(), FakeLink::default()).with_config_path(&path);

        let mut cfg = runtime.get_config().await;
        cfg.player.http_port = 8181;
        runtime.update_config(cfg.clone()).await.unwrap();

        assert_eq!(AppConfig::load_from(&path).unwrap(), cfg);
        assert_eq!(runtime.client.endpoint().port, 8181);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_record_connection_changes() {
        let runtime = Runtime::with_link(config(), FakeLink::default());
        runtime.start().await;

        let connected = runtime.events().into_iter().any(|(_, e)| {
            matches!(
                e,
                SyncEvent::ConnectionChanged {
                    phase: ConnectionPhase::Connected,
                    ..
                }
            )
        });
        assert!(connected);
        runtime.shutdown().await;
    }
}
