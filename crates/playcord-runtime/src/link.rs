//! Connection to the presence service.
//!
//! `DiscordIpcLink` runs a `DiscordIpcClient` on a dedicated OS thread
//! (IPC is blocking) and exposes async request/reply calls over channels.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use discord_rich_presence::{activity, DiscordIpc, DiscordIpcClient};
use thiserror::Error;
use tokio::sync::oneshot;

use playcord_core::{ActivityKind, PresencePayload};

#[derive(Debug, Clone, Error)]
pub enum LinkError {
    #[error("not connected")]
    NotConnected,

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("timed out waiting for the presence service")]
    Timeout,

    #[error("link worker has stopped")]
    Closed,
}

/// A connection to the presence service.
pub trait PresenceLink: Send + Sync + 'static {
    /// Open (or reopen) the connection under `client_id`.
    fn connect(&self, client_id: &str) -> impl Future<Output = Result<(), LinkError>> + Send;

    /// Drop the connection. Never fails.
    fn close(&self) -> impl Future<Output = ()> + Send;

    fn set_activity(
        &self,
        payload: &PresencePayload,
    ) -> impl Future<Output = Result<(), LinkError>> + Send;

    fn clear_activity(&self) -> impl Future<Output = Result<(), LinkError>> + Send;

    /// Whether the service has completed its handshake for a user.
    fn is_authenticated(&self) -> bool;
}

type Reply<T> = oneshot::Sender<T>;

/// Commands sent to the IPC worker thread.
enum LinkCommand {
    Connect {
        client_id: String,
        reply: Reply<Result<(), LinkError>>,
    },
    SetActivity {
        payload: Box<PresencePayload>,
        reply: Reply<Result<(), LinkError>>,
    },
    Clear {
        reply: Reply<Result<(), LinkError>>,
    },
    Close {
        reply: Reply<()>,
    },
}

/// Discord IPC link backed by a worker thread.
pub struct DiscordIpcLink {
    tx: mpsc::Sender<LinkCommand>,
    authenticated: Arc<AtomicBool>,
    timeout: Duration,
}

impl DiscordIpcLink {
    /// Spawn the worker thread. `timeout` bounds every call.
    pub fn spawn(timeout: Duration) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let authenticated = Arc::new(AtomicBool::new(false));
        let flag = authenticated.clone();

        std::thread::Builder::new()
            .name("discord-rpc".into())
            .spawn(move || worker_loop(rx, flag))?;

        Ok(Self {
            tx,
            authenticated,
            timeout,
        })
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> LinkCommand,
    ) -> Result<T, LinkError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).map_err(|_| LinkError::Closed)?;
        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(LinkError::Closed),
            Err(_) => Err(LinkError::Timeout),
        }
    }
}

impl PresenceLink for DiscordIpcLink {
    async fn connect(&self, client_id: &str) -> Result<(), LinkError> {
        let client_id = client_id.to_string();
        self.call(|reply| LinkCommand::Connect { client_id, reply })
            .await?
    }

    async fn close(&self) {
        let _ = self.call(|reply| LinkCommand::Close { reply }).await;
    }

    async fn set_activity(&self, payload: &PresencePayload) -> Result<(), LinkError> {
        let payload = Box::new(payload.clone());
        self.call(|reply| LinkCommand::SetActivity { payload, reply })
            .await?
    }

    async fn clear_activity(&self) -> Result<(), LinkError> {
        self.call(|reply| LinkCommand::Clear { reply }).await?
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }
}

/// The worker loop: owns the IPC client and processes commands.
fn worker_loop(rx: mpsc::Receiver<LinkCommand>, authenticated: Arc<AtomicBool>) {
    let mut client: Option<DiscordIpcClient> = None;

    let drop_client = |client: &mut Option<DiscordIpcClient>| {
        if let Some(mut ipc) = client.take() {
            let _ = ipc.close();
        }
        authenticated.store(false, Ordering::SeqCst);
    };

    for cmd in rx {
        match cmd {
            LinkCommand::Connect { client_id, reply } => {
                drop_client(&mut client);
                let mut ipc = DiscordIpcClient::new(&client_id);
                let result = match ipc.connect() {
                    Ok(()) => {
                        client = Some(ipc);
                        authenticated.store(true, Ordering::SeqCst);
                        Ok(())
                    }
                    Err(e) => Err(LinkError::Ipc(e.to_string())),
                };
                let _ = reply.send(result);
            }
            LinkCommand::SetActivity { payload, reply } => {
                let result = match client.as_mut() {
                    Some(ipc) => push_activity(ipc, &payload),
                    None => Err(LinkError::NotConnected),
                };
                if result.is_err() {
                    // The pipe is most likely gone.
                    drop_client(&mut client);
                }
                let _ = reply.send(result);
            }
            LinkCommand::Clear { reply } => {
                let result = match client.as_mut() {
                    Some(ipc) => ipc
                        .clear_activity()
                        .map_err(|e| LinkError::Ipc(e.to_string())),
                    None => Err(LinkError::NotConnected),
                };
                if result.is_err() {
                    drop_client(&mut client);
                }
                let _ = reply.send(result);
            }
            LinkCommand::Close { reply } => {
                drop_client(&mut client);
                let _ = reply.send(());
            }
        }
    }

    drop_client(&mut client);
    tracing::debug!("Discord link worker stopped");
}

fn push_activity(ipc: &mut DiscordIpcClient, payload: &PresencePayload) -> Result<(), LinkError> {
    let mut assets = activity::Assets::new();
    if let Some(image) = payload.large_image.as_deref() {
        assets = assets.large_image(image);
    }
    if let Some(text) = payload.large_caption.as_deref() {
        assets = assets.large_text(text);
    }
    if let Some(image) = payload.small_image.as_deref() {
        assets = assets.small_image(image);
    }
    if let Some(text) = payload.small_caption.as_deref() {
        assets = assets.small_text(text);
    }

    let mut act = activity::Activity::new()
        .details(payload.title_line.as_str())
        .state(payload.subtitle_line.as_str())
        .assets(assets)
        .activity_type(match payload.activity_kind {
            ActivityKind::Listening => activity::ActivityType::Listening,
            ActivityKind::Watching => activity::ActivityType::Watching,
        });

    if let Some(start) = payload.start_unix {
        let mut timestamps = activity::Timestamps::new().start(start);
        if let Some(end) = payload.end_unix {
            timestamps = timestamps.end(end);
        }
        act = act.timestamps(timestamps);
    }
    ipc.set_activity(act)
        .map_err(|e| LinkError::Ipc(e.to_string()))
}
