//! HTTP client for VLC's web interface (`/requests/status.json`).
//!
//! VLC's interface uses Basic auth with an empty username. Some setups
//! reject the header form but accept credentials in the URL, so a 401
//! triggers one retry with the other strategy; if that works, it becomes
//! the default for later requests.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use url::Url;

use crate::cache::StatusSource;
use crate::error::FetchError;
use crate::status::{parse_current_playlist_item, parse_status, PlayerStatus};
use crate::unix_now;

const STATUS_ENDPOINT: &str = "status.json";
const PLAYLIST_ENDPOINT: &str = "playlist.json";

/// Default hard timeout for a single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Where and how to reach the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEndpoint {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub enabled: bool,
    pub timeout: Duration,
}

impl Default for PlayerEndpoint {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9080,
            password: String::new(),
            enabled: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// How credentials are attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// `Authorization: Basic base64(":" + password)`, always sent.
    Header,
    /// `http://:password@host:port/...`
    Url,
}

impl AuthStrategy {
    fn alternate(self) -> Self {
        match self {
            Self::Header => Self::Url,
            Self::Url => Self::Header,
        }
    }
}

/// Result of a connectivity check against the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub reachable: bool,
    pub message: String,
}

/// Client for the player's JSON status interface.
pub struct VlcClient {
    http: Client,
    endpoint: RwLock<PlayerEndpoint>,
    strategy: RwLock<AuthStrategy>,
}

impl VlcClient {
    pub fn new(endpoint: PlayerEndpoint) -> Self {
        Self {
            http: Client::new(),
            endpoint: RwLock::new(endpoint),
            strategy: RwLock::new(AuthStrategy::Header),
        }
    }

    /// Swap in new connection settings (port or password changed).
    pub fn reconfigure(&self, endpoint: PlayerEndpoint) {
        if let Ok(mut current) = self.endpoint.write() {
            *current = endpoint;
        }
        self.set_auth_strategy(AuthStrategy::Header);
    }

    pub fn endpoint(&self) -> PlayerEndpoint {
        self.endpoint
            .read()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// The auth strategy used first on the next request.
    pub fn auth_strategy(&self) -> AuthStrategy {
        *self.strategy.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_auth_strategy(&self, strategy: AuthStrategy) {
        *self.strategy.write().unwrap_or_else(PoisonError::into_inner) = strategy;
    }

    /// Fetch and parse the current status, bypassing any cache.
    pub async fn fetch_status(&self) -> Option<PlayerStatus> {
        let body = match self.get(STATUS_ENDPOINT).await {
            Ok(body) => body,
            Err(e) => {
                log_fetch_error(&e);
                return None;
            }
        };
        match parse_status(&body, unix_now()) {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!(error = %e, "Invalid JSON in player status");
                None
            }
        }
    }

    /// Name of the current playlist item, used when the status carries no title.
    pub async fn fetch_current_item_name(&self) -> Option<String> {
        let body = match self.get(PLAYLIST_ENDPOINT).await {
            Ok(body) => body,
            Err(e) => {
                log_fetch_error(&e);
                return None;
            }
        };
        parse_current_playlist_item(&body).ok().flatten()
    }

    /// Probe the interface and describe what is wrong, if anything.
    pub async fn check(&self) -> Diagnosis {
        let diagnosis = |reachable: bool, message: &str| Diagnosis {
            reachable,
            message: message.to_string(),
        };
        match self.get(STATUS_ENDPOINT).await {
            Ok(_) => diagnosis(true, "VLC is running and the HTTP interface is accessible"),
            Err(FetchError::Disabled) => {
                diagnosis(false, "VLC HTTP interface is not enabled in configuration")
            }
            Err(FetchError::Unauthorized) => diagnosis(
                false,
                "VLC is running but authentication failed (incorrect password)",
            ),
            Err(FetchError::NotAvailable) => diagnosis(
                false,
                "VLC is running but the HTTP interface is not properly configured",
            ),
            Err(FetchError::Status(code)) => Diagnosis {
                reachable: false,
                message: format!("VLC returned unexpected status code: {code}"),
            },
            Err(FetchError::Unreachable(_)) => {
                diagnosis(false, "VLC is not running or the HTTP interface is not enabled")
            }
            Err(FetchError::Timeout) => diagnosis(false, "Connection to VLC timed out"),
            Err(e) => Diagnosis {
                reachable: false,
                message: format!("Error checking VLC status: {e}"),
            },
        }
    }

    /// GET an endpoint under `/requests/`, retrying once with the
    /// alternate auth strategy on 401.
    async fn get(&self, path: &str) -> Result<String, FetchError> {
        let endpoint = self.endpoint();
        if !endpoint.enabled {
            return Err(FetchError::Disabled);
        }

        let primary = self.auth_strategy();
        match self.request(&endpoint, path, primary).await {
            Err(FetchError::Unauthorized) => {
                let alternate = primary.alternate();
                tracing::debug!(?alternate, "Got 401, retrying with alternate auth");
                let body = self.request(&endpoint, path, alternate).await?;
                self.set_auth_strategy(alternate);
                tracing::info!(strategy = ?alternate, "Switched player auth strategy");
                Ok(body)
            }
            other => other,
        }
    }

    async fn request(
        &self,
        endpoint: &PlayerEndpoint,
        path: &str,
        strategy: AuthStrategy,
    ) -> Result<String, FetchError> {
        let mut url = request_url(endpoint, path)?;
        if strategy == AuthStrategy::Url && url.set_password(Some(&endpoint.password)).is_err() {
            return Err(FetchError::Parse("cannot embed credentials in URL".into()));
        }

        let mut req = self.http.get(url).timeout(endpoint.timeout);
        if strategy == AuthStrategy::Header {
            req = req.basic_auth("", Some(&endpoint.password));
        }

        let resp = req.send().await.map_err(classify_send_error)?;
        match resp.status() {
            StatusCode::OK => Ok(resp.text().await.map_err(classify_send_error)?),
            StatusCode::UNAUTHORIZED => Err(FetchError::Unauthorized),
            StatusCode::NOT_FOUND => Err(FetchError::NotAvailable),
            other => Err(FetchError::Status(other.as_u16())),
        }
    }
}

impl StatusSource for VlcClient {
    async fn fetch_body(&self) -> Result<String, FetchError> {
        self.get(STATUS_ENDPOINT).await
    }

    async fn current_item_name(&self) -> Option<String> {
        self.fetch_current_item_name().await
    }
}

fn request_url(endpoint: &PlayerEndpoint, path: &str) -> Result<Url, FetchError> {
    let base = Url::parse(&format!(
        "http://{}:{}/requests/",
        endpoint.host, endpoint.port
    ))?;
    Ok(base.join(path)?)
}

fn classify_send_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_connect() {
        FetchError::Unreachable(e.to_string())
    } else {
        FetchError::Http(e)
    }
}

pub(crate) fn log_fetch_error(e: &FetchError) {
    if e.is_routine() {
        tracing::debug!(error = %e, "Player status unavailable");
    } else {
        tracing::warn!(error = %e, "Failed to read player status");
    }
}
