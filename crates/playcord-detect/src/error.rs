use thiserror::Error;

/// Errors from talking to the player's HTTP interface.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP interface is disabled")]
    Disabled,

    #[error("HTTP interface not available (404)")]
    NotAvailable,

    #[error("authentication failed (401)")]
    Unauthorized,

    #[error("player unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// Errors expected whenever the player is closed or not configured.
    /// These are routine and only worth a debug line.
    pub fn is_routine(&self) -> bool {
        matches!(
            self,
            Self::Disabled | Self::NotAvailable | Self::Unreachable(_) | Self::Timeout
        )
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
