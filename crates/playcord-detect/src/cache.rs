//! Content-hash cache in front of status parsing.

use std::future::Future;

use crate::client::log_fetch_error;
use crate::error::FetchError;
use crate::status::{parse_status, PlayerStatus};
use crate::unix_now;

/// Anything that can produce a raw `status.json` body.
pub trait StatusSource {
    fn fetch_body(&self) -> impl Future<Output = Result<String, FetchError>> + Send;

    /// Name of the current playlist item, for items whose status has no title.
    fn current_item_name(&self) -> impl Future<Output = Option<String>> + Send {
        async { None }
    }
}

/// Skips re-parsing when the raw status body has not changed.
///
/// The body hash is always stored, even when parsing fails, so an
/// unchanged malformed body is not parsed twice.
#[derive(Debug, Default)]
pub struct StatusCache {
    last_hash: Option<String>,
    last_status: Option<PlayerStatus>,
    parse_count: u64,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the body and return the parsed status, reusing the previous
    /// result when the body is byte-identical and `force_update` is unset.
    pub async fn get_or_fetch<S: StatusSource>(
        &mut self,
        source: &S,
        force_update: bool,
    ) -> Option<PlayerStatus> {
        let body = match source.fetch_body().await {
            Ok(body) => body,
            Err(e) => {
                log_fetch_error(&e);
                return None;
            }
        };

        let hash = format!("{:x}", md5::compute(body.as_bytes()));
        if !force_update && self.last_hash.as_deref() == Some(hash.as_str()) {
            return self.last_status.clone();
        }
        self.last_hash = Some(hash);

        self.parse_count += 1;
        self.last_status = match parse_status(&body, unix_now()) {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!(error = %e, "Invalid JSON in player status");
                None
            }
        };
        self.last_status.clone()
    }

    /// Number of times a body has actually been parsed.
    pub fn parse_count(&self) -> u64 {
        self.parse_count
    }

    pub fn invalidate(&mut self) {
        self.last_hash = None;
        self.last_status = None;
    }
}
