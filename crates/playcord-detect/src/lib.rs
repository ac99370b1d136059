pub mod cache;
pub mod client;
pub mod error;
pub mod status;

use std::time::{SystemTime, UNIX_EPOCH};

pub use cache::{StatusCache, StatusSource};
pub use client::{AuthStrategy, Diagnosis, PlayerEndpoint, VlcClient};
pub use error::FetchError;
pub use status::{MediaInfo, MediaKind, PlayState, Playback, PlayerStatus, VideoResolution};

/// Current wall-clock time as Unix seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
