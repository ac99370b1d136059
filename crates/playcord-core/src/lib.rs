pub mod artwork;
pub mod config;
pub mod error;
pub mod presence;
pub mod vlcrc;

pub use artwork::{embeddable_ref, Artwork};
pub use config::AppConfig;
pub use error::CoreError;
pub use presence::{compose, ActivityKind, PlaybackPhase, PresencePayload};
