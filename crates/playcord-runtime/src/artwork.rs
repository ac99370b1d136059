use std::future::Future;

use playcord_core::{embeddable_ref, Artwork};
use playcord_detect::PlayerStatus;
use playcord_parse::Classification;

/// Source of images for a composition.
pub trait ArtworkResolver: Send + Sync + 'static {
    fn resolve(
        &self,
        status: &PlayerStatus,
        classification: Option<&Classification>,
    ) -> impl Future<Output = Artwork> + Send;
}

/// Uses the player's own artwork reference when it is already remote.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughArtwork;

impl ArtworkResolver for PassthroughArtwork {
    async fn resolve(
        &self,
        status: &PlayerStatus,
        _classification: Option<&Classification>,
    ) -> Artwork {
        Artwork {
            content_image: None,
            cover_image: embeddable_ref(status.media.artwork_ref.as_deref()),
        }
    }
}
