//! Image references handed to the presence service.

use serde::{Deserialize, Serialize};
use url::Url;

/// Images available for one composition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    /// Image found for the classified content (show poster, film still).
    pub content_image: Option<String>,
    /// Cover shipped with the media itself, already embeddable.
    pub cover_image: Option<String>,
}

/// Turn a player artwork reference into something the presence service
/// can display. Only remote `http(s)` URLs qualify; local files do not.
pub fn embeddable_ref(reference: Option<&str>) -> Option<String> {
    let reference = reference?.trim();
    if reference.is_empty() {
        return None;
    }
    match Url::parse(reference) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Some(url.to_string())
        }
        Ok(url) => {
            tracing::trace!(scheme = url.scheme(), "Artwork reference not embeddable");
            None
        }
        // Bare paths ("/home/.../cover.jpg", "C:\\...") fail to parse or
        // parse with a drive-letter scheme above.
        Err(_) => None,
    }
}
