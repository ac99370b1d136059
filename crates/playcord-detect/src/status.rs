//! Player status model and conversion from VLC's `status.json` /
//! `playlist.json` payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FetchError;

/// Playback state as reported by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    Playing,
    Paused,
    Stopped,
}

/// Whether the loaded item carries a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Playback {
    /// Position as a fraction of the duration, 0.0–1.0.
    pub position_fraction: f64,
    pub position_seconds: i64,
    pub duration_seconds: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Local `file://` reference or remote URL.
    pub artwork_ref: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoResolution {
    pub width: u32,
    pub height: u32,
}

/// Snapshot of the player at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatus {
    /// False when nothing is loaded.
    pub active: bool,
    pub play_state: PlayState,
    pub observed_at_unix: i64,
    pub playback: Playback,
    pub media_kind: MediaKind,
    pub media: MediaInfo,
    pub video_resolution: Option<VideoResolution>,
}

impl PlayerStatus {
    /// Stopped and inactive are treated alike downstream: nothing to show.
    pub fn is_idle(&self) -> bool {
        !self.active || self.play_state == PlayState::Stopped
    }
}

// ── Raw VLC payloads ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawStatus {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    time: Option<f64>,
    #[serde(default)]
    length: Option<f64>,
    #[serde(default)]
    position: Option<f64>,
    /// An object when media is loaded; VLC emits other shapes (or nothing)
    /// otherwise.
    #[serde(default)]
    information: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawInformation {
    #[serde(default)]
    category: BTreeMap<String, BTreeMap<String, Value>>,
}

const META_CATEGORY: &str = "meta";

/// Parse a `status.json` body into a [`PlayerStatus`].
pub fn parse_status(body: &str, observed_at_unix: i64) -> Result<PlayerStatus, FetchError> {
    let raw: RawStatus = serde_json::from_str(body)?;

    let play_state = match raw.state.as_deref() {
        Some("playing") => PlayState::Playing,
        Some("paused") => PlayState::Paused,
        _ => PlayState::Stopped,
    };

    let category = raw
        .information
        .and_then(|v| serde_json::from_value::<RawInformation>(v).ok())
        .unwrap_or_default()
        .category;

    let mut streams = category
        .iter()
        .filter(|(name, _)| name.as_str() != META_CATEGORY)
        .map(|(_, fields)| fields);

    // One video stream is enough, even alongside audio streams.
    let first_video = streams.find(|fields| string_field(fields, "Type") == Some("Video"));
    let media_kind = if first_video.is_some() {
        MediaKind::Video
    } else {
        MediaKind::Audio
    };
    let video_resolution = first_video
        .and_then(|fields| string_field(fields, "Video_resolution"))
        .and_then(parse_resolution);

    let media = category
        .get(META_CATEGORY)
        .map(|meta| MediaInfo {
            title: owned_field(meta, "title").or_else(|| owned_field(meta, "filename")),
            artist: owned_field(meta, "artist"),
            album: owned_field(meta, "album"),
            artwork_ref: owned_field(meta, "artwork_url"),
        })
        .unwrap_or_default();

    Ok(PlayerStatus {
        active: play_state != PlayState::Stopped,
        play_state,
        observed_at_unix,
        playback: Playback {
            position_fraction: raw.position.unwrap_or(0.0),
            position_seconds: raw.time.unwrap_or(0.0) as i64,
            duration_seconds: raw.length.unwrap_or(0.0) as i64,
        },
        media_kind,
        media,
        video_resolution,
    })
}

/// Name of the playlist item marked `current` in a `playlist.json` body.
pub fn parse_current_playlist_item(body: &str) -> Result<Option<String>, FetchError> {
    let root: Value = serde_json::from_str(body)?;
    Ok(find_current(&root).map(str::to_string))
}

fn find_current(node: &Value) -> Option<&str> {
    if node.get("current").is_some() {
        if let Some(name) = node.get("name").and_then(Value::as_str) {
            if !name.is_empty() {
                return Some(name);
            }
        }
    }
    node.get("children")?
        .as_array()?
        .iter()
        .find_map(find_current)
}

fn string_field<'a>(fields: &'a BTreeMap<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}

fn owned_field(fields: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    string_field(fields, key)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// "1920x1080" → 1920×1080.
fn parse_resolution(s: &str) -> Option<VideoResolution> {
    let (w, h) = s.split_once('x')?;
    Some(VideoResolution {
        width: w.trim().parse().ok()?,
        height: h.trim().parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYING_VIDEO: &str = r#"{
        "state": "playing",
        "time": 600,
        "length": 3600,
        "position": 0.1666,
        "information": {
            "category": {
                "meta": {
                    "filename": "Show.Name.S02E05.1080p.mkv",
                    "artwork_url": "file:///tmp/cover.jpg"
                },
                "Stream 0": { "Type": "Audio", "Codec": "AAC" },
                "Stream 1": { "Type": "Video", "Video_resolution": "1920x1080" }
            }
        }
    }"#;

    const PAUSED_AUDIO: &str = r#"{
        "state": "paused",
        "time": 42,
        "length": 215,
        "position": 0.19,
        "information": {
            "category": {
                "meta": {
                    "title": "Money",
                    "artist": "Pink Floyd",
                    "album": "The Dark Side of the Moon",
                    "filename": "05 - Money.flac"
                },
                "Stream 0": { "Type": "Audio", "Codec": "FLAC" }
            }
        }
    }"#;

    #[test]
    fn test_video_stream_marks_whole_item_as_video() {
        let status = parse_status(PLAYING_VIDEO, 1000).unwrap();
        assert_eq!(status.media_kind, MediaKind::Video);
        assert_eq!(
            status.video_resolution,
            Some(VideoResolution {
                width: 1920,
                height: 1080
            })
        );
    }

    #[test]
    fn test_playing_fields() {
        let status = parse_status(PLAYING_VIDEO, 1000).unwrap();
        assert!(status.active);
        assert_eq!(status.play_state, PlayState::Playing);
        assert_eq!(status.observed_at_unix, 1000);
        assert_eq!(status.playback.position_seconds, 600);
        assert_eq!(status.playback.duration_seconds, 3600);
        // No title tag: falls back to the filename.
        assert_eq!(
            status.media.title.as_deref(),
            Some("Show.Name.S02E05.1080p.mkv")
        );
        assert_eq!(
            status.media.artwork_ref.as_deref(),
            Some("file:///tmp/cover.jpg")
        );
    }

    #[test]
    fn test_paused_audio() {
        let status = parse_status(PAUSED_AUDIO, 0).unwrap();
        assert_eq!(status.play_state, PlayState::Paused);
        assert_eq!(status.media_kind, MediaKind::Audio);
        assert_eq!(status.media.title.as_deref(), Some("Money"));
        assert_eq!(status.media.artist.as_deref(), Some("Pink Floyd"));
        assert!(status.video_resolution.is_none());
        assert!(!status.is_idle());
    }

    #[test]
    fn test_stopped_without_information() {
        let status = parse_status(r#"{"state":"stopped","time":0,"length":0}"#, 0).unwrap();
        assert!(!status.active);
        assert!(status.is_idle());
        assert_eq!(status.media, MediaInfo::default());
    }

    #[test]
    fn test_information_array_is_tolerated() {
        let status = parse_status(r#"{"state":"playing","information":[]}"#, 0).unwrap();
        assert_eq!(status.media_kind, MediaKind::Audio);
    }

    #[test]
    fn test_blank_meta_fields_are_absent() {
        let body = r#"{"state":"playing","information":{"category":{"meta":{"title":"  ","artist":""}}}}"#;
        let status = parse_status(body, 0).unwrap();
        assert!(status.media.title.is_none());
        assert!(status.media.artist.is_none());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse_status("<html>", 0),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn test_current_playlist_item() {
        let body = r#"{
            "name": "", "children": [
                { "name": "Playlist", "children": [
                    { "name": "first.mkv", "id": "3" },
                    { "name": "second.mkv", "id": "4", "current": "current" }
                ]},
                { "name": "Media Library", "children": [] }
            ]
        }"#;
        assert_eq!(
            parse_current_playlist_item(body).unwrap().as_deref(),
            Some("second.mkv")
        );
    }

    #[test]
    fn test_playlist_without_current() {
        let body = r#"{"name":"","children":[{"name":"Playlist","children":[]}]}"#;
        assert_eq!(parse_current_playlist_item(body).unwrap(), None);
    }
}
