//! Derivation of the presence payload from player status and classification.

use serde::{Deserialize, Serialize};

use playcord_detect::{MediaKind, PlayState, PlayerStatus};
use playcord_parse::Classification;

use crate::artwork::Artwork;
use crate::config::DiscordConfig;

/// Presence text fields are cut to this many characters.
pub const MAX_TEXT_LEN: usize = 128;
const ELLIPSIS: &str = "...";

/// Durations at or above this are treated as bogus and get no end time.
pub const MAX_SANE_DURATION_SECS: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Listening,
    Watching,
}

/// What a tick should do with the presence, decided from the status alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// Player idle or stopped.
    Stopped,
    /// No status could be read.
    NoStatus,
    Playing,
    Paused,
}

impl PlaybackPhase {
    pub fn of(status: Option<&PlayerStatus>) -> Self {
        match status {
            None => Self::NoStatus,
            Some(s) if s.is_idle() => Self::Stopped,
            Some(s) if s.play_state == PlayState::Paused => Self::Paused,
            Some(_) => Self::Playing,
        }
    }

    pub fn shows_presence(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

/// The outbound presence message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresencePayload {
    pub title_line: String,
    pub subtitle_line: String,
    pub large_image: Option<String>,
    pub large_caption: Option<String>,
    pub small_image: Option<String>,
    pub small_caption: Option<String>,
    pub start_unix: Option<i64>,
    pub end_unix: Option<i64>,
    pub activity_kind: ActivityKind,
}

/// Timestamp drift between polls that does not warrant a new push.
const TIMESTAMP_TOLERANCE_SECS: i64 = 2;

impl PresencePayload {
    /// Same visible content, allowing for poll-to-poll timestamp jitter.
    pub fn is_equivalent(&self, other: &Self) -> bool {
        let close = |a: Option<i64>, b: Option<i64>| match (a, b) {
            (Some(a), Some(b)) => (a - b).abs() <= TIMESTAMP_TOLERANCE_SECS,
            (None, None) => true,
            _ => false,
        };
        self.title_line == other.title_line
            && self.subtitle_line == other.subtitle_line
            && self.large_image == other.large_image
            && self.large_caption == other.large_caption
            && self.small_image == other.small_image
            && self.small_caption == other.small_caption
            && self.activity_kind == other.activity_kind
            && close(self.start_unix, other.start_unix)
            && close(self.end_unix, other.end_unix)
    }
}

/// Cut `text` to [`MAX_TEXT_LEN`] characters, ending in `...` when cut.
pub fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_TEXT_LEN {
        return text.to_string();
    }
    let keep = MAX_TEXT_LEN - ELLIPSIS.len();
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Listening unless the item is video or classified as watchable content.
/// Items tagged with both artist and album stay Listening unless the
/// classification says otherwise (music videos).
pub fn activity_kind(status: &PlayerStatus, classification: Option<&Classification>) -> ActivityKind {
    let watchable = classification.is_some_and(|c| c.kind().is_watchable());
    if watchable {
        return ActivityKind::Watching;
    }
    let tagged_music = status.media.artist.is_some() && status.media.album.is_some();
    if status.media_kind == MediaKind::Video && !tagged_music {
        ActivityKind::Watching
    } else {
        ActivityKind::Listening
    }
}

/// Build the payload for `status`, or `None` when presence should be cleared.
pub fn compose(
    status: &PlayerStatus,
    classification: Option<&Classification>,
    cfg: &DiscordConfig,
    artwork: &Artwork,
    now: i64,
) -> Option<PresencePayload> {
    let phase = PlaybackPhase::of(Some(status));
    if !phase.shows_presence() {
        return None;
    }
    let paused = phase == PlaybackPhase::Paused;
    let activity = activity_kind(status, classification);

    let title = classification
        .and_then(content_title)
        .or_else(|| status.media.title.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    let subtitle = subtitle(status, activity);

    let (start_unix, end_unix) = if paused {
        (None, None)
    } else {
        timestamps(status, now)
    };

    let large_image = artwork
        .content_image
        .clone()
        .or_else(|| artwork.cover_image.clone())
        .or_else(|| non_empty(&cfg.large_image));

    let mut large_caption = match (&status.media.album, activity) {
        (Some(album), ActivityKind::Listening) => album.clone(),
        _ => cfg.large_text.clone(),
    };
    if paused {
        large_caption.push_str(" (Paused)");
    }

    let mut small_caption = if paused { "Paused" } else { "Playing" }.to_string();
    if let (MediaKind::Video, Some(res)) = (status.media_kind, status.video_resolution) {
        small_caption.push_str(&format!(" • {}x{}", res.width, res.height));
    }
    let small_image = non_empty(if paused {
        &cfg.paused_image
    } else {
        &cfg.playing_image
    });

    Some(PresencePayload {
        title_line: truncate(&title),
        subtitle_line: truncate(&subtitle),
        large_image,
        large_caption: Some(truncate(&large_caption)),
        small_image,
        small_caption: Some(small_caption),
        start_unix,
        end_unix,
        activity_kind: activity,
    })
}

fn content_title(classification: &Classification) -> Option<String> {
    match classification {
        Classification::TvShow {
            show_name,
            season,
            episode,
        } => Some(match (season, episode) {
            (Some(s), Some(e)) => format!("{show_name} S{s:02}E{e:02}"),
            (None, Some(e)) => format!("{show_name} - Episode {e}"),
            _ => show_name.clone(),
        }),
        Classification::Movie { movie_name, year } => Some(match year {
            Some(y) => format!("{movie_name} ({y})"),
            None => movie_name.clone(),
        }),
        Classification::Anime {
            anime_name,
            episode,
        } => Some(match episode {
            Some(e) => format!("{anime_name} - Episode {e}"),
            None => anime_name.clone(),
        }),
        Classification::GenericVideo { .. } | Classification::Unclassified => None,
    }
}

fn subtitle(status: &PlayerStatus, activity: ActivityKind) -> String {
    if activity == ActivityKind::Watching {
        return "Now watching".to_string();
    }
    match (&status.media.artist, &status.media.album) {
        (Some(artist), Some(album)) => format!("by {artist} • {album}"),
        (Some(artist), None) => format!("by {artist}"),
        (None, Some(album)) => format!("from {album}"),
        (None, None) => "Now listening".to_string(),
    }
}

fn timestamps(status: &PlayerStatus, now: i64) -> (Option<i64>, Option<i64>) {
    let position = status.playback.position_seconds.max(0);
    let duration = status.playback.duration_seconds;
    if duration > 0 && duration < MAX_SANE_DURATION_SECS {
        let remaining = (duration - position).max(0);
        (Some(now - position), Some(now + remaining))
    } else {
        (Some(now), None)
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use playcord_detect::{MediaInfo, Playback, VideoResolution};

    const NOW: i64 = 1_700_000_000;

    fn cfg() -> DiscordConfig {
        AppConfig::default().discord
    }

    fn status(state: PlayState, kind: MediaKind) -> PlayerStatus {
        PlayerStatus {
            active: state != PlayState::Stopped,
            play_state: state,
            observed_at_unix: NOW,
            playback: Playback {
                position_fraction: 0.0,
                position_seconds: 600,
                duration_seconds: 3600,
            },
            media_kind: kind,
            media: MediaInfo {
                title: Some("Show.Name.S02E05.1080p.mkv".into()),
                ..Default::default()
            },
            video_resolution: None,
        }
    }

    fn music(state: PlayState) -> PlayerStatus {
        let mut s = status(state, MediaKind::Audio);
        s.media = MediaInfo {
            title: Some("Money".into()),
            artist: Some("Pink Floyd".into()),
            album: Some("The Dark Side of the Moon".into()),
            artwork_ref: None,
        };
        s
    }

    fn tv() -> Classification {
        Classification::TvShow {
            show_name: "Show Name".into(),
            season: Some(2),
            episode: Some(5),
        }
    }

    fn compose_now(s: &PlayerStatus, c: Option<&Classification>) -> Option<PresencePayload> {
        compose(s, c, &cfg(), &Artwork::default(), NOW)
    }

    #[test]
    fn test_stopped_or_inactive_clears() {
        assert!(compose_now(&status(PlayState::Stopped, MediaKind::Video), None).is_none());

        let mut inactive = status(PlayState::Playing, MediaKind::Video);
        inactive.active = false;
        assert!(compose_now(&inactive, Some(&tv())).is_none());
    }

    #[test]
    fn test_phase() {
        assert_eq!(PlaybackPhase::of(None), PlaybackPhase::NoStatus);
        let s = status(PlayState::Paused, MediaKind::Audio);
        assert_eq!(PlaybackPhase::of(Some(&s)), PlaybackPhase::Paused);
        let s = status(PlayState::Stopped, MediaKind::Audio);
        assert_eq!(PlaybackPhase::of(Some(&s)), PlaybackPhase::Stopped);
    }

    #[test]
    fn test_exact_timestamps() {
        let p = compose_now(&status(PlayState::Playing, MediaKind::Video), None).unwrap();
        assert_eq!(p.start_unix, Some(NOW - 600));
        assert_eq!(p.end_unix, Some(NOW + 3000));
    }

    #[test]
    fn test_insane_duration_is_open_ended() {
        let mut s = status(PlayState::Playing, MediaKind::Video);
        s.playback.duration_seconds = MAX_SANE_DURATION_SECS + 1;
        let p = compose_now(&s, None).unwrap();
        assert_eq!(p.start_unix, Some(NOW));
        assert_eq!(p.end_unix, None);
    }

    #[test]
    fn test_unknown_duration_is_open_ended() {
        let mut s = status(PlayState::Playing, MediaKind::Audio);
        s.playback.duration_seconds = 0;
        let p = compose_now(&s, None).unwrap();
        assert_eq!((p.start_unix, p.end_unix), (Some(NOW), None));
    }

    #[test]
    fn test_truncation() {
        let long = "x".repeat(200);
        let t = truncate(&long);
        assert_eq!(t.chars().count(), MAX_TEXT_LEN);
        assert!(t.ends_with("..."));
        assert_eq!(truncate("short"), "short");

        let mut s = status(PlayState::Playing, MediaKind::Audio);
        s.media.title = Some(long);
        let p = compose_now(&s, None).unwrap();
        assert_eq!(p.title_line.chars().count(), MAX_TEXT_LEN);
    }

    #[test]
    fn test_tv_title_and_watching() {
        let p = compose_now(&status(PlayState::Playing, MediaKind::Video), Some(&tv())).unwrap();
        assert_eq!(p.title_line, "Show Name S02E05");
        assert_eq!(p.subtitle_line, "Now watching");
        assert_eq!(p.activity_kind, ActivityKind::Watching);
    }

    #[test]
    fn test_content_titles() {
        let episode_only = Classification::TvShow {
            show_name: "Show".into(),
            season: None,
            episode: Some(7),
        };
        assert_eq!(content_title(&episode_only).unwrap(), "Show - Episode 7");

        let movie = Classification::Movie {
            movie_name: "Heat".into(),
            year: Some(1995),
        };
        assert_eq!(content_title(&movie).unwrap(), "Heat (1995)");

        let anime = Classification::Anime {
            anime_name: "Anime Name".into(),
            episode: Some(12),
        };
        assert_eq!(content_title(&anime).unwrap(), "Anime Name - Episode 12");

        let bare = Classification::Anime {
            anime_name: "Anime Name".into(),
            episode: None,
        };
        assert_eq!(content_title(&bare).unwrap(), "Anime Name");
        assert!(content_title(&Classification::Unclassified).is_none());
    }

    #[test]
    fn test_generic_video_uses_raw_title() {
        let generic = Classification::GenericVideo {
            generic_title: "holiday video".into(),
        };
        let mut s = status(PlayState::Playing, MediaKind::Video);
        s.media.title = Some("holiday_video.mp4".into());
        let p = compose_now(&s, Some(&generic)).unwrap();
        assert_eq!(p.title_line, "holiday_video.mp4");
        assert_eq!(p.activity_kind, ActivityKind::Watching);
    }

    #[test]
    fn test_music_listening() {
        let p = compose_now(&music(PlayState::Playing), None).unwrap();
        assert_eq!(p.activity_kind, ActivityKind::Listening);
        assert_eq!(p.title_line, "Money");
        assert_eq!(p.subtitle_line, "by Pink Floyd • The Dark Side of the Moon");
        assert_eq!(p.large_caption.as_deref(), Some("The Dark Side of the Moon"));
        assert_eq!(p.small_image.as_deref(), Some("playing"));
        assert_eq!(p.small_caption.as_deref(), Some("Playing"));
    }

    #[test]
    fn test_music_video_stays_listening() {
        let mut s = music(PlayState::Playing);
        s.media_kind = MediaKind::Video;
        let generic = Classification::GenericVideo {
            generic_title: "Money".into(),
        };
        assert_eq!(activity_kind(&s, Some(&generic)), ActivityKind::Listening);
        assert_eq!(activity_kind(&s, None), ActivityKind::Listening);
        // A watchable classification wins over tags.
        assert_eq!(activity_kind(&s, Some(&tv())), ActivityKind::Watching);
    }

    #[test]
    fn test_listening_subtitles() {
        let mut s = status(PlayState::Playing, MediaKind::Audio);
        s.media.artist = Some("Artist".into());
        assert_eq!(compose_now(&s, None).unwrap().subtitle_line, "by Artist");

        s.media.artist = None;
        s.media.album = Some("Album".into());
        assert_eq!(compose_now(&s, None).unwrap().subtitle_line, "from Album");

        s.media.album = None;
        assert_eq!(compose_now(&s, None).unwrap().subtitle_line, "Now listening");
    }

    #[test]
    fn test_paused() {
        let p = compose_now(&music(PlayState::Paused), None).unwrap();
        assert_eq!(p.small_image.as_deref(), Some("paused"));
        assert_eq!(p.small_caption.as_deref(), Some("Paused"));
        assert_eq!(
            p.large_caption.as_deref(),
            Some("The Dark Side of the Moon (Paused)")
        );
        assert_eq!((p.start_unix, p.end_unix), (None, None));
    }

    #[test]
    fn test_resolution_caption() {
        let mut s = status(PlayState::Playing, MediaKind::Video);
        s.video_resolution = Some(VideoResolution {
            width: 1920,
            height: 1080,
        });
        let p = compose_now(&s, Some(&tv())).unwrap();
        assert_eq!(p.small_caption.as_deref(), Some("Playing • 1920x1080"));
        assert_eq!(p.large_caption.as_deref(), Some("VLC Media Player"));
    }

    #[test]
    fn test_equivalence_tolerates_jitter() {
        let s = status(PlayState::Playing, MediaKind::Video);
        let a = compose(&s, Some(&tv()), &cfg(), &Artwork::default(), NOW).unwrap();
        let b = compose(&s, Some(&tv()), &cfg(), &Artwork::default(), NOW + 1).unwrap();
        assert!(a.is_equivalent(&b));

        let c = compose(&s, Some(&tv()), &cfg(), &Artwork::default(), NOW + 30).unwrap();
        assert!(!a.is_equivalent(&c));

        let paused = compose_now(&status(PlayState::Paused, MediaKind::Video), Some(&tv())).unwrap();
        assert!(!a.is_equivalent(&paused));
    }

    #[test]
    fn test_image_priority() {
        let s = music(PlayState::Playing);
        let both = Artwork {
            content_image: Some("https://a/content.jpg".into()),
            cover_image: Some("https://a/cover.jpg".into()),
        };
        let p = compose(&s, None, &cfg(), &both, NOW).unwrap();
        assert_eq!(p.large_image.as_deref(), Some("https://a/content.jpg"));

        let cover = Artwork {
            content_image: None,
            cover_image: Some("https://a/cover.jpg".into()),
        };
        let p = compose(&s, None, &cfg(), &cover, NOW).unwrap();
        assert_eq!(p.large_image.as_deref(), Some("https://a/cover.jpg"));

        let p = compose(&s, None, &cfg(), &Artwork::default(), NOW).unwrap();
        assert_eq!(p.large_image.as_deref(), Some("logo"));
    }
}
