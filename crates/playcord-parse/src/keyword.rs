use phf::phf_map;

/// The category a release keyword belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    Resolution,
    VideoCodec,
    AudioCodec,
    Source,
    VideoTerm,
    ReleaseInfo,
    FileExtension,
}

impl KeywordKind {
    /// Whether a trailing keyword of this kind marks a release tag
    /// (quality, codec, source) rather than part of the title.
    pub fn is_release_tag(self) -> bool {
        !matches!(self, Self::FileExtension)
    }
}

/// Compile-time keyword lookup table.
/// All keys are UPPERCASE for case-insensitive matching.
pub static KEYWORDS: phf::Map<&'static str, KeywordKind> = phf_map! {
    // ── Resolution ───────────────────────────────────────────────
    "480P" => KeywordKind::Resolution,
    "576P" => KeywordKind::Resolution,
    "720P" => KeywordKind::Resolution,
    "1080P" => KeywordKind::Resolution,
    "1080I" => KeywordKind::Resolution,
    "1440P" => KeywordKind::Resolution,
    "2160P" => KeywordKind::Resolution,
    "4K" => KeywordKind::Resolution,
    "UHD" => KeywordKind::Resolution,

    // ── Video codecs ─────────────────────────────────────────────
    "H264" => KeywordKind::VideoCodec,
    "H.264" => KeywordKind::VideoCodec,
    "X264" => KeywordKind::VideoCodec,
    "H265" => KeywordKind::VideoCodec,
    "H.265" => KeywordKind::VideoCodec,
    "X265" => KeywordKind::VideoCodec,
    "HEVC" => KeywordKind::VideoCodec,
    "AVC" => KeywordKind::VideoCodec,
    "AV1" => KeywordKind::VideoCodec,
    "XVID" => KeywordKind::VideoCodec,
    "DIVX" => KeywordKind::VideoCodec,
    "VP9" => KeywordKind::VideoCodec,

    // ── Audio codecs ─────────────────────────────────────────────
    "AAC" => KeywordKind::AudioCodec,
    "AAC2.0" => KeywordKind::AudioCodec,
    "AC3" => KeywordKind::AudioCodec,
    "EAC3" => KeywordKind::AudioCodec,
    "DTS" => KeywordKind::AudioCodec,
    "DTS-HD" => KeywordKind::AudioCodec,
    "TRUEHD" => KeywordKind::AudioCodec,
    "ATMOS" => KeywordKind::AudioCodec,
    "FLAC" => KeywordKind::AudioCodec,
    "OPUS" => KeywordKind::AudioCodec,
    "DD5.1" => KeywordKind::AudioCodec,
    "DDP5.1" => KeywordKind::AudioCodec,

    // ── Sources ──────────────────────────────────────────────────
    "BLURAY" => KeywordKind::Source,
    "BLU-RAY" => KeywordKind::Source,
    "BDRIP" => KeywordKind::Source,
    "BRRIP" => KeywordKind::Source,
    "DVDRIP" => KeywordKind::Source,
    "HDTV" => KeywordKind::Source,
    "HDRIP" => KeywordKind::Source,
    "WEB-DL" => KeywordKind::Source,
    "WEBDL" => KeywordKind::Source,
    "WEBRIP" => KeywordKind::Source,
    "WEB-RIP" => KeywordKind::Source,
    "CAM" => KeywordKind::Source,
    "HDCAM" => KeywordKind::Source,

    // ── Video terms ──────────────────────────────────────────────
    "10BIT" => KeywordKind::VideoTerm,
    "10-BIT" => KeywordKind::VideoTerm,
    "8BIT" => KeywordKind::VideoTerm,
    "HDR" => KeywordKind::VideoTerm,
    "HDR10" => KeywordKind::VideoTerm,
    "SDR" => KeywordKind::VideoTerm,
    "REMUX" => KeywordKind::VideoTerm,

    // ── Release info ─────────────────────────────────────────────
    "PROPER" => KeywordKind::ReleaseInfo,
    "REPACK" => KeywordKind::ReleaseInfo,
    "EXTENDED" => KeywordKind::ReleaseInfo,
    "UNRATED" => KeywordKind::ReleaseInfo,
    "REMASTERED" => KeywordKind::ReleaseInfo,
    "LIMITED" => KeywordKind::ReleaseInfo,

    // ── File extensions ──────────────────────────────────────────
    "MKV" => KeywordKind::FileExtension,
    "MP4" => KeywordKind::FileExtension,
    "AVI" => KeywordKind::FileExtension,
    "MOV" => KeywordKind::FileExtension,
    "WMV" => KeywordKind::FileExtension,
    "FLV" => KeywordKind::FileExtension,
    "WEBM" => KeywordKind::FileExtension,
    "M4V" => KeywordKind::FileExtension,
    "MPG" => KeywordKind::FileExtension,
    "MPEG" => KeywordKind::FileExtension,
    "TS" => KeywordKind::FileExtension,
    "M2TS" => KeywordKind::FileExtension,
    "OGM" => KeywordKind::FileExtension,
    "OGV" => KeywordKind::FileExtension,
    "3GP" => KeywordKind::FileExtension,
};

/// Look up a keyword (case-insensitive).
pub fn lookup(s: &str) -> Option<KeywordKind> {
    KEYWORDS.get(s.to_uppercase().as_str()).copied()
}

/// Whether `s` is a release tag such as `1080p`, `x264` or `BluRay`.
pub fn is_release_tag(s: &str) -> bool {
    lookup(s).is_some_and(KeywordKind::is_release_tag)
}

/// Whether `s` is a known video container extension (without the dot).
pub fn is_video_extension(s: &str) -> bool {
    lookup(s) == Some(KeywordKind::FileExtension)
}
