//! Title cleanup applied before pattern matching.
//!
//! Strips the container extension and any run of trailing release tags
//! (`1080p`, `x264-GROUP`, `[1080p]`, `[ABCD1234]`), and tidies the
//! separators used in scene and fansub filenames.

use regex::Regex;
use std::sync::LazyLock;

use crate::keyword;

/// "720p", "1080i", "2160P".
static RE_RESOLUTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d{3,4}[pi]$").unwrap());

/// 8-digit hex checksum, as appended by fansub groups: "[ABCD1234]".
static RE_CHECKSUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Fa-f]{8}$").unwrap());

/// Any bracketed or parenthesized group.
static RE_ENCLOSED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)").unwrap());

static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// A title after extension and trailing-tag removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTitle {
    /// The remaining title text, separators untouched.
    pub text: String,
    /// Whether at least one bare (unbracketed) release tag was stripped.
    pub tagged: bool,
}

/// Normalize a raw title for classification.
pub fn normalize_title(raw: &str) -> NormalizedTitle {
    let mut text = strip_extension(raw.trim()).to_string();
    let mut tagged = false;

    loop {
        let trimmed = text.trim_end_matches(is_separator);
        if let Some(head) = strip_trailing_enclosed_tag(trimmed) {
            text = head.to_string();
            continue;
        }
        if let Some(head) = strip_trailing_bare_tag(trimmed) {
            text = head.to_string();
            tagged = true;
            continue;
        }
        text = trimmed.to_string();
        break;
    }

    NormalizedTitle { text, tagged }
}

/// Turn a captured name fragment into display form:
/// drops bracketed groups, maps `.`/`_` to spaces, collapses whitespace.
pub fn tidy(s: &str) -> String {
    let without_groups = RE_ENCLOSED.replace_all(s, " ");
    let spaced = without_groups.replace(['.', '_'], " ");
    let collapsed = RE_WHITESPACE.replace_all(&spaced, " ");
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || c == '-' || c == ',')
        .to_string()
}

/// Remove every bracketed or parenthesized group.
pub fn strip_enclosed(s: &str) -> String {
    RE_ENCLOSED.replace_all(s, " ").into_owned()
}

fn is_separator(c: char) -> bool {
    matches!(c, '.' | '_' | ' ' | '-')
}

fn strip_extension(s: &str) -> &str {
    match s.rsplit_once('.') {
        Some((head, ext)) if !head.is_empty() && keyword::is_video_extension(ext) => head,
        _ => s,
    }
}

fn is_tag(token: &str) -> bool {
    keyword::is_release_tag(token) || RE_RESOLUTION.is_match(token)
}

/// "Title [1080p]" → "Title ", "Title (BD x265)" → "Title ".
fn strip_trailing_enclosed_tag(s: &str) -> Option<&str> {
    let open = match s.chars().last()? {
        ']' => '[',
        ')' => '(',
        _ => return None,
    };
    let start = s.rfind(open)?;
    if start == 0 {
        return None;
    }
    let inner = &s[start + 1..s.len() - 1];
    let tagged = inner
        .split(|c: char| c == ' ' || c == ',' || c == '_' || c == '.')
        .any(|t| is_tag(t) || RE_CHECKSUM.is_match(t));
    tagged.then(|| &s[..start])
}

/// "Title.x264" → "Title", "Title.x264-GROUP" → "Title".
fn strip_trailing_bare_tag(s: &str) -> Option<&str> {
    let split = s.rfind(['.', '_', ' '])?;
    let (head, token) = (&s[..split], &s[split + 1..]);
    if head.trim_end_matches(is_separator).is_empty() || token.is_empty() {
        return None;
    }
    let matched = is_tag(token)
        || token
            .rsplit_once('-')
            .is_some_and(|(tag, group)| !group.is_empty() && is_tag(tag));
    matched.then_some(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_extension_and_tags() {
        let n = normalize_title("Movie.Title.2021.BluRay.x264.mkv");
        assert_eq!(n.text, "Movie.Title.2021");
        assert!(n.tagged);
    }

    #[test]
    fn test_strips_release_group_suffix() {
        let n = normalize_title("Inception.2010.1080p.BluRay.x264-SPARKS.mkv");
        assert_eq!(n.text, "Inception.2010");
        assert!(n.tagged);
    }

    #[test]
    fn test_bracketed_tags_do_not_count_as_bare() {
        let n = normalize_title("[Group] Anime Name - 12 [1080p][ABCD1234].mkv");
        assert_eq!(n.text, "[Group] Anime Name - 12");
        assert!(!n.tagged);
    }

    #[test]
    fn test_keeps_year_in_parens() {
        let n = normalize_title("Heat (1995).mp4");
        assert_eq!(n.text, "Heat (1995)");
        assert!(!n.tagged);
    }

    #[test]
    fn test_plain_title_untouched() {
        let n = normalize_title("Charlotte's Web");
        assert_eq!(n.text, "Charlotte's Web");
        assert!(!n.tagged);
    }

    #[test]
    fn test_lone_tag_is_kept() {
        let n = normalize_title("1080p");
        assert_eq!(n.text, "1080p");
    }

    #[test]
    fn test_tidy() {
        assert_eq!(tidy("Show.Name."), "Show Name");
        assert_eq!(tidy("[Group] Anime Name - "), "Anime Name");
        assert_eq!(tidy("Spider-Man"), "Spider-Man");
        assert_eq!(tidy("The_Office__US"), "The Office US");
    }
}
