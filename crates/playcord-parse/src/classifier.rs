//! Ordered pattern table mapping titles to classifications.
//!
//! Rules are tried top to bottom and the first rule whose pattern matches
//! and whose extractor accepts the captures wins. TV patterns come first,
//! then movie, then anime; anything left is a generic video.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::classification::Classification;
use crate::normalize::{normalize_title, strip_enclosed, tidy, NormalizedTitle};

type Extractor = fn(&Captures<'_>, &NormalizedTitle) -> Option<Classification>;

/// One entry of the classification table.
struct Rule {
    name: &'static str,
    pattern: Regex,
    extract: Extractor,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, extract: Extractor) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            extract,
        }
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        // ── TV ───────────────────────────────────────────────────
        // "Show.Name.S02E05", "Show Name s2 e5"
        Rule::new(
            "tv_sxxeyy",
            r"(?i)^(.*?)[\s._-]*\bS(\d{1,2})[\s._-]*E(\d{1,3})",
            tv_season_episode,
        ),
        // "Show Name 2x05"
        Rule::new(
            "tv_nxm",
            r"(?i)^(.*?)[\s._-]*\b(\d{1,2})x(\d{1,3})\b",
            tv_season_episode,
        ),
        // "Show Season 2 Episode 5", "Dark Staffel 1 Folge 3", "Saison 2 Épisode 4"
        Rule::new(
            "tv_season_word",
            r"(?i)^(.*?)[\s._-]*\b(?:season|saison|staffel|temporada|stagione)[\s._-]*(\d{1,2})[\s._,-]*(?:episode|épisode|episodio|episódio|folge)[\s._-]*(\d{1,3})",
            tv_season_episode,
        ),
        // "Show - Episode 7", "Show Ep.7"
        Rule::new(
            "tv_episode",
            r"(?i)^(.*?)[\s._-]*\b(?:episode|épisode|episodio|episódio|folge|ep)\.?[\s._-]*(\d{1,4})\b",
            tv_episode_only,
        ),
        // ── Movie ────────────────────────────────────────────────
        // "Heat (1995)", "Heat [1995]"
        Rule::new(
            "movie_year_enclosed",
            r"^(.+?)[\s._-]*[\[(]((?:19|20)\d{2})[\])]",
            movie_with_year,
        ),
        // "Movie.Title.2021", "Movie Title 2021 Extended"
        Rule::new(
            "movie_year",
            r"^(.+?)[\s._-]+((?:19|20)\d{2})(?:[\s._-]|$)",
            movie_with_year,
        ),
        // "Movie.Title.1080p.BluRay" (tags already stripped by normalization)
        Rule::new("movie_tagged", r"^(.+)$", movie_from_tags),
        // ── Anime ────────────────────────────────────────────────
        // "[Group] Anime Name - 12", "Anime.Name.sub.05"
        Rule::new(
            "anime_enclosed",
            r"(?i)\[[^\]]+\]|[\s._](?:sub|dub)[\s._]",
            anime_from_enclosed,
        ),
        // "Anime Name - 12", "Anime Name 05v2"
        Rule::new(
            "anime_trailing_number",
            r"^(.+?)[\s._-]+(\d{1,3})(?:v\d{1,2})?$",
            anime_trailing_number,
        ),
    ]
});

/// An isolated 1–3 digit token, optionally with a version suffix.
static RE_ISOLATED_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s._-])(\d{1,3})(?:v\d{1,2})?(?:[\s._-]|$)").unwrap()
});

static RE_SUB_DUB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:sub|dub)\b").unwrap());

/// Classify a raw media title.
///
/// Never fails: titles no rule accepts degrade to
/// [`Classification::GenericVideo`], and only blank input yields
/// [`Classification::Unclassified`].
pub fn classify(raw_title: &str) -> Classification {
    let raw = raw_title.trim();
    if raw.is_empty() {
        return Classification::Unclassified;
    }

    let normalized = normalize_title(raw);
    for rule in RULES.iter() {
        let Some(caps) = rule.pattern.captures(&normalized.text) else {
            continue;
        };
        if let Some(classification) = (rule.extract)(&caps, &normalized) {
            tracing::trace!(rule = rule.name, title = raw, "Title classified");
            return classification;
        }
    }

    let generic_title = match tidy(&normalized.text) {
        t if !t.is_empty() => t,
        _ => raw.to_string(),
    };
    Classification::GenericVideo { generic_title }
}

fn non_empty(name: String) -> Option<String> {
    (!name.is_empty()).then_some(name)
}

fn number(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}

fn tv_season_episode(caps: &Captures<'_>, _: &NormalizedTitle) -> Option<Classification> {
    Some(Classification::TvShow {
        show_name: non_empty(tidy(&caps[1]))?,
        season: number(caps, 2),
        episode: number(caps, 3),
    })
}

fn tv_episode_only(caps: &Captures<'_>, _: &NormalizedTitle) -> Option<Classification> {
    Some(Classification::TvShow {
        show_name: non_empty(tidy(&caps[1]))?,
        season: None,
        episode: number(caps, 2),
    })
}

fn movie_with_year(caps: &Captures<'_>, _: &NormalizedTitle) -> Option<Classification> {
    Some(Classification::Movie {
        movie_name: non_empty(tidy(&caps[1]))?,
        year: number(caps, 2),
    })
}

fn movie_from_tags(caps: &Captures<'_>, title: &NormalizedTitle) -> Option<Classification> {
    if !title.tagged {
        return None;
    }
    Some(Classification::Movie {
        movie_name: non_empty(tidy(&caps[1]))?,
        year: None,
    })
}

fn anime_name(fragment: &str) -> String {
    tidy(&RE_SUB_DUB.replace_all(fragment, " "))
}

fn anime_from_enclosed(_: &Captures<'_>, title: &NormalizedTitle) -> Option<Classification> {
    let text = strip_enclosed(&title.text);

    let last_number = RE_ISOLATED_NUMBER.captures_iter(&text).last();
    if let Some(caps) = last_number {
        let whole = caps.get(0)?;
        if let Some(name) = non_empty(anime_name(&text[..whole.start()])) {
            return Some(Classification::Anime {
                anime_name: name,
                episode: number(&caps, 1),
            });
        }
    }

    Some(Classification::Anime {
        anime_name: non_empty(anime_name(&text))?,
        episode: None,
    })
}

fn anime_trailing_number(caps: &Captures<'_>, _: &NormalizedTitle) -> Option<Classification> {
    Some(Classification::Anime {
        anime_name: non_empty(anime_name(&caps[1]))?,
        episode: number(caps, 2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::ContentKind;

    fn tv(show: &str, season: Option<u32>, episode: Option<u32>) -> Classification {
        Classification::TvShow {
            show_name: show.into(),
            season,
            episode,
        }
    }

    #[test]
    fn test_tv_sxxeyy() {
        assert_eq!(
            classify("Show.Name.S02E05.1080p.mkv"),
            tv("Show Name", Some(2), Some(5))
        );
        assert_eq!(
            classify("The.Office.S03E10.720p.HDTV.x264-DIMENSION.mkv"),
            tv("The Office", Some(3), Some(10))
        );
    }

    #[test]
    fn test_tv_nxm() {
        assert_eq!(
            classify("Show.Name.2x07.720p.mkv"),
            tv("Show Name", Some(2), Some(7))
        );
    }

    #[test]
    fn test_tv_localized() {
        assert_eq!(
            classify("Show Season 2 Episode 5"),
            tv("Show", Some(2), Some(5))
        );
        assert_eq!(
            classify("Dark Staffel 1 Folge 3.mkv"),
            tv("Dark", Some(1), Some(3))
        );
    }

    #[test]
    fn test_tv_bare_episode() {
        assert_eq!(classify("Show - Episode 7"), tv("Show", None, Some(7)));
        assert_eq!(classify("Show Ep.12.mp4"), tv("Show", None, Some(12)));
    }

    #[test]
    fn test_first_tv_pattern_wins() {
        // Carries both SxxEyy and a bare "Episode" marker.
        assert_eq!(
            classify("Show.S01E02.Episode.9.mkv"),
            tv("Show", Some(1), Some(2))
        );
    }

    #[test]
    fn test_tv_pattern_beats_year() {
        let c = classify("Show.2019.S01E02.mkv");
        assert_eq!(c.kind(), ContentKind::TvShow);
    }

    #[test]
    fn test_missing_show_name_falls_through() {
        let c = classify("S01E02.mkv");
        assert_ne!(c.kind(), ContentKind::TvShow);
    }

    #[test]
    fn test_movie_trailing_year() {
        assert_eq!(
            classify("Movie.Title.2021.BluRay.x264.mkv"),
            Classification::Movie {
                movie_name: "Movie Title".into(),
                year: Some(2021),
            }
        );
        assert_eq!(
            classify("Inception.2010.1080p.BluRay.x264-SPARKS.mkv"),
            Classification::Movie {
                movie_name: "Inception".into(),
                year: Some(2010),
            }
        );
    }

    #[test]
    fn test_movie_enclosed_year() {
        assert_eq!(
            classify("Heat (1995).mp4"),
            Classification::Movie {
                movie_name: "Heat".into(),
                year: Some(1995),
            }
        );
    }

    #[test]
    fn test_movie_from_quality_tag_only() {
        assert_eq!(
            classify("Some.Film.1080p.WEB-DL.mkv"),
            Classification::Movie {
                movie_name: "Some Film".into(),
                year: None,
            }
        );
    }

    #[test]
    fn test_anime_fansub() {
        assert_eq!(
            classify("[Group] Anime Name - 12 [1080p].mkv"),
            Classification::Anime {
                anime_name: "Anime Name".into(),
                episode: Some(12),
            }
        );
        assert_eq!(
            classify("[HorribleSubs] Attack on Titan - 03 [1080p].mkv"),
            Classification::Anime {
                anime_name: "Attack on Titan".into(),
                episode: Some(3),
            }
        );
    }

    #[test]
    fn test_anime_number_in_name_uses_last_token() {
        assert_eq!(
            classify("[Group] Mob Psycho 100 - 05 [720p].mkv"),
            Classification::Anime {
                anime_name: "Mob Psycho 100".into(),
                episode: Some(5),
            }
        );
    }

    #[test]
    fn test_anime_without_episode() {
        assert_eq!(
            classify("[Group] Some Anime OVA.mkv"),
            Classification::Anime {
                anime_name: "Some Anime OVA".into(),
                episode: None,
            }
        );
    }

    #[test]
    fn test_anime_sub_marker() {
        assert_eq!(
            classify("Naruto.sub.05.mp4"),
            Classification::Anime {
                anime_name: "Naruto".into(),
                episode: Some(5),
            }
        );
    }

    #[test]
    fn test_anime_trailing_number() {
        assert_eq!(
            classify("Anime Name - 05v2"),
            Classification::Anime {
                anime_name: "Anime Name".into(),
                episode: Some(5),
            }
        );
    }

    #[test]
    fn test_generic_fallback() {
        assert_eq!(
            classify("holiday_video.mp4"),
            Classification::GenericVideo {
                generic_title: "holiday video".into(),
            }
        );
    }

    #[test]
    fn test_generic_keeps_raw_when_cleanup_empties() {
        assert_eq!(
            classify("[1080p]"),
            Classification::GenericVideo {
                generic_title: "[1080p]".into(),
            }
        );
    }

    #[test]
    fn test_empty_is_unclassified() {
        assert_eq!(classify(""), Classification::Unclassified);
        assert_eq!(classify("   "), Classification::Unclassified);
    }
}
