use serde::{Deserialize, Serialize};

/// Coarse content category of a classified title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    TvShow,
    Movie,
    Anime,
    GenericVideo,
    Unclassified,
}

impl ContentKind {
    /// TV, movie and anime classifications describe something being watched.
    pub fn is_watchable(self) -> bool {
        matches!(self, Self::TvShow | Self::Movie | Self::Anime)
    }
}

/// Heuristic classification of a media title.
///
/// Each variant carries exactly the fields its kind can populate;
/// numbers are present only when the source title carried them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    TvShow {
        show_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        season: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        episode: Option<u32>,
    },
    Movie {
        movie_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        year: Option<u32>,
    },
    Anime {
        anime_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        episode: Option<u32>,
    },
    GenericVideo {
        generic_title: String,
    },
    Unclassified,
}

impl Classification {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::TvShow { .. } => ContentKind::TvShow,
            Self::Movie { .. } => ContentKind::Movie,
            Self::Anime { .. } => ContentKind::Anime,
            Self::GenericVideo { .. } => ContentKind::GenericVideo,
            Self::Unclassified => ContentKind::Unclassified,
        }
    }

    /// The kind-specific name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::TvShow { show_name, .. } => Some(show_name),
            Self::Movie { movie_name, .. } => Some(movie_name),
            Self::Anime { anime_name, .. } => Some(anime_name),
            Self::GenericVideo { generic_title } => Some(generic_title),
            Self::Unclassified => None,
        }
    }

    /// Episode number for TV and anime classifications.
    pub fn episode(&self) -> Option<u32> {
        match self {
            Self::TvShow { episode, .. } | Self::Anime { episode, .. } => *episode,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_kind_tag() {
        let c = Classification::TvShow {
            show_name: "Show Name".into(),
            season: Some(2),
            episode: Some(5),
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["kind"], "tv_show");
        assert_eq!(json["show_name"], "Show Name");
        assert_eq!(json["season"], 2);
    }

    #[test]
    fn test_absent_numbers_are_omitted() {
        let c = Classification::Movie {
            movie_name: "Heat".into(),
            year: None,
        };
        let json = serde_json::to_value(&c).unwrap();
        assert!(json.get("year").is_none());
    }

    #[test]
    fn test_watchable_kinds() {
        assert!(ContentKind::Anime.is_watchable());
        assert!(!ContentKind::GenericVideo.is_watchable());
        assert!(!Classification::Unclassified.kind().is_watchable());
    }
}
