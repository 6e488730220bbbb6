use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt::Display};

pub mod anime;
pub mod catalog;
pub mod distance;
pub mod profile;
pub mod recommendation;

pub use anime::{AnimeMetadata, ScrapedAnimelist};
pub use catalog::Catalog;
pub use distance::{DistanceMatrix, RowView};
pub use profile::{KnownTitles, ProfileTable, ProfileValue, RawScore, UserProfile};
pub use recommendation::{
    CandidateList, RecommendationEntry, RecommendationWarning, Recommendations, Source,
};

/// Opaque identifier of an anime within the catalog (its main title)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimeTitle(String);

impl AnimeTitle {
    pub fn new(title: impl Into<String>) -> Self {
        Self(title.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AnimeTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for AnimeTitle {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AnimeTitle {
    fn from(title: &str) -> Self {
        Self(title.to_string())
    }
}

impl From<String> for AnimeTitle {
    fn from(title: String) -> Self {
        Self(title)
    }
}

/// Scoring channel a candidate list or profile table belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Low-rank user/anime embedding (NMF factors)
    Collaborative,
    /// Anime feature vectors compared to the user's averaged history
    Content,
}

impl Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Collaborative => write!(f, "collaborative"),
            Channel::Content => write!(f, "content"),
        }
    }
}
