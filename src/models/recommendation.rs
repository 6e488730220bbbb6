use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{AnimeTitle, Channel};
use crate::error::{AppError, AppResult};

/// Origin of a merged recommendation
///
/// The declaration order is the tie-break order for equal weighted scores:
/// collaborative ranks above content, content above combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Collaborative,
    Content,
    Both,
}

impl From<Channel> for Source {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::Collaborative => Source::Collaborative,
            Channel::Content => Source::Content,
        }
    }
}

/// Nearest-first list of titles not yet known to the user, for one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateList {
    channel: Channel,
    titles: Vec<AnimeTitle>,
}

impl CandidateList {
    /// Wraps an ordered title list; a title may appear only once
    pub fn new(channel: Channel, titles: Vec<AnimeTitle>) -> AppResult<Self> {
        let mut seen = HashSet::with_capacity(titles.len());
        if let Some(dup) = titles.iter().find(|title| !seen.insert(*title)) {
            return Err(AppError::InvalidInput(format!(
                "Duplicate {} candidate: {}",
                channel, dup
            )));
        }

        Ok(Self { channel, titles })
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn titles(&self) -> &[AnimeTitle] {
        &self.titles
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Keeps at most `len` of the nearest candidates
    pub fn truncate(&mut self, len: usize) {
        self.titles.truncate(len);
    }
}

/// One scored row of the merged recommendation table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub user_id: String,
    pub anime_title: AnimeTitle,
    pub source: Source,
    /// 1-based position in the source candidate list (best of both for combined entries)
    pub original_rank: usize,
    pub base_score: i64,
    pub weighted_score: f64,
}

/// Non-fatal conditions reported alongside a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecommendationWarning {
    /// Fewer titles than requested survived filtering and merging
    ShortResult { requested: usize, available: usize },
}

/// Output of one recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    /// Top titles, best first, at most the requested count
    pub ranked_titles: Vec<AnimeTitle>,
    /// Complete deduplicated table in final order
    pub table: Vec<RecommendationEntry>,
    #[serde(default)]
    pub warnings: Vec<RecommendationWarning>,
}
