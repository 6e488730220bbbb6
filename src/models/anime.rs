use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{AnimeTitle, RawScore};

/// Display metadata for a catalog title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeMetadata {
    pub title: AnimeTitle,
    pub mal_id: u64,
    /// MyAnimeList page
    pub url: String,
    /// Thumbnail image
    pub image_url: Option<String>,
    pub media_type: Option<String>,
    pub num_episodes: u32,
    pub score: Option<f64>,
    pub scored_by: Option<u64>,
    pub rank: Option<u32>,
    pub popularity: Option<u32>,
    pub members: Option<u64>,
    pub favorites: Option<u64>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub studios: Vec<String>,
    pub aired_from: Option<NaiveDate>,
    pub aired_to: Option<NaiveDate>,
    pub age_in_years: Option<f64>,
}

/// One user's animelist as collected
///
/// `titles` and `scores` are `None` when the list could not be fetched
/// (private, deleted, or a failed request).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedAnimelist {
    pub user_id: String,
    pub animelist_url: String,
    pub titles: Option<Vec<String>>,
    pub scores: Option<Vec<RawScore>>,
    pub scraped_at: DateTime<Utc>,
}

impl ScrapedAnimelist {
    /// Record for a list that could not be collected
    pub fn unavailable(user_id: &str, animelist_url: String) -> Self {
        Self {
            user_id: user_id.to_string(),
            animelist_url,
            titles: None,
            scores: None,
            scraped_at: Utc::now(),
        }
    }
}

// ============================================================================
// MyAnimeList animelist JSON Types
// ============================================================================

/// Entry of the `/animelist/{user}/load.json` response
#[derive(Debug, Clone, Deserialize)]
pub struct MalAnimelistItem {
    #[serde(deserialize_with = "string_or_number")]
    pub anime_title: String,
    /// 0 when the user has not scored the title
    #[serde(default)]
    pub score: u8,
}

/// Some titles ("86", "91 Days" style) come back as bare numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Text(text) => text,
        StringOrNumber::Number(number) => number.to_string(),
    })
}

// ============================================================================
// Jikan API Types
// ============================================================================

/// Response of Jikan `GET /top/anime`
#[derive(Debug, Clone, Deserialize)]
pub struct JikanTopAnimePage {
    pub data: Vec<JikanAnime>,
    pub pagination: JikanPagination,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanPagination {
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanAnime {
    pub mal_id: u64,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub images: Option<JikanImages>,
    #[serde(rename = "type", default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub scored_by: Option<u64>,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub members: Option<u64>,
    #[serde(default)]
    pub favorites: Option<u64>,
    #[serde(default)]
    pub aired: Option<JikanAired>,
    #[serde(default)]
    pub genres: Vec<JikanNamed>,
    #[serde(default)]
    pub studios: Vec<JikanNamed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanImages {
    pub jpg: JikanImage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanImage {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanAired {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanNamed {
    pub name: String,
}
