//! MyAnimeList provider
//!
//! Animelists come from MyAnimeList's own JSON endpoint
//! (`/animelist/{user}/load.json`, paged by offset). The top-anime ranking comes
//! from the Jikan API, which mirrors MyAnimeList with typed fields.
use chrono::Utc;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

use crate::{
    error::{AppError, AppResult},
    models::{
        anime::{JikanTopAnimePage, MalAnimelistItem},
        RawScore, ScrapedAnimelist,
    },
    services::scrape::AnimelistSource,
};

/// Entries returned per `load.json` page
const ANIMELIST_PAGE_SIZE: usize = 300;

/// `status=7` selects every list status (watching, completed, dropped, ...)
const ALL_STATUSES: &str = "7";

#[derive(Clone)]
pub struct MalClient {
    http_client: HttpClient,
    mal_base_url: String,
    jikan_base_url: String,
}

impl MalClient {
    pub fn new(mal_base_url: String, jikan_base_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            mal_base_url,
            jikan_base_url,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let response = self.http_client.get(url).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(url = %url, status = %status, "MyAnimeList request failed");
            return Err(AppError::ExternalApi(format!(
                "{} returned status {}: {}",
                url, status, body
            )));
        }

        Ok(response.json().await?)
    }
}

/// Converts raw list entries into a scraped record
///
/// A score of 0 means the title is listed without a score and is kept as '-'.
pub fn animelist_from_items(
    user_id: &str,
    animelist_url: String,
    items: Vec<MalAnimelistItem>,
) -> ScrapedAnimelist {
    let (titles, scores): (Vec<String>, Vec<RawScore>) = items
        .into_iter()
        .map(|item| {
            let score = match item.score {
                0 => RawScore::Text("-".to_string()),
                score => RawScore::Number(f64::from(score)),
            };
            (item.anime_title, score)
        })
        .unzip();

    ScrapedAnimelist {
        user_id: user_id.to_string(),
        animelist_url,
        titles: Some(titles),
        scores: Some(scores),
        scraped_at: Utc::now(),
    }
}

#[async_trait::async_trait]
impl AnimelistSource for MalClient {
    async fn fetch_animelist(&self, user_id: &str) -> AppResult<ScrapedAnimelist> {
        let url = format!("{}/animelist/{}/load.json", self.mal_base_url, user_id);
        let mut items: Vec<MalAnimelistItem> = Vec::new();

        loop {
            let page: Vec<MalAnimelistItem> = self
                .get_json(
                    &url,
                    &[
                        ("status", ALL_STATUSES.to_string()),
                        ("offset", items.len().to_string()),
                    ],
                )
                .await?;

            let page_len = page.len();
            items.extend(page);

            if page_len < ANIMELIST_PAGE_SIZE {
                break;
            }
        }

        tracing::debug!(user_id = %user_id, entries = items.len(), "Fetched animelist");

        Ok(animelist_from_items(user_id, self.animelist_url(user_id), items))
    }

    async fn fetch_top_anime_page(&self, page: u32) -> AppResult<JikanTopAnimePage> {
        let url = format!("{}/top/anime", self.jikan_base_url);
        self.get_json(&url, &[("page", page.to_string())]).await
    }

    fn animelist_url(&self, user_id: &str) -> String {
        format!("{}/animelist/{}", self.mal_base_url, user_id)
    }

    fn name(&self) -> &'static str {
        "myanimelist"
    }
}
