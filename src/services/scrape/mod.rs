//! Offline collection of animelists and top-anime metadata
//!
//! Sources are pluggable behind `AnimelistSource`. Collection runs in fixed-size
//! batches with a bounded number of concurrent requests per batch and a fixed
//! pause between batches, to stay under the remote site's rate limit.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::{
    error::{AppError, AppResult},
    models::{
        anime::{JikanAnime, JikanTopAnimePage},
        ScrapedAnimelist,
    },
};

pub mod mal;

pub use mal::MalClient;

/// Trait for animelist data sources
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AnimelistSource: Send + Sync {
    /// Fetches every entry on a user's animelist
    async fn fetch_animelist(&self, user_id: &str) -> AppResult<ScrapedAnimelist>;

    /// Fetches one page of the top-anime ranking (pages start at 1)
    async fn fetch_top_anime_page(&self, page: u32) -> AppResult<JikanTopAnimePage>;

    /// Public URL of a user's animelist
    fn animelist_url(&self, user_id: &str) -> String;

    /// Source name for logging
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeSettings {
    /// Users per batch
    pub batch_size: usize,
    /// Concurrent fetches within a batch
    pub max_concurrency: usize,
    /// Pause between batches
    pub pause: Duration,
    /// Pause between top-anime pages
    pub page_pause: Duration,
    /// Each batch is written here as `animelists_<n>.json` when set
    pub output_dir: Option<PathBuf>,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_concurrency: 4,
            pause: Duration::from_secs(180),
            page_pause: Duration::from_millis(400),
            output_dir: None,
        }
    }
}

/// Batched, rate-limited collector
pub struct Scraper {
    source: Arc<dyn AnimelistSource>,
    settings: ScrapeSettings,
}

impl Scraper {
    pub fn new(source: Arc<dyn AnimelistSource>, settings: ScrapeSettings) -> AppResult<Self> {
        if settings.batch_size == 0 || settings.max_concurrency == 0 {
            return Err(AppError::InvalidInput(
                "Batch size and concurrency must be positive".to_string(),
            ));
        }

        Ok(Self { source, settings })
    }

    /// Collects the animelists of all users, batch by batch
    ///
    /// Results keep the order of `user_ids`. A user whose list cannot be
    /// fetched gets an unavailable record instead of failing the run.
    pub async fn scrape_animelists(&self, user_ids: &[String]) -> AppResult<Vec<ScrapedAnimelist>> {
        let batches: Vec<&[String]> = user_ids.chunks(self.settings.batch_size).collect();
        let mut all = Vec::with_capacity(user_ids.len());

        tracing::info!(
            source = self.source.name(),
            users = user_ids.len(),
            batches = batches.len(),
            "Starting animelist collection"
        );

        for (batch_idx, batch) in batches.iter().enumerate() {
            if batch_idx > 0 && !self.settings.pause.is_zero() {
                tracing::info!(pause_secs = self.settings.pause.as_secs(), "Pausing between batches");
                tokio::time::sleep(self.settings.pause).await;
            }

            let results = self.scrape_batch(batch).await;

            if let Some(dir) = &self.settings.output_dir {
                let path = dir.join(format!("animelists_{}.json", batch_idx));
                tokio::fs::write(&path, serde_json::to_string(&results)?).await?;
            }

            tracing::info!(
                batch = batch_idx,
                collected = results.iter().filter(|r| r.titles.is_some()).count(),
                unavailable = results.iter().filter(|r| r.titles.is_none()).count(),
                "Batch collected"
            );

            all.extend(results);
        }

        Ok(all)
    }

    /// Fetches one batch with at most `max_concurrency` requests in flight
    pub async fn scrape_batch(&self, user_ids: &[String]) -> Vec<ScrapedAnimelist> {
        let permits = Arc::new(Semaphore::new(self.settings.max_concurrency));
        let mut tasks = JoinSet::new();

        for (idx, user_id) in user_ids.iter().cloned().enumerate() {
            let source = Arc::clone(&self.source);
            let permits = Arc::clone(&permits);

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let result = source.fetch_animelist(&user_id).await;
                (idx, user_id, result)
            });
        }

        let mut slots: Vec<Option<ScrapedAnimelist>> = vec![None; user_ids.len()];

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, _, Ok(animelist))) => slots[idx] = Some(animelist),
                Ok((idx, user_id, Err(e))) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Animelist fetch failed");
                    slots[idx] = Some(ScrapedAnimelist::unavailable(
                        &user_id,
                        self.source.animelist_url(&user_id),
                    ));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Task join error");
                }
            }
        }

        slots
            .into_iter()
            .zip(user_ids)
            .map(|(slot, user_id)| {
                slot.unwrap_or_else(|| {
                    ScrapedAnimelist::unavailable(user_id, self.source.animelist_url(user_id))
                })
            })
            .collect()
    }

    /// Collects the best-ranked `count` anime, page by page
    pub async fn fetch_top_anime(&self, count: usize) -> AppResult<Vec<JikanAnime>> {
        let mut anime = Vec::with_capacity(count);
        let mut page = 1;

        while anime.len() < count {
            if page > 1 && !self.settings.page_pause.is_zero() {
                tokio::time::sleep(self.settings.page_pause).await;
            }

            let response = self.source.fetch_top_anime_page(page).await?;
            let has_next_page = response.pagination.has_next_page;
            anime.extend(response.data);

            tracing::debug!(page = page, collected = anime.len(), "Fetched top anime page");

            if !has_next_page {
                break;
            }
            page += 1;
        }

        anime.truncate(count);
        Ok(anime)
    }
}
