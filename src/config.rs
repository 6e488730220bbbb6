use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::recommender::{RecommenderSettings, WeightPolicy};
use crate::services::scrape::ScrapeSettings;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the model artifact (catalog, profiles, embeddings)
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Redis connection URL; result caching is disabled when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// TTL for cached recommendation results, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Number of nearest titles considered per channel before filtering
    #[serde(default = "default_candidate_cap")]
    pub candidate_cap: usize,

    #[serde(default = "default_num_recs")]
    pub default_num_recs: usize,

    #[serde(default = "default_collab_weight")]
    pub default_collab_weight: f64,

    /// Whether negative collaborative weights are accepted or rejected
    #[serde(default)]
    pub weight_policy: WeightPolicy,

    /// MyAnimeList base URL (animelist JSON endpoint)
    #[serde(default = "default_mal_base_url")]
    pub mal_base_url: String,

    /// Jikan API base URL (top anime listing)
    #[serde(default = "default_jikan_base_url")]
    pub jikan_base_url: String,

    /// File with one MyAnimeList user name per line
    #[serde(default = "default_scrape_users_file")]
    pub scrape_users_file: String,

    #[serde(default = "default_scrape_output_dir")]
    pub scrape_output_dir: String,

    /// Trained factors and features, joined with the collected profiles into the model
    #[serde(default = "default_embeddings_path")]
    pub embeddings_path: String,

    #[serde(default = "default_scrape_batch_size")]
    pub scrape_batch_size: usize,

    #[serde(default = "default_scrape_workers")]
    pub scrape_workers: usize,

    /// Pause between batches, in seconds
    #[serde(default = "default_scrape_pause_secs")]
    pub scrape_pause_secs: u64,

    #[serde(default = "default_scrape_top_anime")]
    pub scrape_top_anime: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model_path() -> String {
    "data/model.json".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_candidate_cap() -> usize {
    50
}

fn default_num_recs() -> usize {
    10
}

fn default_collab_weight() -> f64 {
    1.0
}

fn default_mal_base_url() -> String {
    "https://myanimelist.net".to_string()
}

fn default_jikan_base_url() -> String {
    "https://api.jikan.moe/v4".to_string()
}

fn default_scrape_users_file() -> String {
    "data/users.txt".to_string()
}

fn default_scrape_output_dir() -> String {
    "data/scraped".to_string()
}

fn default_embeddings_path() -> String {
    "data/embeddings.json".to_string()
}

fn default_scrape_batch_size() -> usize {
    100
}

fn default_scrape_workers() -> usize {
    4
}

fn default_scrape_pause_secs() -> u64 {
    180
}

fn default_scrape_top_anime() -> usize {
    1000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Settings for the request-time recommender
    pub fn recommender_settings(&self) -> RecommenderSettings {
        RecommenderSettings {
            candidate_cap: self.candidate_cap,
            weight_policy: self.weight_policy,
        }
    }

    /// Where the collection pipeline writes the catalog and profile tables
    pub fn profiles_path(&self) -> PathBuf {
        PathBuf::from(&self.scrape_output_dir).join("profiles.json")
    }

    /// Settings for the batched collection pipeline
    pub fn scrape_settings(&self) -> ScrapeSettings {
        ScrapeSettings {
            batch_size: self.scrape_batch_size,
            max_concurrency: self.scrape_workers,
            pause: Duration::from_secs(self.scrape_pause_secs),
            page_pause: Duration::from_millis(400),
            output_dir: Some(PathBuf::from(&self.scrape_output_dir)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_environment() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.candidate_cap, 50);
        assert_eq!(config.default_num_recs, 10);
        assert_eq!(config.weight_policy, WeightPolicy::Accept);
        assert!(config.redis_url.is_none());
        assert_eq!(config.embeddings_path, "data/embeddings.json");
        assert_eq!(config.profiles_path(), PathBuf::from("data/scraped/profiles.json"));
    }

    #[test]
    fn test_overrides() {
        let vars = vec![
            ("PORT".to_string(), "8080".to_string()),
            ("WEIGHT_POLICY".to_string(), "reject".to_string()),
            ("REDIS_URL".to_string(), "redis://cache:6379".to_string()),
            ("SCRAPE_PAUSE_SECS".to_string(), "5".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.weight_policy, WeightPolicy::Reject);
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.scrape_settings().pause, Duration::from_secs(5));
    }
}
