//! Offline collection: top-anime catalog, user animelists, profile tables and
//! the score matrix used for matrix factorization. Once the factors are trained,
//! `build-model` joins them with `profiles.json` into the server's model file.
use std::{collections::HashSet, path::Path, sync::Arc};

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use anime_recs::{
    config::Config,
    models::{AnimeTitle, Catalog},
    services::{
        data_cleaning::{
            build_profile_tables, clean_top_anime, fix_mismatching_lengths, score_matrix,
        },
        model_store::CollectedProfiles,
        scrape::{MalClient, Scraper},
    },
};

#[derive(Serialize)]
struct ScoreMatrixOutput<'a> {
    users: &'a [String],
    titles: &'a [AnimeTitle],
    rows: Vec<Vec<f64>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("anime_recs=info,scrape=info")),
        )
        .init();

    let config = Config::from_env()?;
    let output_dir = Path::new(&config.scrape_output_dir);
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let user_ids = read_users(&config.scrape_users_file).await?;

    let client = MalClient::new(config.mal_base_url.clone(), config.jikan_base_url.clone());
    let scraper = Scraper::new(Arc::new(client), config.scrape_settings())?;

    let raw_top = scraper.fetch_top_anime(config.scrape_top_anime).await?;
    let metadata = clean_top_anime(raw_top, Utc::now().date_naive());
    let catalog = Catalog::new(metadata.iter().map(|m| m.title.clone()))?;
    tracing::info!(titles = catalog.len(), "Catalog collected");

    let mut animelists = scraper.scrape_animelists(&user_ids).await?;
    let repaired = fix_mismatching_lengths(&mut animelists);
    if repaired > 0 {
        tracing::warn!(repaired, "Cleared scores of animelists with mismatched lengths");
    }

    let (scores, history) = build_profile_tables(&animelists, &catalog)?;
    let matrix = score_matrix(&scores, &catalog);

    write_json(
        &config.profiles_path(),
        &CollectedProfiles {
            catalog: catalog.iter().map(|title| title.to_string()).collect(),
            metadata,
            collab_profiles: scores.to_records(),
            content_profiles: history.to_records(),
        },
    )
    .await?;

    write_json(
        &output_dir.join("score_matrix.json"),
        &ScoreMatrixOutput {
            users: scores.users(),
            titles: catalog.titles(),
            rows: matrix.outer_iter().map(|row| row.to_vec()).collect(),
        },
    )
    .await?;

    tracing::info!(
        users = scores.len(),
        titles = catalog.len(),
        output_dir = %output_dir.display(),
        "Collection finished"
    );

    Ok(())
}

/// One user name per line; blank lines and repeats are skipped
async fn read_users(path: &str) -> anyhow::Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read users file {}", path))?;

    let mut seen = HashSet::new();
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect())
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string(value)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "Wrote output");
    Ok(())
}
