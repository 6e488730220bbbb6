use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;
use crate::{
    cached,
    db::CacheKey,
    error::AppResult,
    models::{AnimeTitle, RecommendationEntry, RecommendationWarning, Recommendations, Source},
};

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    /// Collaborative weight; higher favors what similar users liked
    adventurous_level: Option<f64>,
    num_recs: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendedAnime {
    pub title: AnimeTitle,
    pub source: Source,
    pub weighted_score: f64,
    pub url: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: String,
    pub collab_weight: f64,
    pub recommendations: Vec<RecommendedAnime>,
    pub warnings: Vec<RecommendationWarning>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationTableResponse {
    pub user_id: String,
    pub collab_weight: f64,
    pub table: Vec<RecommendationEntry>,
    pub warnings: Vec<RecommendationWarning>,
}

async fn fetch(
    state: &AppState,
    user_id: &str,
    query: RecommendationQuery,
) -> AppResult<(f64, Recommendations)> {
    let collab_weight = query
        .adventurous_level
        .unwrap_or(state.default_collab_weight);
    let num_recs = query.num_recs.unwrap_or(state.default_num_recs);

    let key = CacheKey::Recommendations {
        model: state.recommender.model().fingerprint().to_string(),
        user_id: user_id.to_string(),
        collab_weight,
        num_recs,
    };

    let recommendations: Recommendations =
        cached!(state.cache.as_ref(), key, state.cache_ttl_secs, {
            state.recommender.recommend(user_id, collab_weight, num_recs)
        })?;

    Ok((collab_weight, recommendations))
}

/// Top titles joined with their display metadata
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let (collab_weight, recs) = fetch(&state, &user_id, query).await?;
    let model = state.recommender.model();

    // `table` is already in final order and its head is `ranked_titles`
    let recommendations = recs
        .table
        .into_iter()
        .take(recs.ranked_titles.len())
        .map(|entry| {
            let metadata = model.metadata(entry.anime_title.as_str());
            RecommendedAnime {
                url: metadata.map(|m| m.url.clone()),
                image_url: metadata.and_then(|m| m.image_url.clone()),
                title: entry.anime_title,
                source: entry.source,
                weighted_score: entry.weighted_score,
            }
        })
        .collect();

    Ok(Json(RecommendationResponse {
        user_id,
        collab_weight,
        recommendations,
        warnings: recs.warnings,
    }))
}

/// The full scored table behind a recommendation
pub async fn recommendation_table(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationTableResponse>> {
    let (collab_weight, recs) = fetch(&state, &user_id, query).await?;

    Ok(Json(RecommendationTableResponse {
        user_id,
        collab_weight,
        table: recs.table,
        warnings: recs.warnings,
    }))
}
