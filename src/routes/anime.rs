use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use super::AppState;
use crate::{
    error::{AppError, AppResult},
    models::AnimeMetadata,
};

/// Display metadata for one catalog title
pub async fn get_anime(
    State(state): State<Arc<AppState>>,
    Path(title): Path<String>,
) -> AppResult<Json<AnimeMetadata>> {
    state
        .recommender
        .model()
        .metadata(&title)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Anime '{}'", title)))
}
