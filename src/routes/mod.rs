use axum::{http::Method, http::StatusCode, middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::Config,
    db::Cache,
    middleware::{make_span_with_request_id, request_id_middleware},
    services::Recommender,
};

pub mod anime;
pub mod recommendations;

/// State shared by every handler
pub struct AppState {
    pub recommender: Recommender,
    /// `None` when no Redis is configured
    pub cache: Option<Cache>,
    pub cache_ttl_secs: u64,
    pub default_num_recs: usize,
    pub default_collab_weight: f64,
}

impl AppState {
    pub fn new(recommender: Recommender, cache: Option<Cache>, config: &Config) -> Self {
        Self {
            recommender,
            cache,
            cache_ttl_secs: config.cache_ttl_secs,
            default_num_recs: config.default_num_recs,
            default_collab_weight: config.default_collab_weight,
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/recommendations/:user_id",
            get(recommendations::recommend),
        )
        .route(
            "/recommendations/:user_id/table",
            get(recommendations::recommendation_table),
        )
        .route("/anime/:title", get(anime::get_anime))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
}

async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
