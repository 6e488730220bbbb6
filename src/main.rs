use std::sync::Arc;

use anime_recs::{
    config::Config,
    db::{create_redis_client, Cache, CacheWriterHandle},
    routes::{create_router, AppState},
    services::{load_model, Recommender},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("anime_recs=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let model = load_model(&config.model_path).await?;
    tracing::info!(fingerprint = model.fingerprint(), "Model loaded");
    let recommender = Recommender::new(Arc::new(model), config.recommender_settings());

    let (cache, cache_handle) = connect_cache(&config).await;

    let state = Arc::new(AppState::new(recommender, cache, &config));
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }

    Ok(())
}

/// Result caching is skipped when Redis is unset or unreachable
async fn connect_cache(config: &Config) -> (Option<Cache>, Option<CacheWriterHandle>) {
    let Some(redis_url) = config.redis_url.as_deref() else {
        tracing::info!("REDIS_URL not set, result caching disabled");
        return (None, None);
    };

    let connected = match create_redis_client(redis_url) {
        Ok(client) => Cache::connect(client).await.map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };

    match connected {
        Ok((cache, handle)) => {
            tracing::info!("Result cache connected");
            (Some(cache), Some(handle))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, result caching disabled");
            (None, None)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
