//! Joins the collected profiles with externally trained factors and features
//! into the model file the server loads.
use tracing_subscriber::EnvFilter;

use anime_recs::{config::Config, services::model_store::build_model_file};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("anime_recs=info,build_model=info")),
        )
        .init();

    let config = Config::from_env()?;

    let model = build_model_file(
        config.profiles_path(),
        &config.embeddings_path,
        &config.model_path,
    )
    .await?;

    tracing::info!(
        collab_users = model.collab_distances.n_users(),
        content_users = model.content_distances.n_users(),
        fingerprint = model.fingerprint(),
        "Model ready"
    );

    Ok(())
}
