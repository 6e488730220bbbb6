use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;

use crate::{
    error::{AppError, AppResult},
    models::{
        profile::ProfileRecord, AnimeMetadata, Catalog, Channel, DistanceMatrix, ProfileTable,
    },
    services::{
        embedding::{collaborative_distances, content_distances, rows_to_array},
        recommender::RecommenderModel,
    },
};

/// Catalog and profile tables written by the collection pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedProfiles {
    /// Catalog titles in column order
    pub catalog: Vec<String>,
    #[serde(default)]
    pub metadata: Vec<AnimeMetadata>,
    pub collab_profiles: Vec<ProfileRecord>,
    pub content_profiles: Vec<ProfileRecord>,
}

/// Output of the external training step, one source per channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedEmbeddings {
    pub collaborative: CollaborativeSource,
    pub content: ContentSource,
}

/// Serialized model loaded by the server, assembled by `build_model_file`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Catalog titles in column order
    pub catalog: Vec<String>,
    #[serde(default)]
    pub metadata: Vec<AnimeMetadata>,
    pub collab_profiles: Vec<ProfileRecord>,
    pub content_profiles: Vec<ProfileRecord>,
    pub collaborative: CollaborativeSource,
    pub content: ContentSource,
}

/// Collaborative distances, precomputed or derived from NMF factors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollaborativeSource {
    Distances {
        users: Vec<String>,
        rows: Vec<Vec<f64>>,
    },
    Embeddings {
        users: Vec<String>,
        /// users × k
        user_factors: Vec<Vec<f64>>,
        /// anime × k, catalog order
        anime_factors: Vec<Vec<f64>>,
    },
}

/// Content distances, precomputed or derived from anime feature vectors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentSource {
    Distances {
        users: Vec<String>,
        rows: Vec<Vec<f64>>,
    },
    /// User vectors are averaged from the content profiles
    Features {
        /// anime × f, catalog order
        anime_features: Vec<Vec<f64>>,
    },
}

impl ModelArtifact {
    pub fn assemble(profiles: CollectedProfiles, embeddings: TrainedEmbeddings) -> Self {
        Self {
            catalog: profiles.catalog,
            metadata: profiles.metadata,
            collab_profiles: profiles.collab_profiles,
            content_profiles: profiles.content_profiles,
            collaborative: embeddings.collaborative,
            content: embeddings.content,
        }
    }

    /// Validates the artifact and computes any distances it does not carry
    pub fn into_model(self) -> AppResult<RecommenderModel> {
        let catalog = Catalog::new(self.catalog)?;
        let collab_profiles = ProfileTable::from_records(Channel::Collaborative, self.collab_profiles)?;
        let content_profiles = ProfileTable::from_records(Channel::Content, self.content_profiles)?;

        let collab_distances = match self.collaborative {
            CollaborativeSource::Distances { users, rows } => {
                DistanceMatrix::from_rows(&catalog, users, rows)?
            }
            CollaborativeSource::Embeddings {
                users,
                user_factors,
                anime_factors,
            } => {
                let width = anime_factors.first().map(Vec::len).unwrap_or(0);
                let user_factors = rows_to_array(&user_factors, width)?;
                let anime_factors = rows_to_array(&anime_factors, width)?;
                collaborative_distances(&catalog, users, &user_factors, &anime_factors)?
            }
        };

        let content_distances = match self.content {
            ContentSource::Distances { users, rows } => {
                DistanceMatrix::from_rows(&catalog, users, rows)?
            }
            ContentSource::Features { anime_features } => {
                let width = anime_features.first().map(Vec::len).unwrap_or(0);
                let features = rows_to_array(&anime_features, width)?;
                content_distances(&catalog, &content_profiles, &features)?
            }
        };

        RecommenderModel::new(
            catalog,
            collab_distances,
            content_distances,
            collab_profiles,
            content_profiles,
            self.metadata,
        )
    }
}

/// Reads an artifact from disk and builds the model
pub async fn load_model(path: impl AsRef<Path>) -> AppResult<RecommenderModel> {
    let path = path.as_ref();
    let artifact: ModelArtifact = read_json(path).await?;
    let model = artifact.into_model()?;

    tracing::info!(
        path = %path.display(),
        titles = model.catalog.len(),
        collab_users = model.collab_distances.n_users(),
        content_users = model.content_distances.n_users(),
        "Loaded recommendation model"
    );

    Ok(model)
}

/// Writes an artifact to disk as JSON
pub async fn save_artifact(path: impl AsRef<Path>, artifact: &ModelArtifact) -> AppResult<()> {
    let json = serde_json::to_string(artifact)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let json = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::Internal(format!("Failed to read {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_str(&json)?)
}

/// Joins collected profiles with trained embeddings into the server's model file
///
/// The combined artifact is validated by building the model before anything is
/// written, so a shape mismatch never replaces a working model file.
pub async fn build_model_file(
    profiles_path: impl AsRef<Path>,
    embeddings_path: impl AsRef<Path>,
    model_path: impl AsRef<Path>,
) -> AppResult<RecommenderModel> {
    let profiles: CollectedProfiles = read_json(profiles_path.as_ref()).await?;
    let embeddings: TrainedEmbeddings = read_json(embeddings_path.as_ref()).await?;

    let artifact = ModelArtifact::assemble(profiles, embeddings);
    let model = artifact.clone().into_model()?;
    save_artifact(model_path.as_ref(), &artifact).await?;

    tracing::info!(
        path = %model_path.as_ref().display(),
        titles = model.catalog.len(),
        "Wrote model artifact"
    );

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact_json() -> serde_json::Value {
        json!({
            "catalog": ["Akira", "Paprika", "Monster"],
            "collab_profiles": [
                {"user_id": "alice", "entries": {"Akira": 8, "Paprika": 0}},
                {"user_id": "bob", "entries": {"Monster": "-"}}
            ],
            "content_profiles": [
                {"user_id": "alice", "entries": {"Akira": 1}},
                {"user_id": "bob", "entries": {"Monster": 1}}
            ],
            "collaborative": {
                "kind": "embeddings",
                "users": ["alice", "bob"],
                "user_factors": [[1.0, 0.0], [0.0, 1.0]],
                "anime_factors": [[1.0, 0.0], [0.5, 0.5], [0.0, 1.0]]
            },
            "content": {
                "kind": "features",
                "anime_features": [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
            }
        })
    }

    #[test]
    fn test_artifact_with_embeddings() {
        let artifact: ModelArtifact = serde_json::from_value(artifact_json()).unwrap();
        let model = artifact.into_model().unwrap();

        assert_eq!(model.catalog.len(), 3);
        let alice = model.collab_distances.row_for("alice").unwrap();
        assert!(alice.distances[0] < alice.distances[2]);
        assert!(model.content_distances.row_for("bob").is_ok());
        assert_eq!(model.collab_profiles.profile_for("alice").unwrap().len(), 1);
    }

    #[test]
    fn test_artifact_with_precomputed_distances() {
        let mut value = artifact_json();
        value["collaborative"] = json!({
            "kind": "distances",
            "users": ["alice", "bob"],
            "rows": [[0.1, 0.2, 0.3], [0.3, 0.2, 0.1]]
        });
        value["content"] = json!({
            "kind": "distances",
            "users": ["alice", "bob"],
            "rows": [[0.5, 0.5, 0.5], [0.0, 1.0, 2.0]]
        });

        let artifact: ModelArtifact = serde_json::from_value(value).unwrap();
        let model = artifact.into_model().unwrap();
        let bob = model.content_distances.row_for("bob").unwrap();
        assert_eq!(bob.distances.to_vec(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_artifact_with_bad_shape() {
        let mut value = artifact_json();
        value["content"] = json!({
            "kind": "features",
            "anime_features": [[1.0, 0.0]]
        });

        let artifact: ModelArtifact = serde_json::from_value(value).unwrap();
        assert!(matches!(
            artifact.into_model(),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let artifact: ModelArtifact = serde_json::from_value(artifact_json()).unwrap();
        let path = std::env::temp_dir().join(format!("anime-recs-{}.json", uuid::Uuid::new_v4()));

        save_artifact(&path, &artifact).await.unwrap();
        let model = load_model(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(model.catalog.title(2).unwrap().as_str(), "Monster");
    }

    #[tokio::test]
    async fn test_build_model_file_from_pipeline_outputs() {
        let value = artifact_json();
        let profiles = json!({
            "catalog": value["catalog"],
            "collab_profiles": value["collab_profiles"],
            "content_profiles": value["content_profiles"],
        });
        let embeddings = json!({
            "collaborative": value["collaborative"],
            "content": value["content"],
        });

        let dir = std::env::temp_dir().join(format!("anime-recs-build-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let profiles_path = dir.join("profiles.json");
        let embeddings_path = dir.join("embeddings.json");
        let model_path = dir.join("model.json");
        tokio::fs::write(&profiles_path, profiles.to_string()).await.unwrap();
        tokio::fs::write(&embeddings_path, embeddings.to_string()).await.unwrap();

        build_model_file(&profiles_path, &embeddings_path, &model_path)
            .await
            .unwrap();
        let model = load_model(&model_path).await.unwrap();
        tokio::fs::remove_dir_all(&dir).await.unwrap();

        assert_eq!(model.catalog.len(), 3);
        assert!(model.collab_distances.row_for("alice").is_ok());
    }

    #[tokio::test]
    async fn test_build_model_file_rejects_bad_shape_without_writing() {
        let value = artifact_json();
        let profiles = json!({
            "catalog": value["catalog"],
            "collab_profiles": value["collab_profiles"],
            "content_profiles": value["content_profiles"],
        });
        let embeddings = json!({
            "collaborative": value["collaborative"],
            "content": {"kind": "features", "anime_features": [[1.0, 0.0]]},
        });

        let dir = std::env::temp_dir().join(format!("anime-recs-build-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let profiles_path = dir.join("profiles.json");
        let embeddings_path = dir.join("embeddings.json");
        let model_path = dir.join("model.json");
        tokio::fs::write(&profiles_path, profiles.to_string()).await.unwrap();
        tokio::fs::write(&embeddings_path, embeddings.to_string()).await.unwrap();

        let result = build_model_file(&profiles_path, &embeddings_path, &model_path).await;
        let written = tokio::fs::try_exists(&model_path).await.unwrap();
        tokio::fs::remove_dir_all(&dir).await.unwrap();

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(!written);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = load_model("/nonexistent/model.json").await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
