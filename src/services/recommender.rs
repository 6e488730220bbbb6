use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        AnimeMetadata, AnimeTitle, Catalog, Channel, DistanceMatrix, ProfileTable,
        Recommendations,
    },
    services::{
        candidates::{select_candidates, DEFAULT_CANDIDATE_CAP},
        merger,
    },
};

/// How negative collaborative weights are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightPolicy {
    /// Negative weights invert the collaborative preference
    #[default]
    Accept,
    /// Negative weights fail with `InvalidWeight`
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommenderSettings {
    pub candidate_cap: usize,
    pub weight_policy: WeightPolicy,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            candidate_cap: DEFAULT_CANDIDATE_CAP,
            weight_policy: WeightPolicy::Accept,
        }
    }
}

/// Everything produced offline that a recommendation request reads
///
/// Loaded once and shared read-only between requests.
#[derive(Debug)]
pub struct RecommenderModel {
    pub catalog: Catalog,
    pub collab_distances: DistanceMatrix,
    pub content_distances: DistanceMatrix,
    /// Scores per user (collaborative channel)
    pub collab_profiles: ProfileTable,
    /// Watch history per user (content channel)
    pub content_profiles: ProfileTable,
    metadata: HashMap<AnimeTitle, AnimeMetadata>,
    fingerprint: String,
}

impl RecommenderModel {
    pub fn new(
        catalog: Catalog,
        collab_distances: DistanceMatrix,
        content_distances: DistanceMatrix,
        collab_profiles: ProfileTable,
        content_profiles: ProfileTable,
        metadata: Vec<AnimeMetadata>,
    ) -> AppResult<Self> {
        if collab_profiles.channel() != Channel::Collaborative
            || content_profiles.channel() != Channel::Content
        {
            return Err(AppError::InvalidInput(
                "Profile tables are assigned to the wrong channels".to_string(),
            ));
        }

        for matrix in [&collab_distances, &content_distances] {
            if matrix.n_titles() != catalog.len() {
                return Err(AppError::InvalidInput(format!(
                    "Distance matrix covers {} titles but the catalog has {}",
                    matrix.n_titles(),
                    catalog.len()
                )));
            }
        }

        let metadata = metadata
            .into_iter()
            .map(|anime| (anime.title.clone(), anime))
            .collect();

        let fingerprint = fingerprint(
            &catalog,
            [&collab_distances, &content_distances],
            [&collab_profiles, &content_profiles],
        );

        Ok(Self {
            catalog,
            collab_distances,
            content_distances,
            collab_profiles,
            content_profiles,
            metadata,
            fingerprint,
        })
    }

    /// Identifies the model contents, as `<catalog length>-<hash>`
    ///
    /// Only stable within one build of the server, which is as long as a
    /// cached result can outlive its model.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Display metadata for a title, if the metadata table has it
    pub fn metadata(&self, title: &str) -> Option<&AnimeMetadata> {
        self.metadata.get(title)
    }
}

fn fingerprint(
    catalog: &Catalog,
    distances: [&DistanceMatrix; 2],
    profiles: [&ProfileTable; 2],
) -> String {
    let mut hasher = DefaultHasher::new();
    catalog.titles().hash(&mut hasher);
    for matrix in distances {
        matrix.hash(&mut hasher);
    }
    for table in profiles {
        for profile in table.iter() {
            profile.user_id.hash(&mut hasher);
            for (title, value) in profile.entries() {
                title.hash(&mut hasher);
                value.as_numeric().to_bits().hash(&mut hasher);
            }
        }
    }
    format!("{}-{:016x}", catalog.len(), hasher.finish())
}

/// Request-level entry point over a loaded model
#[derive(Debug, Clone)]
pub struct Recommender {
    model: Arc<RecommenderModel>,
    settings: RecommenderSettings,
}

impl Recommender {
    pub fn new(model: Arc<RecommenderModel>, settings: RecommenderSettings) -> Self {
        Self { model, settings }
    }

    pub fn model(&self) -> &RecommenderModel {
        &self.model
    }

    /// Produces the merged recommendations for one user
    ///
    /// Each channel's candidates are cut to `num_recs` before merging, so every
    /// channel contributes at most as many titles as were requested.
    pub fn recommend(
        &self,
        user_id: &str,
        collab_weight: f64,
        num_recs: usize,
    ) -> AppResult<Recommendations> {
        self.check_weight(collab_weight)?;

        if num_recs == 0 {
            return Err(AppError::InvalidInput(
                "Number of recommendations must be positive".to_string(),
            ));
        }

        let model = &self.model;
        let cap = self.settings.candidate_cap;

        let content_known = model.content_profiles.profile_for(user_id)?;
        let collab_known = model.collab_profiles.profile_for(user_id)?;

        let mut content = select_candidates(
            Channel::Content,
            user_id,
            &model.content_distances,
            &model.catalog,
            content_known,
            cap,
        )?;
        let mut collab = select_candidates(
            Channel::Collaborative,
            user_id,
            &model.collab_distances,
            &model.catalog,
            collab_known,
            cap,
        )?;

        content.truncate(num_recs);
        collab.truncate(num_recs);

        let recommendations =
            merger::recommend(user_id, &content, &collab, collab_weight, num_recs)?;

        if !recommendations.warnings.is_empty() {
            tracing::warn!(
                user_id = %user_id,
                requested = num_recs,
                available = recommendations.ranked_titles.len(),
                "Fewer recommendations than requested"
            );
        }

        Ok(recommendations)
    }

    fn check_weight(&self, collab_weight: f64) -> AppResult<()> {
        if !collab_weight.is_finite() {
            return Err(AppError::InvalidWeight(collab_weight));
        }

        if collab_weight < 0.0 && self.settings.weight_policy == WeightPolicy::Reject {
            return Err(AppError::InvalidWeight(collab_weight));
        }

        Ok(())
    }
}
