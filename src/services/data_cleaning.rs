use chrono::{DateTime, NaiveDate};
use ndarray::Array2;
use std::collections::HashSet;

use crate::{
    error::AppResult,
    models::{
        anime::JikanAnime, AnimeMetadata, AnimeTitle, Catalog, Channel, ProfileTable,
        ProfileValue, RawScore, ScrapedAnimelist, UserProfile,
    },
};

/// Days per year used for the age of a title
const DAYS_PER_YEAR: f64 = 360.0;

/// Repairs animelists whose score list does not line up with the title list
///
/// There is no way to tell which score belongs to which title, so every score
/// becomes 0 and the list no longer marks any title as known. Returns the
/// number of lists repaired.
pub fn fix_mismatching_lengths(animelists: &mut [ScrapedAnimelist]) -> usize {
    let mut repaired = 0;

    for animelist in animelists.iter_mut() {
        let Some(titles) = &animelist.titles else {
            continue;
        };

        let scores_len = animelist.scores.as_ref().map(Vec::len).unwrap_or(0);
        if titles.is_empty() || titles.len() == scores_len {
            continue;
        }

        tracing::debug!(
            user_id = %animelist.user_id,
            titles = titles.len(),
            scores = scores_len,
            "Animelist scores do not match titles"
        );

        animelist.scores = Some(vec![RawScore::Number(0.0); titles.len()]);
        repaired += 1;
    }

    repaired
}

/// Builds the collaborative (scores) and content (history) tables
///
/// Every collected user gets a row, including users whose list was unavailable.
/// Only catalog titles are kept. A title with an unreadable score is left out of
/// the scores table but still counts as watched, and a user seen twice keeps the
/// first record.
pub fn build_profile_tables(
    animelists: &[ScrapedAnimelist],
    catalog: &Catalog,
) -> AppResult<(ProfileTable, ProfileTable)> {
    let mut scores = ProfileTable::new(Channel::Collaborative);
    let mut history = ProfileTable::new(Channel::Content);
    let mut seen = HashSet::new();

    for animelist in animelists {
        if !seen.insert(animelist.user_id.as_str()) {
            tracing::warn!(user_id = %animelist.user_id, "Duplicate animelist, keeping first");
            continue;
        }

        let mut score_profile = UserProfile::new(animelist.user_id.as_str());
        let mut history_profile = UserProfile::new(animelist.user_id.as_str());

        if let (Some(titles), Some(raw_scores)) = (&animelist.titles, &animelist.scores) {
            for (title, raw) in titles.iter().zip(raw_scores) {
                if !catalog.contains(title) {
                    continue;
                }

                // Any listed title with a non-zero entry is watched, readable or not
                match ProfileValue::from_raw(Channel::Content, raw) {
                    Ok(Some(watched)) => history_profile.insert(title.as_str(), watched),
                    Ok(None) => {}
                    Err(_) => history_profile.insert(title.as_str(), ProfileValue::Watched),
                }

                match ProfileValue::from_raw(Channel::Collaborative, raw) {
                    Ok(Some(score)) => score_profile.insert(title.as_str(), score),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            user_id = %animelist.user_id,
                            title = %title,
                            error = %e,
                            "Skipping unreadable score"
                        );
                    }
                }
            }
        }

        scores.insert(score_profile)?;
        history.insert(history_profile)?;
    }

    tracing::info!(
        users = scores.len(),
        titles = catalog.len(),
        "Built profile tables"
    );

    Ok((scores, history))
}

/// Users × catalog matrix handed to matrix factorization
///
/// Scores keep their value; unscored and unlisted titles are 0.
pub fn score_matrix(table: &ProfileTable, catalog: &Catalog) -> Array2<f64> {
    let mut matrix = Array2::<f64>::zeros((table.len(), catalog.len()));

    for (row, profile) in table.iter().enumerate() {
        for (title, value) in profile.entries() {
            if let Some(col) = catalog.position(title.as_str()) {
                matrix[[row, col]] = value.as_numeric();
            }
        }
    }

    matrix
}

/// Turns top-anime API records into catalog metadata
///
/// Records are expected best-ranked first; a repeated title keeps its first
/// record. Missing episode counts become 0 and a missing end date falls back to
/// the start date (movies, single OVAs).
pub fn clean_top_anime(raw: Vec<JikanAnime>, today: NaiveDate) -> Vec<AnimeMetadata> {
    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(raw.len());

    for anime in raw {
        if !seen.insert(anime.title.clone()) {
            tracing::debug!(title = %anime.title, "Dropping repeated top anime title");
            continue;
        }

        let aired = anime.aired.as_ref();
        let aired_from = aired.and_then(|a| a.from.as_deref()).and_then(parse_api_date);
        let aired_to = aired
            .and_then(|a| a.to.as_deref())
            .and_then(parse_api_date)
            .or(aired_from);
        let age_in_years =
            aired_from.map(|from| (today - from).num_days() as f64 / DAYS_PER_YEAR);

        cleaned.push(AnimeMetadata {
            title: AnimeTitle::new(anime.title),
            mal_id: anime.mal_id,
            url: anime.url,
            image_url: anime.images.and_then(|images| images.jpg.image_url),
            media_type: anime.media_type,
            num_episodes: anime.episodes.unwrap_or(0),
            score: anime.score,
            scored_by: anime.scored_by,
            rank: anime.rank,
            popularity: anime.popularity,
            members: anime.members,
            favorites: anime.favorites,
            genres: anime.genres.into_iter().map(|g| g.name).collect(),
            studios: anime.studios.into_iter().map(|s| s.name).collect(),
            aired_from,
            aired_to,
            age_in_years,
        });
    }

    cleaned
}

fn parse_api_date(value: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .ok()
}
