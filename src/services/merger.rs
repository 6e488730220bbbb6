use std::cmp::Ordering;
use std::collections::HashMap;

use crate::{
    error::{AppError, AppResult},
    models::{
        AnimeTitle, CandidateList, Channel, RecommendationEntry, RecommendationWarning,
        Recommendations, Source,
    },
};

/// Number of titles returned when the caller does not ask for a count
pub const DEFAULT_NUM_RECS: usize = 10;

/// Base score of the first candidate of a channel; each later rank scores one less
const TOP_BASE_SCORE: i64 = 10;

/// Merges the content and collaborative candidate lists of one user
///
/// 1. Every candidate at 0-based position `idx` gets `base_score = 10 - idx`
///    (negative past the tenth rank). Collaborative entries are weighted by
///    `collab_weight`, content entries by 1.
/// 2. Entries are interleaved rank by rank, collaborative first, until the
///    shorter list runs out; the tail of the longer list is dropped.
/// 3. A title recommended by both channels collapses into one `Both` entry whose
///    scores are the sums of the two and whose rank is the better of the two.
/// 4. Entries are ordered by weighted score, highest first, with ties going to
///    collaborative, then content, then combined entries. The sort is stable so
///    remaining ties keep interleave order.
/// 5. The first `num_recs` titles are returned with the full table.
///
/// Negative weights are accepted and push collaborative entries down; non-finite
/// weights are rejected because they leave the order undefined.
pub fn recommend(
    user_id: &str,
    content: &CandidateList,
    collab: &CandidateList,
    collab_weight: f64,
    num_recs: usize,
) -> AppResult<Recommendations> {
    if content.channel() != Channel::Content || collab.channel() != Channel::Collaborative {
        return Err(AppError::InvalidInput(format!(
            "Expected content and collaborative candidates, got {} and {}",
            content.channel(),
            collab.channel()
        )));
    }

    if !collab_weight.is_finite() {
        return Err(AppError::InvalidWeight(collab_weight));
    }

    if num_recs == 0 {
        return Err(AppError::InvalidInput(
            "Number of recommendations must be positive".to_string(),
        ));
    }

    let collab_entries = score_channel(user_id, collab, collab_weight);
    let content_entries = score_channel(user_id, content, 1.0);

    let interleaved = collab_entries
        .into_iter()
        .zip(content_entries)
        .flat_map(|(collab_entry, content_entry)| [collab_entry, content_entry]);

    let mut table = combine_duplicates(interleaved);

    table.sort_by(|a, b| {
        b.weighted_score
            .partial_cmp(&a.weighted_score)
            .unwrap_or(Ordering::Equal)
            .then(a.source.cmp(&b.source))
    });

    let ranked_titles: Vec<AnimeTitle> = table
        .iter()
        .take(num_recs)
        .map(|entry| entry.anime_title.clone())
        .collect();

    let mut warnings = Vec::new();
    if ranked_titles.len() < num_recs {
        warnings.push(RecommendationWarning::ShortResult {
            requested: num_recs,
            available: ranked_titles.len(),
        });
    }

    tracing::debug!(
        user_id = %user_id,
        collab_candidates = collab.len(),
        content_candidates = content.len(),
        merged = table.len(),
        returned = ranked_titles.len(),
        "Merged recommendations"
    );

    Ok(Recommendations {
        ranked_titles,
        table,
        warnings,
    })
}

/// Assigns rank-based scores to one channel's candidates
fn score_channel(user_id: &str, candidates: &CandidateList, weight: f64) -> Vec<RecommendationEntry> {
    let source = Source::from(candidates.channel());

    candidates
        .titles()
        .iter()
        .enumerate()
        .map(|(idx, title)| {
            let base_score = TOP_BASE_SCORE - idx as i64;
            RecommendationEntry {
                user_id: user_id.to_string(),
                anime_title: title.clone(),
                source,
                original_rank: idx + 1,
                base_score,
                weighted_score: base_score as f64 * weight,
            }
        })
        .collect()
}

/// Collapses entries sharing a title into a single combined entry
///
/// Entries keep the position of their first occurrence. Every entry belongs to
/// the same user, so the title alone identifies a group.
fn combine_duplicates(
    entries: impl Iterator<Item = RecommendationEntry>,
) -> Vec<RecommendationEntry> {
    let mut table: Vec<RecommendationEntry> = Vec::new();
    let mut positions: HashMap<AnimeTitle, usize> = HashMap::new();

    for entry in entries {
        match positions.get(&entry.anime_title).copied() {
            Some(pos) => {
                let combined = &mut table[pos];
                combined.source = Source::Both;
                combined.original_rank = combined.original_rank.min(entry.original_rank);
                combined.base_score += entry.base_score;
                combined.weighted_score += entry.weighted_score;
            }
            None => {
                positions.insert(entry.anime_title.clone(), table.len());
                table.push(entry);
            }
        }
    }

    table
}
