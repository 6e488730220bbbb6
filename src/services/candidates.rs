use std::cmp::Ordering;

use crate::{
    error::{AppError, AppResult},
    models::{CandidateList, Catalog, Channel, DistanceMatrix, KnownTitles},
};

/// Number of nearest titles examined per channel before known titles are removed
pub const DEFAULT_CANDIDATE_CAP: usize = 50;

/// Selects the nearest titles a user does not know yet, for one channel
///
/// The user's row is ordered by ascending distance with a stable sort, so equal
/// distances keep catalog order. The first `cap` titles of that order are taken
/// and known titles are removed afterwards; the result can therefore be shorter
/// than `cap` (or empty) when the user already knows most of their nearest titles.
pub fn select_candidates<K>(
    channel: Channel,
    user_id: &str,
    distances: &DistanceMatrix,
    catalog: &Catalog,
    known: &K,
    cap: usize,
) -> AppResult<CandidateList>
where
    K: KnownTitles + ?Sized,
{
    if cap == 0 {
        return Err(AppError::InvalidInput(
            "Candidate cap must be positive".to_string(),
        ));
    }

    if distances.n_titles() != catalog.len() {
        return Err(AppError::InvalidInput(format!(
            "Distance matrix covers {} titles but the catalog has {}",
            distances.n_titles(),
            catalog.len()
        )));
    }

    let row = distances.row_for(user_id)?;

    let mut order: Vec<usize> = (0..row.distances.len()).collect();
    order.sort_by(|&a, &b| {
        row.distances[a]
            .partial_cmp(&row.distances[b])
            .unwrap_or(Ordering::Equal)
    });

    let titles = order
        .into_iter()
        .take(cap)
        .filter_map(|idx| catalog.title(idx))
        .filter(|title| !known.is_known(title))
        .cloned()
        .collect();

    let candidates = CandidateList::new(channel, titles)?;

    tracing::debug!(
        user_id = %user_id,
        channel = %channel,
        cap = cap,
        candidates = candidates.len(),
        "Selected candidates"
    );

    Ok(candidates)
}
