//! Cosine distance matrices from embeddings
//!
//! Collaborative distances compare NMF user factors with anime factors.
//! Content distances compare each anime's feature vector with the mean
//! feature vector of the anime a user has watched.

use ndarray::{Array1, Array2, Axis};

use crate::{
    error::{AppError, AppResult},
    models::{Catalog, DistanceMatrix, ProfileTable},
};

/// Pairwise cosine distances between the rows of `left` and the rows of `right`
///
/// Distance is `1 - cos`, clamped to `[0, 2]`. A zero row has no direction and
/// is at distance 1 from everything.
pub fn cosine_distances(left: &Array2<f64>, right: &Array2<f64>) -> AppResult<Array2<f64>> {
    if left.ncols() != right.ncols() {
        return Err(AppError::InvalidInput(format!(
            "Embedding dimensions differ: {} vs {}",
            left.ncols(),
            right.ncols()
        )));
    }

    let left = normalize_rows(left);
    let right = normalize_rows(right);

    let mut distances = left.dot(&right.t());
    distances.mapv_inplace(|similarity| (1.0 - similarity).clamp(0.0, 2.0));

    Ok(distances)
}

/// Scales every row to unit length, leaving zero rows untouched
fn normalize_rows(matrix: &Array2<f64>) -> Array2<f64> {
    let mut normalized = matrix.clone();
    for mut row in normalized.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row /= norm;
        }
    }
    normalized
}

/// Mean feature vector of each user's watched anime, in history-table order
pub fn content_user_vectors(
    history: &ProfileTable,
    catalog: &Catalog,
    features: &Array2<f64>,
) -> AppResult<Array2<f64>> {
    if features.nrows() != catalog.len() {
        return Err(AppError::InvalidInput(format!(
            "Feature matrix has {} rows for a catalog of {} titles",
            features.nrows(),
            catalog.len()
        )));
    }

    let mut vectors = Array2::<f64>::zeros((history.len(), features.ncols()));

    for (mut target, profile) in vectors.axis_iter_mut(Axis(0)).zip(history.iter()) {
        let mut sum = Array1::<f64>::zeros(features.ncols());
        let mut watched = 0usize;

        for title in profile.titles() {
            if let Some(idx) = catalog.position(title.as_str()) {
                sum += &features.row(idx);
                watched += 1;
            }
        }

        if watched > 0 {
            target.assign(&(sum / watched as f64));
        }
    }

    Ok(vectors)
}

/// Collaborative distances from NMF factors
///
/// `user_factors` is users × k, `anime_factors` is anime × k in catalog order.
pub fn collaborative_distances(
    catalog: &Catalog,
    users: Vec<String>,
    user_factors: &Array2<f64>,
    anime_factors: &Array2<f64>,
) -> AppResult<DistanceMatrix> {
    if anime_factors.nrows() != catalog.len() {
        return Err(AppError::InvalidInput(format!(
            "Anime factors have {} rows for a catalog of {} titles",
            anime_factors.nrows(),
            catalog.len()
        )));
    }

    let distances = cosine_distances(user_factors, anime_factors)?;
    DistanceMatrix::new(catalog, users, distances)
}

/// Content distances for every user of the history table
pub fn content_distances(
    catalog: &Catalog,
    history: &ProfileTable,
    features: &Array2<f64>,
) -> AppResult<DistanceMatrix> {
    let user_vectors = content_user_vectors(history, catalog, features)?;
    let distances = cosine_distances(&user_vectors, features)?;
    DistanceMatrix::new(catalog, history.users().to_vec(), distances)
}

/// Converts row vectors into a dense matrix of the given width
pub fn rows_to_array(rows: &[Vec<f64>], width: usize) -> AppResult<Array2<f64>> {
    if let Some(row) = rows.iter().find(|row| row.len() != width) {
        return Err(AppError::InvalidInput(format!(
            "Row has {} values, expected {}",
            row.len(),
            width
        )));
    }

    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), width), flat)
        .map_err(|e| AppError::InvalidInput(format!("Invalid matrix shape: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, ProfileValue, UserProfile};
    use ndarray::array;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_cosine_distances_basic() {
        let users = array![[1.0, 0.0], [1.0, 1.0]];
        let items = array![[2.0, 0.0], [0.0, 3.0], [-1.0, 0.0]];

        let d = cosine_distances(&users, &items).unwrap();

        assert_eq!(d.dim(), (2, 3));
        assert_close(d[[0, 0]], 0.0);
        assert_close(d[[0, 1]], 1.0);
        assert_close(d[[0, 2]], 2.0);
        assert_close(d[[1, 0]], 1.0 - 1.0 / 2f64.sqrt());
    }

    #[test]
    fn test_zero_vector_is_distance_one() {
        let users = array![[0.0, 0.0]];
        let items = array![[1.0, 2.0], [0.0, 0.0]];

        let d = cosine_distances(&users, &items).unwrap();
        assert_close(d[[0, 0]], 1.0);
        assert_close(d[[0, 1]], 1.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let users = array![[1.0, 0.0, 0.0]];
        let items = array![[1.0, 0.0]];
        assert!(cosine_distances(&users, &items).is_err());
    }

    #[test]
    fn test_content_user_vector_is_mean_of_watched() {
        let catalog = Catalog::new(["Akira", "Paprika", "Monster"]).unwrap();
        let features = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

        let mut history = ProfileTable::new(Channel::Content);
        let mut alice = UserProfile::new("alice");
        alice.insert("Akira", ProfileValue::Watched);
        alice.insert("Paprika", ProfileValue::Watched);
        alice.insert("Not In Catalog", ProfileValue::Watched);
        history.insert(alice).unwrap();
        history.insert(UserProfile::new("newcomer")).unwrap();

        let vectors = content_user_vectors(&history, &catalog, &features).unwrap();
        assert_eq!(vectors.row(0).to_vec(), vec![0.5, 0.5]);
        assert_eq!(vectors.row(1).to_vec(), vec![0.0, 0.0]);

        let distances = content_distances(&catalog, &history, &features).unwrap();
        let row = distances.row_for("alice").unwrap();
        // Monster points the same way as the averaged history
        assert_close(row.distances[2], 0.0);
        let newcomer = distances.row_for("newcomer").unwrap();
        assert!(newcomer.distances.iter().all(|d| (d - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_collaborative_distances_validate_catalog() {
        let catalog = Catalog::new(["Akira", "Paprika"]).unwrap();
        let user_factors = array![[0.3, 0.1]];
        let anime_factors = array![[0.2, 0.2]];

        let result =
            collaborative_distances(&catalog, vec!["alice".to_string()], &user_factors, &anime_factors);
        assert!(result.is_err());
    }

    #[test]
    fn test_rows_to_array() {
        let array = rows_to_array(&[vec![1.0, 2.0], vec![3.0, 4.0]], 2).unwrap();
        assert_eq!(array, array![[1.0, 2.0], [3.0, 4.0]]);
        assert!(rows_to_array(&[vec![1.0]], 2).is_err());
    }
}
