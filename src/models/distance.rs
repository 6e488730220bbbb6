use ndarray::{Array2, ArrayView1};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use super::Catalog;
use crate::error::{AppError, AppResult};

/// Dense users × anime matrix of cosine distances
///
/// Rows are addressed by user id, columns follow the catalog order the matrix
/// was validated against. Lower values mean more similar.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    users: Vec<String>,
    user_rows: HashMap<String, usize>,
    distances: Array2<f64>,
}

/// Borrowed view of one user's distances
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    pub user_id: &'a str,
    pub distances: ArrayView1<'a, f64>,
}

impl DistanceMatrix {
    /// Wraps a matrix after checking its shape against the catalog, its user
    /// index for duplicates, and every value for being finite and non-negative
    pub fn new(catalog: &Catalog, users: Vec<String>, distances: Array2<f64>) -> AppResult<Self> {
        let (rows, cols) = distances.dim();

        if rows != users.len() {
            return Err(AppError::InvalidInput(format!(
                "Distance matrix has {} rows for {} users",
                rows,
                users.len()
            )));
        }

        if cols != catalog.len() {
            return Err(AppError::InvalidInput(format!(
                "Distance matrix has {} columns for a catalog of {} titles",
                cols,
                catalog.len()
            )));
        }

        if let Some(bad) = distances.iter().find(|d| !d.is_finite() || **d < 0.0) {
            return Err(AppError::InvalidInput(format!(
                "Distance matrix contains invalid distance {}",
                bad
            )));
        }

        let mut user_rows = HashMap::with_capacity(users.len());
        for (idx, user_id) in users.iter().enumerate() {
            if user_rows.insert(user_id.clone(), idx).is_some() {
                return Err(AppError::InvalidInput(format!(
                    "Duplicate user in distance matrix: {}",
                    user_id
                )));
            }
        }

        Ok(Self {
            users,
            user_rows,
            distances,
        })
    }

    /// Builds a matrix from row vectors (one per user)
    pub fn from_rows(catalog: &Catalog, users: Vec<String>, rows: Vec<Vec<f64>>) -> AppResult<Self> {
        let n_rows = rows.len();
        if let Some(row) = rows.iter().find(|r| r.len() != catalog.len()) {
            return Err(AppError::InvalidInput(format!(
                "Distance row has {} values for a catalog of {} titles",
                row.len(),
                catalog.len()
            )));
        }

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let distances = Array2::from_shape_vec((n_rows, catalog.len()), flat)
            .map_err(|e| AppError::InvalidInput(format!("Invalid distance matrix shape: {}", e)))?;

        Self::new(catalog, users, distances)
    }

    /// Resolves a user id to its row
    pub fn row_for(&self, user_id: &str) -> AppResult<RowView<'_>> {
        let idx = self
            .user_rows
            .get(user_id)
            .copied()
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;

        Ok(RowView {
            user_id: &self.users[idx],
            distances: self.distances.row(idx),
        })
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    pub fn n_titles(&self) -> usize {
        self.distances.ncols()
    }
}

impl Hash for DistanceMatrix {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.users.hash(state);
        self.distances.dim().hash(state);
        for value in self.distances.iter() {
            value.to_bits().hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn catalog() -> Catalog {
        Catalog::new(["Akira", "Paprika", "Perfect Blue"]).unwrap()
    }

    #[test]
    fn test_row_for_known_user() {
        let matrix = DistanceMatrix::new(
            &catalog(),
            vec!["alice".to_string(), "bob".to_string()],
            array![[0.1, 0.5, 0.3], [0.9, 0.0, 0.2]],
        )
        .unwrap();

        let row = matrix.row_for("bob").unwrap();
        assert_eq!(row.user_id, "bob");
        assert_eq!(row.distances.to_vec(), vec![0.9, 0.0, 0.2]);
    }

    #[test]
    fn test_row_for_unknown_user() {
        let matrix =
            DistanceMatrix::from_rows(&catalog(), vec!["alice".to_string()], vec![vec![0.1, 0.2, 0.3]])
                .unwrap();

        let err = matrix.row_for("mallory").unwrap_err();
        assert!(matches!(err, AppError::UserNotFound(ref id) if id == "mallory"));
    }

    #[test]
    fn test_rejects_column_mismatch() {
        let result =
            DistanceMatrix::from_rows(&catalog(), vec!["alice".to_string()], vec![vec![0.1, 0.2]]);
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_row_count_mismatch() {
        let result = DistanceMatrix::new(&catalog(), vec![], array![[0.1, 0.2, 0.3]]);
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_duplicate_users() {
        let result = DistanceMatrix::from_rows(
            &catalog(),
            vec!["alice".to_string(), "alice".to_string()],
            vec![vec![0.1, 0.2, 0.3], vec![0.3, 0.2, 0.1]],
        );
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_negative_and_nan_distances() {
        let negative = DistanceMatrix::from_rows(
            &catalog(),
            vec!["alice".to_string()],
            vec![vec![0.1, -0.2, 0.3]],
        );
        assert!(negative.is_err());

        let nan = DistanceMatrix::from_rows(
            &catalog(),
            vec!["alice".to_string()],
            vec![vec![0.1, f64::NAN, 0.3]],
        );
        assert!(nan.is_err());
    }
}
