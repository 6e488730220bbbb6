use std::collections::HashMap;

use super::AnimeTitle;
use crate::error::{AppError, AppResult};

/// Fixed, ordered list of anime titles
///
/// The position of a title in the catalog is the column index of that title in
/// every distance matrix built against it. A catalog is immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    titles: Vec<AnimeTitle>,
    positions: HashMap<AnimeTitle, usize>,
}

impl Catalog {
    /// Builds a catalog, rejecting duplicate titles
    pub fn new<I, T>(titles: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<AnimeTitle>,
    {
        let titles: Vec<AnimeTitle> = titles.into_iter().map(Into::into).collect();
        let mut positions = HashMap::with_capacity(titles.len());

        for (idx, title) in titles.iter().enumerate() {
            if positions.insert(title.clone(), idx).is_some() {
                return Err(AppError::InvalidInput(format!(
                    "Duplicate catalog title: {}",
                    title
                )));
            }
        }

        Ok(Self { titles, positions })
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Title at a column index
    pub fn title(&self, idx: usize) -> Option<&AnimeTitle> {
        self.titles.get(idx)
    }

    /// Column index of a title
    pub fn position(&self, title: &str) -> Option<usize> {
        self.positions.get(title).copied()
    }

    pub fn contains(&self, title: &str) -> bool {
        self.positions.contains_key(title)
    }

    pub fn titles(&self) -> &[AnimeTitle] {
        &self.titles
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnimeTitle> {
        self.titles.iter()
    }
}
