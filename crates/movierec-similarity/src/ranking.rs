use tracing::debug;

use movierec_core::error::{Error, Result};
use movierec_core::traits::Ranker;
use movierec_core::types::{best_first, CatalogRecord, ItemIndex};

use crate::matrix::SimilarityMatrix;

/// Read-only query structure over the catalog records and their similarity
/// matrix. Row `i` of the matrix belongs to `records[i]`.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    records: Vec<CatalogRecord>,
    matrix: SimilarityMatrix,
}

impl SimilarityIndex {
    pub fn new(records: Vec<CatalogRecord>, matrix: SimilarityMatrix) -> Result<Self> {
        if records.len() != matrix.size() {
            return Err(Error::Artifact(format!(
                "catalog has {} items but similarity matrix is {}x{}",
                records.len(),
                matrix.size(),
                matrix.size()
            )));
        }
        Ok(Self { records, matrix })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn check(&self, index: ItemIndex) -> Result<()> {
        if index >= self.records.len() {
            return Err(Error::IndexOutOfRange { index, len: self.records.len() });
        }
        Ok(())
    }
}

impl Ranker for SimilarityIndex {
    fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    fn similarity(&self, a: ItemIndex, b: ItemIndex) -> Result<f32> {
        self.check(a)?;
        self.check(b)?;
        self.matrix
            .get(a, b)
            .ok_or(Error::IndexOutOfRange { index: a.max(b), len: self.matrix.size() })
    }

    /// Most similar other items first. Equal scores keep catalog order.
    fn nearest_neighbors(&self, index: ItemIndex, k: usize) -> Result<Vec<ItemIndex>> {
        self.check(index)?;
        let row = self
            .matrix
            .row(index)
            .ok_or(Error::IndexOutOfRange { index, len: self.matrix.size() })?;
        let mut candidates: Vec<(ItemIndex, f32)> = row
            .iter()
            .copied()
            .enumerate()
            .filter(|(j, _)| *j != index)
            .collect();
        candidates.sort_by(|a, b| best_first(a.1, b.1));
        Ok(candidates.into_iter().take(k).map(|(j, _)| j).collect())
    }

    /// Items carrying every requested category, best rated first. Equal
    /// ratings keep catalog order. No categories selects nothing.
    fn top_ranked_by_category(&self, categories: &[String], k: usize) -> Vec<ItemIndex> {
        if categories.is_empty() {
            debug!("empty category selection");
            return Vec::new();
        }
        let mut matches: Vec<(ItemIndex, f32)> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.has_all_categories(categories))
            .map(|(i, r)| (i, r.rating))
            .collect();
        matches.sort_by(|a, b| best_first(a.1, b.1));
        matches.into_iter().take(k).map(|(i, _)| i).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, title: &str, categories: &[&str], rating: f32) -> CatalogRecord {
        CatalogRecord {
            id,
            title: title.into(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            rating,
        }
    }

    fn index(records: Vec<CatalogRecord>, sims: Vec<f32>) -> SimilarityIndex {
        let n = records.len();
        let matrix = SimilarityMatrix::from_parts(n, sims).expect("square");
        SimilarityIndex::new(records, matrix).expect("aligned")
    }

    fn abc() -> SimilarityIndex {
        index(
            vec![
                record(1, "A", &["Action"], 8.0),
                record(2, "B", &["Action", "Drama"], 6.0),
                record(3, "C", &["Drama"], 9.0),
            ],
            vec![1.0, 0.5, 0.2, 0.5, 1.0, 0.5, 0.2, 0.5, 1.0],
        )
    }

    fn titles(idx: &SimilarityIndex, picks: &[ItemIndex]) -> Vec<String> {
        picks.iter().map(|i| idx.records()[*i].title.clone()).collect()
    }

    #[test]
    fn drama_is_ranked_by_rating() {
        let idx = abc();
        let picks = idx.top_ranked_by_category(&["Drama".to_string()], 10);
        assert_eq!(titles(&idx, &picks), vec!["C", "B"]);
    }

    #[test]
    fn categories_use_and_semantics() {
        let idx = abc();
        let picks = idx.top_ranked_by_category(&["Action".to_string(), "Drama".to_string()], 10);
        assert_eq!(titles(&idx, &picks), vec!["B"]);
    }

    #[test]
    fn empty_selection_returns_nothing() {
        assert!(abc().top_ranked_by_category(&[], 10).is_empty());
    }

    #[test]
    fn rating_ties_keep_catalog_order() {
        let idx = index(
            vec![record(1, "X", &["War"], 7.0), record(2, "Y", &["War"], 7.0)],
            vec![1.0, 0.0, 0.0, 1.0],
        );
        assert_eq!(idx.top_ranked_by_category(&["War".to_string()], 10), vec![0, 1]);
    }

    #[test]
    fn unrated_nan_items_rank_last() {
        let idx = index(
            vec![
                record(1, "Unknown", &["War"], f32::NAN),
                record(2, "Low", &["War"], 2.0),
                record(3, "High", &["War"], 8.0),
            ],
            vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        );
        let picks = idx.top_ranked_by_category(&["War".to_string()], 10);
        assert_eq!(titles(&idx, &picks), vec!["High", "Low", "Unknown"]);
    }

    #[test]
    fn neighbors_exclude_self_and_break_ties_by_position() {
        let idx = abc();
        assert_eq!(idx.nearest_neighbors(1, 10).expect("neighbors"), vec![0, 2]);
        assert_eq!(idx.nearest_neighbors(0, 1).expect("neighbors"), vec![1]);
    }

    #[test]
    fn neighbors_of_out_of_range_index_fail() {
        assert!(matches!(
            abc().nearest_neighbors(3, 5),
            Err(Error::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn mismatched_sizes_are_rejected() {
        let matrix = SimilarityMatrix::from_parts(1, vec![1.0]).expect("square");
        assert!(SimilarityIndex::new(vec![], matrix).is_err());
    }
}
