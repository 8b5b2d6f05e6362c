use crate::error::Result;
use crate::types::{CatalogRecord, FeatureDocument, FeatureMatrix, ItemIndex};

/// Learns a vocabulary from a document collection and maps every document
/// onto it.
pub trait Vectorizer: Send + Sync {
    fn fit_transform(&mut self, documents: &[FeatureDocument]) -> FeatureMatrix;
    fn vocabulary_size(&self) -> usize;
}

/// Read-only ranking over a persisted catalog.
pub trait Ranker: Send + Sync {
    fn records(&self) -> &[CatalogRecord];
    fn similarity(&self, a: ItemIndex, b: ItemIndex) -> Result<f32>;
    fn nearest_neighbors(&self, index: ItemIndex, k: usize) -> Result<Vec<ItemIndex>>;
    fn top_ranked_by_category(&self, categories: &[String], k: usize) -> Vec<ItemIndex>;
}
