//! Query facade used by the serving layer.
//!
//! Titles are resolved first-match: when several catalog rows share a title,
//! the earliest one wins.

use std::collections::BTreeSet;
use tracing::debug;

use movierec_core::config::DEFAULT_RECOMMENDATION_LIMIT;
use movierec_core::error::{Error, Result};
use movierec_core::traits::Ranker;
use movierec_core::types::{best_first, ItemIndex, Recommendation};
use movierec_similarity::artifacts::{load_pair, ArtifactPaths};
use movierec_similarity::SimilarityIndex;

pub struct Recommender<R: Ranker> {
    ranker: R,
    limit: usize,
}

impl Recommender<SimilarityIndex> {
    /// Load both artifacts and serve from them.
    pub fn open(paths: &ArtifactPaths, limit: usize) -> Result<Self> {
        let (records, matrix) = load_pair(paths)?;
        Ok(Self::new(SimilarityIndex::new(records, matrix)?, limit))
    }
}

impl<R: Ranker> Recommender<R> {
    pub fn new(ranker: R, limit: usize) -> Self {
        let limit = if limit == 0 { DEFAULT_RECOMMENDATION_LIMIT } else { limit };
        Self { ranker, limit }
    }

    pub fn limit(&self) -> usize { self.limit }

    pub fn resolve_title(&self, title: &str) -> Result<ItemIndex> {
        self.ranker
            .records()
            .iter()
            .position(|r| r.title == title)
            .ok_or_else(|| Error::ItemNotFound(title.to_string()))
    }

    /// Up to `limit` titles most similar to `title`.
    pub fn recommend_similar_to_title(&self, title: &str) -> Result<Vec<String>> {
        Ok(self.similar_to_title(title, self.limit)?.into_iter().map(|r| r.title).collect())
    }

    /// Up to `limit` best rated titles having every category in `categories`.
    pub fn recommend_by_categories<S: AsRef<str>>(&self, categories: &[S]) -> Vec<String> {
        self.by_categories(categories, self.limit).into_iter().map(|r| r.title).collect()
    }

    pub fn similar_to_title(&self, title: &str, k: usize) -> Result<Vec<Recommendation>> {
        let index = self.resolve_title(title)?;
        debug!(title, index, "resolved title");
        self.ranker
            .nearest_neighbors(index, k)?
            .into_iter()
            .map(|j| Ok(self.recommendation(j, self.ranker.similarity(index, j)?)))
            .collect()
    }

    pub fn by_categories<S: AsRef<str>>(&self, categories: &[S], k: usize) -> Vec<Recommendation> {
        let wanted: Vec<String> = categories.iter().map(|c| c.as_ref().to_string()).collect();
        self.ranker
            .top_ranked_by_category(&wanted, k)
            .into_iter()
            .map(|i| self.recommendation(i, self.ranker.records()[i].rating))
            .collect()
    }

    /// Best rated titles over the whole catalog, catalog order on ties.
    pub fn top_rated(&self, k: usize) -> Vec<Recommendation> {
        let mut order: Vec<ItemIndex> = (0..self.ranker.records().len()).collect();
        let records = self.ranker.records();
        order.sort_by(|a, b| best_first(records[*a].rating, records[*b].rating));
        order.into_iter().take(k).map(|i| self.recommendation(i, records[i].rating)).collect()
    }

    /// Every category present in the catalog, sorted.
    pub fn all_categories(&self) -> Vec<String> {
        self.ranker
            .records()
            .iter()
            .flat_map(|r| r.categories.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn recommendation(&self, index: ItemIndex, score: f32) -> Recommendation {
        let r = &self.ranker.records()[index];
        Recommendation { index, id: r.id, title: r.title.clone(), score }
    }
}
