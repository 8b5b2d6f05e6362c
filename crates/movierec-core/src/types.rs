//! Domain types shared by the feature builder, the similarity engine and the
//! serving facade.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub type ItemId = i64;

/// Row position of an item. Shared by the catalog artifact, the feature
/// matrix and the similarity matrix.
pub type ItemIndex = usize;

/// A `{id, name}` record as found in the raw `genres` / `keywords` columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamedTag {
    pub id: i64,
    pub name: String,
}

/// One movie of the catalog, fully parsed.
///
/// - `id`: unique across the catalog
/// - `title`: display string, may repeat
/// - `overview`: free text, empty when the source had none
/// - `categories`/`keywords`: names in source order, without duplicates
/// - `rating`: used for ranking only, never for similarity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub title: String,
    pub overview: String,
    pub categories: Vec<String>,
    pub keywords: Vec<String>,
    pub rating: f32,
}

/// The subset of a [`CatalogItem`] that is persisted for query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: ItemId,
    pub title: String,
    pub categories: Vec<String>,
    pub rating: f32,
}

impl CatalogRecord {
    /// AND semantics: every wanted category must be present.
    pub fn has_all_categories<S: AsRef<str>>(&self, wanted: &[S]) -> bool {
        wanted
            .iter()
            .all(|w| self.categories.iter().any(|c| c == w.as_ref()))
    }
}

impl From<&CatalogItem> for CatalogRecord {
    fn from(item: &CatalogItem) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            categories: item.categories.clone(),
            rating: item.rating,
        }
    }
}

/// Text used for vectorization: overview, category names, keyword names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureDocument(String);

impl FeatureDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl AsRef<str> for FeatureDocument {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Best-first order for ratings and scores. NaN sorts after every number.
pub fn best_first(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

/// A ranked result. `score` is the cosine similarity for neighbor queries and
/// the rating for category/top-rated queries; higher is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub index: ItemIndex,
    pub id: ItemId,
    pub title: String,
    pub score: f32,
}

/// Dense row-major matrix: one row per catalog item (catalog order), one
/// column per vocabulary term.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMatrix {
    n_rows: usize,
    n_cols: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self { n_rows, n_cols, data: vec![0.0; n_rows * n_cols] }
    }

    /// Build from rows that all have `n_cols` entries.
    pub fn from_rows(rows: Vec<Vec<f32>>, n_cols: usize) -> Option<Self> {
        if rows.iter().any(|r| r.len() != n_cols) { return None; }
        let n_rows = rows.len();
        let data = rows.into_iter().flatten().collect();
        Some(Self { n_rows, n_cols, data })
    }

    pub fn n_rows(&self) -> usize { self.n_rows }

    pub fn n_cols(&self) -> usize { self.n_cols }

    pub fn row(&self, i: ItemIndex) -> &[f32] {
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    /// Number of non-zero entries in row `i`.
    pub fn nnz(&self, i: ItemIndex) -> usize {
        self.row(i).iter().filter(|v| **v != 0.0).count()
    }
}
