//! TF-IDF vectorizer.
//!
//! Vocabulary is the `max_features` terms with the highest total count over the
//! corpus (ties go to the alphabetically smaller term); columns are then laid
//! out in alphabetical order. Weights are raw counts times the smoothed idf
//! `ln((1 + n) / (1 + df)) + 1`, and every non-zero row is scaled to unit L2
//! norm. Documents without any vocabulary term stay all-zero.

use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use movierec_core::config::{FeatureSettings, StopWords};
use movierec_core::error::Result;
use movierec_core::traits::Vectorizer;
use movierec_core::types::{FeatureDocument, FeatureMatrix};

use crate::tokenize::Tokenizer;

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    tokenizer: Tokenizer,
    max_features: usize,
    vocabulary: Vec<String>,
    columns: HashMap<String, usize>,
    idf: Vec<f32>,
}

#[derive(Default)]
struct TermStats {
    total: u64,
    df: usize,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize, stop_words: StopWords) -> Result<Self> {
        Ok(Self {
            tokenizer: Tokenizer::new(stop_words)?,
            max_features,
            vocabulary: Vec::new(),
            columns: HashMap::new(),
            idf: Vec::new(),
        })
    }

    pub fn from_settings(settings: &FeatureSettings) -> Result<Self> {
        Self::new(settings.max_features, settings.stop_words)
    }

    /// Learned terms in column order.
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Inverse document frequency per column.
    pub fn idf(&self) -> &[f32] {
        &self.idf
    }

    pub fn column_of(&self, term: &str) -> Option<usize> {
        self.columns.get(term).copied()
    }

    pub fn fit(&mut self, documents: &[FeatureDocument]) {
        let tokens = self.tokenize_all(documents);
        self.fit_tokens(&tokens);
    }

    /// Weight documents against the learned vocabulary. Unknown terms are dropped.
    pub fn transform(&self, documents: &[FeatureDocument]) -> FeatureMatrix {
        let tokens = self.tokenize_all(documents);
        self.transform_tokens(&tokens)
    }

    fn tokenize_all(&self, documents: &[FeatureDocument]) -> Vec<Vec<String>> {
        documents
            .par_iter()
            .map(|d| self.tokenizer.tokenize(d.as_str()))
            .collect()
    }

    fn fit_tokens(&mut self, tokens: &[Vec<String>]) {
        let mut stats: HashMap<&str, TermStats> = HashMap::new();
        for doc in tokens {
            let mut local: HashMap<&str, u64> = HashMap::new();
            for t in doc {
                *local.entry(t.as_str()).or_default() += 1;
            }
            for (term, count) in local {
                let s = stats.entry(term).or_default();
                s.total += count;
                s.df += 1;
            }
        }

        let mut ranked: Vec<(&str, TermStats)> = stats.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total.cmp(&a.1.total).then_with(|| a.0.cmp(b.0)));
        let distinct = ranked.len();
        ranked.truncate(self.max_features);
        ranked.sort_by(|a, b| a.0.cmp(b.0));

        let n = tokens.len() as f64;
        self.vocabulary = ranked.iter().map(|(t, _)| t.to_string()).collect();
        self.idf = ranked
            .iter()
            .map(|(_, s)| (((1.0 + n) / (1.0 + s.df as f64)).ln() + 1.0) as f32)
            .collect();
        self.columns = self
            .vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        if self.vocabulary.is_empty() {
            warn!(documents = tokens.len(), "no vocabulary terms found, every row will be zero");
        }
        info!(
            documents = tokens.len(),
            distinct_terms = distinct,
            vocabulary = self.vocabulary.len(),
            "vocabulary learned"
        );
    }

    fn transform_tokens(&self, tokens: &[Vec<String>]) -> FeatureMatrix {
        let width = self.vocabulary.len();
        let rows: Vec<Vec<f32>> = tokens
            .par_iter()
            .map(|doc| self.weigh(doc, width))
            .collect();
        let zero_rows = rows.iter().filter(|r| r.iter().all(|v| *v == 0.0)).count();
        debug!(rows = rows.len(), zero_rows, "documents weighted");
        FeatureMatrix::from_rows(rows, width).unwrap_or_else(|| FeatureMatrix::zeros(tokens.len(), width))
    }

    fn weigh(&self, doc: &[String], width: usize) -> Vec<f32> {
        let mut counts = vec![0.0f64; width];
        for t in doc {
            if let Some(&col) = self.columns.get(t) {
                counts[col] += 1.0;
            }
        }
        for (c, idf) in counts.iter_mut().zip(&self.idf) {
            *c *= f64::from(*idf);
        }
        let norm = counts.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            counts.iter().map(|v| (v / norm) as f32).collect()
        } else {
            vec![0.0; width]
        }
    }
}

impl Vectorizer for TfidfVectorizer {
    fn fit_transform(&mut self, documents: &[FeatureDocument]) -> FeatureMatrix {
        let tokens = self.tokenize_all(documents);
        self.fit_tokens(&tokens);
        self.transform_tokens(&tokens)
    }

    fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<FeatureDocument> {
        texts.iter().map(|t| FeatureDocument::new(*t)).collect()
    }

    #[test]
    fn vocabulary_is_alphabetical() {
        let mut v = TfidfVectorizer::new(10, StopWords::English).expect("vectorizer");
        v.fit(&docs(&["zebra apple", "mango apple"]));
        assert_eq!(v.vocabulary(), &["apple", "mango", "zebra"]);
    }

    #[test]
    fn max_features_keeps_most_frequent_terms() {
        let mut v = TfidfVectorizer::new(2, StopWords::None).expect("vectorizer");
        v.fit(&docs(&["alien alien ship", "alien ship crew", "bb"]));
        assert_eq!(v.vocabulary(), &["alien", "ship"]);
    }

    #[test]
    fn frequency_ties_prefer_smaller_term() {
        let mut v = TfidfVectorizer::new(1, StopWords::None).expect("vectorizer");
        v.fit(&docs(&["space heist"]));
        assert_eq!(v.vocabulary(), &["heist"]);
    }

    #[test]
    fn idf_uses_smoothing() {
        let mut v = TfidfVectorizer::new(10, StopWords::None).expect("vectorizer");
        v.fit(&docs(&["robot", "robot", "robot love"]));
        let robot = v.column_of("robot").expect("robot");
        let love = v.column_of("love").expect("love");
        assert!((v.idf()[robot] - 1.0).abs() < 1e-6);
        let expected = ((4.0f64 / 2.0).ln() + 1.0) as f32;
        assert!((v.idf()[love] - expected).abs() < 1e-6);
    }

    #[test]
    fn rows_are_unit_length_or_zero() {
        let mut v = TfidfVectorizer::new(10, StopWords::English).expect("vectorizer");
        let m = v.fit_transform(&docs(&["spy thriller spy", "", "the and of"]));
        let norm: f32 = m.row(0).iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(m.row(1).iter().all(|x| *x == 0.0));
        assert!(m.row(2).iter().all(|x| *x == 0.0));
        assert_eq!(m.n_rows(), 3);
    }

    #[test]
    fn transform_drops_unknown_terms() {
        let mut v = TfidfVectorizer::new(10, StopWords::None).expect("vectorizer");
        v.fit(&docs(&["pirate ship"]));
        let m = v.transform(&docs(&["dragon"]));
        assert_eq!(m.n_cols(), 2);
        assert_eq!(m.nnz(0), 0);
    }
}
