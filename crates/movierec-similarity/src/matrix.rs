use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use movierec_core::types::{FeatureMatrix, ItemIndex};

/// Dense square matrix of pairwise cosine similarities, row-major, indexed
/// by catalog position.
///
/// Exactly symmetric, values in `[0, 1]`, and the diagonal is always `1.0`,
/// including rows whose feature vector is all zero. A zero row is `0.0`
/// against every other row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    n: usize,
    data: Vec<f32>,
}

/// Non-zero entries of a row as `(column, value)`, columns ascending.
type SparseRow = Vec<(u32, f64)>;

impl SimilarityMatrix {
    /// Validate a raw buffer of `n * n` values.
    pub fn from_parts(n: usize, data: Vec<f32>) -> Option<Self> {
        (n.checked_mul(n)? == data.len()).then_some(Self { n, data })
    }

    pub fn compute(features: &FeatureMatrix) -> Self {
        let n = features.n_rows();
        let rows: Vec<SparseRow> = features.rows().map(sparse_unit_row).collect();

        let pb = ProgressBar::new(n as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows ({percent}%)")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        // Row i holds the similarities for columns i+1..n.
        let upper: Vec<Vec<f32>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let out = ((i + 1)..n).map(|j| cosine(&rows[i], &rows[j])).collect();
                pb.inc(1);
                out
            })
            .collect();
        pb.finish_and_clear();

        let mut data = vec![0.0f32; n * n];
        for (i, tail) in upper.iter().enumerate() {
            data[i * n + i] = 1.0;
            for (offset, &v) in tail.iter().enumerate() {
                let j = i + 1 + offset;
                data[i * n + j] = v;
                data[j * n + i] = v;
            }
        }
        info!(items = n, "similarity matrix computed");
        Self { n, data }
    }

    /// Number of items along each side.
    pub fn size(&self) -> usize {
        self.n
    }

    pub fn get(&self, a: ItemIndex, b: ItemIndex) -> Option<f32> {
        if a >= self.n || b >= self.n {
            return None;
        }
        Some(self.data[a * self.n + b])
    }

    pub fn row(&self, a: ItemIndex) -> Option<&[f32]> {
        (a < self.n).then(|| &self.data[a * self.n..(a + 1) * self.n])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

fn sparse_unit_row(row: &[f32]) -> SparseRow {
    let norm = row.iter().map(|v| f64::from(*v) * f64::from(*v)).sum::<f64>().sqrt();
    if norm == 0.0 {
        return Vec::new();
    }
    row.iter()
        .enumerate()
        .filter(|(_, v)| **v != 0.0)
        .map(|(c, v)| (c as u32, f64::from(*v) / norm))
        .collect()
}

fn cosine(a: &SparseRow, b: &SparseRow) -> f32 {
    let (mut i, mut j, mut dot) = (0, 0, 0.0f64);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot.clamp(0.0, 1.0) as f32
}
