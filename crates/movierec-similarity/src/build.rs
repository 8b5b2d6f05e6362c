//! Offline build: raw CSV to catalog and similarity artifacts.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use movierec_core::catalog::{build_documents, CatalogLoader};
use movierec_core::config::FeatureSettings;
use movierec_core::traits::Vectorizer;
use movierec_core::types::CatalogRecord;
use movierec_text::TfidfVectorizer;

use crate::artifacts::{save_pair, ArtifactPaths};
use crate::matrix::SimilarityMatrix;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub items: usize,
    pub rows_skipped: usize,
    pub duplicate_ids: usize,
    pub malformed_fields: usize,
    pub blank_documents: usize,
    pub vocabulary_size: usize,
    /// Shared by both artifacts of this build.
    pub build_id: u64,
    pub paths: ArtifactPaths,
}

/// Ingest `catalog_csv`, vectorize, compute similarities and persist both
/// artifacts. A missing or unreadable CSV fails the whole build.
pub fn build_artifacts(catalog_csv: &Path, paths: &ArtifactPaths, features: &FeatureSettings) -> Result<BuildReport> {
    let started = Instant::now();
    let catalog = CatalogLoader::load_csv(catalog_csv)
        .with_context(|| format!("loading raw catalog {}", catalog_csv.display()))?;

    let documents = build_documents(&catalog.items);
    let blank_documents = documents.iter().filter(|d| d.is_blank()).count();

    let mut vectorizer = TfidfVectorizer::from_settings(features)?;
    let feature_matrix = vectorizer.fit_transform(&documents);
    let similarity = SimilarityMatrix::compute(&feature_matrix);

    let records: Vec<CatalogRecord> = catalog.items.iter().map(CatalogRecord::from).collect();
    let build_id = save_pair(paths, &records, &similarity).with_context(|| {
        format!("writing {} and {}", paths.catalog.display(), paths.similarity.display())
    })?;

    let report = BuildReport {
        items: records.len(),
        rows_skipped: catalog.report.rows_skipped,
        duplicate_ids: catalog.report.duplicate_ids,
        malformed_fields: catalog.report.malformed_fields,
        blank_documents,
        vocabulary_size: vectorizer.vocabulary_size(),
        build_id,
        paths: paths.clone(),
    };
    info!(
        items = report.items,
        vocabulary = report.vocabulary_size,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "build finished"
    );
    Ok(report)
}
