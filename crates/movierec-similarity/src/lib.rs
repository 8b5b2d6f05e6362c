//! movierec-similarity
//!
//! Pairwise cosine similarity over the feature matrix, neighbor and category
//! ranking, the persisted artifacts, and the offline build pipeline.
pub mod artifacts;
pub mod build;
pub mod matrix;
pub mod ranking;

pub use artifacts::ArtifactPaths;
pub use build::{build_artifacts, BuildReport};
pub use matrix::SimilarityMatrix;
pub use ranking::SimilarityIndex;
