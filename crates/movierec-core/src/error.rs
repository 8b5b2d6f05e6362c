use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A structured-literal field could not be parsed. Ingestion recovers from
    /// this locally by treating the field as empty.
    #[error("Malformed field '{field}': {reason}")]
    MalformedField { field: String, reason: String },

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Index {index} out of range for catalog of {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Failed to load catalog from {path}: {reason}")]
    CatalogLoad { path: String, reason: String },

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
