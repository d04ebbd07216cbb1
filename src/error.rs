use std::path::PathBuf;
use thiserror::Error;

use crate::dataset::RequiredArtifact;

/// The main error type for dataset preparation and checkpoint loading.
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("Failed to fetch {url}: {message}")]
    Network { url: String, message: String },

    #[error("Failed to extract archive {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid archive URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Checkpoint not found: {path}")]
    CheckpointNotFound { path: PathBuf },

    #[error("Failed to deserialize checkpoint {path}: {message}")]
    Deserialization { path: PathBuf, message: String },

    #[error("Dataset layout incomplete: {} artifact(s) missing", missing.len())]
    IncompleteLayout { missing: Vec<RequiredArtifact> },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

impl PrepError {
    /// Wrap an I/O error with the path it happened at.
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PrepError::Filesystem {
            path: path.into(),
            source,
        }
    }
}
