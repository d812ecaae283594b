//! Versioned JSON envelope around a fitted [`PricePipeline`].

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    dataset::{Dataset, SchemaError, Table},
    pipeline::PricePipeline,
    search::{CvResult, SearchOutcome},
};

/// Current artifact layout.
pub const FORMAT_VERSION: u32 = 1;

/// Where the training rows came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetProvenance {
    /// CSV file, when training read one from disk.
    pub path: Option<PathBuf>,
    /// Training rows.
    pub rows: usize,
    /// Target column.
    pub target: String,
}

impl DatasetProvenance {
    /// Describes `dataset`.
    #[must_use]
    pub fn of(dataset: &Dataset) -> Self {
        Self {
            path: dataset.source.clone(),
            rows: dataset.len(),
            target: dataset.target_name.clone(),
        }
    }

    /// True when `dataset` was read from the same file that trained the model.
    #[must_use]
    pub fn matches(&self, dataset: &Dataset) -> bool {
        match (&self.path, &dataset.source) {
            (Some(trained), Some(source)) => same_file(trained, source),
            _ => false,
        }
    }
}

fn same_file(left: &Path, right: &Path) -> bool {
    match (fs::canonicalize(left), fs::canonicalize(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => left == right,
    }
}

/// Serialized model plus training metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Layout version, checked on load.
    pub format_version: u32,
    /// Version of the crate that wrote the file.
    pub crate_version: String,
    /// Write time.
    pub created_at: DateTime<Utc>,
    /// Training data description.
    pub dataset: DatasetProvenance,
    /// Selected penalty.
    pub best_alpha: f64,
    /// Mean validation RMSE of the selected penalty.
    pub best_cv_rmse: f64,
    /// Full grid search table.
    pub cv_results: Vec<CvResult>,
    /// Fitted pipeline.
    pub pipeline: PricePipeline,
}

impl ModelArtifact {
    /// Wraps a grid search outcome.
    #[must_use]
    pub fn from_search(outcome: SearchOutcome, dataset: &Dataset) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            dataset: DatasetProvenance::of(dataset),
            best_alpha: outcome.best_alpha,
            best_cv_rmse: outcome.best_cv_rmse,
            cv_results: outcome.results,
            pipeline: outcome.pipeline,
        }
    }

    /// Writes pretty JSON to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let io_err = |source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(io_err)
    }

    /// Reads an artifact, rejecting unknown layouts.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parses an artifact from JSON text.
    pub fn from_json(raw: &str) -> Result<Self, ArtifactError> {
        #[derive(Deserialize)]
        struct Header {
            format_version: u32,
        }

        let header: Header = serde_json::from_str(raw)?;
        if header.format_version != FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                found: header.format_version,
                supported: FORMAT_VERSION,
            });
        }
        Ok(serde_json::from_str(raw)?)
    }

    /// True when the writing crate version differs from this one.
    #[must_use]
    pub fn version_skew(&self) -> bool {
        self.crate_version != env!("CARGO_PKG_VERSION")
    }

    /// Predicts one price per row.
    pub fn predict(&self, features: &Table) -> Result<Vec<f64>, SchemaError> {
        self.pipeline.predict(features)
    }
}

/// Errors raised while persisting or reading artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// File could not be read or written.
    #[error("artifact {path:?}: {source}")]
    Io {
        /// Artifact path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Malformed JSON.
    #[error("artifact json: {0}")]
    Json(#[from] serde_json::Error),
    /// Written by an incompatible layout.
    #[error("artifact format version {found} is not supported (expected {supported})")]
    UnsupportedVersion {
        /// Version in the file.
        found: u32,
        /// Version this build reads.
        supported: u32,
    },
}
