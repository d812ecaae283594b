#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Housing price model: CSV dataset, column preprocessing, ridge regression
//! selected by cross-validated grid search, evaluation and persistence.

/// Versioned model artifact.
pub mod artifact;
/// TOML configuration.
pub mod config;
/// Tables, CSV loading and schema errors.
pub mod dataset;
/// Artifact scoring.
pub mod evaluate;
/// Number formatting.
pub mod format;
/// Regression metrics.
pub mod metrics;
/// Fitted preprocessing plus regressor.
pub mod pipeline;
/// Scaler, encoder and column transform.
pub mod preprocess;
/// Typed single-house input and its bounds.
pub mod record;
/// Closed-form ridge regression.
pub mod ridge;
/// K-fold grid search.
pub mod search;
/// Dataset statistics and histograms.
pub mod summary;
/// Structured logs and pipeline events.
pub mod telemetry;
/// Training job.
pub mod train;

pub use artifact::{ArtifactError, DatasetProvenance, ModelArtifact, FORMAT_VERSION};
pub use config::{ConfigError, PricingConfig};
pub use dataset::{Column, ColumnKind, Dataset, DatasetError, SchemaError, Table};
pub use evaluate::{evaluate, load_artifact, EvaluationReport, Evaluator};
pub use format::{format_currency, format_thousands};
pub use metrics::Metrics;
pub use pipeline::{PricePipeline, TrainingError};
pub use record::{FurnishingStatus, HouseFeatures, InputError, YesNo};
pub use search::{CvResult, GridSearch, KFold, SearchOutcome};
pub use summary::{DatasetSummary, Histogram, NumericSummary};
pub use telemetry::{PricingTelemetry, PricingTelemetryBuilder};
pub use train::{fit_artifact, TrainingPipeline, TrainingSummary};
