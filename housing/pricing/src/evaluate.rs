//! Evaluation entry point: score a saved artifact against a dataset.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_event_bus::topics;
use shared_logging::LogLevel;

use crate::{
    artifact::ModelArtifact,
    config::PricingConfig,
    dataset::Dataset,
    metrics::Metrics,
    telemetry::{self, PricingTelemetry},
};

/// Fit quality of an artifact on a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Rows scored.
    pub rows: usize,
    /// RMSE, MSE, MAE and R².
    pub metrics: Metrics,
    /// Cross-validated RMSE recorded at training time.
    pub cv_rmse: f64,
    /// Scored rows are the rows the model was trained on.
    pub in_sample: bool,
}

impl EvaluationReport {
    /// Root mean squared error.
    #[must_use]
    pub const fn rmse(&self) -> f64 {
        self.metrics.rmse
    }

    /// Coefficient of determination.
    #[must_use]
    pub const fn r2(&self) -> f64 {
        self.metrics.r2
    }
}

/// Scores every row of `dataset` with `artifact`.
pub fn evaluate(artifact: &ModelArtifact, dataset: &Dataset) -> Result<EvaluationReport> {
    let predicted = artifact
        .predict(&dataset.features)
        .context("dataset does not match the model's training schema")?;
    Ok(EvaluationReport {
        rows: dataset.len(),
        metrics: Metrics::compute(&dataset.target, &predicted),
        cv_rmse: artifact.best_cv_rmse,
        in_sample: artifact.dataset.matches(dataset),
    })
}

/// Artifact-plus-dataset evaluation job.
#[derive(Debug, Clone)]
pub struct Evaluator {
    dataset: PathBuf,
    artifact: PathBuf,
    target: String,
}

impl Evaluator {
    /// Job using the configured dataset and artifact.
    #[must_use]
    pub fn new(config: &PricingConfig) -> Self {
        Self {
            dataset: config.paths.dataset.clone(),
            artifact: config.paths.artifact.clone(),
            target: config.training.target.clone(),
        }
    }

    /// Overrides the dataset path.
    #[must_use]
    pub fn with_dataset(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset = path.into();
        self
    }

    /// Overrides the artifact path.
    #[must_use]
    pub fn with_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact = path.into();
        self
    }

    /// Artifact the job reads.
    #[must_use]
    pub fn artifact_path(&self) -> &Path {
        &self.artifact
    }

    /// Runs the job without telemetry.
    pub fn run(&self) -> Result<EvaluationReport> {
        self.run_with_telemetry(None)
    }

    /// Runs the job, logging the report and emitting an event.
    pub fn run_with_telemetry(
        &self,
        telemetry: Option<&PricingTelemetry>,
    ) -> Result<EvaluationReport> {
        let artifact = load_artifact(&self.artifact, telemetry)?;
        let dataset = Dataset::load(&self.dataset, &self.target)
            .with_context(|| format!("loading dataset {}", self.dataset.display()))?;
        let report = evaluate(&artifact, &dataset)?;
        if report.in_sample {
            telemetry::log(
                telemetry,
                LogLevel::Warn,
                "evaluation.in_sample",
                json!({
                    "dataset": self.dataset,
                    "cv_rmse": report.cv_rmse,
                }),
            );
        }
        let payload = json!({
            "dataset": self.dataset,
            "artifact": self.artifact,
            "report": report,
        });
        telemetry::log(telemetry, LogLevel::Info, "evaluation.completed", payload.clone());
        telemetry::event(telemetry, topics::EVALUATION_COMPLETED, payload);
        Ok(report)
    }
}

/// Loads an artifact, warning when it was written by another crate version.
pub fn load_artifact(
    path: &Path,
    telemetry: Option<&PricingTelemetry>,
) -> Result<ModelArtifact> {
    let artifact = ModelArtifact::load(path)
        .with_context(|| format!("loading artifact {}", path.display()))?;
    if artifact.version_skew() {
        telemetry::log(
            telemetry,
            LogLevel::Warn,
            "artifact.version_skew",
            json!({
                "path": path,
                "written_by": artifact.crate_version,
                "running": env!("CARGO_PKG_VERSION"),
            }),
        );
    }
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::TrainingPipeline;
    use tempfile::tempdir;

    fn trained_config(dir: &Path) -> PricingConfig {
        let mut config = PricingConfig::default();
        config.paths.dataset =
            Path::new(env!("CARGO_MANIFEST_DIR")).join("dataset/Housing.csv");
        config.paths.artifact = dir.join("model.json");
        TrainingPipeline::new(&config).run().unwrap();
        config
    }

    #[test]
    fn shipped_model_explains_most_variance() {
        let dir = tempdir().unwrap();
        let config = trained_config(dir.path());
        let report = Evaluator::new(&config).run().unwrap();
        assert_eq!(report.rows, 545);
        assert!(report.r2() > 0.5, "r2 = {}", report.r2());
        assert!(report.rmse() > 0.0);
        assert!(report.in_sample);
        assert!(report.cv_rmse > 0.0);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let dir = tempdir().unwrap();
        let config = trained_config(dir.path());
        let evaluator = Evaluator::new(&config);
        let first = evaluator.run().unwrap();
        let second = evaluator.run().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn other_dataset_is_out_of_sample() {
        let dir = tempdir().unwrap();
        let config = trained_config(dir.path());
        let copy = dir.path().join("copy.csv");
        std::fs::copy(&config.paths.dataset, &copy).unwrap();
        let evaluator = Evaluator::new(&config).with_dataset(&copy);
        assert_eq!(evaluator.artifact_path(), config.paths.artifact);
        let report = evaluator.run().unwrap();
        assert!(!report.in_sample);
    }

    #[test]
    fn missing_artifact_fails() {
        let dir = tempdir().unwrap();
        let mut config = PricingConfig::default();
        config.paths.artifact = dir.path().join("absent.json");
        let err = Evaluator::new(&config).run().unwrap_err();
        assert!(format!("{err:#}").contains("absent.json"));
    }
}
