//! Training entry point: load, search, refit, persist.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use shared_event_bus::topics;
use shared_logging::LogLevel;

use crate::{
    artifact::ModelArtifact,
    config::{PricingConfig, TrainingConfig},
    dataset::Dataset,
    search::{CvResult, GridSearch},
    telemetry::{self, PricingTelemetry},
};

/// What a training run produced.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    /// Selected penalty.
    pub best_alpha: f64,
    /// Mean validation RMSE of the selected penalty.
    pub best_cv_rmse: f64,
    /// Grid search table.
    pub results: Vec<CvResult>,
    /// Training rows.
    pub rows: usize,
    /// Where the artifact was written.
    pub artifact_path: PathBuf,
}

/// Dataset-to-artifact training job.
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    dataset: PathBuf,
    artifact: PathBuf,
    training: TrainingConfig,
}

impl TrainingPipeline {
    /// Job using the configured dataset, artifact and search settings.
    #[must_use]
    pub fn new(config: &PricingConfig) -> Self {
        Self {
            dataset: config.paths.dataset.clone(),
            artifact: config.paths.artifact.clone(),
            training: config.training.clone(),
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

    /// Dataset the job reads.
    #[must_use]
    pub fn dataset_path(&self) -> &Path {
        &self.dataset
    }

    /// Artifact the job writes.
    #[must_use]
    pub fn artifact_path(&self) -> &Path {
        &self.artifact
    }

    /// Runs the job without telemetry.
    pub fn run(&self) -> Result<TrainingSummary> {
        self.run_with_telemetry(None)
    }

    /// Runs the job, logging progress and emitting pipeline events.
    pub fn run_with_telemetry(
        &self,
        telemetry: Option<&PricingTelemetry>,
    ) -> Result<TrainingSummary> {
        let dataset = Dataset::load(&self.dataset, &self.training.target)
            .with_context(|| format!("loading dataset {}", self.dataset.display()))?;
        telemetry::log(
            telemetry,
            LogLevel::Info,
            "training.dataset_loaded",
            json!({
                "path": self.dataset,
                "rows": dataset.len(),
                "columns": dataset.features.names().collect::<Vec<_>>(),
            }),
        );

        let artifact = fit_artifact(&dataset, &self.training, telemetry)?;
        artifact
            .save(&self.artifact)
            .with_context(|| format!("saving artifact {}", self.artifact.display()))?;
        telemetry::log(
            telemetry,
            LogLevel::Info,
            "training.artifact_saved",
            json!({ "path": self.artifact }),
        );
        telemetry::event(
            telemetry,
            topics::ARTIFACT_SAVED,
            json!({ "path": self.artifact, "best_alpha": artifact.best_alpha }),
        );

        Ok(TrainingSummary {
            best_alpha: artifact.best_alpha,
            best_cv_rmse: artifact.best_cv_rmse,
            results: artifact.cv_results,
            rows: dataset.len(),
            artifact_path: self.artifact.clone(),
        })
    }
}

/// Grid-searches `dataset` and wraps the refit winner, without touching disk.
pub fn fit_artifact(
    dataset: &Dataset,
    training: &TrainingConfig,
    telemetry: Option<&PricingTelemetry>,
) -> Result<ModelArtifact> {
    let search = GridSearch::from_config(training);
    let outcome = search
        .fit(dataset)
        .context("cross-validated grid search failed")?;

    for row in &outcome.results {
        telemetry::log(
            telemetry,
            LogLevel::Debug,
            "training.candidate_scored",
            json!(row),
        );
        telemetry::event(telemetry, topics::CANDIDATE_SCORED, json!(row));
    }
    let payload = json!({
        "best_alpha": outcome.best_alpha,
        "best_cv_rmse": outcome.best_cv_rmse,
        "folds": training.folds,
        "candidates": outcome.results.len(),
        "rows": dataset.len(),
    });
    telemetry::log(telemetry, LogLevel::Info, "training.completed", payload.clone());
    telemetry::event(telemetry, topics::TRAINING_COMPLETED, payload);

    Ok(ModelArtifact::from_search(outcome, dataset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::DEFAULT_ALPHAS, record::HouseFeatures};
    use shared_event_bus::MemoryEventBus;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn shipped_config(dir: &Path) -> PricingConfig {
        let mut config = PricingConfig::default();
        config.paths.dataset =
            Path::new(env!("CARGO_MANIFEST_DIR")).join("dataset/Housing.csv");
        config.paths.artifact = dir.join("artifacts/model.json");
        config.paths.log_dir = dir.join("logs");
        config
    }

    #[test]
    fn trains_on_shipped_dataset_and_saves() {
        let dir = tempdir().unwrap();
        let config = shipped_config(dir.path());
        let bus = Arc::new(MemoryEventBus::new(32));
        let telemetry = PricingTelemetry::builder("train")
            .log_path(config.log_path("train"))
            .event_publisher(bus.clone())
            .build()
            .unwrap();

        let summary = TrainingPipeline::new(&config)
            .run_with_telemetry(Some(&telemetry))
            .unwrap();
        assert!(DEFAULT_ALPHAS.contains(&summary.best_alpha));
        assert_eq!(summary.rows, 545);
        assert_eq!(summary.results.len(), 5);
        assert!(summary.artifact_path.exists());
        assert_eq!(bus.of_type(topics::CANDIDATE_SCORED).len(), 5);
        assert_eq!(bus.of_type(topics::TRAINING_COMPLETED).len(), 1);
        assert_eq!(bus.of_type(topics::ARTIFACT_SAVED).len(), 1);
        assert!(config.log_path("train").exists());
    }

    #[test]
    fn training_is_deterministic() {
        let dir = tempdir().unwrap();
        let config = shipped_config(dir.path());
        let dataset = Dataset::load(&config.paths.dataset, "price").unwrap();
        let first = fit_artifact(&dataset, &config.training, None).unwrap();
        let second = fit_artifact(&dataset, &config.training, None).unwrap();
        assert_eq!(first.best_alpha, second.best_alpha);
        assert_eq!(first.pipeline, second.pipeline);
        assert_eq!(first.cv_results, second.cv_results);
    }

    #[test]
    fn prediction_grows_with_area() {
        let dir = tempdir().unwrap();
        let config = shipped_config(dir.path());
        let dataset = Dataset::load(&config.paths.dataset, "price").unwrap();
        let artifact = fit_artifact(&dataset, &config.training, None).unwrap();
        let small = HouseFeatures {
            area: 2000,
            ..HouseFeatures::default()
        };
        let large = HouseFeatures {
            area: 8000,
            ..HouseFeatures::default()
        };
        let small = artifact.pipeline.predict_one(&small).unwrap();
        let large = artifact.pipeline.predict_one(&large).unwrap();
        assert!(large > small, "{large} <= {small}");
    }

    #[test]
    fn minimum_inputs_predict_finite_value() {
        let dir = tempdir().unwrap();
        let config = shipped_config(dir.path());
        let dataset = Dataset::load(&config.paths.dataset, "price").unwrap();
        let artifact = fit_artifact(&dataset, &config.training, None).unwrap();
        let price = artifact
            .pipeline
            .predict_one(&HouseFeatures::minimum())
            .unwrap();
        assert!(price.is_finite());
    }

    #[test]
    fn missing_dataset_fails() {
        let dir = tempdir().unwrap();
        let config = shipped_config(dir.path());
        let job = TrainingPipeline::new(&config).with_dataset(dir.path().join("absent.csv"));
        assert!(job.dataset_path().ends_with("absent.csv"));
        assert_eq!(job.artifact_path(), config.paths.artifact);
        let err = job.run().unwrap_err();
        assert!(format!("{err:#}").contains("absent.csv"));
        assert!(!config.paths.artifact.exists());
    }

    #[test]
    fn too_few_rows_for_folds_fails() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("tiny.csv");
        std::fs::write(&csv, "area,mainroad,price\n1000,yes,1\n2000,no,2\n3000,yes,3\n")
            .unwrap();
        let config = shipped_config(dir.path());
        let err = TrainingPipeline::new(&config)
            .with_dataset(&csv)
            .run()
            .unwrap_err();
        assert!(format!("{err:#}").contains("3 rows cannot be split into 5 folds"));
    }
}
