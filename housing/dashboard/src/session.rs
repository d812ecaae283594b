use std::sync::Arc;

use anyhow::{Context, Result};
use housing_pricing::{
    evaluate, load_artifact, Dataset, DatasetSummary, EvaluationReport, HouseFeatures, Histogram,
    ModelArtifact, PricingConfig, PricingTelemetry,
};
use once_cell::sync::OnceCell;
use serde_json::{json, Value};
use shared_event_bus::topics;
use shared_logging::LogLevel;

use crate::error::DashboardError;

static GLOBAL: OnceCell<Arc<SessionCache>> = OnceCell::new();

/// Dataset and model loaded once per process.
#[derive(Debug)]
pub struct Session {
    config: PricingConfig,
    dataset: Dataset,
    artifact: ModelArtifact,
    summary: DatasetSummary,
    histogram: Histogram,
    telemetry: Option<PricingTelemetry>,
}

impl Session {
    /// Reads the configured dataset and artifact.
    pub fn load(config: &PricingConfig, telemetry: Option<PricingTelemetry>) -> Result<Self> {
        let dataset = Dataset::load(&config.paths.dataset, &config.training.target)
            .with_context(|| format!("loading dataset {}", config.paths.dataset.display()))?;
        let artifact = load_artifact(&config.paths.artifact, telemetry.as_ref())?;
        let summary = DatasetSummary::of(&dataset);
        let histogram = Histogram::new(&dataset.target, config.dashboard.histogram_bins);
        if let Some(telemetry) = &telemetry {
            let payload = json!({
                "dataset": config.paths.dataset,
                "artifact": config.paths.artifact,
                "rows": dataset.len(),
                "best_alpha": artifact.best_alpha,
            });
            report(
                telemetry,
                LogLevel::Info,
                "dashboard.session_loaded",
                topics::SESSION_LOADED,
                payload,
            );
        }
        Ok(Self {
            config: config.clone(),
            dataset,
            artifact,
            summary,
            histogram,
            telemetry,
        })
    }

    /// Configuration the session was loaded with.
    #[must_use]
    pub const fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Loaded model.
    #[must_use]
    pub const fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Descriptive statistics of the dataset.
    #[must_use]
    pub const fn summary(&self) -> &DatasetSummary {
        &self.summary
    }

    /// Price histogram.
    #[must_use]
    pub const fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    /// Scores the model on the loaded dataset.
    pub fn metrics(&self) -> Result<EvaluationReport, DashboardError> {
        evaluate(&self.artifact, &self.dataset)
            .map_err(|err| DashboardError::Internal(format!("{err:#}")))
    }

    /// Validates `house` and predicts its price.
    pub fn predict(&self, house: &HouseFeatures) -> Result<f64, DashboardError> {
        house.validate()?;
        let price = self.artifact.pipeline.predict_one(house)?;
        if let Some(telemetry) = &self.telemetry {
            let payload = json!({ "house": house, "price": price });
            report(
                telemetry,
                LogLevel::Debug,
                "dashboard.prediction",
                topics::PREDICTION_SERVED,
                payload,
            );
        }
        Ok(price)
    }
}

/// Lazily loaded, never invalidated [`Session`].
#[derive(Debug)]
pub struct SessionCache {
    config: PricingConfig,
    telemetry: Option<PricingTelemetry>,
    cell: OnceCell<Arc<Session>>,
}

impl SessionCache {
    /// Cache that loads on first [`Self::get`].
    #[must_use]
    pub const fn new(config: PricingConfig, telemetry: Option<PricingTelemetry>) -> Self {
        Self {
            config,
            telemetry,
            cell: OnceCell::new(),
        }
    }

    /// Process-wide cache. Arguments only matter on the first call.
    #[must_use]
    pub fn global(config: PricingConfig, telemetry: Option<PricingTelemetry>) -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new(config, telemetry))))
    }

    /// Loads the session on first use; later calls share it. A failed load
    /// is retried on the next call.
    pub fn get(&self) -> Result<Arc<Session>, DashboardError> {
        self.cell
            .get_or_try_init(|| Session::load(&self.config, self.telemetry.clone()).map(Arc::new))
            .map(Arc::clone)
            .map_err(|err| {
                tracing::error!(error = %format!("{err:#}"), "session load failed");
                DashboardError::Unavailable(format!("{err:#}"))
            })
    }

    /// True once the session has loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// [`Self::get`] on the blocking pool, so the first load never stalls
    /// a runtime worker.
    pub async fn load(self: &Arc<Self>) -> Result<Arc<Session>, DashboardError> {
        if let Some(session) = self.cell.get() {
            return Ok(Arc::clone(session));
        }
        let cache = Arc::clone(self);
        tokio::task::spawn_blocking(move || cache.get())
            .await
            .map_err(|err| DashboardError::Internal(format!("session loader panicked: {err}")))?
    }
}

/// Log and event sinks are best effort: a failed write never fails a request.
fn report(
    telemetry: &PricingTelemetry,
    level: LogLevel,
    message: &str,
    event_type: &str,
    payload: Value,
) {
    if let Err(err) = telemetry.log(level, message, payload.clone()) {
        tracing::warn!(error = %format!("{err:#}"), record = message, "telemetry log failed");
    }
    if let Err(err) = telemetry.event(event_type, payload) {
        tracing::warn!(error = %format!("{err:#}"), event_type, "telemetry event failed");
    }
}
