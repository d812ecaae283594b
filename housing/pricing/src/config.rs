//! TOML configuration shared by the CLI and the dashboard.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use shared_logging::LogLevel;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "HOUSING_CONFIG";
/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "housing.toml";

/// Penalty strengths searched by default.
pub const DEFAULT_ALPHAS: [f64; 5] = [0.01, 0.1, 1.0, 10.0, 100.0];

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct PricingConfig {
    /// File locations.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Grid search settings.
    #[serde(default)]
    pub training: TrainingConfig,
    /// Web dashboard settings.
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Structured log settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Dataset, artifact and log locations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PathsConfig {
    /// CSV dataset.
    #[serde(default = "default_dataset")]
    pub dataset: PathBuf,
    /// Serialized model artifact.
    #[serde(default = "default_artifact")]
    pub artifact: PathBuf,
    /// Directory receiving `<component>.log.jsonl` files.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            artifact: default_artifact(),
            log_dir: default_log_dir(),
        }
    }
}

/// Cross-validated grid search settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainingConfig {
    /// Target column name.
    #[serde(default = "default_target")]
    pub target: String,
    /// Candidate ridge penalties, searched in order.
    #[serde(default = "default_alphas")]
    pub alphas: Vec<f64>,
    /// Number of cross-validation folds.
    #[serde(default = "default_folds")]
    pub folds: usize,
    /// Shuffle rows before assigning folds.
    #[serde(default)]
    pub shuffle: bool,
    /// Seed used when `shuffle` is set.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Score candidate/fold pairs on the rayon pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            alphas: default_alphas(),
            folds: default_folds(),
            shuffle: false,
            seed: default_seed(),
            parallel: true,
        }
    }
}

/// Dashboard server settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardConfig {
    /// Socket address the server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Number of bins in the price histogram.
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
    /// Symbol prefixed to displayed prices.
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            histogram_bins: default_histogram_bins(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

/// Structured logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Records below this level are dropped.
    #[serde(default = "default_level")]
    pub level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl PricingConfig {
    /// Loads configuration from a TOML file. Relative paths resolve against
    /// the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_toml_str(&raw, &base).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parses a TOML document, resolving relative paths against `base`.
    pub fn from_toml_str(raw: &str, base: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.paths.dataset = resolve(base, &config.paths.dataset);
        config.paths.artifact = resolve(base, &config.paths.artifact);
        config.paths.log_dir = resolve(base, &config.paths.log_dir);
        config.validate()?;
        Ok(config)
    }

    /// Uses `$HOUSING_CONFIG`, then `./housing.toml`, then built-in defaults.
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(explicit) = env::var_os(CONFIG_ENV) {
            return Self::load(PathBuf::from(explicit));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::load(local);
        }
        Ok(Self::default())
    }

    /// Loads `path` when given, otherwise falls back to [`Self::discover`].
    pub fn load_or_discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::discover(),
        }
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.training.folds < 2 {
            return Err(ConfigError::Invalid(format!(
                "training.folds must be at least 2, got {}",
                self.training.folds
            )));
        }
        if self.training.alphas.is_empty() {
            return Err(ConfigError::Invalid("training.alphas is empty".into()));
        }
        if let Some(alpha) = self
            .training
            .alphas
            .iter()
            .find(|alpha| !alpha.is_finite() || **alpha < 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "training.alphas contains invalid penalty {alpha}"
            )));
        }
        if self.training.target.trim().is_empty() {
            return Err(ConfigError::Invalid("training.target is empty".into()));
        }
        if self.dashboard.histogram_bins == 0 {
            return Err(ConfigError::Invalid(
                "dashboard.histogram_bins must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Log file for a component, e.g. `logs/train.log.jsonl`.
    #[must_use]
    pub fn log_path(&self, component: &str) -> PathBuf {
        self.paths.log_dir.join(format!("{component}.log.jsonl"))
    }
}

fn resolve(base: &Path, candidate: &Path) -> PathBuf {
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

fn default_dataset() -> PathBuf {
    PathBuf::from("housing/pricing/dataset/Housing.csv")
}

fn default_artifact() -> PathBuf {
    PathBuf::from("artifacts/model.json")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_target() -> String {
    "price".into()
}

fn default_alphas() -> Vec<f64> {
    DEFAULT_ALPHAS.to_vec()
}

const fn default_folds() -> usize {
    5
}

const fn default_seed() -> u64 {
    42
}

const fn default_true() -> bool {
    true
}

fn default_bind() -> String {
    "127.0.0.1:8501".into()
}

const fn default_histogram_bins() -> usize {
    30
}

fn default_currency_symbol() -> String {
    "₹".into()
}

const fn default_level() -> LogLevel {
    LogLevel::Info
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("reading config {path:?}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Config file is not valid TOML for this schema.
    #[error("parsing config {path:?}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
    /// A value is outside its accepted range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_reference_setup() {
        let config = PricingConfig::default();
        assert_eq!(config.training.alphas, vec![0.01, 0.1, 1.0, 10.0, 100.0]);
        assert_eq!(config.training.folds, 5);
        assert_eq!(config.training.target, "price");
        assert!(!config.training.shuffle);
        assert_eq!(config.dashboard.histogram_bins, 30);
        assert_eq!(config.logging.level, LogLevel::Info);
        config.validate().unwrap();
    }

    #[test]
    fn partial_document_keeps_defaults_and_resolves_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("housing.toml");
        fs::write(
            &path,
            r#"
[paths]
artifact = "out/model.json"

[training]
alphas = [1.0, 10.0]
parallel = false

[logging]
level = "debug"
"#,
        )
        .unwrap();
        let config = PricingConfig::load(&path).unwrap();
        assert_eq!(config.paths.artifact, dir.path().join("out/model.json"));
        assert_eq!(config.training.alphas, vec![1.0, 10.0]);
        assert_eq!(config.training.folds, 5);
        assert!(!config.training.parallel);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(
            config.log_path("train"),
            dir.path().join("logs").join("train.log.jsonl")
        );
    }

    #[test]
    fn rejects_invalid_values() {
        let base = Path::new(".");
        let err = PricingConfig::from_toml_str("[training]\nfolds = 1\n", base).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = PricingConfig::from_toml_str("[training]\nalphas = []\n", base).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err =
            PricingConfig::from_toml_str("[training]\nalphas = [-1.0]\n", base).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = PricingConfig::from_toml_str("[training\n", base).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let err = PricingConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
