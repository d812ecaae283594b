//! Transform-then-regress pipeline: `num` scaler, `cat` encoder, `model`.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    dataset::{SchemaError, Table},
    preprocess::ColumnTransformer,
    record::HouseFeatures,
    ridge::{RidgeError, RidgeRegression},
};

/// Fitted preprocessing plus ridge model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePipeline {
    preprocess: ColumnTransformer,
    model: RidgeRegression,
}

impl PricePipeline {
    /// Fits every stage on `features` and `target`.
    pub fn fit(features: &Table, target: &[f64], alpha: f64) -> Result<Self, TrainingError> {
        if features.height() != target.len() {
            return Err(TrainingError::TargetLength {
                expected: features.height(),
                found: target.len(),
            });
        }
        let preprocess = ColumnTransformer::fit(features)?;
        let design = preprocess.transform(features)?;
        let model = RidgeRegression::fit(&design, &Array1::from(target.to_vec()), alpha)?;
        Ok(Self { preprocess, model })
    }

    /// Predicts one price per row of `features`.
    pub fn predict(&self, features: &Table) -> Result<Vec<f64>, SchemaError> {
        let design = self.preprocess.transform(features)?;
        Ok(self.model.predict(&design)?.to_vec())
    }

    /// Predicts the price of a single house.
    pub fn predict_one(&self, house: &HouseFeatures) -> Result<f64, SchemaError> {
        let prices = self.predict(&house.to_table())?;
        prices
            .first()
            .copied()
            .ok_or_else(|| SchemaError::RowCountMismatch {
                column: "area".into(),
                expected: 1,
                found: 0,
            })
    }

    /// Penalty the model was fit with.
    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.model.alpha()
    }

    /// Model intercept.
    #[must_use]
    pub const fn intercept(&self) -> f64 {
        self.model.intercept()
    }

    /// Coefficients paired with their transformed feature names.
    #[must_use]
    pub fn coefficients(&self) -> Vec<(String, f64)> {
        self.preprocess
            .feature_names()
            .into_iter()
            .zip(self.model.coefficients().iter().copied())
            .collect()
    }

    /// Fitted preprocessing stages.
    #[must_use]
    pub const fn preprocess(&self) -> &ColumnTransformer {
        &self.preprocess
    }
}

/// Errors raised while fitting or searching pipelines.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrainingError {
    /// Training table does not fit the preprocessing stages.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Ridge solve failed.
    #[error(transparent)]
    Ridge(#[from] RidgeError),
    /// Fewer rows than folds.
    #[error("{rows} rows cannot be split into {folds} folds")]
    TooFewRows {
        /// Dataset rows.
        rows: usize,
        /// Requested folds.
        folds: usize,
    },
    /// No penalty candidates.
    #[error("alpha grid is empty")]
    EmptyGrid,
    /// Candidate penalty is negative or not finite.
    #[error("invalid alpha candidate {0}")]
    InvalidAlpha(f64),
    /// Target length differs from the feature table height.
    #[error("target has {found} values for {expected} rows")]
    TargetLength {
        /// Feature rows.
        expected: usize,
        /// Target values.
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> (Table, Vec<f64>) {
        let area = vec![1000.0, 1500.0, 2000.0, 2500.0, 3000.0, 3500.0];
        let road = vec!["no", "yes", "no", "yes", "no", "yes"];
        let price: Vec<f64> = area
            .iter()
            .zip(&road)
            .map(|(a, r)| 100.0 * a + if *r == "yes" { 50_000.0 } else { 0.0 })
            .collect();
        let table = Table::new()
            .with_column("area", area.into())
            .unwrap()
            .with_column("mainroad", road.into())
            .unwrap();
        (table, price)
    }

    #[test]
    fn fits_and_predicts_training_rows() {
        let (features, target) = table();
        let pipeline = PricePipeline::fit(&features, &target, 1e-8).unwrap();
        let predicted = pipeline.predict(&features).unwrap();
        for (p, t) in predicted.iter().zip(&target) {
            assert!((p - t).abs() < 1e-3, "{p} vs {t}");
        }
        let names: Vec<_> = pipeline.coefficients().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["num__area", "cat__mainroad_yes"]);
        assert_eq!(pipeline.preprocess().width(), 2);
    }

    #[test]
    fn mismatched_target_fails() {
        let (features, _) = table();
        assert!(matches!(
            PricePipeline::fit(&features, &[1.0, 2.0], 1.0),
            Err(TrainingError::TargetLength { expected: 6, found: 2 })
        ));
    }

    #[test]
    fn missing_column_at_predict_time_fails() {
        let (features, target) = table();
        let pipeline = PricePipeline::fit(&features, &target, 1.0).unwrap();
        let mut input = features.take_rows(&[0]);
        input.remove_column("mainroad");
        assert_eq!(
            pipeline.predict(&input).unwrap_err(),
            SchemaError::MissingColumn("mainroad".into())
        );
    }
}
