//! Regression metrics.

use serde::{Deserialize, Serialize};

/// Score for inputs that cannot be compared: 0 when empty, NaN when the
/// lengths disagree so a caller bug never reads as a perfect fit.
fn degenerate(truth: &[f64], predicted: &[f64]) -> Option<f64> {
    debug_assert_eq!(
        truth.len(),
        predicted.len(),
        "truth and predictions differ in length"
    );
    if truth.len() != predicted.len() {
        Some(f64::NAN)
    } else if truth.is_empty() {
        Some(0.0)
    } else {
        None
    }
}

/// Mean squared error. Empty inputs score 0.
#[must_use]
pub fn mse(truth: &[f64], predicted: &[f64]) -> f64 {
    if let Some(score) = degenerate(truth, predicted) {
        return score;
    }
    truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / truth.len() as f64
}

/// Root mean squared error.
#[must_use]
pub fn rmse(truth: &[f64], predicted: &[f64]) -> f64 {
    mse(truth, predicted).sqrt()
}

/// Mean absolute error.
#[must_use]
pub fn mae(truth: &[f64], predicted: &[f64]) -> f64 {
    if let Some(score) = degenerate(truth, predicted) {
        return score;
    }
    truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / truth.len() as f64
}

/// Coefficient of determination, `1 - SS_res / SS_tot`.
///
/// Constant targets score 1.0 when predicted exactly and 0.0 otherwise.
#[must_use]
pub fn r2_score(truth: &[f64], predicted: &[f64]) -> f64 {
    if let Some(score) = degenerate(truth, predicted) {
        return score;
    }
    let mean = truth.iter().sum::<f64>() / truth.len() as f64;
    let ss_tot: f64 = truth.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Fit quality of a set of predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean squared error.
    pub mse: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Coefficient of determination.
    pub r2: f64,
}

impl Metrics {
    /// Scores `predicted` against `truth`.
    #[must_use]
    pub fn compute(truth: &[f64], predicted: &[f64]) -> Self {
        let mse = mse(truth, predicted);
        Self {
            rmse: mse.sqrt(),
            mse,
            mae: mae(truth, predicted),
            r2: r2_score(truth, predicted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_hand_computed_values() {
        let truth = [3.0, -0.5, 2.0, 7.0];
        let predicted = [2.5, 0.0, 2.0, 8.0];
        assert!((mse(&truth, &predicted) - 0.375).abs() < 1e-12);
        assert!((rmse(&truth, &predicted) - 0.375_f64.sqrt()).abs() < 1e-12);
        assert!((mae(&truth, &predicted) - 0.5).abs() < 1e-12);
        assert!((r2_score(&truth, &predicted) - 0.948_608_137_044_967_9).abs() < 1e-12);
    }

    #[test]
    fn constant_target_edge_cases() {
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(r2_score(&[2.0, 2.0], &[1.0, 3.0]), 0.0);
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(mse(&[], &[]), 0.0);
        assert_eq!(mae(&[], &[]), 0.0);
        assert_eq!(r2_score(&[], &[]), 0.0);
        let metrics = Metrics::compute(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.r2, 1.0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "differ in length")]
    fn mismatched_lengths_are_a_bug() {
        let _ = rmse(&[1.0], &[1.0, 2.0]);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn mismatched_lengths_never_look_perfect() {
        assert!(rmse(&[1.0], &[1.0, 2.0]).is_nan());
        assert!(r2_score(&[1.0], &[1.0, 2.0]).is_nan());
    }
}
