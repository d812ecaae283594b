use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::SchemaError;

/// Ridge regression with an unpenalized intercept.
///
/// Features and target are centered before solving
/// `(XᵀX + αI) w = Xᵀy` through a Cholesky factorization; the intercept
/// absorbs the means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegression {
    alpha: f64,
    coefficients: Array1<f64>,
    intercept: f64,
}

impl RidgeRegression {
    /// Fits the model on a design matrix and target vector.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<Self, RidgeError> {
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(RidgeError::InvalidAlpha(alpha));
        }
        if x.nrows() != y.len() {
            return Err(RidgeError::ShapeMismatch {
                rows: x.nrows(),
                targets: y.len(),
            });
        }
        let x_mean = x.mean_axis(Axis(0)).ok_or(RidgeError::Empty)?;
        let y_mean = y.mean().ok_or(RidgeError::Empty)?;
        let xc = x - &x_mean;
        let yc = y - y_mean;

        let mut gram = xc.t().dot(&xc);
        for idx in 0..gram.nrows() {
            gram[[idx, idx]] += alpha;
        }
        let moment = xc.t().dot(&yc);
        let coefficients = cholesky_solve(&gram, &moment)?;
        let intercept = y_mean - x_mean.dot(&coefficients);
        Ok(Self {
            alpha,
            coefficients,
            intercept,
        })
    }

    /// Predicts one value per row of `x`.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, SchemaError> {
        if x.ncols() != self.coefficients.len() {
            return Err(SchemaError::WidthMismatch {
                expected: self.coefficients.len(),
                found: x.ncols(),
            });
        }
        Ok(x.dot(&self.coefficients) + self.intercept)
    }

    /// Penalty strength used for the fit.
    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Fitted weights, one per design-matrix column.
    #[must_use]
    pub const fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    /// Fitted intercept.
    #[must_use]
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }
}

const PIVOT_TOLERANCE: f64 = 1e-12;

/// Solves `a · w = b` for symmetric positive-definite `a`.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, RidgeError> {
    let n = a.nrows();
    let mut lower = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= lower[[i, k]] * lower[[j, k]];
            }
            if i == j {
                // pivots lost to rounding count as zero
                if !(sum > PIVOT_TOLERANCE * a[[i, i]].abs() && sum.is_finite()) {
                    return Err(RidgeError::NotPositiveDefinite);
                }
                lower[[i, i]] = sum.sqrt();
            } else {
                lower[[i, j]] = sum / lower[[j, j]];
            }
        }
    }

    // L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= lower[[i, k]] * z[k];
        }
        z[i] = sum / lower[[i, i]];
    }
    // Lᵀ w = z
    let mut w = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in i + 1..n {
            sum -= lower[[k, i]] * w[k];
        }
        w[i] = sum / lower[[i, i]];
    }
    Ok(w)
}

/// Errors raised while fitting [`RidgeRegression`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RidgeError {
    /// No rows to fit on.
    #[error("cannot fit on an empty design matrix")]
    Empty,
    /// Rows and targets differ in count.
    #[error("design matrix has {rows} rows but {targets} targets")]
    ShapeMismatch {
        /// Design-matrix rows.
        rows: usize,
        /// Target values.
        targets: usize,
    },
    /// Penalty is negative or not finite.
    #[error("invalid ridge penalty {0}")]
    InvalidAlpha(f64),
    /// The penalized normal equations are singular.
    #[error("normal equations are not positive definite; increase alpha")]
    NotPositiveDefinite,
}
