//! Column-wise preprocessing: numeric standardization and drop-first one-hot
//! encoding, composed into a single fitted transform.

use std::collections::BTreeSet;

use ndarray::{s, Array2, ArrayViewMut2};
use serde::{Deserialize, Serialize};

use crate::dataset::{ColumnKind, SchemaError, Table};

/// Scales below this are treated as zero variance and replaced by 1.
const MIN_SCALE: f64 = 10.0 * f64::EPSILON;

/// Standardizes numeric columns to zero mean and unit variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    columns: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Stage name inside the column transform.
    pub const NAME: &'static str = "num";

    /// Learns per-column mean and population standard deviation.
    pub fn fit(table: &Table, columns: &[String]) -> Result<Self, SchemaError> {
        let mut means = Vec::with_capacity(columns.len());
        let mut scales = Vec::with_capacity(columns.len());
        for name in columns {
            let values = numeric(table, name)?;
            let count = values.len().max(1) as f64;
            let mean = values.iter().sum::<f64>() / count;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
            let scale = variance.sqrt();
            means.push(mean);
            scales.push(if scale < MIN_SCALE { 1.0 } else { scale });
        }
        Ok(Self {
            columns: columns.to_vec(),
            means,
            scales,
        })
    }

    /// Number of output features.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Input columns in output order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Fitted means, one per column.
    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Fitted scales, one per column.
    #[must_use]
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    /// Writes standardized values into `out` (rows × [`Self::width`]).
    pub fn apply(&self, table: &Table, mut out: ArrayViewMut2<'_, f64>) -> Result<(), SchemaError> {
        for (idx, name) in self.columns.iter().enumerate() {
            let values = numeric(table, name)?;
            let (mean, scale) = (self.means[idx], self.scales[idx]);
            for (row, value) in values.iter().enumerate() {
                out[[row, idx]] = (value - mean) / scale;
            }
        }
        Ok(())
    }
}

fn numeric<'a>(table: &'a Table, name: &str) -> Result<&'a [f64], SchemaError> {
    table
        .require(name)?
        .as_numeric()
        .ok_or_else(|| SchemaError::NotNumeric(name.to_string()))
}

/// One-hot encodes categorical columns, dropping the first (sorted) category
/// of each. Unseen categories encode to all zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    /// Stage name inside the column transform.
    pub const NAME: &'static str = "cat";

    /// Learns the sorted vocabulary of each column.
    pub fn fit(table: &Table, columns: &[String]) -> Result<Self, SchemaError> {
        let mut categories = Vec::with_capacity(columns.len());
        for name in columns {
            let column = table.require(name)?;
            let vocabulary: BTreeSet<String> = (0..column.len())
                .filter_map(|row| column.label(row))
                .collect();
            categories.push(vocabulary.into_iter().collect());
        }
        Ok(Self {
            columns: columns.to_vec(),
            categories,
        })
    }

    /// Number of output features (categories minus one per column).
    #[must_use]
    pub fn width(&self) -> usize {
        self.categories
            .iter()
            .map(|vocabulary| vocabulary.len().saturating_sub(1))
            .sum()
    }

    /// Input columns in output order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Sorted vocabulary of each column, including the dropped reference.
    #[must_use]
    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    /// Output feature names, `<column>_<category>`.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.categories)
            .flat_map(|(name, vocabulary)| {
                vocabulary
                    .iter()
                    .skip(1)
                    .map(move |category| format!("{name}_{category}"))
            })
            .collect()
    }

    /// Writes indicator values into `out` (rows × [`Self::width`]), which
    /// must start zeroed.
    pub fn apply(&self, table: &Table, mut out: ArrayViewMut2<'_, f64>) -> Result<(), SchemaError> {
        let mut offset = 0;
        for (name, vocabulary) in self.columns.iter().zip(&self.categories) {
            let column = table.require(name)?;
            for row in 0..column.len() {
                let Some(label) = column.label(row) else {
                    continue;
                };
                if let Ok(position) = vocabulary.binary_search(&label) {
                    if position > 0 {
                        out[[row, offset + position - 1]] = 1.0;
                    }
                }
            }
            offset += vocabulary.len().saturating_sub(1);
        }
        Ok(())
    }
}

/// Fitted column transform: standardized numeric block, then one-hot block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    numeric: StandardScaler,
    categorical: OneHotEncoder,
}

impl ColumnTransformer {
    /// Partitions columns by kind and fits both stages on `table`.
    pub fn fit(table: &Table) -> Result<Self, SchemaError> {
        let (numeric, categorical): (Vec<_>, Vec<_>) = table
            .iter()
            .partition(|(_, column)| column.kind() == ColumnKind::Numeric);
        let numeric: Vec<String> = numeric.into_iter().map(|(name, _)| name.to_string()).collect();
        let categorical: Vec<String> = categorical
            .into_iter()
            .map(|(name, _)| name.to_string())
            .collect();
        Ok(Self {
            numeric: StandardScaler::fit(table, &numeric)?,
            categorical: OneHotEncoder::fit(table, &categorical)?,
        })
    }

    /// Transforms `table` into a dense design matrix. Extra columns are
    /// ignored; missing ones fail.
    pub fn transform(&self, table: &Table) -> Result<Array2<f64>, SchemaError> {
        let rows = table.height();
        let split = self.numeric.width();
        let mut out = Array2::<f64>::zeros((rows, self.width()));
        self.numeric.apply(table, out.slice_mut(s![.., ..split]))?;
        self.categorical.apply(table, out.slice_mut(s![.., split..]))?;
        Ok(out)
    }

    /// Number of output features.
    #[must_use]
    pub fn width(&self) -> usize {
        self.numeric.width() + self.categorical.width()
    }

    /// Numeric stage.
    #[must_use]
    pub const fn scaler(&self) -> &StandardScaler {
        &self.numeric
    }

    /// Categorical stage.
    #[must_use]
    pub const fn encoder(&self) -> &OneHotEncoder {
        &self.categorical
    }

    /// Output feature names, `num__<column>` then `cat__<column>_<category>`.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        self.numeric
            .columns()
            .iter()
            .map(|name| format!("{}__{name}", StandardScaler::NAME))
            .chain(
                self.categorical
                    .feature_names()
                    .into_iter()
                    .map(|name| format!("{}__{name}", OneHotEncoder::NAME)),
            )
            .collect()
    }
}
