//! Descriptive statistics and histograms for the dashboard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dataset::{Column, Dataset};

/// `count / mean / std / min / quartiles / max` of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    /// Number of values.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator); NaN below two values.
    pub std: f64,
    /// Smallest value.
    pub min: f64,
    /// 25th percentile.
    pub q25: f64,
    /// Median.
    pub q50: f64,
    /// 75th percentile.
    pub q75: f64,
    /// Largest value.
    pub max: f64,
}

impl NumericSummary {
    /// Describes `values`; `None` when empty.
    #[must_use]
    pub fn describe(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = if count < 2 {
            f64::NAN
        } else {
            (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
        };
        Some(Self {
            count,
            mean,
            std,
            min: sorted[0],
            q25: quantile(&sorted, 0.25),
            q50: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max: sorted[count - 1],
        })
    }
}

/// Linear-interpolation quantile of sorted, non-empty data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Whole-dataset overview shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// Rows in the dataset.
    pub rows: usize,
    /// Numeric columns (target last), in dataset order.
    pub numeric: Vec<(String, NumericSummary)>,
    /// Value counts of each categorical column, keys sorted.
    pub categorical: Vec<(String, BTreeMap<String, usize>)>,
}

impl DatasetSummary {
    /// Summarizes every feature column plus the target.
    #[must_use]
    pub fn of(dataset: &Dataset) -> Self {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();
        for (name, column) in dataset.features.iter() {
            match column {
                Column::Numeric(values) => {
                    if let Some(summary) = NumericSummary::describe(values) {
                        numeric.push((name.to_string(), summary));
                    }
                }
                Column::Categorical(values) => {
                    let mut counts = BTreeMap::new();
                    for value in values {
                        *counts.entry(value.clone()).or_insert(0) += 1;
                    }
                    categorical.push((name.to_string(), counts));
                }
            }
        }
        if let Some(summary) = NumericSummary::describe(&dataset.target) {
            numeric.push((dataset.target_name.clone(), summary));
        }
        Self {
            rows: dataset.len(),
            numeric,
            categorical,
        }
    }
}

/// Equal-width histogram. Every bin is half-open except the last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// `bins + 1` ascending bin edges.
    pub edges: Vec<f64>,
    /// Values per bin.
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bins finite `values` into `bins` equal-width buckets spanning their range.
    /// A constant sample spans `value ± 0.5`.
    #[must_use]
    pub fn new(values: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let (mut low, mut high) = finite
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        if finite.is_empty() {
            (low, high) = (0.0, 1.0);
        } else if low == high {
            (low, high) = (low - 0.5, high + 0.5);
        }
        let width = (high - low) / bins as f64;
        let edges: Vec<f64> = (0..=bins)
            .map(|idx| if idx == bins { high } else { low + width * idx as f64 })
            .collect();
        let mut counts = vec![0; bins];
        for value in finite {
            let idx = (((value - low) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }
        Self { edges, counts }
    }

    /// Number of bins.
    #[must_use]
    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Largest bin count.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Values counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn describe_matches_pandas_conventions() {
        let summary = NumericSummary::describe(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, 2.5);
        assert!((summary.std - 1.290_994_448_735_805_6).abs() < 1e-12);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.q25, 1.75);
        assert_eq!(summary.q50, 2.5);
        assert_eq!(summary.q75, 3.25);
        assert_eq!(summary.max, 4.0);
        assert!(NumericSummary::describe(&[]).is_none());
        assert!(NumericSummary::describe(&[7.0]).unwrap().std.is_nan());
    }

    #[test]
    fn histogram_closes_last_bin() {
        let histogram = Histogram::new(&[0.0, 1.0, 2.0, 3.0, 4.0], 4);
        assert_eq!(histogram.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(histogram.counts, vec![1, 1, 1, 2]);
        assert_eq!(histogram.total(), 5);
        assert_eq!(histogram.peak(), 2);
    }

    #[test]
    fn constant_sample_spans_unit_range() {
        let histogram = Histogram::new(&[5.0, 5.0, 5.0], 2);
        assert_eq!(histogram.edges, vec![4.5, 5.0, 5.5]);
        assert_eq!(histogram.counts, vec![0, 3]);
    }

    #[test]
    fn summarizes_shipped_dataset() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("dataset/Housing.csv");
        let dataset = Dataset::load(path, "price").unwrap();
        let summary = DatasetSummary::of(&dataset);
        assert_eq!(summary.rows, 545);
        let names: Vec<_> = summary.numeric.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec!["area", "bedrooms", "bathrooms", "stories", "parking", "price"]
        );
        let furnishing = &summary
            .categorical
            .iter()
            .find(|(name, _)| name == "furnishingstatus")
            .unwrap()
            .1;
        assert_eq!(furnishing.values().sum::<usize>(), 545);
        assert_eq!(furnishing.len(), 3);
        let histogram = Histogram::new(&dataset.target, 30);
        assert_eq!(histogram.bins(), 30);
        assert_eq!(histogram.total(), 545);
    }
}
