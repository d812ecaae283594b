//! K-fold cross-validated grid search over the ridge penalty.

use rand::{rngs::SmallRng, seq::SliceRandom, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::TrainingConfig,
    dataset::Dataset,
    metrics::rmse,
    pipeline::{PricePipeline, TrainingError},
};

/// Row indices of one train/validation split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Rows the pipeline is fit on.
    pub train: Vec<usize>,
    /// Rows the pipeline is scored on.
    pub test: Vec<usize>,
}

/// K-fold splitter. Contiguous blocks by default; the first `n % k` folds
/// take one extra row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KFold {
    folds: usize,
    shuffle_seed: Option<u64>,
}

impl KFold {
    /// Unshuffled splitter with `folds` partitions.
    #[must_use]
    pub const fn new(folds: usize) -> Self {
        Self {
            folds,
            shuffle_seed: None,
        }
    }

    /// Permutes rows with a seeded RNG before partitioning.
    #[must_use]
    pub const fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Number of partitions.
    #[must_use]
    pub const fn folds(&self) -> usize {
        self.folds
    }

    /// Splits `rows` row indices into folds.
    pub fn split(&self, rows: usize) -> Result<Vec<Fold>, TrainingError> {
        if self.folds < 2 || rows < self.folds {
            return Err(TrainingError::TooFewRows {
                rows,
                folds: self.folds,
            });
        }
        let mut order: Vec<usize> = (0..rows).collect();
        if let Some(seed) = self.shuffle_seed {
            order.shuffle(&mut SmallRng::seed_from_u64(seed));
        }
        let base = rows / self.folds;
        let extra = rows % self.folds;
        let mut start = 0;
        let mut folds = Vec::with_capacity(self.folds);
        for idx in 0..self.folds {
            let size = base + usize::from(idx < extra);
            let end = start + size;
            folds.push(Fold {
                train: order[..start].iter().chain(&order[end..]).copied().collect(),
                test: order[start..end].to_vec(),
            });
            start = end;
        }
        Ok(folds)
    }
}

/// Cross-validation score of one penalty candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvResult {
    /// Penalty strength.
    pub alpha: f64,
    /// Mean validation RMSE across folds.
    pub mean_rmse: f64,
    /// Population standard deviation of the fold RMSEs.
    pub std_rmse: f64,
    /// Validation RMSE per fold, in fold order.
    pub fold_rmse: Vec<f64>,
    /// 1 for the best mean RMSE; ties share a rank.
    pub rank: usize,
}

/// Grid search result: the table, the winner, and the winner refit on all rows.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Winning penalty.
    pub best_alpha: f64,
    /// Mean validation RMSE of the winner.
    pub best_cv_rmse: f64,
    /// One row per candidate, in grid order.
    pub results: Vec<CvResult>,
    /// Winner refit on the full dataset.
    pub pipeline: PricePipeline,
}

impl SearchOutcome {
    /// Result row of the winning candidate.
    #[must_use]
    pub fn best(&self) -> Option<&CvResult> {
        self.results.iter().find(|row| row.alpha == self.best_alpha)
    }
}

/// Exhaustive search over ridge penalties.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSearch {
    alphas: Vec<f64>,
    kfold: KFold,
    parallel: bool,
}

impl GridSearch {
    /// Searches `alphas` with the given splitter.
    #[must_use]
    pub const fn new(alphas: Vec<f64>, kfold: KFold) -> Self {
        Self {
            alphas,
            kfold,
            parallel: true,
        }
    }

    /// Builds the search described by a `[training]` section.
    #[must_use]
    pub fn from_config(config: &TrainingConfig) -> Self {
        let mut kfold = KFold::new(config.folds);
        if config.shuffle {
            kfold = kfold.with_shuffle(config.seed);
        }
        Self::new(config.alphas.clone(), kfold).with_parallel(config.parallel)
    }

    /// Toggles scoring on the rayon pool.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Candidate penalties, in grid order.
    #[must_use]
    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    /// Scores every candidate, picks the lowest mean RMSE (earliest on ties)
    /// and refits it on the whole dataset.
    pub fn fit(&self, dataset: &Dataset) -> Result<SearchOutcome, TrainingError> {
        if self.alphas.is_empty() {
            return Err(TrainingError::EmptyGrid);
        }
        if let Some(alpha) = self.alphas.iter().find(|a| !a.is_finite() || **a < 0.0) {
            return Err(TrainingError::InvalidAlpha(*alpha));
        }
        let folds = self.kfold.split(dataset.len())?;
        let splits: Vec<(Dataset, Dataset)> = folds
            .iter()
            .map(|fold| (dataset.subset(&fold.train), dataset.subset(&fold.test)))
            .collect();

        let tasks: Vec<(f64, &(Dataset, Dataset))> = self
            .alphas
            .iter()
            .flat_map(|alpha| splits.iter().map(move |split| (*alpha, split)))
            .collect();
        let score = |(alpha, (train, test)): &(f64, &(Dataset, Dataset))| {
            score_fold(*alpha, train, test)
        };
        let scores: Vec<f64> = if self.parallel {
            tasks
                .par_iter()
                .map(score)
                .collect::<Result<Vec<_>, TrainingError>>()?
        } else {
            tasks
                .iter()
                .map(score)
                .collect::<Result<Vec<_>, TrainingError>>()?
        };

        let mut results: Vec<CvResult> = self
            .alphas
            .iter()
            .zip(scores.chunks(splits.len()))
            .map(|(alpha, fold_rmse)| {
                let count = fold_rmse.len() as f64;
                let mean = fold_rmse.iter().sum::<f64>() / count;
                let variance = fold_rmse.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
                CvResult {
                    alpha: *alpha,
                    mean_rmse: mean,
                    std_rmse: variance.sqrt(),
                    fold_rmse: fold_rmse.to_vec(),
                    rank: 0,
                }
            })
            .collect();
        let means: Vec<f64> = results.iter().map(|row| row.mean_rmse).collect();
        for row in &mut results {
            row.rank = 1 + means.iter().filter(|mean| **mean < row.mean_rmse).count();
        }

        let mut best = &results[0];
        for row in &results[1..] {
            if row.mean_rmse < best.mean_rmse {
                best = row;
            }
        }
        let (best_alpha, best_cv_rmse) = (best.alpha, best.mean_rmse);
        let pipeline = PricePipeline::fit(&dataset.features, &dataset.target, best_alpha)?;
        Ok(SearchOutcome {
            best_alpha,
            best_cv_rmse,
            results,
            pipeline,
        })
    }
}

fn score_fold(alpha: f64, train: &Dataset, test: &Dataset) -> Result<f64, TrainingError> {
    let pipeline = PricePipeline::fit(&train.features, &train.target, alpha)?;
    let predicted = pipeline.predict(&test.features)?;
    Ok(rmse(&test.target, &predicted))
}
