//! Offline training for the risk model
//!
//! Loads labelled rewrites, holds out a seeded 20% test partition, grid
//! searches the ensemble hyperparameters with 3-fold cross-validation on the
//! rest, refits the winner and reports test metrics.

use std::fmt;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use super::dataset::{load_dataset, TrainingExample};
use super::features::{extract_features, FeatureVector};
use super::forest::{BaggedTrees, ForestParams, ProbabilisticClassifier};
use super::model::RiskModel;
use crate::error::{RefactorError, Result};

/// Seed for the split and the final refit.
pub const TRAINING_SEED: u64 = 42;

/// Share of examples held out for testing.
pub const TEST_FRACTION: f64 = 0.2;

const CV_FOLDS: usize = 3;

/// Metrics from one training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub examples: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub best_params: ForestParams,
    /// Mean cross-validated accuracy of `best_params`, when CV ran.
    pub cv_accuracy: Option<f64>,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
}

impl fmt::Display for TrainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Examples: {} (train {}, test {})",
            self.examples, self.train_size, self.test_size
        )?;
        writeln!(f, "Best parameters: {}", self.best_params)?;
        if let Some(cv) = self.cv_accuracy {
            writeln!(f, "Cross-validated accuracy: {:.3}", cv)?;
        }
        writeln!(f, "Accuracy: {:.3}", self.accuracy)?;
        writeln!(f, "Precision: {:.3}", self.precision)?;
        write!(f, "Recall: {:.3}", self.recall)
    }
}

/// Hyperparameter combinations, in search order.
///
/// Keys iterate alphabetically with the last one varying fastest, so ties
/// resolve towards unbounded depth, small leaves and fewer trees.
pub fn param_grid() -> Vec<ForestParams> {
    let mut grid = Vec::with_capacity(8);
    for max_depth in [None, Some(5)] {
        for min_leaf_size in [1, 3] {
            for n_estimators in [50, 100] {
                grid.push(ForestParams {
                    n_estimators,
                    max_depth,
                    min_leaf_size,
                    seed: TRAINING_SEED,
                });
            }
        }
    }
    grid
}

/// Shuffled (train, test) index partitions.
fn split_indices(n: usize) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(TRAINING_SEED);
    indices.shuffle(&mut rng);
    let test_size = ((n as f64) * TEST_FRACTION).ceil() as usize;
    let train = indices.split_off(test_size);
    (train, indices)
}

/// Contiguous fold ranges; the first `n % k` folds take one extra row.
fn fold_ranges(n: usize, k: usize) -> Vec<std::ops::Range<usize>> {
    let mut ranges = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = n / k + usize::from(fold < n % k);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

fn accuracy(model: &BaggedTrees, features: &[FeatureVector], labels: &[bool]) -> f64 {
    if features.is_empty() {
        return 0.0;
    }
    let correct = features
        .iter()
        .zip(labels)
        .filter(|(f, &label)| predict_class(model, f) == label)
        .count();
    correct as f64 / features.len() as f64
}

fn predict_class(model: &BaggedTrees, features: &FeatureVector) -> bool {
    model.predict_probability(features) > 0.5
}

fn cross_validate(features: &[FeatureVector], labels: &[bool], params: &ForestParams) -> Result<f64> {
    let k = CV_FOLDS.min(features.len());
    let mut total = 0.0;
    for range in fold_ranges(features.len(), k) {
        let (mut train_x, mut train_y) = (Vec::new(), Vec::new());
        for i in (0..range.start).chain(range.end..features.len()) {
            train_x.push(features[i]);
            train_y.push(labels[i]);
        }
        let model = BaggedTrees::fit(&train_x, &train_y, params)?;
        total += accuracy(&model, &features[range.clone()], &labels[range]);
    }
    Ok(total / k as f64)
}

/// Best combination by mean CV accuracy; the earliest wins a tie.
fn search(features: &[FeatureVector], labels: &[bool]) -> Result<(ForestParams, Option<f64>)> {
    let grid = param_grid();
    if features.len() < 2 {
        return Ok((grid[0], None));
    }
    let scores = grid
        .par_iter()
        .map(|params| cross_validate(features, labels, params))
        .collect::<Result<Vec<f64>>>()?;

    let mut best = 0;
    for (i, score) in scores.iter().enumerate() {
        tracing::debug!("CV accuracy {:.3} for {}", score, grid[i]);
        if *score > scores[best] {
            best = i;
        }
    }
    Ok((grid[best], Some(scores[best])))
}

/// Precision and recall for the positive class; 0 when undefined.
fn precision_recall(predicted: &[bool], actual: &[bool]) -> (f64, f64) {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    for (&p, &a) in predicted.iter().zip(actual) {
        match (p, a) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
            (false, false) => {}
        }
    }
    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    (ratio(tp, tp + fp), ratio(tp, tp + fn_))
}

/// Fit a risk model on labelled examples.
pub fn train(examples: &[TrainingExample]) -> Result<(RiskModel, TrainReport)> {
    if examples.len() < 2 {
        return Err(RefactorError::Training(format!(
            "need at least 2 labelled examples, found {}",
            examples.len()
        )));
    }
    tracing::info!("Loaded {} labelled examples", examples.len());

    let features: Vec<FeatureVector> = examples
        .par_iter()
        .map(|ex| extract_features(&ex.code_before, &ex.code_after))
        .collect();
    let labels: Vec<bool> = examples.iter().map(|ex| ex.error_introduced).collect();

    let (train_idx, test_idx) = split_indices(examples.len());
    let pick = |idx: &[usize]| -> (Vec<FeatureVector>, Vec<bool>) {
        idx.iter().map(|&i| (features[i], labels[i])).unzip()
    };
    let (train_x, train_y) = pick(&train_idx[..]);
    let (test_x, test_y) = pick(&test_idx[..]);
    tracing::info!(
        "Training: {} examples, Test: {} examples",
        train_x.len(),
        test_x.len()
    );

    let (best_params, cv_accuracy) = search(&train_x, &train_y)?;
    tracing::info!("Best parameters: {}", best_params);

    let ensemble = BaggedTrees::fit(&train_x, &train_y, &best_params)?;
    let predicted: Vec<bool> = test_x.iter().map(|f| predict_class(&ensemble, f)).collect();
    let (precision, recall) = precision_recall(&predicted, &test_y);

    let report = TrainReport {
        examples: examples.len(),
        train_size: train_x.len(),
        test_size: test_x.len(),
        best_params,
        cv_accuracy,
        accuracy: accuracy(&ensemble, &test_x, &test_y),
        precision,
        recall,
    };
    tracing::info!(
        "Test accuracy {:.3}, precision {:.3}, recall {:.3}",
        report.accuracy,
        report.precision,
        report.recall
    );

    Ok((RiskModel::new(ensemble), report))
}

/// Load a dataset, train on it and persist the model.
pub fn train_from_path(data: &Path, model_path: &Path) -> Result<TrainReport> {
    let examples = load_dataset(data)?;
    let (model, report) = train(&examples)?;
    model.save(model_path)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn example(before: &str, after: &str, error_introduced: bool) -> TrainingExample {
        TrainingExample {
            code_before: before.to_string(),
            code_after: after.to_string(),
            error_introduced,
        }
    }

    /// Shrinking rewrites are safe, rewrites that balloon the code are not.
    fn dataset() -> Vec<TrainingExample> {
        let mut examples = Vec::new();
        for i in 0..10 {
            examples.push(example(
                &format!("out = []\nfor i in range({i}):\n    out.append(i)\n"),
                &format!("out = [i for i in range({i})]\n"),
                false,
            ));
            let grown = (0..12 + i).map(|j| format!("v{j} = {j}\n")).collect::<String>();
            examples.push(example("x = 1\n", &grown, true));
        }
        examples
    }

    #[test]
    fn test_param_grid_order() {
        let grid = param_grid();
        assert_eq!(grid.len(), 8);
        assert_eq!(grid[0].max_depth, None);
        assert_eq!(grid[0].n_estimators, 50);
        assert_eq!(grid[1].n_estimators, 100);
        assert_eq!(grid[2].min_leaf_size, 3);
        assert_eq!(grid[4].max_depth, Some(5));
    }

    #[test]
    fn test_split_sizes() {
        let (train, test) = split_indices(10);
        assert_eq!((train.len(), test.len()), (8, 2));
        let (train, test) = split_indices(11);
        assert_eq!((train.len(), test.len()), (8, 3));
        let (train, test) = split_indices(2);
        assert_eq!((train.len(), test.len()), (1, 1));

        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1]);
    }

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(split_indices(30), split_indices(30));
    }

    #[test]
    fn test_fold_ranges() {
        assert_eq!(fold_ranges(7, 3), vec![0..3, 3..5, 5..7]);
        assert_eq!(fold_ranges(2, 2), vec![0..1, 1..2]);
    }

    #[test]
    fn test_precision_recall_zero_division() {
        assert_eq!(precision_recall(&[false, false], &[true, false]), (0.0, 0.0));
        assert_eq!(
            precision_recall(&[true, true, false], &[true, false, true]),
            (0.5, 0.5)
        );
    }

    #[test]
    fn test_train_reports_metrics() {
        let (model, report) = train(&dataset()).unwrap();
        assert_eq!(report.examples, 20);
        assert_eq!(report.test_size, 4);
        assert_eq!(report.train_size, 16);
        assert!(report.cv_accuracy.is_some());
        for metric in [report.accuracy, report.precision, report.recall] {
            assert!((0.0..=1.0).contains(&metric));
        }
        assert_eq!(model.params, report.best_params);

        let safe = extract_features("out = []\nfor i in x:\n    out.append(i)\n", "out = [i for i in x]\n");
        let risky = extract_features("x = 1\n", &"y = 2\n".repeat(15));
        assert!(model.predict(&risky) > model.predict(&safe));
    }

    #[test]
    fn test_train_rejects_tiny_dataset() {
        let err = train(&[example("a\n", "b\n", false)]).unwrap_err();
        assert!(matches!(err, RefactorError::Training(_)));
    }

    #[test]
    fn test_train_from_path_writes_model() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data.json");
        let rows: Vec<serde_json::Value> = dataset()
            .iter()
            .map(|ex| {
                serde_json::json!({
                    "code_before": ex.code_before,
                    "code_after": ex.code_after,
                    "error_introduced": u8::from(ex.error_introduced),
                })
            })
            .collect();
        std::fs::write(&data, serde_json::Value::Array(rows).to_string()).unwrap();

        let model_path = dir.path().join("models").join("model.json");
        let report = train_from_path(&data, &model_path).unwrap();
        assert_eq!(report.examples, 20);
        assert!(RiskModel::load(&model_path).is_ok());
    }
}
