//! Bagged decision-tree ensemble
//!
//! Each member is a single `gbdt` regression tree (one boosting iteration,
//! shrinkage 1.0, `LogLikelyhood` loss) fitted on a bootstrap sample of the
//! training rows. The ensemble probability is the mean of the members'.
//!
//! Labels use the gbdt convention: `1.0` for "error introduced", `-1.0`
//! otherwise, so each tree predicts P(error introduced).
//!
//! Bootstrap samples come from `ChaCha8Rng` seeded with `seed + member
//! index`, so a fit is reproducible regardless of rayon scheduling.

use std::fmt;

use gbdt::config::Config;
use gbdt::decision_tree::Data;
use gbdt::gradient_boost::GBDT;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::features::{FeatureVector, NUM_FEATURES};
use crate::error::{RefactorError, Result};

/// Depth cap used when a tree is configured as unbounded.
pub const UNBOUNDED_DEPTH: u32 = 30;

/// Probability reported when the ensemble yields a non-finite value.
const FALLBACK_PROBABILITY: f64 = 0.5;

/// A classifier producing a probability for the positive class
pub trait ProbabilisticClassifier: Sized {
    type Params;

    fn fit(features: &[FeatureVector], labels: &[bool], params: &Self::Params) -> Result<Self>;

    /// P(positive class), within [0, 1].
    fn predict_probability(&self, features: &FeatureVector) -> f64;
}

/// Ensemble hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// `None` grows trees up to `UNBOUNDED_DEPTH`.
    pub max_depth: Option<u32>,
    pub min_leaf_size: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_leaf_size: 1,
            seed: 42,
        }
    }
}

impl fmt::Display for ForestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = self
            .max_depth
            .map_or_else(|| "none".to_string(), |d| d.to_string());
        write!(
            f,
            "n_estimators={}, max_depth={}, min_leaf_size={}",
            self.n_estimators, depth, self.min_leaf_size
        )
    }
}

/// One ensemble member
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Estimator {
    Tree { model: GBDT },
    /// The bootstrap sample held a single class.
    Constant { probability: f64 },
}

impl Estimator {
    #[allow(clippy::ptr_arg)]
    fn predict(&self, data: &Vec<Data>) -> f64 {
        match self {
            Estimator::Tree { model } => model
                .predict(data)
                .first()
                .map(|&p| f64::from(p))
                .unwrap_or(FALLBACK_PROBABILITY),
            Estimator::Constant { probability } => *probability,
        }
    }
}

/// Bagged ensemble of gbdt trees
#[derive(Serialize, Deserialize)]
pub struct BaggedTrees {
    params: ForestParams,
    estimators: Vec<Estimator>,
}

impl fmt::Debug for BaggedTrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaggedTrees")
            .field("params", &self.params)
            .field("estimators", &self.estimators.len())
            .finish()
    }
}

impl BaggedTrees {
    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.estimators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimators.is_empty()
    }
}

fn tree_config(params: &ForestParams) -> Config {
    let mut cfg = Config::new();
    cfg.set_feature_size(NUM_FEATURES);
    cfg.set_max_depth(params.max_depth.unwrap_or(UNBOUNDED_DEPTH));
    cfg.set_min_leaf_size(params.min_leaf_size.max(1));
    cfg.set_iterations(1);
    cfg.set_shrinkage(1.0);
    cfg.set_loss("LogLikelyhood");
    cfg.set_debug(false);
    cfg.set_training_optimization_level(2);
    cfg
}

fn fit_member(
    features: &[FeatureVector],
    labels: &[bool],
    params: &ForestParams,
    index: usize,
) -> Estimator {
    let n = features.len();
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(index as u64));
    let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();

    let positives = sample.iter().filter(|&&i| labels[i]).count();
    if positives == 0 || positives == sample.len() {
        return Estimator::Constant {
            probability: if positives == 0 { 0.0 } else { 1.0 },
        };
    }

    let mut data: Vec<Data> = sample
        .iter()
        .map(|&i| {
            let label = if labels[i] { 1.0_f32 } else { -1.0_f32 };
            Data::new_training_data(features[i].to_f32(), 1.0_f32, label, None)
        })
        .collect();

    let mut model = GBDT::new(&tree_config(params));
    model.fit(&mut data);
    Estimator::Tree { model }
}

impl ProbabilisticClassifier for BaggedTrees {
    type Params = ForestParams;

    fn fit(features: &[FeatureVector], labels: &[bool], params: &ForestParams) -> Result<Self> {
        if features.is_empty() {
            return Err(RefactorError::Training("no training samples provided".into()));
        }
        if features.len() != labels.len() {
            return Err(RefactorError::Training(format!(
                "feature count ({}) does not match label count ({})",
                features.len(),
                labels.len()
            )));
        }
        if params.n_estimators == 0 {
            return Err(RefactorError::Training(
                "n_estimators must be at least 1".into(),
            ));
        }

        let estimators = (0..params.n_estimators)
            .into_par_iter()
            .map(|index| fit_member(features, labels, params, index))
            .collect();

        Ok(Self {
            params: *params,
            estimators,
        })
    }

    fn predict_probability(&self, features: &FeatureVector) -> f64 {
        if self.estimators.is_empty() {
            return FALLBACK_PROBABILITY;
        }
        let data = vec![Data::new_test_data(features.to_f32(), None)];
        let total: f64 = self.estimators.iter().map(|e| e.predict(&data)).sum();
        let mean = total / self.estimators.len() as f64;
        if mean.is_finite() {
            mean.clamp(0.0, 1.0)
        } else {
            FALLBACK_PROBABILITY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two well-separated clusters: low `length_change` is safe, high is risky.
    fn clusters() -> (Vec<FeatureVector>, Vec<bool>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            let mut values = [0.0; NUM_FEATURES];
            values[5] = -1.0 - (i % 3) as f64;
            features.push(FeatureVector::new(values));
            labels.push(false);

            let mut values = [0.0; NUM_FEATURES];
            values[5] = 10.0 + (i % 4) as f64;
            features.push(FeatureVector::new(values));
            labels.push(true);
        }
        (features, labels)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_estimators: 10,
            max_depth: Some(5),
            min_leaf_size: 1,
            seed: 7,
        }
    }

    #[test]
    fn test_fit_and_predict_separates_clusters() {
        let (features, labels) = clusters();
        let model = BaggedTrees::fit(&features, &labels, &small_params()).unwrap();
        assert_eq!(model.len(), 10);

        let mut risky = [0.0; NUM_FEATURES];
        risky[5] = 11.0;
        let mut safe = [0.0; NUM_FEATURES];
        safe[5] = -2.0;
        let p_risky = model.predict_probability(&FeatureVector::new(risky));
        let p_safe = model.predict_probability(&FeatureVector::new(safe));
        assert!((0.0..=1.0).contains(&p_risky));
        assert!((0.0..=1.0).contains(&p_safe));
        assert!(p_risky > p_safe);
    }

    #[test]
    fn test_single_class_yields_constant_members() {
        let features = vec![FeatureVector::new([1.0; NUM_FEATURES]); 4];
        let labels = vec![true; 4];
        let model = BaggedTrees::fit(&features, &labels, &small_params()).unwrap();
        let p = model.predict_probability(&FeatureVector::new([0.0; NUM_FEATURES]));
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (features, labels) = clusters();
        let a = BaggedTrees::fit(&features, &labels, &small_params()).unwrap();
        let b = BaggedTrees::fit(&features, &labels, &small_params()).unwrap();
        let probe = FeatureVector::new([3.0; NUM_FEATURES]);
        assert_eq!(a.predict_probability(&probe), b.predict_probability(&probe));
    }

    #[test]
    fn test_fit_validation_errors() {
        let features = vec![FeatureVector::new([0.0; NUM_FEATURES])];
        assert!(BaggedTrees::fit(&[], &[], &small_params()).is_err());
        assert!(BaggedTrees::fit(&features, &[true, false], &small_params()).is_err());
        let zero = ForestParams {
            n_estimators: 0,
            ..small_params()
        };
        assert!(BaggedTrees::fit(&features, &[true], &zero).is_err());
    }

    #[test]
    fn test_serde_roundtrip_keeps_predictions() {
        let (features, labels) = clusters();
        let model = BaggedTrees::fit(&features, &labels, &small_params()).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let restored: BaggedTrees = serde_json::from_str(&json).unwrap();
        let probe = FeatureVector::new(features[1].values);
        assert_eq!(
            model.predict_probability(&probe),
            restored.predict_probability(&probe)
        );
        assert_eq!(restored.params(), model.params());
    }
}
