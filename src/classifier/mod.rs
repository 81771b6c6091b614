//! Risk classifier for proposed rewrites
//!
//! Scores a `(before, after)` pair with the probability that the rewrite
//! introduced an error. A bagged ensemble of gbdt trees is trained offline
//! (`train`), persisted as a JSON envelope (`model`), and consulted by the
//! pipeline through `RiskClassifier` and `RiskGate`.
//!
//! Pipeline: source metrics → 10 features → ensemble → threshold gate

pub mod dataset;
mod features;
pub mod forest;
mod gate;
mod metrics;
pub mod model;
pub mod train;

pub use dataset::{load_dataset, TrainingExample};
pub use features::{extract_features, feature_keys, FeatureVector, FEATURE_NAMES, NUM_FEATURES};
pub use forest::{BaggedTrees, ForestParams, ProbabilisticClassifier};
pub use gate::{GateDecision, RiskGate, DEFAULT_RISK_THRESHOLD};
pub use metrics::{average_complexity, line_count, nesting_depth, variable_reads};
pub use model::{RiskClassifier, RiskModel, MODEL_FORMAT_VERSION};
pub use train::{train, train_from_path, TrainReport};
