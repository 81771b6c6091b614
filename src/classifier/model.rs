//! Persisted risk model and its lazy, shared loader
//!
//! On disk a model is a JSON envelope:
//!
//! ```text
//! {
//!   "format_version": 1,
//!   "feature_keys": ["complexity_before", ...],
//!   "params": { "n_estimators": 100, ... },
//!   "ensemble": { ... }
//! }
//! ```
//!
//! The header is checked before the ensemble is decoded, so a file written by
//! a different format version reports `UnsupportedModelVersion` rather than
//! a JSON error.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::features::{extract_features, feature_keys, FeatureVector};
use super::forest::{BaggedTrees, ForestParams, ProbabilisticClassifier};
use crate::error::{RefactorError, Result};

/// Version written by this build; the only version it reads.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// A fitted ensemble with the schema it was trained against
#[derive(Debug, Serialize, Deserialize)]
pub struct RiskModel {
    pub format_version: u32,
    pub feature_keys: Vec<String>,
    pub params: ForestParams,
    pub ensemble: BaggedTrees,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    format_version: u32,
    feature_keys: Vec<String>,
}

impl RiskModel {
    /// Wrap a freshly fitted ensemble with the current schema.
    pub fn new(ensemble: BaggedTrees) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            feature_keys: feature_keys(),
            params: *ensemble.params(),
            ensemble,
        }
    }

    pub fn predict(&self, features: &FeatureVector) -> f64 {
        self.ensemble.predict_probability(features)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;
        info!("Model saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(RefactorError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let header: EnvelopeHeader = serde_json::from_str(json)?;
        if header.format_version != MODEL_FORMAT_VERSION {
            return Err(RefactorError::UnsupportedModelVersion {
                expected: MODEL_FORMAT_VERSION,
                found: header.format_version,
            });
        }
        let expected = feature_keys();
        if header.feature_keys != expected {
            return Err(RefactorError::SchemaMismatch {
                expected,
                found: header.feature_keys,
            });
        }
        Ok(serde_json::from_str(json)?)
    }
}

/// Scores rewrites with a model loaded on first use
///
/// The model stays resident afterwards and is shared read-only through an
/// `Arc`, so one classifier can serve every worker thread.
#[derive(Debug)]
pub struct RiskClassifier {
    model_path: PathBuf,
    resident: OnceLock<Arc<RiskModel>>,
}

impl RiskClassifier {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            resident: OnceLock::new(),
        }
    }

    /// Build a classifier around an already loaded model.
    pub fn with_model(model_path: impl Into<PathBuf>, model: RiskModel) -> Self {
        let classifier = Self::new(model_path);
        let _ = classifier.resident.set(Arc::new(model));
        classifier
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// The resident model, loading it on first call.
    pub fn model(&self) -> Result<Arc<RiskModel>> {
        if let Some(model) = self.resident.get() {
            return Ok(Arc::clone(model));
        }
        let loaded = Arc::new(RiskModel::load(&self.model_path)?);
        debug!("Loaded risk model from {}", self.model_path.display());
        // a concurrent loader may have won; keep whichever landed first
        Ok(Arc::clone(self.resident.get_or_init(|| loaded)))
    }

    /// P(error introduced) for rewriting `before` into `after`.
    pub fn predict(&self, before: &str, after: &str) -> Result<f64> {
        let features = extract_features(before, after);
        self.predict_features(&features)
    }

    pub fn predict_features(&self, features: &FeatureVector) -> Result<f64> {
        Ok(self.model()?.predict(features).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::features::NUM_FEATURES;
    use tempfile::TempDir;

    fn tiny_model() -> RiskModel {
        let features = vec![
            FeatureVector::new([0.0; NUM_FEATURES]),
            FeatureVector::new([5.0; NUM_FEATURES]),
            FeatureVector::new([0.5; NUM_FEATURES]),
            FeatureVector::new([6.0; NUM_FEATURES]),
        ];
        let labels = vec![false, true, false, true];
        let params = ForestParams {
            n_estimators: 5,
            max_depth: Some(3),
            min_leaf_size: 1,
            seed: 1,
        };
        RiskModel::new(BaggedTrees::fit(&features, &labels, &params).unwrap())
    }

    #[test]
    fn test_missing_model_file() {
        let dir = TempDir::new().unwrap();
        let classifier = RiskClassifier::new(dir.path().join("absent.json"));
        match classifier.predict("x = 1\n", "x = 1\n") {
            Err(RefactorError::ModelNotFound { path }) => {
                assert!(path.ends_with("absent.json"));
            }
            other => panic!("expected ModelNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("models").join("model.json");
        let model = tiny_model();
        model.save(&path).unwrap();

        let classifier = RiskClassifier::new(&path);
        let p = classifier.predict("x = 1\n", "x = 1\ny = 2\n").unwrap();
        assert!((0.0..=1.0).contains(&p));

        let probe = extract_features("a\n", "b\n");
        assert_eq!(
            classifier.predict_features(&probe).unwrap(),
            model.predict(&probe)
        );
    }

    #[test]
    fn test_schema_mismatch() {
        let mut value = serde_json::to_value(tiny_model()).unwrap();
        value["feature_keys"] = serde_json::json!(["complexity_before"]);
        match RiskModel::from_json(&value.to_string()) {
            Err(RefactorError::SchemaMismatch { found, expected }) => {
                assert_eq!(found, vec!["complexity_before".to_string()]);
                assert_eq!(expected.len(), NUM_FEATURES);
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_version() {
        let json = r#"{"format_version": 99, "feature_keys": [], "params": null, "ensemble": null}"#;
        match RiskModel::from_json(json) {
            Err(RefactorError::UnsupportedModelVersion { expected, found }) => {
                assert_eq!(expected, MODEL_FORMAT_VERSION);
                assert_eq!(found, 99);
            }
            other => panic!("expected UnsupportedModelVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_model_loaded_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        tiny_model().save(&path).unwrap();

        let classifier = RiskClassifier::new(&path);
        let first = classifier.model().unwrap();
        std::fs::remove_file(&path).unwrap();
        let second = classifier.model().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
