//! Per-file refactoring pipeline
//!
//! parse → detect → rewrite → unparse → score → gate
//!
//! A `Refactorer` is built once per run and shared by every worker: the only
//! state it holds is the run configuration and the resident risk model.

use std::path::Path;

use tracing::{debug, warn};

use crate::classifier::{GateDecision, RiskClassifier, RiskGate, RiskModel};
use crate::config::RunConfig;
use crate::detectors::{analyze, IssueReport};
use crate::error::{RefactorError, Result};
use crate::fixes::{rewrite_module, TransformLog};
use crate::syntax::{parse_module, unparse};

/// Everything the pipeline decided for one source file
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// Issues found in the original source.
    pub issues: IssueReport,
    pub log: TransformLog,
    /// Rewritten text, when at least one rule applied.
    pub candidate: Option<String>,
    /// Risk of the candidate, when the gate scored it.
    pub risk: Option<f64>,
    pub decision: Option<GateDecision>,
    /// Text to write out: the accepted candidate or the original.
    pub output: String,
}

impl FileOutcome {
    /// Whether `output` differs from the original source.
    pub fn is_rewritten(&self) -> bool {
        self.candidate.is_some() && self.decision != Some(GateDecision::Discard)
    }
}

/// Parse `source` and report its issues.
pub fn analyze_source(source: &str) -> Result<IssueReport> {
    let tree = parse_module(source)?;
    Ok(analyze(&tree))
}

pub struct Refactorer {
    config: RunConfig,
    classifier: Option<RiskClassifier>,
    gate: RiskGate,
}

impl Refactorer {
    /// Build a pipeline for `config`.
    ///
    /// With the risk filter enabled the model is loaded eagerly. A missing
    /// model disables the filter for this run; any other model error is
    /// returned.
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        let classifier = if config.use_risk_filter {
            match RiskModel::load(&config.model_path) {
                Ok(model) => Some(RiskClassifier::with_model(&config.model_path, model)),
                Err(RefactorError::ModelNotFound { path }) => {
                    warn!(
                        "No risk model at {}; continuing without the risk filter",
                        path.display()
                    );
                    None
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };
        Ok(Self {
            gate: config.gate(),
            config,
            classifier,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn gate_enabled(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn analyze(&self, source: &str) -> Result<IssueReport> {
        analyze_source(source)
    }

    pub fn process(&self, source: &str) -> Result<FileOutcome> {
        let tree = parse_module(source)?;
        let issues = analyze(&tree);
        let (rewritten, log) = rewrite_module(&tree, self.config.chain_body_policy);

        if !log.any_applied() {
            return Ok(FileOutcome {
                issues,
                log,
                candidate: None,
                risk: None,
                decision: None,
                output: source.to_string(),
            });
        }

        let candidate = unparse(&rewritten);
        debug!("{} rewrite(s) applied", log.applied());

        let (risk, decision) = match &self.classifier {
            Some(classifier) => {
                let p = classifier.predict(source, &candidate)?;
                (Some(p), Some(self.gate.decide(p)))
            }
            None => (None, None),
        };

        let output = if decision == Some(GateDecision::Discard) {
            warn!(
                "Discarding rewrite: risk {:.3} exceeds threshold {:.3}",
                risk.unwrap_or_default(),
                self.gate.threshold()
            );
            source.to_string()
        } else {
            candidate.clone()
        };

        Ok(FileOutcome {
            issues,
            log,
            candidate: Some(candidate),
            risk,
            decision,
            output,
        })
    }

    pub fn process_file(&self, path: &Path) -> Result<FileOutcome> {
        let source = std::fs::read_to_string(path)?;
        debug!("Processing {}", path.display());
        self.process(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LOOP: &str = "result = []\nfor i in range(5):\n    result.append(i * 2)\n";

    #[test]
    fn test_identity_without_patterns() {
        let source = "# keep me\ndef f(x):\n    return x + 1   # trailing\n";
        let outcome = Refactorer::new(RunConfig::default())
            .unwrap()
            .process(source)
            .unwrap();
        assert!(outcome.issues.is_empty());
        assert_eq!(outcome.output, source);
        assert!(!outcome.is_rewritten());
    }

    #[test]
    fn test_loop_rewritten_without_gate() {
        let outcome = Refactorer::new(RunConfig::default())
            .unwrap()
            .process(LOOP)
            .unwrap();
        assert_eq!(outcome.issues.loops.len(), 1);
        assert!(outcome.output.contains("result = [i * 2 for i in range(5)]"));
        assert!(outcome.risk.is_none());
        assert!(outcome.is_rewritten());
    }

    #[test]
    fn test_parse_error_propagates() {
        let refactorer = Refactorer::new(RunConfig::default()).unwrap();
        let err = refactorer
            .process("def faulty_function(:\n    pass\n")
            .unwrap_err();
        assert!(matches!(err, RefactorError::Parse { line: 1, .. }));
        assert!(refactorer.analyze("def faulty_function(:\n").is_err());
    }

    #[test]
    fn test_missing_model_disables_gate() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig {
            use_risk_filter: true,
            model_path: dir.path().join("absent.json"),
            ..RunConfig::default()
        };
        let refactorer = Refactorer::new(config).unwrap();
        assert!(!refactorer.gate_enabled());
        assert!(refactorer.process(LOOP).unwrap().is_rewritten());
    }

    #[test]
    fn test_corrupt_model_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, r#"{"format_version": 7, "feature_keys": []}"#).unwrap();
        let config = RunConfig {
            use_risk_filter: true,
            model_path: path,
            ..RunConfig::default()
        };
        assert!(matches!(
            Refactorer::new(config),
            Err(RefactorError::UnsupportedModelVersion { found: 7, .. })
        ));
    }
}
