//! Run configuration
//!
//! Resolution order, later wins:
//! 1. built-in defaults
//! 2. `pyrefine.toml` in the working directory, or the file given by `--config`
//! 3. `PYREFINE_RISK_THRESHOLD` / `PYREFINE_MODEL_PATH`
//! 4. command-line flags (applied by the CLI)
//!
//! ```toml
//! risk_threshold = 0.25
//! use_risk_filter = true
//! model_path = "models/model.json"
//! chain_body_policy = "strict"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classifier::{RiskGate, DEFAULT_RISK_THRESHOLD};
use crate::error::{RefactorError, Result};
use crate::fixes::ChainBodyPolicy;

/// File looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "pyrefine.toml";

pub const ENV_RISK_THRESHOLD: &str = "PYREFINE_RISK_THRESHOLD";
pub const ENV_MODEL_PATH: &str = "PYREFINE_MODEL_PATH";

fn default_model_path() -> PathBuf {
    PathBuf::from("models").join("model.json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Rewrites scored above this are discarded.
    pub risk_threshold: f64,
    pub use_risk_filter: bool,
    pub model_path: PathBuf,
    pub chain_body_policy: ChainBodyPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            risk_threshold: DEFAULT_RISK_THRESHOLD,
            use_risk_filter: false,
            model_path: default_model_path(),
            chain_body_policy: ChainBodyPolicy::default(),
        }
    }
}

impl RunConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RunConfig =
            toml::from_str(content).map_err(|e| RefactorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RefactorError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| RefactorError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from `explicit` if given, else from `pyrefine.toml` in `dir`,
    /// then apply environment overrides.
    ///
    /// An explicit file that fails to load is an error. A broken implicit
    /// file is reported and ignored.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = dir.join(CONFIG_FILE_NAME);
                if path.is_file() {
                    match Self::from_file(&path) {
                        Ok(config) => {
                            debug!("Loaded config from {}", path.display());
                            config
                        }
                        Err(e) => {
                            warn!("Ignoring {}: {}", path.display(), e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `PYREFINE_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(ENV_RISK_THRESHOLD) {
            self.risk_threshold = raw.trim().parse().map_err(|_| {
                RefactorError::Config(format!(
                    "{} must be a number, got '{}'",
                    ENV_RISK_THRESHOLD, raw
                ))
            })?;
        }
        if let Some(raw) = lookup(ENV_MODEL_PATH).filter(|v| !v.is_empty()) {
            self.model_path = PathBuf::from(raw);
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.risk_threshold) {
            return Err(RefactorError::Config(format!(
                "risk_threshold must be within [0, 1], got {}",
                self.risk_threshold
            )));
        }
        Ok(())
    }

    pub fn gate(&self) -> RiskGate {
        RiskGate::new(self.risk_threshold)
    }
}
