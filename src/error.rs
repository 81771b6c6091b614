//! Error taxonomy for the refactoring engine
//!
//! Rule mismatches are deliberately absent: a rule that does not apply
//! reports `TransformOutcome::Unchanged` and never surfaces as an error.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while parsing, scoring or training
#[derive(Error, Debug)]
pub enum RefactorError {
    #[error("syntax error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("no risk model found at {}", path.display())]
    ModelNotFound { path: PathBuf },

    #[error("model feature schema [{}] does not match extractor schema [{}]", found.join(", "), expected.join(", "))]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("unsupported model format version {found} (expected {expected})")]
    UnsupportedModelVersion { expected: u32, found: u32 },

    #[error("dataset is missing required column(s): {}", missing.join(", "))]
    DatasetSchema { missing: Vec<String> },

    #[error("invalid dataset: {0}")]
    Dataset(String),

    #[error("training failed: {0}")]
    Training(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl RefactorError {
    /// Whether this error only concerns the classification path.
    ///
    /// Callers may keep processing files without the gate when this is true
    /// for `ModelNotFound`; the remaining classification errors are fatal
    /// for that path.
    pub fn is_classification_error(&self) -> bool {
        matches!(
            self,
            RefactorError::ModelNotFound { .. }
                | RefactorError::SchemaMismatch { .. }
                | RefactorError::UnsupportedModelVersion { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RefactorError>;
