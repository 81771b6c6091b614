//! pyrefine - pattern-driven Python refactoring
//!
//! Detects three non-idiomatic constructs in Python source, rewrites them
//! into idiomatic equivalents, and optionally discards rewrites that a
//! learned risk model flags as likely to change behaviour.
//!
//! - [`syntax`]: tree-sitter parse into an owned tree, and back to text
//! - [`detectors`]: read-only pattern matching
//! - [`fixes`]: tree rewrites and the bottom-up driver
//! - [`classifier`]: features, ensemble, training and the risk gate
//! - [`pipeline`]: per-file parse → detect → rewrite → gate
//!
//! ```ignore
//! use pyrefine::{config::RunConfig, pipeline::Refactorer};
//!
//! let refactorer = Refactorer::new(RunConfig::default())?;
//! let outcome = refactorer.process("for i in xs:\n    out.append(i)\n")?;
//! print!("{}", outcome.output);
//! ```

pub mod classifier;
pub mod config;
pub mod detectors;
pub mod error;
pub mod fixes;
pub mod pipeline;
pub mod syntax;

pub use error::{RefactorError, Result};
