//! Pattern detectors
//!
//! Read-only passes over a parsed module. Each detector implements the
//! `Detector` trait; `analyze` runs all three and groups their issues into an
//! `IssueReport`.
//!
//! # Detectors
//!
//! - `LoopAppendDetector` - for-loops that only append/accumulate
//! - `NestedIfDetector` - if-statements wrapping a single if-statement
//! - `IfChainDetector` - if/elif chains dispatching on one variable
//!
//! # Usage
//!
//! ```ignore
//! use pyrefine::detectors::analyze;
//! use pyrefine::syntax::parse_module;
//!
//! let tree = parse_module(source)?;
//! for issue in analyze(&tree).iter() {
//!     println!("{}", issue);
//! }
//! ```

mod base;
mod if_chain;
mod loop_append;
mod nested_if;

pub use base::{Detector, DetectorKind, Issue, IssueReport};
pub use if_chain::{IfChainDetector, MIN_CHAIN_LENGTH};
pub use loop_append::LoopAppendDetector;
pub use nested_if::NestedIfDetector;

pub(crate) use if_chain::{equality_test, flatten_chain};
pub(crate) use loop_append::append_call;

use crate::syntax::Node;

/// All detectors, in report order.
pub fn default_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(LoopAppendDetector),
        Box::new(NestedIfDetector),
        Box::new(IfChainDetector),
    ]
}

/// Run every detector over `tree`.
pub fn analyze(tree: &Node) -> IssueReport {
    let mut report = IssueReport::default();
    for detector in default_detectors() {
        let issues = detector.detect(tree);
        tracing::debug!("{}: {} issue(s)", detector.name(), issues.len());
        for issue in issues {
            report.push(issue);
        }
    }
    report
}
