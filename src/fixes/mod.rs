//! Rule-based rewrites
//!
//! Deterministic tree-to-tree transformations for the three detected
//! patterns. A rule re-validates the shape it rewrites and never mutates its
//! input; a node it cannot handle comes back as `Unchanged` with the reason.
//! `engine` drives the rules bottom-up over a module.

mod chain_dispatch;
mod engine;
mod loop_comprehension;
mod merge_if;

pub use chain_dispatch::{ChainToMapping, DISPATCH_VARIABLE};
pub use engine::{rewrite_module, TransformLog, TransformRecord, TransformStatus};
pub use loop_comprehension::LoopToComprehension;
pub use merge_if::MergeNestedIf;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::syntax::{Node, NodeKind};

/// Why a rule declined to rewrite a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchReason {
    /// The node is not the kind of statement the rule rewrites.
    NotApplicable,
    BodyNotSingleStatement,
    NotAppendCall,
    ReceiverNotIdentifier,
    LoopHasElse,
    AsyncLoop,
    BodyNotConditional,
    InnerHasElse,
    NoEqualityBranch,
    ChainElementMismatch,
    ComparatorNotConstant,
    SubjectMismatch,
    DuplicateKey,
    NonExpressionBranch,
    /// Moving the expression into a new scope would detach an `await` or
    /// `yield` from its function.
    SuspendingExpression,
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotApplicable => "node kind not handled by this rule",
            Self::BodyNotSingleStatement => "loop body is not a single statement",
            Self::NotAppendCall => "statement is not a one-argument append call",
            Self::ReceiverNotIdentifier => "append receiver is not a plain name",
            Self::LoopHasElse => "loop has an else branch",
            Self::AsyncLoop => "loop is asynchronous",
            Self::BodyNotConditional => "body is not a single if-statement",
            Self::InnerHasElse => "inner if-statement has an else branch",
            Self::NoEqualityBranch => "chain head is not an equality test",
            Self::ChainElementMismatch => "chain element is not an equality test",
            Self::ComparatorNotConstant => "comparator is not a literal",
            Self::SubjectMismatch => "chain compares different variables",
            Self::DuplicateKey => "chain repeats a literal",
            Self::NonExpressionBranch => "branch body is not a single expression",
            Self::SuspendingExpression => "expression contains await or yield",
        };
        f.write_str(text)
    }
}

/// Result of applying a rule to one node
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome {
    /// Statements that take the node's place in its parent body.
    Replaced(Vec<Node>),
    Unchanged(MismatchReason),
}

/// Handling of chain branches whose body is not one expression statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainBodyPolicy {
    /// Leave the chain untouched.
    #[default]
    Strict,
    /// Rewrite anyway, using `None` for such branches. Changes behaviour.
    Approximate,
}

impl std::str::FromStr for ChainBodyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "approximate" => Ok(Self::Approximate),
            other => Err(format!(
                "unknown chain body policy '{}' (expected strict or approximate)",
                other
            )),
        }
    }
}

/// Whether `node` contains an `await` or `yield`. Such expressions cannot
/// move into a lambda or comprehension. Opaque expression text is checked by
/// keyword, which may over-report.
pub(crate) fn suspends(node: &Node) -> bool {
    let mut found = false;
    node.walk(&mut |n| {
        found |= match &n.kind {
            NodeKind::Await(_) | NodeKind::Yield { .. } => true,
            NodeKind::Raw(text) => text.contains("await") || text.contains("yield"),
            _ => false,
        };
    });
    found
}

/// A tree rewrite for one pattern
pub trait Rule: Send + Sync {
    /// Unique identifier, shared with the matching detector
    fn name(&self) -> &'static str;

    fn apply(&self, node: &Node) -> TransformOutcome;

    /// Whether rewriting `node` drops code from it.
    fn lossy(&self, _node: &Node) -> bool {
        false
    }
}
