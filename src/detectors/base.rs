//! Base detector trait and types

use serde::Serialize;
use std::fmt;

use crate::syntax::{Node, Position};

/// Which pattern an issue belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorKind {
    LoopAppend,
    NestedIf,
    IfChain,
}

impl DetectorKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoopAppend => "loop-append",
            Self::NestedIf => "nested-if",
            Self::IfChain => "if-chain",
        }
    }

    /// Fixed message attached to every issue of this kind.
    pub fn message(&self) -> &'static str {
        match self {
            Self::LoopAppend => "For-loop can be converted to a list comprehension.",
            Self::NestedIf => "Nested if-statements can be merged.",
            Self::IfChain => "If-elif-else chain can be replaced with a dictionary.",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A located occurrence of an anti-pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub position: Position,
    pub message: String,
    pub detector: DetectorKind,
}

impl Issue {
    pub fn new(detector: DetectorKind, position: Position) -> Self {
        Self {
            position,
            message: detector.message().to_string(),
            detector,
        }
    }

    pub fn line(&self) -> usize {
        self.position.line
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.position.line, self.message)
    }
}

/// Trait for all pattern detectors
///
/// Detectors are read-only: they never mutate the tree they inspect.
/// `matches` decides a single node; `detect` applies it to every node of a
/// tree in pre-order, so each node is visited exactly once.
///
/// # Example Implementation
///
/// ```ignore
/// pub struct PassDetector;
///
/// impl Detector for PassDetector {
///     fn name(&self) -> &'static str { "pass" }
///     fn description(&self) -> &'static str { "Finds pass statements" }
///     fn kind(&self) -> DetectorKind { DetectorKind::NestedIf }
///     fn matches(&self, node: &Node) -> bool {
///         matches!(node.kind, NodeKind::Pass)
///     }
/// }
/// ```
pub trait Detector: Send + Sync {
    /// Unique identifier for this detector
    fn name(&self) -> &'static str;

    /// Human-readable description of what this detector finds
    fn description(&self) -> &'static str;

    fn kind(&self) -> DetectorKind;

    /// Whether `node` itself is an occurrence of the pattern.
    fn matches(&self, node: &Node) -> bool;

    /// Run detection over a whole tree, in source order.
    fn detect(&self, tree: &Node) -> Vec<Issue> {
        let mut issues = Vec::new();
        tree.walk(&mut |node| {
            if self.matches(node) {
                issues.push(Issue::new(self.kind(), node.pos));
            }
        });
        issues
    }
}

/// Issues of one file, grouped by pattern
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueReport {
    pub loops: Vec<Issue>,
    pub nested_conditionals: Vec<Issue>,
    pub conditional_chains: Vec<Issue>,
}

impl IssueReport {
    pub fn push(&mut self, issue: Issue) {
        match issue.detector {
            DetectorKind::LoopAppend => self.loops.push(issue),
            DetectorKind::NestedIf => self.nested_conditionals.push(issue),
            DetectorKind::IfChain => self.conditional_chains.push(issue),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.loops.len() + self.nested_conditionals.len() + self.conditional_chains.len()
    }

    /// All issues in report order: loops, nested conditionals, chains.
    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.loops
            .iter()
            .chain(&self.nested_conditionals)
            .chain(&self.conditional_chains)
    }
}
