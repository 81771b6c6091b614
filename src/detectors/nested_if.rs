//! Nested-conditional detector

use crate::detectors::base::{Detector, DetectorKind};
use crate::syntax::{Node, NodeKind};

/// Finds `if` statements whose body is a single `if` statement.
///
/// One level per match: a three-deep nest yields two issues.
pub struct NestedIfDetector;

impl Detector for NestedIfDetector {
    fn name(&self) -> &'static str {
        "nested-if"
    }

    fn description(&self) -> &'static str {
        "Detects if-statements whose only statement is another if-statement"
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::NestedIf
    }

    fn matches(&self, node: &Node) -> bool {
        match &node.kind {
            NodeKind::Conditional { body, .. } => matches!(
                body.as_slice(),
                [Node {
                    kind: NodeKind::Conditional { .. },
                    ..
                }]
            ),
            _ => false,
        }
    }
}
