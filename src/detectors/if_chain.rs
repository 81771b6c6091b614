//! Conditional-chain detector

use crate::detectors::base::{Detector, DetectorKind};
use crate::syntax::{CmpOperator, Node, NodeKind};

/// Chains shorter than this are left alone.
pub const MIN_CHAIN_LENGTH: usize = 3;

/// Finds `if`/`elif` chains that compare one variable against literals.
pub struct IfChainDetector;

/// An `if`/`elif` chain flattened into its branches.
pub(crate) struct Chain<'a> {
    /// `(test, body)` of the head and every `elif`.
    pub branches: Vec<(&'a Node, &'a [Node])>,
    /// Body of the closing plain `else`.
    pub default: Option<&'a [Node]>,
}

/// Flatten the chain starting at `head`. `None` unless `head` is a
/// conditional that is not itself an `elif` continuation.
pub(crate) fn flatten_chain(head: &Node) -> Option<Chain<'_>> {
    let NodeKind::Conditional { elif: false, .. } = &head.kind else {
        return None;
    };

    let mut branches = Vec::new();
    let mut default = None;
    let mut current = head;
    while let NodeKind::Conditional {
        test, body, orelse, ..
    } = &current.kind
    {
        branches.push((test.as_ref(), body.as_slice()));
        match orelse.as_slice() {
            [] => break,
            [
                next @ Node {
                    kind: NodeKind::Conditional { elif: true, .. },
                    ..
                },
            ] => current = next,
            rest => {
                default = Some(rest);
                break;
            }
        }
    }
    Some(Chain { branches, default })
}

/// `<identifier> == <expr>`: the subject name and the comparator.
pub(crate) fn equality_test(test: &Node) -> Option<(&str, &Node)> {
    let NodeKind::Comparison {
        left,
        ops,
        comparators,
    } = &test.kind
    else {
        return None;
    };
    match (ops.as_slice(), comparators.as_slice()) {
        ([CmpOperator::Eq], [comparator]) => left.as_identifier().map(|name| (name, comparator)),
        _ => None,
    }
}

impl Detector for IfChainDetector {
    fn name(&self) -> &'static str {
        "if-chain"
    }

    fn description(&self) -> &'static str {
        "Detects if-elif chains that dispatch on one variable's value"
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::IfChain
    }

    fn matches(&self, node: &Node) -> bool {
        let Some(chain) = flatten_chain(node) else {
            return false;
        };
        if chain.branches.len() < MIN_CHAIN_LENGTH {
            return false;
        }

        let mut subject: Option<&str> = None;
        chain.branches.iter().all(|(test, _)| match equality_test(test) {
            Some((name, comparator)) if matches!(comparator.kind, NodeKind::Constant(_)) => {
                *subject.get_or_insert(name) == name
            }
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_module;

    fn count(source: &str) -> usize {
        let tree = parse_module(source).unwrap();
        IfChainDetector.detect(&tree).len()
    }

    #[test]
    fn test_three_branch_chain_detected() {
        let source = "\
if x == 1:
    a()
elif x == 2:
    b()
elif x == 3:
    c()
else:
    d()
";
        assert_eq!(count(source), 1);
    }

    #[test]
    fn test_two_branch_chain_ignored() {
        let source = "if x == 1:\n    a()\nelif x == 2:\n    b()\nelse:\n    c()\n";
        assert_eq!(count(source), 0);
    }

    #[test]
    fn test_different_subject_ignored() {
        let source = "\
if x == 1:
    a()
elif y == 2:
    b()
elif x == 3:
    c()
";
        assert_eq!(count(source), 0);
    }

    #[test]
    fn test_non_constant_comparator_ignored() {
        let source = "\
if x == 1:
    a()
elif x == other:
    b()
elif x == 3:
    c()
";
        assert_eq!(count(source), 0);
    }

    #[test]
    fn test_else_wrapping_if_ends_chain() {
        let source = "\
if x == 1:
    a()
elif x == 2:
    b()
else:
    if x == 3:
        c()
";
        assert_eq!(count(source), 0);
    }

    #[test]
    fn test_elif_never_reported_as_head() {
        let source = "\
if x == 0:
    z()
elif x == 1:
    a()
elif x == 2:
    b()
elif x == 3:
    c()
";
        let tree = parse_module(source).unwrap();
        let issues = IfChainDetector.detect(&tree);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line(), 1);
    }
}
