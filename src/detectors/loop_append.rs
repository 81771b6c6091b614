//! Loop-to-collection detector

use crate::detectors::base::{Detector, DetectorKind};
use crate::syntax::{Node, NodeKind};

/// Finds `for` loops whose whole body collects into a variable.
pub struct LoopAppendDetector;

/// `<receiver>.append(<arg>)` with exactly one positional argument and no
/// keywords. Returns the receiver and the appended expression; callers decide
/// what receivers they accept.
pub(crate) fn append_call(statement: &Node) -> Option<(&Node, &Node)> {
    let NodeKind::Expression { value } = &statement.kind else {
        return None;
    };
    let NodeKind::Call {
        func,
        args,
        keywords,
    } = &value.kind
    else {
        return None;
    };
    let NodeKind::Attribute { value: receiver, attr } = &func.kind else {
        return None;
    };
    if attr != "append" || !keywords.is_empty() {
        return None;
    }
    match args.as_slice() {
        [arg] if !matches!(arg.kind, NodeKind::Starred(_)) => Some((receiver, arg)),
        _ => None,
    }
}

impl Detector for LoopAppendDetector {
    fn name(&self) -> &'static str {
        "loop-append"
    }

    fn description(&self) -> &'static str {
        "Detects for-loops that only append to a list"
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::LoopAppend
    }

    fn matches(&self, node: &Node) -> bool {
        let NodeKind::Loop { body, .. } = &node.kind else {
            return false;
        };
        match body.as_slice() {
            [statement] => {
                append_call(statement)
                    .is_some_and(|(receiver, _)| receiver.as_identifier().is_some())
                    || matches!(statement.kind, NodeKind::AugmentedAssignment { .. })
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_module;

    fn lines(source: &str) -> Vec<usize> {
        let tree = parse_module(source).unwrap();
        LoopAppendDetector
            .detect(&tree)
            .iter()
            .map(|i| i.line())
            .collect()
    }

    #[test]
    fn test_append_loop_detected() {
        let source = "result = []\nfor i in range(5):\n    result.append(i * 2)\n";
        assert_eq!(lines(source), vec![2]);
    }

    #[test]
    fn test_augmented_assignment_loop_detected() {
        assert_eq!(lines("for x in xs:\n    total += x\n"), vec![1]);
    }

    #[test]
    fn test_multi_statement_body_ignored() {
        let source = "for i in xs:\n    print(i)\n    out.append(i)\n";
        assert!(lines(source).is_empty());
    }

    #[test]
    fn test_keyword_or_extra_arguments_ignored() {
        assert!(lines("for i in xs:\n    out.append(i, key=1)\n").is_empty());
        assert!(lines("for i in xs:\n    out.append(i, 2)\n").is_empty());
        assert!(lines("for i in xs:\n    out.extend(i)\n").is_empty());
    }

    #[test]
    fn test_attribute_receiver_ignored() {
        assert!(lines("for i in xs:\n    self.out.append(i)\n").is_empty());
    }

    #[test]
    fn test_nested_loops_in_source_order() {
        let source = "\
def f():
    for a in xs:
        out.append(a)
    for b in ys:
        out.append(b)
";
        assert_eq!(lines(source), vec![2, 4]);
    }
}
