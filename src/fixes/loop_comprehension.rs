//! `for` loop → list comprehension

use crate::detectors::append_call;
use crate::fixes::{suspends, MismatchReason, Rule, TransformOutcome};
use crate::syntax::{ComprehensionKind, Generator, Node, NodeKind};

/// Rewrites
///
/// ```text
/// for t in items:
///     out.append(expr)
/// ```
///
/// into `out = [expr for t in items]`.
///
/// The rewrite rebinds `out` rather than extending it, so anything the list
/// held before the loop is dropped.
pub struct LoopToComprehension;

impl Rule for LoopToComprehension {
    fn name(&self) -> &'static str {
        "loop-append"
    }

    fn apply(&self, node: &Node) -> TransformOutcome {
        let NodeKind::Loop {
            target,
            iterable,
            body,
            orelse,
            is_async,
        } = &node.kind
        else {
            return TransformOutcome::Unchanged(MismatchReason::NotApplicable);
        };

        let [statement] = body.as_slice() else {
            return TransformOutcome::Unchanged(MismatchReason::BodyNotSingleStatement);
        };
        if !orelse.is_empty() {
            return TransformOutcome::Unchanged(MismatchReason::LoopHasElse);
        }
        if *is_async {
            return TransformOutcome::Unchanged(MismatchReason::AsyncLoop);
        }

        let Some((receiver, element)) = append_call(statement) else {
            return TransformOutcome::Unchanged(MismatchReason::NotAppendCall);
        };
        if receiver.as_identifier().is_none() {
            return TransformOutcome::Unchanged(MismatchReason::ReceiverNotIdentifier);
        }
        if [target.as_ref(), iterable.as_ref(), element].into_iter().any(suspends) {
            return TransformOutcome::Unchanged(MismatchReason::SuspendingExpression);
        }

        let comprehension = Node::new(
            node.pos,
            NodeKind::Comprehension {
                kind: ComprehensionKind::List,
                element: Box::new(element.clone()),
                value: None,
                generators: vec![Generator {
                    target: target.as_ref().clone(),
                    iter: iterable.as_ref().clone(),
                    ifs: Vec::new(),
                    is_async: false,
                }],
            },
        );
        TransformOutcome::Replaced(vec![Node::new(
            node.pos,
            NodeKind::Assignment {
                targets: vec![receiver.clone()],
                value: Box::new(comprehension),
            },
        )])
    }
}
