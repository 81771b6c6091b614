//! Nested `if` → single `if` with a conjunction

use crate::fixes::{MismatchReason, Rule, TransformOutcome};
use crate::syntax::{BoolOperator, Node, NodeKind};

/// Merges `if a: if b: body` into `if a and b: body`.
///
/// The outer conditional's `else` (and its `elif` role) carry over, so an
/// outer else now also runs when `a` holds and `b` does not.
pub struct MergeNestedIf;

/// Operands of a conjunction, with an `and` on either side flattened.
fn conjuncts(test: &Node) -> Vec<Node> {
    match &test.kind {
        NodeKind::BoolOp {
            op: BoolOperator::And,
            values,
        } => values.clone(),
        _ => vec![test.clone()],
    }
}

impl Rule for MergeNestedIf {
    fn name(&self) -> &'static str {
        "nested-if"
    }

    fn apply(&self, node: &Node) -> TransformOutcome {
        let NodeKind::Conditional {
            test: outer_test,
            body: outer_body,
            orelse: outer_else,
            elif,
        } = &node.kind
        else {
            return TransformOutcome::Unchanged(MismatchReason::NotApplicable);
        };

        let [inner] = outer_body.as_slice() else {
            return TransformOutcome::Unchanged(MismatchReason::BodyNotConditional);
        };
        let NodeKind::Conditional {
            test: inner_test,
            body: inner_body,
            orelse: inner_else,
            ..
        } = &inner.kind
        else {
            return TransformOutcome::Unchanged(MismatchReason::BodyNotConditional);
        };
        if !inner_else.is_empty() {
            return TransformOutcome::Unchanged(MismatchReason::InnerHasElse);
        }

        let mut values = conjuncts(outer_test);
        values.extend(conjuncts(inner_test));
        let test = Node::new(
            outer_test.pos,
            NodeKind::BoolOp {
                op: BoolOperator::And,
                values,
            },
        );

        TransformOutcome::Replaced(vec![Node::new(
            node.pos,
            NodeKind::Conditional {
                test: Box::new(test),
                body: inner_body.clone(),
                orelse: outer_else.clone(),
                elif: *elif,
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse_module, unparse_statements};

    fn first_statement(source: &str) -> Node {
        match parse_module(source).unwrap().kind {
            NodeKind::Block { mut body } => body.remove(0),
            other => panic!("expected block, got {:?}", other),
        }
    }

    fn rewritten(source: &str) -> String {
        match MergeNestedIf.apply(&first_statement(source)) {
            TransformOutcome::Replaced(stmts) => unparse_statements(&stmts),
            other => panic!("expected replacement, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_two_levels() {
        assert_eq!(
            rewritten("if a > 0:\n    if b:\n        go()\n"),
            "if a > 0 and b:\n    go()\n"
        );
    }

    #[test]
    fn test_conjunctions_flattened() {
        assert_eq!(
            rewritten("if a and b:\n    if c and d:\n        go()\n"),
            "if a and b and c and d:\n    go()\n"
        );
    }

    #[test]
    fn test_disjunction_parenthesized() {
        assert_eq!(
            rewritten("if a or b:\n    if c:\n        go()\n"),
            "if (a or b) and c:\n    go()\n"
        );
    }

    #[test]
    fn test_outer_else_kept() {
        assert_eq!(
            rewritten("if a:\n    if b:\n        go()\nelse:\n    stop()\n"),
            "if a and b:\n    go()\nelse:\n    stop()\n"
        );
    }

    #[test]
    fn test_inner_else_rejected() {
        let node = first_statement("if a:\n    if b:\n        go()\n    else:\n        stop()\n");
        assert_eq!(
            MergeNestedIf.apply(&node),
            TransformOutcome::Unchanged(MismatchReason::InnerHasElse)
        );
    }

    #[test]
    fn test_body_not_conditional() {
        let node = first_statement("if a:\n    go()\n");
        assert_eq!(
            MergeNestedIf.apply(&node),
            TransformOutcome::Unchanged(MismatchReason::BodyNotConditional)
        );
    }
}
