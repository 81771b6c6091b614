//! Bottom-up rewrite driver
//!
//! Walks every statement body of a module, rewriting nested bodies before
//! the statement that contains them. A rule is only invoked where its
//! detector reports the pattern. For a conditional the merge rule runs first
//! and the chain rule then sees the merged result.
//!
//! One pass is not a fixed point: a rewrite can expose a new match in its
//! parent that was already visited, which a second run would pick up.

use tracing::debug;

use crate::detectors::{Detector, IfChainDetector, LoopAppendDetector, NestedIfDetector};
use crate::fixes::{
    ChainBodyPolicy, ChainToMapping, LoopToComprehension, MergeNestedIf, MismatchReason, Rule,
    TransformOutcome,
};
use crate::syntax::{Clause, Node, NodeKind, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformStatus {
    Applied,
    Skipped(MismatchReason),
}

/// One rule decision at one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRecord {
    pub rule: &'static str,
    pub position: Position,
    pub status: TransformStatus,
    /// The applied rewrite dropped code.
    pub lossy: bool,
}

/// Every decision taken while rewriting one module, in visiting order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformLog {
    records: Vec<TransformRecord>,
}

impl TransformLog {
    pub fn records(&self) -> &[TransformRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransformRecord> {
        self.records.iter()
    }

    pub fn applied(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == TransformStatus::Applied)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.records.len() - self.applied()
    }

    pub fn any_applied(&self) -> bool {
        self.applied() > 0
    }

    pub fn is_lossy(&self) -> bool {
        self.records.iter().any(|r| r.lossy)
    }
}

/// Rewrite every supported pattern in `tree`.
///
/// The input is left untouched; the returned tree shares no nodes with it.
pub fn rewrite_module(tree: &Node, policy: ChainBodyPolicy) -> (Node, TransformLog) {
    let mut rewriter = Rewriter {
        chain_rule: ChainToMapping::new(policy),
        log: TransformLog::default(),
    };
    let rewritten = match &tree.kind {
        NodeKind::Block { body } => Node::new(
            tree.pos,
            NodeKind::Block {
                body: rewriter.body(body),
            },
        ),
        _ => {
            let mut body = rewriter.body(std::slice::from_ref(tree));
            match body.len() {
                1 => body.remove(0),
                _ => Node::new(tree.pos, NodeKind::Block { body }),
            }
        }
    };
    (rewritten, rewriter.log)
}

struct Rewriter {
    chain_rule: ChainToMapping,
    log: TransformLog,
}

impl Rewriter {
    fn body(&mut self, statements: &[Node]) -> Vec<Node> {
        let mut out = Vec::with_capacity(statements.len());
        for statement in statements {
            let statement = self.children(statement);
            out.extend(self.site(statement));
        }
        out
    }

    fn clauses(&mut self, clauses: &[Clause]) -> Vec<Clause> {
        clauses
            .iter()
            .map(|clause| Clause {
                header: clause.header.clone(),
                body: self.body(&clause.body),
            })
            .collect()
    }

    /// Copy of `node` with its nested statement bodies rewritten.
    fn children(&mut self, node: &Node) -> Node {
        let kind = match &node.kind {
            NodeKind::Block { body } => NodeKind::Block {
                body: self.body(body),
            },
            NodeKind::FunctionDef {
                name,
                params,
                returns,
                decorators,
                body,
                is_async,
            } => NodeKind::FunctionDef {
                name: name.clone(),
                params: params.clone(),
                returns: returns.clone(),
                decorators: decorators.clone(),
                body: self.body(body),
                is_async: *is_async,
            },
            NodeKind::ClassDef {
                name,
                bases,
                decorators,
                body,
            } => NodeKind::ClassDef {
                name: name.clone(),
                bases: bases.clone(),
                decorators: decorators.clone(),
                body: self.body(body),
            },
            NodeKind::Loop {
                target,
                iterable,
                body,
                orelse,
                is_async,
            } => NodeKind::Loop {
                target: target.clone(),
                iterable: iterable.clone(),
                body: self.body(body),
                orelse: self.body(orelse),
                is_async: *is_async,
            },
            NodeKind::While { test, body, orelse } => NodeKind::While {
                test: test.clone(),
                body: self.body(body),
                orelse: self.body(orelse),
            },
            NodeKind::Conditional {
                test,
                body,
                orelse,
                elif,
            } => NodeKind::Conditional {
                test: test.clone(),
                body: self.body(body),
                orelse: self.body(orelse),
                elif: *elif,
            },
            NodeKind::With {
                items,
                body,
                is_async,
            } => NodeKind::With {
                items: items.clone(),
                body: self.body(body),
                is_async: *is_async,
            },
            NodeKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => NodeKind::Try {
                body: self.body(body),
                handlers: self.clauses(handlers),
                orelse: self.body(orelse),
                finalbody: self.body(finalbody),
            },
            NodeKind::Match { subject, cases } => NodeKind::Match {
                subject: subject.clone(),
                cases: self.clauses(cases),
            },
            NodeKind::Return { .. }
            | NodeKind::Assignment { .. }
            | NodeKind::AnnotatedAssignment { .. }
            | NodeKind::AugmentedAssignment { .. }
            | NodeKind::Expression { .. }
            | NodeKind::Pass
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::RawStatement(_)
            | NodeKind::Identifier(_)
            | NodeKind::Constant(_)
            | NodeKind::Attribute { .. }
            | NodeKind::Call { .. }
            | NodeKind::BinaryOp { .. }
            | NodeKind::BoolOp { .. }
            | NodeKind::UnaryOp { .. }
            | NodeKind::Comparison { .. }
            | NodeKind::IfExp { .. }
            | NodeKind::Lambda { .. }
            | NodeKind::Mapping { .. }
            | NodeKind::List(_)
            | NodeKind::Tuple(_)
            | NodeKind::Set(_)
            | NodeKind::Comprehension { .. }
            | NodeKind::Subscript { .. }
            | NodeKind::Slice { .. }
            | NodeKind::Starred(_)
            | NodeKind::NamedExpr { .. }
            | NodeKind::Await(_)
            | NodeKind::Yield { .. }
            | NodeKind::Raw(_) => return node.clone(),
        };
        Node::new(node.pos, kind)
    }

    /// Apply the rules whose pattern `node` exhibits.
    fn site(&mut self, node: Node) -> Vec<Node> {
        if matches!(node.kind, NodeKind::Loop { .. }) && LoopAppendDetector.matches(&node) {
            return self.attempt(&LoopToComprehension, node);
        }
        if !matches!(node.kind, NodeKind::Conditional { .. }) {
            return vec![node];
        }

        let merged = if NestedIfDetector.matches(&node) {
            self.attempt(&MergeNestedIf, node)
        } else {
            vec![node]
        };
        let mut out = Vec::with_capacity(merged.len());
        for candidate in merged {
            if IfChainDetector.matches(&candidate) {
                let rule = self.chain_rule;
                out.extend(self.attempt(&rule, candidate));
            } else {
                out.push(candidate);
            }
        }
        out
    }

    fn attempt(&mut self, rule: &dyn Rule, node: Node) -> Vec<Node> {
        match rule.apply(&node) {
            TransformOutcome::Replaced(statements) => {
                debug!("{} applied at line {}", rule.name(), node.pos.line);
                self.log.records.push(TransformRecord {
                    rule: rule.name(),
                    position: node.pos,
                    status: TransformStatus::Applied,
                    lossy: rule.lossy(&node),
                });
                statements
            }
            TransformOutcome::Unchanged(reason) => {
                debug!("{} skipped at line {}: {}", rule.name(), node.pos.line, reason);
                self.log.records.push(TransformRecord {
                    rule: rule.name(),
                    position: node.pos,
                    status: TransformStatus::Skipped(reason),
                    lossy: false,
                });
                vec![node]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse_module, unparse};

    fn rewrite(source: &str) -> (String, TransformLog) {
        let tree = parse_module(source).unwrap();
        let (rewritten, log) = rewrite_module(&tree, ChainBodyPolicy::Strict);
        (unparse(&rewritten), log)
    }

    #[test]
    fn test_loop_inside_function_rewritten() {
        let source = "\
def evens(n):
    result = []
    for i in range(n):
        result.append(i * 2)
    return result
";
        let (out, log) = rewrite(source);
        assert_eq!(
            out,
            "def evens(n):\n    result = []\n    result = [i * 2 for i in range(n)]\n    return result\n"
        );
        assert_eq!(log.applied(), 1);
        assert_eq!(log.records()[0].position.line, 3);
    }

    #[test]
    fn test_three_level_nest_merges_bottom_up() {
        let source = "if a:\n    if b:\n        if c:\n            go()\n";
        let (out, log) = rewrite(source);
        assert_eq!(out, "if a and b and c:\n    go()\n");
        assert_eq!(log.applied(), 2);
    }

    #[test]
    fn test_merge_then_chain_on_same_site() {
        let source = "\
if x == 1:
    a()
elif x == 2:
    if ready:
        b()
elif x == 3:
    c()
";
        let (out, log) = rewrite(source);
        // the merged elif no longer compares x to a literal, so the chain stays
        assert!(out.contains("elif x == 2 and ready:\n    b()\n"));
        assert_eq!(log.applied(), 1);
    }

    #[test]
    fn test_chain_rewritten_only_from_three_branches() {
        let two = "if x == 1:\n    a()\nelif x == 2:\n    b()\nelse:\n    c()\n";
        let (out, log) = rewrite(two);
        assert_eq!(out, two);
        assert!(log.records().is_empty());

        let three = "if x == 1:\n    a()\nelif x == 2:\n    b()\nelif x == 3:\n    c()\n";
        let (out, _) = rewrite(three);
        assert_eq!(
            out,
            "actions = {1: lambda: a(), 2: lambda: b(), 3: lambda: c()}\nactions.get(x)()\n"
        );
    }

    #[test]
    fn test_skips_are_logged() {
        let (out, log) = rewrite("for x in xs:\n    total += x\n");
        assert_eq!(out, "for x in xs:\n    total += x\n");
        assert_eq!(log.applied(), 0);
        assert_eq!(
            log.records()[0].status,
            TransformStatus::Skipped(MismatchReason::NotAppendCall)
        );
    }

    #[test]
    fn test_nested_in_try_and_class() {
        let source = "\
class A:
    def run(self):
        try:
            for i in xs:
                out.append(i)
        except Exception:
            pass
";
        let (out, log) = rewrite(source);
        assert!(out.contains("            out = [i for i in xs]\n"));
        assert_eq!(log.applied(), 1);
    }
}
