//! `if`/`elif` chain → dictionary dispatch

use crate::detectors::{equality_test, flatten_chain};
use crate::fixes::{suspends, ChainBodyPolicy, MismatchReason, Rule, TransformOutcome};
use crate::syntax::{Keyword, MappingEntry, Node, NodeKind, Position};

/// Name bound to the generated dispatch table.
pub const DISPATCH_VARIABLE: &str = "actions";

/// Rewrites
///
/// ```text
/// if x == 1:
///     a()
/// elif x == 2:
///     b()
/// else:
///     c()
/// ```
///
/// into
///
/// ```text
/// actions = {1: lambda: a(), 2: lambda: b()}
/// actions.get(x, lambda: c())()
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainToMapping {
    pub policy: ChainBodyPolicy,
}

impl ChainToMapping {
    pub fn new(policy: ChainBodyPolicy) -> Self {
        Self { policy }
    }

    /// Lambda body for a branch, or why it cannot become one.
    fn branch_expr(&self, body: &[Node], pos: Position) -> Result<Node, MismatchReason> {
        match body {
            [Node {
                kind: NodeKind::Expression { value },
                ..
            }] if suspends(value) => Err(MismatchReason::SuspendingExpression),
            [Node {
                kind: NodeKind::Expression { value },
                ..
            }] => Ok(value.as_ref().clone()),
            _ => match self.policy {
                ChainBodyPolicy::Strict => Err(MismatchReason::NonExpressionBranch),
                ChainBodyPolicy::Approximate => Ok(Node::constant(pos, "None")),
            },
        }
    }
}

/// Dictionary identity of a literal as Python hashes it: `1`, `1.0`, `0x1`
/// and `True` are one key, as are `'a'` and `"a"`.
#[derive(Debug, Clone, PartialEq)]
enum LiteralKey {
    Number(f64),
    Imaginary(f64),
    Text { bytes: bool, value: String },
    /// A string whose value is not read here (escapes, implicit
    /// concatenation). May equal any string of the same kind.
    OpaqueText { bytes: bool },
    /// `None`, `...` and anything else compared by spelling.
    Other(String),
}

impl LiteralKey {
    fn of(literal: &str) -> Self {
        match literal {
            "True" => return Self::Number(1.0),
            "False" => return Self::Number(0.0),
            _ => {}
        }
        match literal.find(['\'', '"']) {
            Some(start) => string_key(&literal[..start], &literal[start..]),
            None if literal.starts_with(|c: char| c.is_ascii_digit() || c == '.') => {
                number_key(literal).unwrap_or_else(|| Self::Other(literal.to_string()))
            }
            None => Self::Other(literal.to_string()),
        }
    }

    fn may_equal(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::OpaqueText { bytes: a }, Self::Text { bytes: b, .. })
            | (Self::OpaqueText { bytes: a }, Self::OpaqueText { bytes: b })
            | (Self::Text { bytes: a, .. }, Self::OpaqueText { bytes: b }) => a == b,
            _ => self == other,
        }
    }
}

fn number_key(literal: &str) -> Option<LiteralKey> {
    let digits = literal.replace('_', "").to_ascii_lowercase();
    if let Some(imag) = digits.strip_suffix('j') {
        let value: f64 = imag.parse().ok()?;
        return Some(if value == 0.0 {
            LiteralKey::Number(0.0)
        } else {
            LiteralKey::Imaginary(value)
        });
    }
    let radix = match digits.get(..2) {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    let value = match radix {
        Some(radix) => u128::from_str_radix(&digits[2..], radix).ok()? as f64,
        None => digits.parse::<f64>().ok()?,
    };
    Some(LiteralKey::Number(value))
}

fn string_key(prefix: &str, quoted: &str) -> LiteralKey {
    let prefix = prefix.to_ascii_lowercase();
    let bytes = prefix.contains('b');
    let raw = prefix.contains('r');
    let value = ["\"\"\"", "'''", "\"", "'"]
        .into_iter()
        .find(|d| quoted.starts_with(d))
        .and_then(|d| {
            let inner = quoted.strip_prefix(d)?.strip_suffix(d)?;
            let plain = !inner.contains(d) && (raw || !inner.contains('\\'));
            plain.then(|| inner.to_string())
        });
    match value {
        Some(value) => LiteralKey::Text { bytes, value },
        None => LiteralKey::OpaqueText { bytes },
    }
}

fn is_single_expression(body: &[Node]) -> bool {
    matches!(
        body,
        [Node {
            kind: NodeKind::Expression { .. },
            ..
        }]
    )
}

fn thunk(pos: Position, body: Node) -> Node {
    Node::new(
        pos,
        NodeKind::Lambda {
            params: String::new(),
            body: Box::new(body),
        },
    )
}

impl Rule for ChainToMapping {
    fn name(&self) -> &'static str {
        "if-chain"
    }

    fn apply(&self, node: &Node) -> TransformOutcome {
        let Some(chain) = flatten_chain(node) else {
            return TransformOutcome::Unchanged(MismatchReason::NotApplicable);
        };
        let pos = node.pos;

        let mut subject: Option<&Node> = None;
        let mut seen: Vec<LiteralKey> = Vec::new();
        let mut entries = Vec::with_capacity(chain.branches.len());

        for (index, (test, body)) in chain.branches.iter().enumerate() {
            let Some((name, comparator)) = equality_test(test) else {
                let reason = if index == 0 {
                    MismatchReason::NoEqualityBranch
                } else {
                    MismatchReason::ChainElementMismatch
                };
                return TransformOutcome::Unchanged(reason);
            };
            let NodeKind::Constant(literal) = &comparator.kind else {
                return TransformOutcome::Unchanged(MismatchReason::ComparatorNotConstant);
            };
            match subject {
                Some(first) if first.as_identifier() != Some(name) => {
                    return TransformOutcome::Unchanged(MismatchReason::SubjectMismatch);
                }
                Some(_) => {}
                None => {
                    if let NodeKind::Comparison { left, .. } = &test.kind {
                        subject = Some(left.as_ref());
                    }
                }
            }
            let key = LiteralKey::of(literal);
            if seen.iter().any(|other| other.may_equal(&key)) {
                return TransformOutcome::Unchanged(MismatchReason::DuplicateKey);
            }
            seen.push(key);

            let expr = match self.branch_expr(body, test.pos) {
                Ok(expr) => expr,
                Err(reason) => return TransformOutcome::Unchanged(reason),
            };
            entries.push(MappingEntry {
                key: Some(comparator.clone()),
                value: thunk(test.pos, expr),
            });
        }

        let Some(subject) = subject else {
            return TransformOutcome::Unchanged(MismatchReason::NoEqualityBranch);
        };

        let mut args = vec![subject.clone()];
        if let Some(default) = chain.default {
            let expr = match self.branch_expr(default, pos) {
                Ok(expr) => expr,
                Err(reason) => return TransformOutcome::Unchanged(reason),
            };
            args.push(thunk(pos, expr));
        }

        let table = Node::new(
            pos,
            NodeKind::Assignment {
                targets: vec![Node::identifier(pos, DISPATCH_VARIABLE)],
                value: Box::new(Node::new(pos, NodeKind::Mapping { entries })),
            },
        );
        let lookup = Node::new(
            pos,
            NodeKind::Call {
                func: Box::new(Node::new(
                    pos,
                    NodeKind::Attribute {
                        value: Box::new(Node::identifier(pos, DISPATCH_VARIABLE)),
                        attr: "get".to_string(),
                    },
                )),
                args,
                keywords: Vec::<Keyword>::new(),
            },
        );
        let dispatch = Node::new(
            pos,
            NodeKind::Expression {
                value: Box::new(Node::new(
                    pos,
                    NodeKind::Call {
                        func: Box::new(lookup),
                        args: Vec::new(),
                        keywords: Vec::new(),
                    },
                )),
            },
        );

        TransformOutcome::Replaced(vec![table, dispatch])
    }

    fn lossy(&self, node: &Node) -> bool {
        if self.policy == ChainBodyPolicy::Strict {
            return false;
        }
        flatten_chain(node).is_some_and(|chain| {
            chain
                .branches
                .iter()
                .any(|(_, body)| !is_single_expression(body))
                || chain.default.is_some_and(|d| !is_single_expression(d))
        })
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

    #[test]
    fn test_two_branches_with_default() {
        let node = first_statement("if x == 1:\n    a()\nelif x == 2:\n    b()\nelse:\n    c()\n");
        match ChainToMapping::default().apply(&node) {
            TransformOutcome::Replaced(stmts) => {
                assert_eq!(stmts.len(), 2);
                assert_eq!(
                    unparse_statements(&stmts),
                    "actions = {1: lambda: a(), 2: lambda: b()}\nactions.get(x, lambda: c())()\n"
                );
            }
            other => panic!("expected replacement, got {:?}", other),
        }
    }

    #[test]
    fn test_no_default_branch() {
        let node = first_statement(
            "if cmd == 'start':\n    run()\nelif cmd == 'stop':\n    halt()\nelif cmd == 'pause':\n    wait(1)\n",
        );
        match ChainToMapping::default().apply(&node) {
            TransformOutcome::Replaced(stmts) => assert_eq!(
                unparse_statements(&stmts),
                "actions = {'start': lambda: run(), 'stop': lambda: halt(), 'pause': lambda: wait(1)}\nactions.get(cmd)()\n"
            ),
            other => panic!("expected replacement, got {:?}", other),
        }
    }

    #[test]
    fn test_mismatch_reasons() {
        let cases = [
            (
                "if x > 1:\n    a()\nelif x == 2:\n    b()\n",
                MismatchReason::NoEqualityBranch,
            ),
            (
                "if x == 1:\n    a()\nelif x > 2:\n    b()\n",
                MismatchReason::ChainElementMismatch,
            ),
            (
                "if x == 1:\n    a()\nelif y == 2:\n    b()\n",
                MismatchReason::SubjectMismatch,
            ),
            (
                "if x == 1:\n    a()\nelif x == k:\n    b()\n",
                MismatchReason::ComparatorNotConstant,
            ),
            (
                "if x == 1:\n    a()\nelif x == 1:\n    b()\n",
                MismatchReason::DuplicateKey,
            ),
            (
                "if x == 1:\n    y = 2\nelif x == 2:\n    b()\n",
                MismatchReason::NonExpressionBranch,
            ),
            ("pass\n", MismatchReason::NotApplicable),
        ];
        for (source, reason) in cases {
            assert_eq!(
                ChainToMapping::default().apply(&first_statement(source)),
                TransformOutcome::Unchanged(reason),
                "source: {}",
                source
            );
        }
    }

    #[test]
    fn test_equal_keys_in_different_spellings_refused() {
        let chains = [
            "if x == 1:\n    a()\nelif x == True:\n    b()\nelif x == 2:\n    c()\n",
            "if x == 1:\n    a()\nelif x == 1.0:\n    b()\n",
            "if x == 16:\n    a()\nelif x == 0x10:\n    b()\n",
            "if x == 0:\n    a()\nelif x == False:\n    b()\n",
            "if x == 1_000:\n    a()\nelif x == 1e3:\n    b()\n",
            "if x == 'a':\n    a()\nelif x == \"a\":\n    b()\n",
            "if x == 'a':\n    a()\nelif x == r'a':\n    b()\n",
            "if x == 'a':\n    a()\nelif x == '\\x61':\n    b()\n",
        ];
        for source in chains {
            assert_eq!(
                ChainToMapping::default().apply(&first_statement(source)),
                TransformOutcome::Unchanged(MismatchReason::DuplicateKey),
                "source: {}",
                source
            );
        }
    }

    #[test]
    fn test_distinct_keys_of_mixed_kinds_accepted() {
        let source =
            "if x == 1:\n    a()\nelif x == '1':\n    b()\nelif x == b'1':\n    c()\nelif x == None:\n    d()\nelif x == 2j:\n    e()\n";
        assert!(matches!(
            ChainToMapping::default().apply(&first_statement(source)),
            TransformOutcome::Replaced(_)
        ));
    }

    #[test]
    fn test_await_or_yield_branch_left_alone() {
        let chains = [
            "if x == 1:\n    await a()\nelif x == 2:\n    b()\n",
            "if x == 1:\n    a()\nelif x == 2:\n    b()\nelse:\n    (yield x)\n",
        ];
        for source in chains {
            assert_eq!(
                ChainToMapping::default().apply(&first_statement(source)),
                TransformOutcome::Unchanged(MismatchReason::SuspendingExpression),
                "source: {}",
                source
            );
        }
    }

    #[test]
    fn test_approximate_policy_substitutes_none() {
        let rule = ChainToMapping::new(ChainBodyPolicy::Approximate);
        let node = first_statement(
            "if x == 1:\n    y = 2\nelif x == 2:\n    b()\nelse:\n    log()\n    c()\n",
        );
        assert!(rule.lossy(&node));
        match rule.apply(&node) {
            TransformOutcome::Replaced(stmts) => assert_eq!(
                unparse_statements(&stmts),
                "actions = {1: lambda: None, 2: lambda: b()}\nactions.get(x, lambda: None)()\n"
            ),
            other => panic!("expected replacement, got {:?}", other),
        }
        assert!(!ChainToMapping::default().lossy(&node));
    }
}
