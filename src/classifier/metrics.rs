//! Source metrics used as classifier inputs
//!
//! All metrics work on the parsed `Node` tree, except `line_count` which
//! looks at raw text. Callers decide what a parse failure means; these
//! functions only see valid trees.

use crate::syntax::{Node, NodeKind};

/// Cyclomatic complexity averaged over every function and class block,
/// radon style. A module without blocks scores 0.
pub fn average_complexity(tree: &Node) -> f64 {
    let mut blocks: Vec<u32> = Vec::new();
    tree.walk(&mut |node| {
        if let NodeKind::FunctionDef { body, .. } | NodeKind::ClassDef { body, .. } = &node.kind {
            blocks.push(1 + body.iter().map(decision_points).sum::<u32>());
        }
    });
    if blocks.is_empty() {
        return 0.0;
    }
    blocks.iter().map(|&c| f64::from(c)).sum::<f64>() / blocks.len() as f64
}

/// Branch points inside `node`, not descending into nested blocks.
///
/// Loops and `try` count their `else` branch; every comprehension generator
/// counts once plus its `if` clauses, as radon does.
fn decision_points(node: &Node) -> u32 {
    let own = match &node.kind {
        NodeKind::FunctionDef { .. } | NodeKind::ClassDef { .. } => return 0,
        NodeKind::Loop { orelse, .. } | NodeKind::While { orelse, .. } => {
            1 + u32::from(!orelse.is_empty())
        }
        NodeKind::Conditional { .. } | NodeKind::With { .. } | NodeKind::IfExp { .. } => 1,
        NodeKind::Try {
            handlers, orelse, ..
        } => handlers.len() as u32 + u32::from(!orelse.is_empty()),
        NodeKind::Match { cases, .. } => cases.len() as u32,
        NodeKind::BoolOp { values, .. } => values.len().saturating_sub(1) as u32,
        NodeKind::Comprehension { generators, .. } => {
            generators.iter().map(|g| 1 + g.ifs.len() as u32).sum()
        }
        NodeKind::RawStatement(text) if text.starts_with("assert") => 1,
        _ => 0,
    };
    own + node
        .children()
        .into_iter()
        .map(decision_points)
        .sum::<u32>()
}

/// Number of lines of the snippet once surrounding whitespace is removed.
/// An empty snippet counts as one line.
pub fn line_count(code: &str) -> usize {
    code.trim().split('\n').count()
}

/// Depth of the deepest node below the module's top-level statements.
pub fn nesting_depth(tree: &Node) -> usize {
    tree.depth().saturating_sub(1)
}

/// Identifier occurrences that read a variable (assignment targets excluded).
pub fn variable_reads(tree: &Node) -> usize {
    loads(tree)
}

fn loads(node: &Node) -> usize {
    match &node.kind {
        NodeKind::Identifier(_) => 1,
        NodeKind::Assignment { targets, value } => {
            targets.iter().map(store_target).sum::<usize>() + loads(value)
        }
        NodeKind::AugmentedAssignment { target, value, .. } => store_target(target) + loads(value),
        NodeKind::AnnotatedAssignment { target, value, .. } => {
            store_target(target) + value.as_deref().map_or(0, loads)
        }
        NodeKind::Loop {
            target,
            iterable,
            body,
            orelse,
            ..
        } => {
            store_target(target)
                + loads(iterable)
                + body.iter().chain(orelse).map(loads).sum::<usize>()
        }
        NodeKind::NamedExpr { target, value } => store_target(target) + loads(value),
        NodeKind::Comprehension {
            element,
            value,
            generators,
            ..
        } => {
            loads(element)
                + value.as_deref().map_or(0, loads)
                + generators
                    .iter()
                    .map(|g| {
                        store_target(&g.target)
                            + loads(&g.iter)
                            + g.ifs.iter().map(loads).sum::<usize>()
                    })
                    .sum::<usize>()
        }
        _ => node.children().into_iter().map(loads).sum(),
    }
}

/// Reads inside an assignment target: bare names are writes, but the
/// object of `a.b = ...` or the operands of `a[i] = ...` are reads.
fn store_target(node: &Node) -> usize {
    match &node.kind {
        NodeKind::Identifier(_) => 0,
        NodeKind::Tuple(elements) | NodeKind::List(elements) => {
            elements.iter().map(store_target).sum()
        }
        NodeKind::Starred(inner) => store_target(inner),
        _ => loads(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_module;

    fn tree(source: &str) -> Node {
        parse_module(source).unwrap()
    }

    #[test]
    fn test_complexity_without_blocks_is_zero() {
        assert_eq!(average_complexity(&tree("x = 1\nif x:\n    pass\n")), 0.0);
    }

    #[test]
    fn test_complexity_counts_branches() {
        let source = "\
def f(a, b):
    if a and b:
        return 1
    for i in a:
        pass
    return 0
";
        // base 1 + if + and + for
        assert_eq!(average_complexity(&tree(source)), 4.0);
    }

    #[test]
    fn test_complexity_counts_else_branches_and_generators() {
        let loop_else = "def f(xs):\n    for x in xs:\n        pass\n    else:\n        pass\n";
        assert_eq!(average_complexity(&tree(loop_else)), 3.0);

        let try_else = "\
def f():
    try:
        go()
    except ValueError:
        pass
    else:
        done()
";
        assert_eq!(average_complexity(&tree(try_else)), 3.0);

        // a loop and the comprehension replacing it score the same
        let before = "def f(xs):\n    out = []\n    for x in xs:\n        out.append(x)\n    return out\n";
        let after = "def f(xs):\n    out = []\n    out = [x for x in xs]\n    return out\n";
        assert_eq!(average_complexity(&tree(before)), 2.0);
        assert_eq!(average_complexity(&tree(after)), 2.0);
        assert_eq!(average_complexity(&tree("def f(xs):\n    return [x for x in xs if x]\n")), 3.0);
    }

    #[test]
    fn test_complexity_averages_blocks() {
        let source = "def f():\n    pass\ndef g(x):\n    if x:\n        pass\n";
        assert_eq!(average_complexity(&tree(source)), 1.5);
    }

    #[test]
    fn test_line_count() {
        assert_eq!(line_count("\n\na = 1\nb = 2\n\n"), 2);
        assert_eq!(line_count(""), 1);
    }

    #[test]
    fn test_nesting_depth() {
        assert_eq!(nesting_depth(&tree("")), 0);
        assert_eq!(nesting_depth(&tree("pass\n")), 0);
        // Block -> Assignment -> Identifier
        assert_eq!(nesting_depth(&tree("x = 1\n")), 1);
        assert!(nesting_depth(&tree("if a:\n    if b:\n        x = 1\n")) > 1);
    }

    #[test]
    fn test_variable_reads_skip_targets() {
        assert_eq!(variable_reads(&tree("x = y + z\n")), 2);
        assert_eq!(variable_reads(&tree("a, b = b, a\n")), 2);
        assert_eq!(variable_reads(&tree("obj.attr = value\n")), 2);
        assert_eq!(variable_reads(&tree("for i in items:\n    print(i)\n")), 3);
        assert_eq!(variable_reads(&tree("r = [i * 2 for i in range(n)]\n")), 3);
    }
}
