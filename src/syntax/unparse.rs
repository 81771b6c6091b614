//! `Node` → Python source text
//!
//! Output follows the conventions of CPython's `ast.unparse`: four-space
//! indentation, no blank lines, minimal parentheses derived from operator
//! precedence. Raw text is emitted unchanged; continuation lines of a raw
//! fragment keep their original indentation.

use super::{BinOperator, BoolOperator, Clause, ComprehensionKind, Node, NodeKind, UnaryOperator};

const INDENT: &str = "    ";

/// Binding strength, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    NamedExpr,
    Tuple,
    Yield,
    Test,
    Or,
    And,
    Not,
    Cmp,
    BitOr,
    BitXor,
    BitAnd,
    Shift,
    Arith,
    Term,
    Factor,
    Power,
    Await,
    Atom,
}

impl Prec {
    fn next(self) -> Prec {
        match self {
            Prec::NamedExpr => Prec::Tuple,
            Prec::Tuple => Prec::Yield,
            Prec::Yield => Prec::Test,
            Prec::Test => Prec::Or,
            Prec::Or => Prec::And,
            Prec::And => Prec::Not,
            Prec::Not => Prec::Cmp,
            Prec::Cmp => Prec::BitOr,
            Prec::BitOr => Prec::BitXor,
            Prec::BitXor => Prec::BitAnd,
            Prec::BitAnd => Prec::Shift,
            Prec::Shift => Prec::Arith,
            Prec::Arith => Prec::Term,
            Prec::Term => Prec::Factor,
            Prec::Factor => Prec::Power,
            Prec::Power => Prec::Await,
            Prec::Await | Prec::Atom => Prec::Atom,
        }
    }

    fn of_bin(op: BinOperator) -> Prec {
        match op {
            BinOperator::BitOr => Prec::BitOr,
            BinOperator::BitXor => Prec::BitXor,
            BinOperator::BitAnd => Prec::BitAnd,
            BinOperator::LShift | BinOperator::RShift => Prec::Shift,
            BinOperator::Add | BinOperator::Sub => Prec::Arith,
            BinOperator::Mult
            | BinOperator::MatMult
            | BinOperator::Div
            | BinOperator::FloorDiv
            | BinOperator::Mod => Prec::Term,
            BinOperator::Pow => Prec::Power,
        }
    }
}

/// Render a module, statement or expression.
pub fn unparse(node: &Node) -> String {
    let mut writer = Unparser::default();
    if node.is_statement() {
        writer.statement(node);
    } else {
        writer.expr(node, Prec::Tuple);
    }
    writer.out
}

pub fn unparse_statements(statements: &[Node]) -> String {
    let mut writer = Unparser::default();
    writer.block(statements);
    writer.out
}

/// Render an expression at statement level (no surrounding newline).
pub fn unparse_expr(node: &Node) -> String {
    let mut writer = Unparser::default();
    writer.expr(node, Prec::Tuple);
    writer.out
}

#[derive(Default)]
struct Unparser {
    out: String,
    depth: usize,
}

impl Unparser {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn render(&self, node: &Node, ctx: Prec) -> String {
        let mut sub = Unparser::default();
        sub.expr(node, ctx);
        sub.out
    }

    fn block(&mut self, body: &[Node]) {
        if body.is_empty() {
            self.line("pass");
            return;
        }
        for stmt in body {
            self.statement(stmt);
        }
    }

    fn suite(&mut self, header: &str, body: &[Node]) {
        self.line(&format!("{}:", header));
        self.depth += 1;
        self.block(body);
        self.depth -= 1;
    }

    fn clauses(&mut self, clauses: &[Clause]) {
        for clause in clauses {
            self.suite(&clause.header, &clause.body);
        }
    }

    fn decorators(&mut self, decorators: &[Node]) {
        for decorator in decorators {
            let text = format!("@{}", self.render(decorator, Prec::NamedExpr));
            self.line(&text);
        }
    }

    fn statement(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::Block { body } => {
                for stmt in body {
                    self.statement(stmt);
                }
            }
            NodeKind::FunctionDef {
                name,
                params,
                returns,
                decorators,
                body,
                is_async,
            } => {
                self.decorators(decorators);
                let mut header = format!(
                    "{}def {}{}",
                    if *is_async { "async " } else { "" },
                    name,
                    params
                );
                if let Some(returns) = returns {
                    header.push_str(" -> ");
                    header.push_str(returns);
                }
                self.suite(&header, body);
            }
            NodeKind::ClassDef {
                name,
                bases,
                decorators,
                body,
            } => {
                self.decorators(decorators);
                let header = format!("class {}{}", name, bases.as_deref().unwrap_or(""));
                self.suite(&header, body);
            }
            NodeKind::Loop {
                target,
                iterable,
                body,
                orelse,
                is_async,
            } => {
                let header = format!(
                    "{}for {} in {}",
                    if *is_async { "async " } else { "" },
                    self.render(target, Prec::Tuple),
                    self.render(iterable, Prec::Test)
                );
                self.suite(&header, body);
                if !orelse.is_empty() {
                    self.suite("else", orelse);
                }
            }
            NodeKind::While { test, body, orelse } => {
                let header = format!("while {}", self.render(test, Prec::Test));
                self.suite(&header, body);
                if !orelse.is_empty() {
                    self.suite("else", orelse);
                }
            }
            NodeKind::Conditional { .. } => self.conditional(node, "if"),
            NodeKind::With {
                items,
                body,
                is_async,
            } => {
                let header = format!("{}with {}", if *is_async { "async " } else { "" }, items);
                self.suite(&header, body);
            }
            NodeKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                self.suite("try", body);
                self.clauses(handlers);
                if !orelse.is_empty() {
                    self.suite("else", orelse);
                }
                if !finalbody.is_empty() {
                    self.suite("finally", finalbody);
                }
            }
            NodeKind::Match { subject, cases } => {
                let header = format!("match {}:", self.render(subject, Prec::Tuple));
                self.line(&header);
                self.depth += 1;
                self.clauses(cases);
                self.depth -= 1;
            }
            NodeKind::Return { value } => match value {
                Some(value) => {
                    let text = format!("return {}", self.render(value, Prec::Tuple));
                    self.line(&text);
                }
                None => self.line("return"),
            },
            NodeKind::Assignment { targets, value } => {
                let mut parts: Vec<String> = targets
                    .iter()
                    .map(|t| self.render(t, Prec::Tuple))
                    .collect();
                parts.push(self.render(value, Prec::Tuple));
                self.line(&parts.join(" = "));
            }
            NodeKind::AnnotatedAssignment {
                target,
                annotation,
                value,
            } => {
                let mut text = format!("{}: {}", self.render(target, Prec::Atom), annotation);
                if let Some(value) = value {
                    text.push_str(" = ");
                    text.push_str(&self.render(value, Prec::Tuple));
                }
                self.line(&text);
            }
            NodeKind::AugmentedAssignment { target, op, value } => {
                let text = format!(
                    "{} {}= {}",
                    self.render(target, Prec::Tuple),
                    op.as_str(),
                    self.render(value, Prec::Tuple)
                );
                self.line(&text);
            }
            NodeKind::Expression { value } => {
                let text = self.render(value, Prec::Tuple);
                self.line(&text);
            }
            NodeKind::Pass => self.line("pass"),
            NodeKind::Break => self.line("break"),
            NodeKind::Continue => self.line("continue"),
            NodeKind::RawStatement(text) => self.line(text),
            // Bare expressions reached through a statement list
            NodeKind::Identifier(_)
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
            | NodeKind::Raw(_) => {
                let text = self.render(node, Prec::Tuple);
                self.line(&text);
            }
        }
    }

    fn conditional(&mut self, node: &Node, keyword: &str) {
        let NodeKind::Conditional {
            test, body, orelse, ..
        } = &node.kind
        else {
            self.statement(node);
            return;
        };
        let header = format!("{} {}", keyword, self.render(test, Prec::Test));
        self.suite(&header, body);

        match orelse.as_slice() {
            [] => {}
            [
                next @ Node {
                    kind: NodeKind::Conditional { elif: true, .. },
                    ..
                },
            ] => self.conditional(next, "elif"),
            _ => self.suite("else", orelse),
        }
    }

    fn wrap(&mut self, needed: bool, write: impl FnOnce(&mut Self)) {
        if needed {
            self.out.push('(');
        }
        write(self);
        if needed {
            self.out.push(')');
        }
    }

    fn items(&mut self, nodes: &[Node], ctx: Prec) {
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(node, ctx);
        }
    }

    fn expr(&mut self, node: &Node, ctx: Prec) {
        match &node.kind {
            NodeKind::Identifier(name) => self.out.push_str(name),
            NodeKind::Constant(text) | NodeKind::Raw(text) => self.out.push_str(text),
            NodeKind::Attribute { value, attr } => {
                let integer_literal = matches!(
                    &value.kind,
                    NodeKind::Constant(text)
                        if text.chars().all(|c| c.is_ascii_digit() || c == '_')
                );
                if integer_literal {
                    self.wrap(true, |w| w.expr(value, Prec::Atom));
                } else {
                    self.expr(value, Prec::Atom);
                }
                self.out.push('.');
                self.out.push_str(attr);
            }
            NodeKind::Call {
                func,
                args,
                keywords,
            } => {
                self.expr(func, Prec::Atom);
                match (args.as_slice(), keywords.is_empty()) {
                    (
                        [Node {
                            kind:
                                NodeKind::Comprehension {
                                    kind: ComprehensionKind::Generator,
                                    element,
                                    generators,
                                    ..
                                },
                            ..
                        }],
                        true,
                    ) => {
                        self.out.push('(');
                        self.expr(element, Prec::Test);
                        self.generators(generators);
                        self.out.push(')');
                    }
                    _ => {
                        self.out.push('(');
                        self.items(args, Prec::Test);
                        for (i, keyword) in keywords.iter().enumerate() {
                            if i > 0 || !args.is_empty() {
                                self.out.push_str(", ");
                            }
                            match &keyword.arg {
                                Some(name) => {
                                    self.out.push_str(name);
                                    self.out.push('=');
                                    self.expr(&keyword.value, Prec::Test);
                                }
                                None => {
                                    self.out.push_str("**");
                                    self.expr(&keyword.value, Prec::BitOr);
                                }
                            }
                        }
                        self.out.push(')');
                    }
                }
            }
            NodeKind::BinaryOp { left, op, right } => {
                let own = Prec::of_bin(*op);
                let (left_ctx, right_ctx) = if *op == BinOperator::Pow {
                    (own.next(), own)
                } else {
                    (own, own.next())
                };
                self.wrap(ctx > own, |w| {
                    w.expr(left, left_ctx);
                    w.out.push(' ');
                    w.out.push_str(op.as_str());
                    w.out.push(' ');
                    w.expr(right, right_ctx);
                });
            }
            NodeKind::BoolOp { op, values } => {
                let own = match op {
                    BoolOperator::And => Prec::And,
                    BoolOperator::Or => Prec::Or,
                };
                self.wrap(ctx > own, |w| {
                    for (i, value) in values.iter().enumerate() {
                        if i > 0 {
                            w.out.push(' ');
                            w.out.push_str(op.as_str());
                            w.out.push(' ');
                        }
                        w.expr(value, own.next());
                    }
                });
            }
            NodeKind::UnaryOp { op, operand } => {
                let own = match op {
                    UnaryOperator::Not => Prec::Not,
                    UnaryOperator::Neg | UnaryOperator::Pos | UnaryOperator::Invert => {
                        Prec::Factor
                    }
                };
                self.wrap(ctx > own, |w| {
                    w.out.push_str(op.as_str());
                    w.expr(operand, own);
                });
            }
            NodeKind::Comparison {
                left,
                ops,
                comparators,
            } => {
                self.wrap(ctx > Prec::Cmp, |w| {
                    w.expr(left, Prec::Cmp.next());
                    for (op, comparator) in ops.iter().zip(comparators) {
                        w.out.push(' ');
                        w.out.push_str(op.as_str());
                        w.out.push(' ');
                        w.expr(comparator, Prec::Cmp.next());
                    }
                });
            }
            NodeKind::IfExp { test, body, orelse } => {
                self.wrap(ctx > Prec::Test, |w| {
                    w.expr(body, Prec::Or);
                    w.out.push_str(" if ");
                    w.expr(test, Prec::Or);
                    w.out.push_str(" else ");
                    w.expr(orelse, Prec::Test);
                });
            }
            NodeKind::Lambda { params, body } => {
                self.wrap(ctx > Prec::Test, |w| {
                    w.out.push_str("lambda");
                    if !params.is_empty() {
                        w.out.push(' ');
                        w.out.push_str(params);
                    }
                    w.out.push_str(": ");
                    w.expr(body, Prec::Test);
                });
            }
            NodeKind::Mapping { entries } => {
                self.out.push('{');
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    match &entry.key {
                        Some(key) => {
                            self.expr(key, Prec::Test);
                            self.out.push_str(": ");
                            self.expr(&entry.value, Prec::Test);
                        }
                        None => {
                            self.out.push_str("**");
                            self.expr(&entry.value, Prec::BitOr);
                        }
                    }
                }
                self.out.push('}');
            }
            NodeKind::List(elements) => {
                self.out.push('[');
                self.items(elements, Prec::Test);
                self.out.push(']');
            }
            NodeKind::Tuple(elements) => {
                let needed = elements.len() < 2 || ctx > Prec::Tuple;
                self.wrap(needed, |w| {
                    w.items(elements, Prec::Test);
                    if elements.len() == 1 {
                        w.out.push(',');
                    }
                });
            }
            NodeKind::Set(elements) => {
                if elements.is_empty() {
                    self.out.push_str("{*()}");
                } else {
                    self.out.push('{');
                    self.items(elements, Prec::Test);
                    self.out.push('}');
                }
            }
            NodeKind::Comprehension {
                kind,
                element,
                value,
                generators,
            } => {
                let (open, close) = match kind {
                    ComprehensionKind::List => ('[', ']'),
                    ComprehensionKind::Set | ComprehensionKind::Dict => ('{', '}'),
                    ComprehensionKind::Generator => ('(', ')'),
                };
                self.out.push(open);
                self.expr(element, Prec::Test);
                if let Some(value) = value {
                    self.out.push_str(": ");
                    self.expr(value, Prec::Test);
                }
                self.generators(generators);
                self.out.push(close);
            }
            NodeKind::Subscript { value, index } => {
                self.expr(value, Prec::Atom);
                self.out.push('[');
                match &index.kind {
                    NodeKind::Tuple(elements) if !elements.is_empty() => {
                        self.items(elements, Prec::Test);
                        if elements.len() == 1 {
                            self.out.push(',');
                        }
                    }
                    _ => self.expr(index, Prec::Tuple),
                }
                self.out.push(']');
            }
            NodeKind::Slice { lower, upper, step } => {
                if let Some(lower) = lower {
                    self.expr(lower, Prec::Test);
                }
                self.out.push(':');
                if let Some(upper) = upper {
                    self.expr(upper, Prec::Test);
                }
                if let Some(step) = step {
                    self.out.push(':');
                    self.expr(step, Prec::Test);
                }
            }
            NodeKind::Starred(value) => {
                self.out.push('*');
                self.expr(value, Prec::BitOr);
            }
            NodeKind::NamedExpr { target, value } => {
                self.wrap(ctx > Prec::NamedExpr, |w| {
                    w.expr(target, Prec::Atom);
                    w.out.push_str(" := ");
                    w.expr(value, Prec::Test);
                });
            }
            NodeKind::Await(value) => {
                self.wrap(ctx > Prec::Await, |w| {
                    w.out.push_str("await ");
                    w.expr(value, Prec::Atom);
                });
            }
            NodeKind::Yield { value, from } => {
                self.wrap(ctx > Prec::Yield, |w| {
                    w.out.push_str(if *from { "yield from" } else { "yield" });
                    if let Some(value) = value {
                        w.out.push(' ');
                        w.expr(value, Prec::Tuple);
                    }
                });
            }
            // Statements never appear in expression position
            NodeKind::Block { .. }
            | NodeKind::FunctionDef { .. }
            | NodeKind::ClassDef { .. }
            | NodeKind::Loop { .. }
            | NodeKind::While { .. }
            | NodeKind::Conditional { .. }
            | NodeKind::With { .. }
            | NodeKind::Try { .. }
            | NodeKind::Match { .. }
            | NodeKind::Return { .. }
            | NodeKind::Assignment { .. }
            | NodeKind::AnnotatedAssignment { .. }
            | NodeKind::AugmentedAssignment { .. }
            | NodeKind::Expression { .. }
            | NodeKind::Pass
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::RawStatement(_) => {
                let mut sub = Unparser::default();
                sub.statement(node);
                self.out.push_str(sub.out.trim_end());
            }
        }
    }

    fn generators(&mut self, generators: &[super::Generator]) {
        for generator in generators {
            self.out
                .push_str(if generator.is_async { " async for " } else { " for " });
            self.expr(&generator.target, Prec::Tuple);
            self.out.push_str(" in ");
            self.expr(&generator.iter, Prec::Or);
            for condition in &generator.ifs {
                self.out.push_str(" if ");
                self.expr(condition, Prec::Or);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_module;

    fn roundtrip(source: &str) -> String {
        let tree = parse_module(source).unwrap();
        unparse(&tree)
    }

    #[test]
    fn test_canonical_source_is_stable() {
        let source = "\
def f(a, b=1):
    if a and b:
        return [x * 2 for x in range(a) if x]
    elif a:
        pass
    else:
        return None
    x = {'k': lambda: g(a), **rest}
    for i, j in pairs:
        total += i
    return -a ** 2
";
        assert_eq!(roundtrip(source), source);
    }

    #[test]
    fn test_minimal_parentheses() {
        assert_eq!(roundtrip("x = (a + b) * c\n"), "x = (a + b) * c\n");
        assert_eq!(roundtrip("x = a + (b * c)\n"), "x = a + b * c\n");
        assert_eq!(roundtrip("x = a - (b - c)\n"), "x = a - (b - c)\n");
        assert_eq!(roundtrip("x = (a or b) and c\n"), "x = (a or b) and c\n");
        assert_eq!(roundtrip("x = not (a == b)\n"), "x = not a == b\n");
    }

    #[test]
    fn test_single_element_tuple() {
        assert_eq!(roundtrip("x = 1,\n"), "x = (1,)\n");
        assert_eq!(roundtrip("a, b = b, a\n"), "a, b = b, a\n");
    }

    #[test]
    fn test_comments_dropped_and_blank_lines_removed() {
        let source = "import os\n\n# note\nx = 1  # one\n\n\ny = 2\n";
        assert_eq!(roundtrip(source), "import os\nx = 1\ny = 2\n");
    }

    #[test]
    fn test_generator_argument() {
        assert_eq!(roundtrip("sum(x for x in y)\n"), "sum(x for x in y)\n");
    }

    #[test]
    fn test_compound_statements() {
        let source = "\
class A(B):
    @property
    def x(self):
        try:
            return self._x
        except AttributeError as e:
            raise ValueError(e)
        finally:
            pass
with open(p) as fh:
    while True:
        break
";
        assert_eq!(roundtrip(source), source);
    }

    #[test]
    fn test_empty_module() {
        assert_eq!(roundtrip(""), "");
    }
}
