//! tree-sitter-python → `Node` conversion
//!
//! Each worker thread owns one tree-sitter parser. A tree containing any
//! `ERROR` or `MISSING` node is rejected as a whole; the engine never works on
//! partially recovered trees.

use std::cell::RefCell;

use tree_sitter::{Node as TsNode, Parser};

use super::{
    BinOperator, BoolOperator, Clause, CmpOperator, ComprehensionKind, Generator, Keyword,
    MappingEntry, Node, NodeKind, Position, UnaryOperator,
};
use crate::error::{RefactorError, Result};

thread_local! {
    static PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

fn new_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| RefactorError::Parse {
            line: 0,
            column: 0,
            message: format!("failed to load Python grammar: {}", e),
        })?;
    Ok(parser)
}

/// Parse a Python module into a `Block` node.
pub fn parse_module(source: &str) -> Result<Node> {
    PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(new_parser()?);
        }
        let parser = slot.as_mut().ok_or_else(|| RefactorError::Parse {
            line: 0,
            column: 0,
            message: "parser unavailable".into(),
        })?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| RefactorError::Parse {
                line: 1,
                column: 0,
                message: "parser produced no tree".into(),
            })?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(first_error(root));
        }

        let converter = Converter {
            src: source.as_bytes(),
        };
        Ok(Node::new(
            Position::new(1, 0),
            NodeKind::Block {
                body: converter.statements(root),
            },
        ))
    })
}

fn first_error(root: TsNode) -> RefactorError {
    fn find(node: TsNode) -> Option<TsNode> {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if !node.has_error() {
            return None;
        }
        let mut cursor = node.walk();
        let children: Vec<TsNode> = node.children(&mut cursor).collect();
        children.into_iter().find_map(find)
    }

    match find(root) {
        Some(node) => {
            let at = node.start_position();
            let message = if node.is_missing() {
                format!("missing '{}'", node.kind())
            } else {
                "invalid syntax".to_string()
            };
            RefactorError::Parse {
                line: at.row + 1,
                column: at.column,
                message,
            }
        }
        None => RefactorError::Parse {
            line: 1,
            column: 0,
            message: "invalid syntax".into(),
        },
    }
}

fn pos(node: TsNode) -> Position {
    let at = node.start_position();
    Position::new(at.row + 1, at.column)
}

fn is_extra(node: TsNode) -> bool {
    matches!(node.kind(), "comment" | "line_continuation")
}

/// Collapse line breaks in a header fragment. Fragments containing string
/// literals are returned untouched.
fn single_line(text: &str) -> String {
    if !text.contains('\n') || text.contains('"') || text.contains('\'') {
        return text.to_string();
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

struct Converter<'s> {
    src: &'s [u8],
}

impl<'s> Converter<'s> {
    fn text(&self, node: TsNode) -> String {
        node.utf8_text(self.src).unwrap_or_default().to_string()
    }

    fn named<'t>(&self, node: TsNode<'t>) -> Vec<TsNode<'t>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .filter(|c| !is_extra(*c))
            .collect()
    }

    fn all<'t>(&self, node: TsNode<'t>) -> Vec<TsNode<'t>> {
        let mut cursor = node.walk();
        node.children(&mut cursor).filter(|c| !is_extra(*c)).collect()
    }

    fn field<'t>(&self, node: TsNode<'t>, name: &str) -> Option<TsNode<'t>> {
        node.child_by_field_name(name)
    }

    fn fields<'t>(&self, node: TsNode<'t>, name: &str) -> Vec<TsNode<'t>> {
        let mut cursor = node.walk();
        node.children_by_field_name(name, &mut cursor)
            .filter(|c| !is_extra(*c))
            .collect()
    }

    fn has_token(&self, node: TsNode, token: &str) -> bool {
        let mut cursor = node.walk();
        let found = node
            .children(&mut cursor)
            .any(|c| !c.is_named() && c.kind() == token);
        found
    }

    /// Text between the start of `node` and the start of `body`, without the
    /// trailing colon.
    fn header(&self, node: TsNode, body: Option<TsNode>) -> String {
        let mut end = body.map(|b| b.start_byte()).unwrap_or(node.end_byte());
        let mut cursor = node.walk();
        let trailing_comment = node
            .children(&mut cursor)
            .find(|c| c.kind() == "comment" && c.start_byte() < end);
        if let Some(comment) = trailing_comment {
            end = comment.start_byte();
        }
        let raw = self
            .src
            .get(node.start_byte()..end)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default();
        raw.trim_end().trim_end_matches(':').trim_end().to_string()
    }

    fn block_child<'t>(&self, node: TsNode<'t>) -> Option<TsNode<'t>> {
        self.named(node).into_iter().rev().find(|c| c.kind() == "block")
    }

    // ---- statements ----

    fn statements(&self, node: TsNode) -> Vec<Node> {
        self.named(node)
            .into_iter()
            .map(|child| self.statement(child))
            .collect()
    }

    fn body(&self, node: Option<TsNode>) -> Vec<Node> {
        node.map(|b| self.statements(b)).unwrap_or_default()
    }

    fn statement(&self, node: TsNode) -> Node {
        let at = pos(node);
        let kind = match node.kind() {
            "expression_statement" => return self.expression_statement(node),
            "return_statement" => NodeKind::Return {
                value: self.named(node).first().map(|v| Box::new(self.expr(*v))),
            },
            "pass_statement" => NodeKind::Pass,
            "break_statement" => NodeKind::Break,
            "continue_statement" => NodeKind::Continue,
            "if_statement" => return self.if_statement(node),
            "for_statement" => NodeKind::Loop {
                target: Box::new(self.opt_expr(at, self.field(node, "left"))),
                iterable: Box::new(self.opt_expr(at, self.field(node, "right"))),
                body: self.body(self.field(node, "body")),
                orelse: self.else_body(self.field(node, "alternative")),
                is_async: self.has_token(node, "async"),
            },
            "while_statement" => NodeKind::While {
                test: Box::new(self.opt_expr(at, self.field(node, "condition"))),
                body: self.body(self.field(node, "body")),
                orelse: self.else_body(self.field(node, "alternative")),
            },
            "with_statement" => {
                let items = self
                    .named(node)
                    .into_iter()
                    .find(|c| c.kind() == "with_clause")
                    .map(|c| self.text(c))
                    .unwrap_or_default();
                NodeKind::With {
                    items,
                    body: self.body(self.field(node, "body")),
                    is_async: self.has_token(node, "async"),
                }
            }
            "try_statement" => self.try_statement(node),
            "match_statement" => self.match_statement(node),
            "function_definition" => self.function(node, Vec::new()),
            "class_definition" => self.class(node, Vec::new()),
            "decorated_definition" => {
                let decorators: Vec<Node> = self
                    .named(node)
                    .into_iter()
                    .filter(|c| c.kind() == "decorator")
                    .map(|d| match self.named(d).first() {
                        Some(inner) => self.expr(*inner),
                        None => Node::new(pos(d), NodeKind::Raw(self.text(d))),
                    })
                    .collect();
                match self.field(node, "definition") {
                    Some(def) if def.kind() == "class_definition" => {
                        return Node::new(pos(def), self.class(def, decorators));
                    }
                    Some(def) => return Node::new(pos(def), self.function(def, decorators)),
                    None => NodeKind::RawStatement(self.text(node)),
                }
            }
            _ => NodeKind::RawStatement(self.text(node)),
        };
        Node::new(at, kind)
    }

    fn expression_statement(&self, node: TsNode) -> Node {
        let at = pos(node);
        let children = self.named(node);
        let kind = match children.as_slice() {
            [single] if single.kind() == "assignment" => self.assignment(*single),
            [single] if single.kind() == "augmented_assignment" => {
                let op_text = self
                    .field(*single, "operator")
                    .map(|o| self.text(o))
                    .unwrap_or_default();
                match BinOperator::from_token(&op_text) {
                    Some(op) => NodeKind::AugmentedAssignment {
                        target: Box::new(self.opt_expr(at, self.field(*single, "left"))),
                        op,
                        value: Box::new(self.opt_expr(at, self.field(*single, "right"))),
                    },
                    None => NodeKind::RawStatement(self.text(node)),
                }
            }
            [single] => NodeKind::Expression {
                value: Box::new(self.expr(*single)),
            },
            many => NodeKind::Expression {
                value: Box::new(Node::new(
                    at,
                    NodeKind::Tuple(many.iter().map(|c| self.expr(*c)).collect()),
                )),
            },
        };
        Node::new(at, kind)
    }

    fn assignment(&self, node: TsNode) -> NodeKind {
        let at = pos(node);
        if let Some(annotation) = self.field(node, "type") {
            return NodeKind::AnnotatedAssignment {
                target: Box::new(self.opt_expr(at, self.field(node, "left"))),
                annotation: single_line(&self.text(annotation)),
                value: self.field(node, "right").map(|v| Box::new(self.expr(v))),
            };
        }

        let mut targets = vec![self.opt_expr(at, self.field(node, "left"))];
        let mut right = self.field(node, "right");
        while let Some(next) = right {
            if next.kind() != "assignment" || self.field(next, "type").is_some() {
                break;
            }
            targets.push(self.opt_expr(at, self.field(next, "left")));
            right = self.field(next, "right");
        }
        match right {
            Some(value) if value.kind() != "augmented_assignment" => NodeKind::Assignment {
                targets,
                value: Box::new(self.expr(value)),
            },
            _ => NodeKind::RawStatement(self.text(node)),
        }
    }

    fn if_statement(&self, node: TsNode) -> Node {
        let alternatives = self.fields(node, "alternative");
        Node::new(
            pos(node),
            NodeKind::Conditional {
                test: Box::new(self.opt_expr(pos(node), self.field(node, "condition"))),
                body: self.body(self.field(node, "consequence")),
                orelse: self.elif_chain(&alternatives),
                elif: false,
            },
        )
    }

    /// Fold `elif`/`else` clauses into nested conditionals.
    fn elif_chain(&self, clauses: &[TsNode]) -> Vec<Node> {
        let Some((first, rest)) = clauses.split_first() else {
            return Vec::new();
        };
        match first.kind() {
            "elif_clause" => vec![Node::new(
                pos(*first),
                NodeKind::Conditional {
                    test: Box::new(self.opt_expr(pos(*first), self.field(*first, "condition"))),
                    body: self.body(self.field(*first, "consequence")),
                    orelse: self.elif_chain(rest),
                    elif: true,
                },
            )],
            _ => self.else_body(Some(*first)),
        }
    }

    fn else_body(&self, clause: Option<TsNode>) -> Vec<Node> {
        match clause {
            Some(c) => self.body(self.field(c, "body").or_else(|| self.block_child(c))),
            None => Vec::new(),
        }
    }

    fn try_statement(&self, node: TsNode) -> NodeKind {
        let mut handlers = Vec::new();
        let mut orelse = Vec::new();
        let mut finalbody = Vec::new();
        for child in self.named(node) {
            match child.kind() {
                "except_clause" | "except_group_clause" => {
                    let block = self.block_child(child);
                    handlers.push(Clause {
                        header: self.header(child, block),
                        body: self.body(block),
                    });
                }
                "else_clause" => orelse = self.else_body(Some(child)),
                "finally_clause" => finalbody = self.body(self.block_child(child)),
                _ => {}
            }
        }
        NodeKind::Try {
            body: self.body(self.field(node, "body")),
            handlers,
            orelse,
            finalbody,
        }
    }

    fn match_statement(&self, node: TsNode) -> NodeKind {
        let at = pos(node);
        let subjects = self.fields(node, "subject");
        let subject = match subjects.as_slice() {
            [single] => self.expr(*single),
            many => Node::new(
                at,
                NodeKind::Tuple(many.iter().map(|s| self.expr(*s)).collect()),
            ),
        };
        let cases = self
            .field(node, "body")
            .map(|b| self.named(b))
            .unwrap_or_default()
            .into_iter()
            .filter(|c| c.kind() == "case_clause")
            .map(|case| {
                let consequence = self.field(case, "consequence");
                Clause {
                    header: single_line(&self.header(case, consequence)),
                    body: self.body(consequence),
                }
            })
            .collect();
        NodeKind::Match {
            subject: Box::new(subject),
            cases,
        }
    }

    fn function(&self, node: TsNode, decorators: Vec<Node>) -> NodeKind {
        NodeKind::FunctionDef {
            name: self
                .field(node, "name")
                .map(|n| self.text(n))
                .unwrap_or_default(),
            params: self
                .field(node, "parameters")
                .map(|p| self.text(p))
                .unwrap_or_else(|| "()".into()),
            returns: self
                .field(node, "return_type")
                .map(|r| single_line(&self.text(r))),
            decorators,
            body: self.body(self.field(node, "body")),
            is_async: self.has_token(node, "async"),
        }
    }

    fn class(&self, node: TsNode, decorators: Vec<Node>) -> NodeKind {
        NodeKind::ClassDef {
            name: self
                .field(node, "name")
                .map(|n| self.text(n))
                .unwrap_or_default(),
            bases: self.field(node, "superclasses").map(|b| self.text(b)),
            decorators,
            body: self.body(self.field(node, "body")),
        }
    }

    // ---- expressions ----

    fn opt_expr(&self, at: Position, node: Option<TsNode>) -> Node {
        match node {
            Some(n) => self.expr(n),
            None => Node::new(at, NodeKind::Raw(String::new())),
        }
    }

    fn boxed(&self, at: Position, node: Option<TsNode>) -> Box<Node> {
        Box::new(self.opt_expr(at, node))
    }

    fn exprs(&self, nodes: Vec<TsNode>) -> Vec<Node> {
        nodes.into_iter().map(|n| self.expr(n)).collect()
    }

    fn expr(&self, node: TsNode) -> Node {
        let at = pos(node);
        let kind = match node.kind() {
            "identifier" => NodeKind::Identifier(self.text(node)),
            "integer" | "float" | "true" | "false" | "none" | "ellipsis" => {
                NodeKind::Constant(self.text(node))
            }
            "string" => {
                if self.is_format_string(node) {
                    NodeKind::Raw(self.text(node))
                } else {
                    NodeKind::Constant(self.text(node))
                }
            }
            "concatenated_string" => {
                let parts = self.named(node);
                let joined = parts
                    .iter()
                    .map(|p| self.text(*p))
                    .collect::<Vec<_>>()
                    .join(" ");
                if parts.iter().any(|p| self.is_format_string(*p)) {
                    NodeKind::Raw(joined)
                } else {
                    NodeKind::Constant(joined)
                }
            }
            "parenthesized_expression" => {
                return match self.named(node).first() {
                    Some(inner) => {
                        let converted = self.expr(*inner);
                        if matches!(converted.kind, NodeKind::Raw(_)) {
                            Node::new(at, NodeKind::Raw(self.text(node)))
                        } else {
                            converted
                        }
                    }
                    None => Node::new(at, NodeKind::Tuple(Vec::new())),
                };
            }
            "attribute" => NodeKind::Attribute {
                value: self.boxed(at, self.field(node, "object")),
                attr: self
                    .field(node, "attribute")
                    .map(|a| self.text(a))
                    .unwrap_or_default(),
            },
            "call" => self.call(node),
            "binary_operator" => {
                let op_text = self
                    .field(node, "operator")
                    .map(|o| self.text(o))
                    .unwrap_or_default();
                match BinOperator::from_token(&op_text) {
                    Some(op) => NodeKind::BinaryOp {
                        left: self.boxed(at, self.field(node, "left")),
                        op,
                        right: self.boxed(at, self.field(node, "right")),
                    },
                    None => NodeKind::Raw(self.text(node)),
                }
            }
            "boolean_operator" => self.bool_op(node),
            "not_operator" => NodeKind::UnaryOp {
                op: UnaryOperator::Not,
                operand: self.boxed(at, self.field(node, "argument")),
            },
            "unary_operator" => {
                let op = match self.field(node, "operator").map(|o| self.text(o)).as_deref() {
                    Some("-") => Some(UnaryOperator::Neg),
                    Some("+") => Some(UnaryOperator::Pos),
                    Some("~") => Some(UnaryOperator::Invert),
                    _ => None,
                };
                match op {
                    Some(op) => NodeKind::UnaryOp {
                        op,
                        operand: self.boxed(at, self.field(node, "argument")),
                    },
                    None => NodeKind::Raw(self.text(node)),
                }
            }
            "comparison_operator" => self.comparison(node),
            "conditional_expression" => match self.named(node).as_slice() {
                [body, test, orelse] => NodeKind::IfExp {
                    test: Box::new(self.expr(*test)),
                    body: Box::new(self.expr(*body)),
                    orelse: Box::new(self.expr(*orelse)),
                },
                _ => NodeKind::Raw(self.text(node)),
            },
            "lambda" => NodeKind::Lambda {
                params: self
                    .field(node, "parameters")
                    .map(|p| single_line(&self.text(p)))
                    .unwrap_or_default(),
                body: self.boxed(at, self.field(node, "body")),
            },
            "dictionary" => NodeKind::Mapping {
                entries: self
                    .named(node)
                    .into_iter()
                    .map(|entry| match entry.kind() {
                        "pair" => MappingEntry {
                            key: Some(self.opt_expr(pos(entry), self.field(entry, "key"))),
                            value: self.opt_expr(pos(entry), self.field(entry, "value")),
                        },
                        "dictionary_splat" => MappingEntry {
                            key: None,
                            value: self.splat_inner(entry),
                        },
                        _ => MappingEntry {
                            key: None,
                            value: self.expr(entry),
                        },
                    })
                    .collect(),
            },
            "list" | "list_pattern" => NodeKind::List(self.exprs(self.named(node))),
            "tuple" | "tuple_pattern" | "pattern_list" | "expression_list" => {
                NodeKind::Tuple(self.exprs(self.named(node)))
            }
            "set" => NodeKind::Set(self.exprs(self.named(node))),
            "list_comprehension" => self.comprehension(node, ComprehensionKind::List),
            "set_comprehension" => self.comprehension(node, ComprehensionKind::Set),
            "generator_expression" => self.comprehension(node, ComprehensionKind::Generator),
            "dictionary_comprehension" => self.comprehension(node, ComprehensionKind::Dict),
            "subscript" => {
                let indices = self.fields(node, "subscript");
                let index = match indices.as_slice() {
                    [single] => self.expr(*single),
                    many => Node::new(at, NodeKind::Tuple(self.exprs(many.to_vec()))),
                };
                NodeKind::Subscript {
                    value: self.boxed(at, self.field(node, "value")),
                    index: Box::new(index),
                }
            }
            "slice" => self.slice(node),
            "list_splat" | "list_splat_pattern" => NodeKind::Starred(Box::new(self.splat_inner(node))),
            "named_expression" => NodeKind::NamedExpr {
                target: self.boxed(at, self.field(node, "name")),
                value: self.boxed(at, self.field(node, "value")),
            },
            "await" => match self.named(node).first() {
                Some(inner) => NodeKind::Await(Box::new(self.expr(*inner))),
                None => NodeKind::Raw(self.text(node)),
            },
            "yield" => NodeKind::Yield {
                value: self.named(node).first().map(|v| Box::new(self.expr(*v))),
                from: self.has_token(node, "from"),
            },
            _ => NodeKind::Raw(self.text(node)),
        };
        Node::new(at, kind)
    }

    fn is_format_string(&self, node: TsNode) -> bool {
        let mut cursor = node.walk();
        let children: Vec<TsNode> = node.children(&mut cursor).collect();
        children.iter().any(|c| match c.kind() {
            "interpolation" => true,
            "string_start" => {
                let start = self.text(*c);
                start
                    .chars()
                    .take_while(|ch| ch.is_ascii_alphabetic())
                    .any(|ch| ch == 'f' || ch == 'F')
            }
            _ => false,
        })
    }

    fn splat_inner(&self, node: TsNode) -> Node {
        match self.named(node).first() {
            Some(inner) => self.expr(*inner),
            None => Node::new(pos(node), NodeKind::Raw(String::new())),
        }
    }

    fn call(&self, node: TsNode) -> NodeKind {
        let at = pos(node);
        let func = self.boxed(at, self.field(node, "function"));
        let mut args = Vec::new();
        let mut keywords = Vec::new();

        match self.field(node, "arguments") {
            Some(arguments) if arguments.kind() == "generator_expression" => {
                args.push(self.expr(arguments));
            }
            Some(arguments) => {
                for arg in self.named(arguments) {
                    match arg.kind() {
                        "keyword_argument" => keywords.push(Keyword {
                            arg: self.field(arg, "name").map(|n| self.text(n)),
                            value: self.opt_expr(pos(arg), self.field(arg, "value")),
                        }),
                        "dictionary_splat" => keywords.push(Keyword {
                            arg: None,
                            value: self.splat_inner(arg),
                        }),
                        _ => args.push(self.expr(arg)),
                    }
                }
            }
            None => {}
        }

        NodeKind::Call {
            func,
            args,
            keywords,
        }
    }

    fn bool_op(&self, node: TsNode) -> NodeKind {
        let at = pos(node);
        let op = match self.field(node, "operator").map(|o| self.text(o)).as_deref() {
            Some("and") => BoolOperator::And,
            Some("or") => BoolOperator::Or,
            _ => return NodeKind::Raw(self.text(node)),
        };

        let mut values = Vec::new();
        for side in [self.field(node, "left"), self.field(node, "right")] {
            let converted = self.opt_expr(at, side);
            let unparenthesized = side.is_some_and(|s| s.kind() == "boolean_operator");
            match converted.kind {
                NodeKind::BoolOp {
                    op: inner_op,
                    values: inner,
                } if unparenthesized && inner_op == op => values.extend(inner),
                kind => values.push(Node::new(converted.pos, kind)),
            }
        }
        NodeKind::BoolOp { op, values }
    }

    fn comparison(&self, node: TsNode) -> NodeKind {
        let mut operands = Vec::new();
        let mut ops = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for child in self.all(node) {
            if child.is_named() {
                if !pending.is_empty() {
                    match CmpOperator::from_token(&pending.join(" ")) {
                        Some(op) => ops.push(op),
                        None => return NodeKind::Raw(self.text(node)),
                    }
                    pending.clear();
                }
                operands.push(self.expr(child));
            } else {
                pending.push(self.text(child));
            }
        }

        if operands.len() < 2 || ops.len() + 1 != operands.len() {
            return NodeKind::Raw(self.text(node));
        }
        let left = operands.remove(0);
        NodeKind::Comparison {
            left: Box::new(left),
            ops,
            comparators: operands,
        }
    }

    fn comprehension(&self, node: TsNode, kind: ComprehensionKind) -> NodeKind {
        let at = pos(node);
        let (element, value) = match self.field(node, "body") {
            Some(pair) if kind == ComprehensionKind::Dict && pair.kind() == "pair" => (
                self.opt_expr(at, self.field(pair, "key")),
                Some(Box::new(self.opt_expr(at, self.field(pair, "value")))),
            ),
            body => (self.opt_expr(at, body), None),
        };

        let mut generators: Vec<Generator> = Vec::new();
        for clause in self.named(node) {
            match clause.kind() {
                "for_in_clause" => {
                    let iters = self.fields(clause, "right");
                    let iter = match iters.as_slice() {
                        [single] => self.expr(*single),
                        many => Node::new(pos(clause), NodeKind::Tuple(self.exprs(many.to_vec()))),
                    };
                    generators.push(Generator {
                        target: self.opt_expr(pos(clause), self.field(clause, "left")),
                        iter,
                        ifs: Vec::new(),
                        is_async: self.has_token(clause, "async"),
                    });
                }
                "if_clause" => {
                    let condition = self.splat_inner(clause);
                    if let Some(last) = generators.last_mut() {
                        last.ifs.push(condition);
                    }
                }
                _ => {}
            }
        }

        if generators.is_empty() {
            return NodeKind::Raw(self.text(node));
        }
        NodeKind::Comprehension {
            kind,
            element: Box::new(element),
            value,
            generators,
        }
    }

    fn slice(&self, node: TsNode) -> NodeKind {
        let mut parts: [Option<Box<Node>>; 3] = [None, None, None];
        let mut slot = 0usize;
        for child in self.all(node) {
            if child.is_named() {
                if let Some(part) = parts.get_mut(slot) {
                    *part = Some(Box::new(self.expr(child)));
                }
            } else if child.kind() == ":" {
                slot += 1;
            }
        }
        let [lower, upper, step] = parts;
        NodeKind::Slice { lower, upper, step }
    }
}
