//! Syntax tree model
//!
//! An owned, acyclic tree of typed nodes built from tree-sitter's Python
//! grammar. Every child is exclusively owned by its parent (`Box`/`Vec`);
//! nothing points back up the tree.
//!
//! Statements and expressions share one `NodeKind` enum. Walks over the tree
//! (`Node::children`, the unparser, the orchestrator) match it exhaustively,
//! so adding a kind is a compile error in each of them until handled.
//!
//! Constructs the engine never inspects are kept as source text
//! (`RawStatement`, `Raw`, and the textual headers of `with`, `except` and
//! `case`). The text is re-emitted exactly as written.

mod parse;
mod unparse;

pub use parse::parse_module;
pub use unparse::{unparse, unparse_expr, unparse_statements};

use serde::Serialize;
use std::fmt;

/// Source position of a node: 1-based line, 0-based byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub pos: Position,
    pub kind: NodeKind,
}

/// A clause introduced by a textual header (`except ValueError as e`,
/// `case Point(x=0)`), followed by a statement body.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub header: String,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    /// `None` for `**mapping` unpacking.
    pub arg: Option<String>,
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    /// `None` for `**mapping` unpacking.
    pub key: Option<Node>,
    pub value: Node,
}

/// One `for ... in ... if ...` clause of a comprehension.
#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    pub target: Node,
    pub iter: Node,
    pub ifs: Vec<Node>,
    pub is_async: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComprehensionKind {
    List,
    Set,
    Dict,
    Generator,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // ---- statements ----
    /// Module root: the implicit top-level block.
    Block {
        body: Vec<Node>,
    },
    FunctionDef {
        name: String,
        /// Parameter list as written, including the parentheses.
        params: String,
        returns: Option<String>,
        decorators: Vec<Node>,
        body: Vec<Node>,
        is_async: bool,
    },
    ClassDef {
        name: String,
        /// Base-class argument list as written, including the parentheses.
        bases: Option<String>,
        decorators: Vec<Node>,
        body: Vec<Node>,
    },
    Loop {
        target: Box<Node>,
        iterable: Box<Node>,
        body: Vec<Node>,
        orelse: Vec<Node>,
        is_async: bool,
    },
    While {
        test: Box<Node>,
        body: Vec<Node>,
        orelse: Vec<Node>,
    },
    Conditional {
        test: Box<Node>,
        body: Vec<Node>,
        orelse: Vec<Node>,
        /// This conditional is the `elif` continuation of its parent.
        elif: bool,
    },
    With {
        items: String,
        body: Vec<Node>,
        is_async: bool,
    },
    Try {
        body: Vec<Node>,
        handlers: Vec<Clause>,
        orelse: Vec<Node>,
        finalbody: Vec<Node>,
    },
    Match {
        subject: Box<Node>,
        cases: Vec<Clause>,
    },
    Return {
        value: Option<Box<Node>>,
    },
    Assignment {
        targets: Vec<Node>,
        value: Box<Node>,
    },
    AnnotatedAssignment {
        target: Box<Node>,
        annotation: String,
        value: Option<Box<Node>>,
    },
    /// In-place combine assignment (`x += y`).
    AugmentedAssignment {
        target: Box<Node>,
        op: BinOperator,
        value: Box<Node>,
    },
    /// Expression statement.
    Expression {
        value: Box<Node>,
    },
    Pass,
    Break,
    Continue,
    /// Simple statement kept as written (imports, raise, assert, ...).
    RawStatement(String),

    // ---- expressions ----
    Identifier(String),
    /// Literal as written in source (`42`, `'a'`, `None`, `...`).
    Constant(String),
    Attribute {
        value: Box<Node>,
        attr: String,
    },
    Call {
        func: Box<Node>,
        args: Vec<Node>,
        keywords: Vec<Keyword>,
    },
    BinaryOp {
        left: Box<Node>,
        op: BinOperator,
        right: Box<Node>,
    },
    BoolOp {
        op: BoolOperator,
        values: Vec<Node>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Node>,
    },
    Comparison {
        left: Box<Node>,
        ops: Vec<CmpOperator>,
        comparators: Vec<Node>,
    },
    IfExp {
        test: Box<Node>,
        body: Box<Node>,
        orelse: Box<Node>,
    },
    /// Anonymous function. `params` is the parameter text without `lambda`.
    Lambda {
        params: String,
        body: Box<Node>,
    },
    Mapping {
        entries: Vec<MappingEntry>,
    },
    List(Vec<Node>),
    Tuple(Vec<Node>),
    Set(Vec<Node>),
    Comprehension {
        kind: ComprehensionKind,
        /// Element, or key for dict comprehensions.
        element: Box<Node>,
        /// Value for dict comprehensions.
        value: Option<Box<Node>>,
        generators: Vec<Generator>,
    },
    Subscript {
        value: Box<Node>,
        index: Box<Node>,
    },
    Slice {
        lower: Option<Box<Node>>,
        upper: Option<Box<Node>>,
        step: Option<Box<Node>>,
    },
    Starred(Box<Node>),
    NamedExpr {
        target: Box<Node>,
        value: Box<Node>,
    },
    Await(Box<Node>),
    Yield {
        value: Option<Box<Node>>,
        from: bool,
    },
    /// Expression kept as written (f-strings and other opaque forms).
    Raw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOperator {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

impl BinOperator {
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token.trim_end_matches('=') {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mult,
            "@" => Self::MatMult,
            "/" => Self::Div,
            "//" => Self::FloorDiv,
            "%" => Self::Mod,
            "**" => Self::Pow,
            "<<" => Self::LShift,
            ">>" => Self::RShift,
            "|" => Self::BitOr,
            "^" => Self::BitXor,
            "&" => Self::BitAnd,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mult => "*",
            Self::MatMult => "@",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::LShift => "<<",
            Self::RShift => ">>",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitAnd => "&",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOperator {
    And,
    Or,
}

impl BoolOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Neg,
    Pos,
    Invert,
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Not => "not ",
            Self::Neg => "-",
            Self::Pos => "+",
            Self::Invert => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CmpOperator {
    pub fn from_token(token: &str) -> Option<Self> {
        let normalized: Vec<&str> = token.split_whitespace().collect();
        let op = match normalized.as_slice() {
            ["=="] => Self::Eq,
            ["!="] | ["<>"] => Self::NotEq,
            ["<"] => Self::Lt,
            ["<="] => Self::LtE,
            [">"] => Self::Gt,
            [">="] => Self::GtE,
            ["is"] => Self::Is,
            ["is", "not"] => Self::IsNot,
            ["in"] => Self::In,
            ["not", "in"] => Self::NotIn,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtE => "<=",
            Self::Gt => ">",
            Self::GtE => ">=",
            Self::Is => "is",
            Self::IsNot => "is not",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

impl Node {
    pub fn new(pos: Position, kind: NodeKind) -> Self {
        Self { pos, kind }
    }

    pub fn identifier(pos: Position, name: impl Into<String>) -> Self {
        Self::new(pos, NodeKind::Identifier(name.into()))
    }

    pub fn constant(pos: Position, literal: impl Into<String>) -> Self {
        Self::new(pos, NodeKind::Constant(literal.into()))
    }

    /// Name of an `Identifier` node.
    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self.kind,
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
                | NodeKind::RawStatement(_)
        )
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<&Node> {
        let mut out: Vec<&Node> = Vec::new();
        match &self.kind {
            NodeKind::Block { body } => out.extend(body),
            NodeKind::FunctionDef {
                decorators, body, ..
            }
            | NodeKind::ClassDef {
                decorators, body, ..
            } => {
                out.extend(decorators);
                out.extend(body);
            }
            NodeKind::Loop {
                target,
                iterable,
                body,
                orelse,
                ..
            } => {
                out.push(target);
                out.push(iterable);
                out.extend(body);
                out.extend(orelse);
            }
            NodeKind::While { test, body, orelse }
            | NodeKind::Conditional {
                test, body, orelse, ..
            } => {
                out.push(test);
                out.extend(body);
                out.extend(orelse);
            }
            NodeKind::With { body, .. } => out.extend(body),
            NodeKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                out.extend(body);
                for handler in handlers {
                    out.extend(&handler.body);
                }
                out.extend(orelse);
                out.extend(finalbody);
            }
            NodeKind::Match { subject, cases } => {
                out.push(subject);
                for case in cases {
                    out.extend(&case.body);
                }
            }
            NodeKind::Return { value } => out.extend(value.as_deref()),
            NodeKind::Assignment { targets, value } => {
                out.extend(targets);
                out.push(value);
            }
            NodeKind::AnnotatedAssignment { target, value, .. } => {
                out.push(target);
                out.extend(value.as_deref());
            }
            NodeKind::AugmentedAssignment { target, value, .. } => {
                out.push(target);
                out.push(value);
            }
            NodeKind::Expression { value } => out.push(value),
            NodeKind::Pass
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::RawStatement(_)
            | NodeKind::Identifier(_)
            | NodeKind::Constant(_)
            | NodeKind::Raw(_) => {}
            NodeKind::Attribute { value, .. } => out.push(value),
            NodeKind::Call {
                func,
                args,
                keywords,
            } => {
                out.push(func);
                out.extend(args);
                out.extend(keywords.iter().map(|k| &k.value));
            }
            NodeKind::BinaryOp { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            NodeKind::BoolOp { values, .. } => out.extend(values),
            NodeKind::UnaryOp { operand, .. } => out.push(operand),
            NodeKind::Comparison {
                left, comparators, ..
            } => {
                out.push(left);
                out.extend(comparators);
            }
            NodeKind::IfExp { test, body, orelse } => {
                out.push(body);
                out.push(test);
                out.push(orelse);
            }
            NodeKind::Lambda { body, .. } => out.push(body),
            NodeKind::Mapping { entries } => {
                for entry in entries {
                    out.extend(entry.key.as_ref());
                    out.push(&entry.value);
                }
            }
            NodeKind::List(elements) | NodeKind::Tuple(elements) | NodeKind::Set(elements) => {
                out.extend(elements)
            }
            NodeKind::Comprehension {
                element,
                value,
                generators,
                ..
            } => {
                out.push(element);
                out.extend(value.as_deref());
                for generator in generators {
                    out.push(&generator.target);
                    out.push(&generator.iter);
                    out.extend(&generator.ifs);
                }
            }
            NodeKind::Subscript { value, index } => {
                out.push(value);
                out.push(index);
            }
            NodeKind::Slice { lower, upper, step } => {
                out.extend(lower.as_deref());
                out.extend(upper.as_deref());
                out.extend(step.as_deref());
            }
            NodeKind::Starred(value) | NodeKind::Await(value) => out.push(value),
            NodeKind::NamedExpr { target, value } => {
                out.push(target);
                out.push(value);
            }
            NodeKind::Yield { value, .. } => out.extend(value.as_deref()),
        }
        out
    }

    /// Pre-order walk: every reachable node is visited exactly once.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn size(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }

    /// Longest root-to-leaf path, counted in edges.
    pub fn depth(&self) -> usize {
        self.children()
            .into_iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}
