// AST node types for .tir graph source files.
//
// One statement per line: `name = <expr>` bindings and a final `return`.
// Every node carries a `SimpleSpan` for error reporting in downstream phases.
//
// Preconditions: produced by the parser from a valid or partially-valid token stream.
// Postconditions: each node's span covers the source range of the construct.
// Failure modes: none (data-only module).
// Side effects: none.

use chumsky::span::SimpleSpan;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

// ── Root ──

/// A complete .tir module: a sequence of statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub statements: Vec<Statement>,
    pub span: Span,
}

// ── Statements ──

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Let(LetStmt),
    Return(ReturnStmt),
}

// ── let_stmt: IDENT '=' expr ──

#[derive(Debug, Clone, PartialEq)]
pub struct LetStmt {
    pub name: Ident,
    pub expr: Expr,
}

// ── return_stmt: 'return' IDENT (',' IDENT)* ──

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub values: Vec<Ident>,
}

// ── Expressions ──

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `param f32[2, 3]`
    Param(TypeSpec),
    /// `const f32 [1.0, 2.0]` or `const f64 3.14`
    Const { dtype: Ident, value: ConstValue },
    /// `add(x, y)`, `annotate(x, "label")`
    Call { op: Ident, args: Vec<Arg> },
}

/// Element type plus optional dimensions. `f32` and `f32[]` are scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub dtype: Ident,
    pub dims: Vec<usize>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Scalar(f64),
    Array(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Ident),
    StringLit(String, Span),
}

impl Arg {
    pub fn span(&self) -> Span {
        match self {
            Arg::Value(ident) => ident.span,
            Arg::StringLit(_, s) => *s,
        }
    }
}

// ── Identifiers ──

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}
