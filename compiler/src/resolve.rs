// resolve.rs — Name resolution and graph construction for .tir modules
//
// Walks the parsed AST in statement order, binds each name to a graph node,
// type-checks operands through the graph builder, and sets the graph outputs
// from the `return` statement.
//
// Preconditions: `module` is a well-formed AST from the parser.
// Postconditions: returns the graph plus all accumulated diagnostics; the
//   graph is only meaningful when no error-level diagnostic was produced.
// Failure modes: undefined/duplicate names, unknown ops or dtypes, bad
//   arguments and type mismatches produce `Diagnostic` entries. Resolution
//   continues past errors.
// Side effects: none.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::ast::*;
use crate::diag::{codes, Diagnostic};
use crate::graph::{Graph, GraphError};
use crate::id::NodeId;
use crate::ops::{BinaryKind, UnaryKind};
use crate::types::{DType, Literal, TensorType, MAX_ELEMENTS};

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ResolveResult {
    pub graph: Graph,
    /// Source name → node, for every successful binding.
    pub bindings: HashMap<String, NodeId>,
    pub diagnostics: Vec<Diagnostic>,
}

// ── Public entry point ──────────────────────────────────────────────────────

pub fn resolve(module: &Module) -> ResolveResult {
    let mut ctx = ResolveCtx::default();
    for stmt in &module.statements {
        match &stmt.kind {
            StatementKind::Let(l) => ctx.resolve_let(l),
            StatementKind::Return(r) => ctx.resolve_return(r, stmt.span),
        }
    }
    ctx.finish(module.span)
}

// ── Internal context ────────────────────────────────────────────────────────

#[derive(Default)]
struct ResolveCtx {
    graph: Graph,
    bindings: HashMap<String, (NodeId, Span)>,
    /// Names whose definition failed; uses are not reported again.
    poisoned: HashSet<String>,
    used: HashSet<String>,
    return_span: Option<Span>,
    diagnostics: Vec<Diagnostic>,
}

/// Argument shape expected by an op.
enum Signature {
    Unary(UnaryKind),
    Binary(BinaryKind),
    Annotate,
}

impl Signature {
    fn lookup(name: &str) -> Option<Self> {
        if name == "annotate" {
            return Some(Signature::Annotate);
        }
        UnaryKind::from_name(name)
            .map(Signature::Unary)
            .or_else(|| BinaryKind::from_name(name).map(Signature::Binary))
    }

    fn describe(&self) -> &'static str {
        match self {
            Signature::Unary(_) => "(value)",
            Signature::Binary(_) => "(value, value)",
            Signature::Annotate => "(value, \"annotation\")",
        }
    }
}

impl ResolveCtx {
    fn resolve_let(&mut self, stmt: &LetStmt) {
        let name = &stmt.name;
        if let Some((_, prev)) = self.bindings.get(&name.name) {
            self.diagnostics.push(
                Diagnostic::error(
                    codes::DUPLICATE_NAME,
                    name.span,
                    format!("'{}' is already defined", name.name),
                )
                .with_related(*prev, "first defined here"),
            );
            return;
        }

        match self.resolve_expr(&name.name, &stmt.expr) {
            Some(id) => {
                debug!("resolve: {} -> {}", name.name, id);
                self.poisoned.remove(&name.name);
                self.bindings.insert(name.name.clone(), (id, name.span));
            }
            None => {
                self.poisoned.insert(name.name.clone());
            }
        }
    }

    fn resolve_expr(&mut self, binding: &str, expr: &Expr) -> Option<NodeId> {
        match &expr.kind {
            ExprKind::Param(ty) => {
                let dtype = self.dtype(&ty.dtype)?;
                let tensor = TensorType::new(dtype, ty.dims.clone());
                if !tensor.is_materializable() {
                    self.diagnostics.push(
                        Diagnostic::error(
                            codes::TENSOR_TOO_LARGE,
                            ty.span,
                            format!("tensor type {} has too many elements", tensor),
                        )
                        .with_hint(format!("at most {} elements are supported", MAX_ELEMENTS)),
                    );
                    return None;
                }
                Some(self.graph.parameter(binding, tensor))
            }
            ExprKind::Const { dtype, value } => {
                let dtype = self.dtype(dtype)?;
                let literal = match value {
                    ConstValue::Scalar(v) => Literal::scalar(dtype, *v),
                    ConstValue::Array(vs) => Literal::vector(dtype, vs.clone()),
                };
                Some(self.graph.constant(literal))
            }
            ExprKind::Call { op, args } => self.resolve_call(op, args, expr.span),
        }
    }

    fn resolve_call(&mut self, op: &Ident, args: &[Arg], span: Span) -> Option<NodeId> {
        let Some(sig) = Signature::lookup(&op.name) else {
            self.diagnostics.push(
                Diagnostic::error(
                    codes::UNKNOWN_OP,
                    op.span,
                    format!("unknown op '{}'", op.name),
                )
                .with_hint("expected one of: neg, relu, exp, add, sub, mul, max, annotate"),
            );
            return None;
        };

        let result = match (&sig, args) {
            (Signature::Unary(kind), [Arg::Value(x)]) => {
                let x = self.value(x)?;
                self.graph.unary(*kind, x)
            }
            (Signature::Binary(kind), [Arg::Value(a), Arg::Value(b)]) => {
                let a = self.value(a);
                let b = self.value(b);
                self.graph.binary(*kind, a?, b?)
            }
            (Signature::Annotate, [Arg::Value(x), Arg::StringLit(text, _)]) => {
                let x = self.value(x)?;
                self.graph.annotate(x, text.clone())
            }
            _ => {
                let mut diag = Diagnostic::error(
                    codes::BAD_ARGUMENTS,
                    span,
                    format!("'{}' expects arguments {}", op.name, sig.describe()),
                );
                if let (Signature::Annotate, [_, label @ Arg::Value(_)]) = (&sig, args) {
                    diag = diag.with_related(label.span(), "annotation must be a string literal");
                }
                self.diagnostics.push(diag);
                return None;
            }
        };

        match result {
            Ok(id) => Some(id),
            Err(e @ GraphError::TypeMismatch { .. }) => {
                self.diagnostics
                    .push(Diagnostic::error(codes::TYPE_MISMATCH, span, e.to_string()));
                None
            }
            Err(e) => {
                self.diagnostics
                    .push(Diagnostic::error(codes::BAD_ARGUMENTS, span, e.to_string()));
                None
            }
        }
    }

    fn resolve_return(&mut self, stmt: &ReturnStmt, span: Span) {
        if let Some(prev) = self.return_span {
            self.diagnostics.push(
                Diagnostic::error(codes::DUPLICATE_RETURN, span, "module has more than one return")
                    .with_related(prev, "first return here"),
            );
            return;
        }
        self.return_span = Some(span);

        let mut outputs = Vec::with_capacity(stmt.values.len());
        for ident in &stmt.values {
            if let Some(id) = self.value(ident) {
                outputs.push(id);
            }
        }
        if outputs.len() == stmt.values.len() {
            if let Err(e) = self.graph.set_outputs(outputs) {
                self.diagnostics
                    .push(Diagnostic::error(codes::BAD_ARGUMENTS, span, e.to_string()));
            }
        }
    }

    /// Look up a value reference, reporting undefined names.
    fn value(&mut self, ident: &Ident) -> Option<NodeId> {
        if let Some((id, _)) = self.bindings.get(&ident.name) {
            self.used.insert(ident.name.clone());
            return Some(*id);
        }
        if !self.poisoned.contains(&ident.name) {
            self.diagnostics.push(Diagnostic::error(
                codes::UNDEFINED_NAME,
                ident.span,
                format!("undefined value '{}'", ident.name),
            ));
        }
        None
    }

    fn dtype(&mut self, ident: &Ident) -> Option<DType> {
        let dtype = DType::from_name(&ident.name);
        if dtype.is_none() {
            self.diagnostics.push(
                Diagnostic::error(
                    codes::UNKNOWN_DTYPE,
                    ident.span,
                    format!("unknown element type '{}'", ident.name),
                )
                .with_hint("expected f32 or f64"),
            );
        }
        dtype
    }

    fn finish(mut self, module_span: Span) -> ResolveResult {
        if self.return_span.is_none() {
            self.diagnostics.push(
                Diagnostic::error(codes::MISSING_RETURN, module_span, "module has no return")
                    .with_hint("add `return <name>` naming the graph outputs"),
            );
        }

        let mut unused: Vec<(&String, &Span)> = self
            .bindings
            .iter()
            .filter(|(name, _)| !self.used.contains(*name))
            .map(|(name, (_, span))| (name, span))
            .collect();
        unused.sort_by_key(|(_, span)| span.start);
        let warnings: Vec<Diagnostic> = unused
            .into_iter()
            .map(|(name, span)| {
                Diagnostic::warning(
                    codes::UNUSED_VALUE,
                    *span,
                    format!("value '{}' is never used", name),
                )
            })
            .collect();
        self.diagnostics.extend(warnings);

        ResolveResult {
            graph: self.graph,
            bindings: self
                .bindings
                .into_iter()
                .map(|(name, (id, _))| (name, id))
                .collect(),
            diagnostics: self.diagnostics,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
