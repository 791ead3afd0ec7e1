// ops — The closed set of IR node kinds
//
// One `Op` variant per node kind. Clone, lower and display dispatch by
// exhaustive `match`.

pub mod annotate;
pub mod arith;
pub mod leaf;

use std::fmt;

use serde::Serialize;

use crate::id::{Handle, NodeId};
use crate::lower::{LoweringContext, LoweringError};

pub use annotate::Annotate;
pub use arith::{Binary, BinaryKind, Unary, UnaryKind};
pub use leaf::{Constant, Parameter};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Parameter(Parameter),
    Constant(Constant),
    Unary(Unary),
    Binary(Binary),
    Annotate(Annotate),
}

impl Op {
    /// Short kind tag, as used in graph dumps and DOT labels.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Op::Parameter(_) => "parameter",
            Op::Constant(_) => "constant",
            Op::Unary(u) => u.kind.name(),
            Op::Binary(b) => b.kind.name(),
            Op::Annotate(_) => "annotate",
        }
    }

    /// Operands in positional order.
    pub fn operands(&self) -> Vec<NodeId> {
        match self {
            Op::Parameter(_) | Op::Constant(_) => Vec::new(),
            Op::Unary(u) => vec![u.input],
            Op::Binary(b) => vec![b.lhs, b.rhs],
            Op::Annotate(a) => a.operands().to_vec(),
        }
    }

    /// Same op over replacement operands. Panics on an arity mismatch.
    pub fn clone_with(&self, operands: &[NodeId]) -> Op {
        match self {
            Op::Parameter(p) => Op::Parameter(p.clone_with(operands)),
            Op::Constant(c) => Op::Constant(c.clone_with(operands)),
            Op::Unary(u) => Op::Unary(u.clone_with(operands)),
            Op::Binary(b) => Op::Binary(b.clone_with(operands)),
            Op::Annotate(a) => Op::Annotate(a.clone_with(operands)),
        }
    }

    /// Emit backend code for this op. Every operand must already be lowered.
    pub fn lower(&self, ctx: &mut LoweringContext) -> Result<Vec<Handle>, LoweringError> {
        match self {
            Op::Parameter(p) => p.lower(ctx),
            Op::Constant(c) => c.lower(ctx),
            Op::Unary(u) => u.lower(ctx),
            Op::Binary(b) => b.lower(ctx),
            Op::Annotate(a) => a.lower(ctx),
        }
    }

    pub fn as_annotate(&self) -> Option<&Annotate> {
        match self {
            Op::Annotate(a) => Some(a),
            _ => None,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Parameter(p) => fmt::Display::fmt(p, f),
            Op::Constant(c) => fmt::Display::fmt(c, f),
            Op::Unary(u) => fmt::Display::fmt(u, f),
            Op::Binary(b) => fmt::Display::fmt(b, f),
            Op::Annotate(a) => fmt::Display::fmt(a, f),
        }
    }
}
