// arith.rs — Elementwise unary and binary tensor ops

use std::fmt;

use serde::Serialize;

use crate::backend::InstrKind;
use crate::id::{Handle, NodeId};
use crate::lower::{LoweringContext, LoweringError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryKind {
    Neg,
    Relu,
    Exp,
}

impl UnaryKind {
    pub const ALL: [UnaryKind; 3] = [UnaryKind::Neg, UnaryKind::Relu, UnaryKind::Exp];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            UnaryKind::Neg => "neg",
            UnaryKind::Relu => "relu",
            UnaryKind::Exp => "exp",
        }
    }

    pub fn apply(self, x: f64) -> f64 {
        match self {
            UnaryKind::Neg => -x,
            UnaryKind::Relu => x.max(0.0),
            UnaryKind::Exp => x.exp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryKind {
    Add,
    Sub,
    Mul,
    Max,
}

impl BinaryKind {
    pub const ALL: [BinaryKind; 4] = [
        BinaryKind::Add,
        BinaryKind::Sub,
        BinaryKind::Mul,
        BinaryKind::Max,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            BinaryKind::Add => "add",
            BinaryKind::Sub => "sub",
            BinaryKind::Mul => "mul",
            BinaryKind::Max => "max",
        }
    }

    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryKind::Add => a + b,
            BinaryKind::Sub => a - b,
            BinaryKind::Mul => a * b,
            BinaryKind::Max => a.max(b),
        }
    }
}

// ── Unary ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Unary {
    pub kind: UnaryKind,
    pub input: NodeId,
}

impl Unary {
    pub fn clone_with(&self, operands: &[NodeId]) -> Self {
        assert_eq!(
            operands.len(),
            1,
            "{} takes exactly 1 operand, got {}",
            self.kind.name(),
            operands.len()
        );
        Self {
            kind: self.kind,
            input: operands[0],
        }
    }

    pub fn lower(&self, ctx: &mut LoweringContext) -> Result<Vec<Handle>, LoweringError> {
        let input = ctx.resolve(self.input)?;
        Ok(vec![ctx.emit(InstrKind::Unary {
            kind: self.kind,
            input,
        })])
    }
}

impl fmt::Display for Unary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind.name(), self.input)
    }
}

// ── Binary ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Binary {
    pub kind: BinaryKind,
    pub lhs: NodeId,
    pub rhs: NodeId,
}

impl Binary {
    pub fn clone_with(&self, operands: &[NodeId]) -> Self {
        assert_eq!(
            operands.len(),
            2,
            "{} takes exactly 2 operands, got {}",
            self.kind.name(),
            operands.len()
        );
        Self {
            kind: self.kind,
            lhs: operands[0],
            rhs: operands[1],
        }
    }

    pub fn lower(&self, ctx: &mut LoweringContext) -> Result<Vec<Handle>, LoweringError> {
        let lhs = ctx.resolve(self.lhs)?;
        let rhs = ctx.resolve(self.rhs)?;
        Ok(vec![ctx.emit(InstrKind::Binary {
            kind: self.kind,
            lhs,
            rhs,
        })])
    }
}

impl fmt::Display for Binary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.kind.name(), self.lhs, self.rhs)
    }
}
