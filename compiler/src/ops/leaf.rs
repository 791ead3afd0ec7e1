// leaf.rs — Operand-free ops: graph parameters and constants

use std::fmt;

use serde::Serialize;

use crate::backend::InstrKind;
use crate::id::{Handle, NodeId};
use crate::lower::{LoweringContext, LoweringError};
use crate::types::{Literal, TensorType};

fn assert_no_operands(kind: &str, operands: &[NodeId]) {
    assert!(
        operands.is_empty(),
        "{kind} takes no operands, got {}",
        operands.len()
    );
}

/// A graph input, bound positionally at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Parameter {
    pub index: usize,
    pub name: String,
    pub ty: TensorType,
}

impl Parameter {
    pub fn clone_with(&self, operands: &[NodeId]) -> Self {
        assert_no_operands("parameter", operands);
        self.clone()
    }

    pub fn lower(&self, ctx: &mut LoweringContext) -> Result<Vec<Handle>, LoweringError> {
        Ok(vec![ctx.emit(InstrKind::Param {
            index: self.index,
            name: self.name.clone(),
            ty: self.ty.clone(),
        })])
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parameter({}), name={}", self.index, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constant {
    pub literal: Literal,
}

impl Constant {
    pub fn clone_with(&self, operands: &[NodeId]) -> Self {
        assert_no_operands("constant", operands);
        self.clone()
    }

    pub fn lower(&self, ctx: &mut LoweringContext) -> Result<Vec<Handle>, LoweringError> {
        Ok(vec![ctx.emit(InstrKind::Const(self.literal.clone()))])
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constant({})", self.literal)
    }
}
