// backend.rs — Lowered program and reference evaluator
//
// The program is a flat SSA listing: instruction i defines handle `h{i}`.
// Annotation records sit between instructions and never define handles.
// `evaluate` runs the listing on concrete inputs and samples every annotated
// value as it is reached.
//
// Preconditions: programs come from `lower::lower_graph` (or uphold the same
//   handle-index invariant).
// Postconditions: outputs follow `Program::outputs` order.
// Failure modes: wrong input count or input types → `EvalError`.
// Side effects: none.

use std::fmt;

use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::id::Handle;
use crate::lower::AnnotationRecord;
use crate::ops::{BinaryKind, UnaryKind};
use crate::types::{Literal, TensorType};

// ── Program ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "instr", rename_all = "snake_case")]
pub enum InstrKind {
    Param {
        index: usize,
        name: String,
        ty: TensorType,
    },
    Const(Literal),
    Unary {
        kind: UnaryKind,
        input: Handle,
    },
    Binary {
        kind: BinaryKind,
        lhs: Handle,
        rhs: Handle,
    },
}

impl fmt::Display for InstrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrKind::Param { index, name, .. } => write!(f, "param {index} {name:?}"),
            InstrKind::Const(lit) => write!(f, "const {lit}"),
            InstrKind::Unary { kind, input } => write!(f, "{} {}", kind.name(), input),
            InstrKind::Binary { kind, lhs, rhs } => write!(f, "{} {}, {}", kind.name(), lhs, rhs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instr {
    pub result: Handle,
    pub ty: TensorType,
    pub kind: InstrKind,
}

/// A program input, bound positionally by `evaluate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSlot {
    pub index: usize,
    pub name: String,
    pub ty: TensorType,
    pub handle: Handle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    /// Inputs sorted by parameter index.
    pub params: Vec<ParamSlot>,
    pub instrs: Vec<Instr>,
    pub outputs: Vec<Handle>,
    pub annotations: Vec<AnnotationRecord>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "program ({} params, {} instrs, {} annotations)",
            self.params.len(),
            self.instrs.len(),
            self.annotations.len()
        )?;
        let mut pending = self.annotations.iter().peekable();
        for (i, instr) in self.instrs.iter().enumerate() {
            while let Some(rec) = pending.next_if(|r| r.position <= i) {
                writeln!(f, "  ; annotate {}: {}", rec.handle, rec.label)?;
            }
            writeln!(f, "  {}: {} = {}", instr.result, instr.ty, instr.kind)?;
        }
        for rec in pending {
            writeln!(f, "  ; annotate {}: {}", rec.handle, rec.label)?;
        }
        write!(f, "  return")?;
        for (i, h) in self.outputs.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{h}")?;
        }
        writeln!(f)
    }
}

// ── Evaluation ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("expected {expected} inputs, got {found}")]
    InputCount { expected: usize, found: usize },

    #[error("input {position} ('{name}') must be {expected}, got {found}")]
    InputType {
        position: usize,
        name: String,
        expected: TensorType,
        found: TensorType,
    },

    #[error("parameter {index} has no program input slot")]
    UnboundParameter { index: usize },

    #[error("input {position} ('{name}') of type {ty} is too large to materialize")]
    TooLarge {
        position: usize,
        name: String,
        ty: TensorType,
    },
}

/// Value observed at an annotation point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationSample {
    pub label: String,
    pub handle: Handle,
    pub value: Literal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub outputs: Vec<Literal>,
    pub samples: Vec<AnnotationSample>,
}

/// Run `program` on `inputs` (one per parameter slot, in slot order).
pub fn evaluate(program: &Program, inputs: &[Literal]) -> Result<Evaluation, EvalError> {
    if inputs.len() != program.params.len() {
        return Err(EvalError::InputCount {
            expected: program.params.len(),
            found: inputs.len(),
        });
    }
    for (position, (slot, input)) in program.params.iter().zip(inputs).enumerate() {
        if slot.ty != input.ty {
            return Err(EvalError::InputType {
                position,
                name: slot.name.clone(),
                expected: slot.ty.clone(),
                found: input.ty.clone(),
            });
        }
    }

    let mut values: Vec<Literal> = Vec::with_capacity(program.instrs.len());
    for instr in &program.instrs {
        let value = match &instr.kind {
            InstrKind::Param { index, .. } => {
                let position = program
                    .params
                    .iter()
                    .position(|p| p.index == *index)
                    .ok_or(EvalError::UnboundParameter { index: *index })?;
                inputs[position].clone()
            }
            InstrKind::Const(lit) => lit.clone(),
            InstrKind::Unary { kind, input } => {
                let a = &values[input.index()];
                Literal {
                    ty: instr.ty.clone(),
                    data: a.data.iter().map(|&x| kind.apply(x)).collect(),
                }
            }
            InstrKind::Binary { kind, lhs, rhs } => {
                let a = &values[lhs.index()];
                let b = &values[rhs.index()];
                Literal {
                    ty: instr.ty.clone(),
                    data: a
                        .data
                        .iter()
                        .zip(&b.data)
                        .map(|(&x, &y)| kind.apply(x, y))
                        .collect(),
                }
            }
        };
        values.push(value);
    }

    let samples = program
        .annotations
        .iter()
        .map(|rec| AnnotationSample {
            label: rec.label.clone(),
            handle: rec.handle,
            value: values[rec.handle.index()].clone(),
        })
        .collect::<Vec<_>>();
    debug!(
        "eval: {} instrs, {} samples",
        values.len(),
        samples.len()
    );

    Ok(Evaluation {
        outputs: program
            .outputs
            .iter()
            .map(|h| values[h.index()].clone())
            .collect(),
        samples,
    })
}
