// lower.rs — Lowering context and graph → backend program driver
//
// Walks the graph in postorder from its outputs and asks each op to emit
// backend instructions into a `LoweringContext`. The context maps every
// lowered node to its backend handles and collects annotation records.
//
// Preconditions: the graph has at least one output.
// Postconditions: one instruction per emitted handle (handle index ==
//   instruction index); annotation records reference existing handles.
// Failure modes: an op resolving an operand that is not lowered yet →
//   `LoweringError::UnloweredOperand`; unknown roots → `LoweringError::Graph`.
// Side effects: none.

use std::collections::HashMap;

use log::{debug, info, trace};
use serde::Serialize;
use thiserror::Error;

use crate::backend::{Instr, InstrKind, ParamSlot, Program};
use crate::graph::{Graph, GraphError, Node};
use crate::id::{Handle, HandleAllocator, NodeId};
use crate::types::TensorType;

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoweringError {
    #[error("operand {operand} has not been lowered")]
    UnloweredOperand { operand: NodeId },

    #[error("graph has no outputs to lower")]
    NoOutputs,

    #[error(transparent)]
    Graph(#[from] GraphError),
}

// ── Annotation channel ──────────────────────────────────────────────────────

/// A label registered at an emission point of the lowered program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationRecord {
    /// Node being lowered when the label was recorded, if any.
    pub node: Option<NodeId>,
    /// Backend value the label is attached to.
    pub handle: Handle,
    /// Number of instructions emitted before the label.
    pub position: usize,
    pub label: String,
}

// ── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct LowerOptions {
    /// Drop annotation records from the program. Instructions are unchanged.
    pub strip_annotations: bool,
}

// ── Context ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct LoweringContext {
    lowered: HashMap<NodeId, Vec<Handle>>,
    handles: HandleAllocator,
    instrs: Vec<Instr>,
    annotations: Vec<AnnotationRecord>,
    current: Option<NodeId>,
}

impl LoweringContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend handle of `id`'s (single) output.
    pub fn resolve(&self, id: NodeId) -> Result<Handle, LoweringError> {
        self.lowered
            .get(&id)
            .and_then(|hs| hs.first().copied())
            .ok_or(LoweringError::UnloweredOperand { operand: id })
    }

    /// Append an instruction and return the handle of its result.
    pub fn emit(&mut self, kind: InstrKind) -> Handle {
        let ty = self.result_type(&kind);
        let result = self.handles.alloc();
        debug_assert_eq!(result.index(), self.instrs.len());
        trace!("lower: {} = {}", result, kind);
        self.instrs.push(Instr { result, ty, kind });
        result
    }

    fn result_type(&self, kind: &InstrKind) -> TensorType {
        match kind {
            InstrKind::Param { ty, .. } => ty.clone(),
            InstrKind::Const(lit) => lit.ty.clone(),
            InstrKind::Unary { input, .. } => self.instrs[input.index()].ty.clone(),
            InstrKind::Binary { lhs, .. } => self.instrs[lhs.index()].ty.clone(),
        }
    }

    /// Register `label` for `handle` at the current emission point.
    pub fn record_annotation(&mut self, handle: Handle, label: &str) {
        debug!("lower: annotation {:?} on {}", label, handle);
        self.annotations.push(AnnotationRecord {
            node: self.current,
            handle,
            position: self.instrs.len(),
            label: label.to_string(),
        });
    }

    /// Bind the handles produced for `id`.
    pub fn assign(&mut self, id: NodeId, handles: Vec<Handle>) {
        self.lowered.insert(id, handles);
    }

    /// Lower one node and bind its outputs.
    pub fn lower_node(&mut self, node: &Node) -> Result<(), LoweringError> {
        self.current = Some(node.id);
        let result = node.op.lower(self);
        self.current = None;
        let handles = result.map_err(|e| {
            debug!("lower: {} failed: {}", node.id, e);
            e
        })?;
        self.assign(node.id, handles);
        Ok(())
    }

    pub fn annotations(&self) -> &[AnnotationRecord] {
        &self.annotations
    }

    pub fn instr_count(&self) -> usize {
        self.instrs.len()
    }

    /// Close the context into a program returning `outputs`.
    pub fn finish(self, outputs: Vec<Handle>) -> Program {
        let mut params: Vec<ParamSlot> = self
            .instrs
            .iter()
            .filter_map(|i| match &i.kind {
                InstrKind::Param { index, name, ty } => Some(ParamSlot {
                    index: *index,
                    name: name.clone(),
                    ty: ty.clone(),
                    handle: i.result,
                }),
                _ => None,
            })
            .collect();
        params.sort_by_key(|p| p.index);
        Program {
            params,
            instrs: self.instrs,
            outputs,
            annotations: self.annotations,
        }
    }
}

// ── Driver ──────────────────────────────────────────────────────────────────

/// Lower every node reachable from the graph's outputs.
pub fn lower_graph(graph: &Graph, options: &LowerOptions) -> Result<Program, LoweringError> {
    if graph.outputs().is_empty() {
        return Err(LoweringError::NoOutputs);
    }
    let order = graph.post_order(graph.outputs())?;
    let mut ctx = LoweringContext::new();
    for id in order {
        let node = graph
            .node(id)
            .ok_or(GraphError::UnknownValue { id, len: graph.len() })?;
        ctx.lower_node(node)?;
    }

    let outputs = graph
        .outputs()
        .iter()
        .map(|&id| ctx.resolve(id))
        .collect::<Result<Vec<_>, _>>()?;

    let mut program = ctx.finish(outputs);
    if options.strip_annotations {
        debug!("lower: stripping {} annotations", program.annotations.len());
        program.annotations.clear();
    }
    info!(
        "lower: {} nodes -> {} instructions, {} annotations",
        graph.len(),
        program.instrs.len(),
        program.annotations.len()
    );
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{BinaryKind, UnaryKind};
    use crate::types::{DType, Literal};

    fn annotated_chain() -> Graph {
        let mut g = Graph::new();
        let x = g.parameter("x", TensorType::new(DType::F32, vec![2]));
        let r = g.unary(UnaryKind::Relu, x).unwrap();
        let a = g.annotate(r, "relu_out").unwrap();
        let y = g.binary(BinaryKind::Add, a, x).unwrap();
        g.set_outputs(vec![y]).unwrap();
        g
    }

    #[test]
    fn annotate_emits_no_instruction() {
        let program = lower_graph(&annotated_chain(), &LowerOptions::default()).unwrap();
        // param, relu, add
        assert_eq!(program.instrs.len(), 3);
        assert_eq!(program.annotations.len(), 1);
        let rec = &program.annotations[0];
        assert_eq!(rec.label, "relu_out");
        assert_eq!(rec.node, Some(NodeId(2)));
        assert_eq!(rec.handle, Handle(1));
        assert_eq!(rec.position, 2);
    }

    #[test]
    fn annotated_value_feeds_users_directly() {
        let program = lower_graph(&annotated_chain(), &LowerOptions::default()).unwrap();
        let InstrKind::Binary { lhs, rhs, .. } = &program.instrs[2].kind else {
            panic!("expected binary")
        };
        assert_eq!(*lhs, Handle(1));
        assert_eq!(*rhs, Handle(0));
    }

    #[test]
    fn strip_annotations_keeps_instructions() {
        let full = lower_graph(&annotated_chain(), &LowerOptions::default()).unwrap();
        let stripped = lower_graph(
            &annotated_chain(),
            &LowerOptions {
                strip_annotations: true,
            },
        )
        .unwrap();
        assert!(stripped.annotations.is_empty());
        assert_eq!(stripped.instrs, full.instrs);
    }

    #[test]
    fn no_outputs_is_an_error() {
        let mut g = Graph::new();
        g.constant(Literal::scalar(DType::F64, 1.0));
        assert_eq!(
            lower_graph(&g, &LowerOptions::default()).unwrap_err(),
            LoweringError::NoOutputs
        );
    }

    #[test]
    fn out_of_order_lowering_fails() {
        let g = annotated_chain();
        let mut ctx = LoweringContext::new();
        let err = ctx.lower_node(&g.nodes()[2]).unwrap_err();
        assert_eq!(err, LoweringError::UnloweredOperand { operand: NodeId(1) });
        assert!(ctx.resolve(NodeId(2)).is_err());
    }

    #[test]
    fn params_are_collected_in_index_order() {
        let mut g = Graph::new();
        let a = g.parameter("a", TensorType::scalar(DType::F64));
        let b = g.parameter("b", TensorType::scalar(DType::F64));
        let s = g.binary(BinaryKind::Sub, b, a).unwrap();
        g.set_outputs(vec![s]).unwrap();
        let program = lower_graph(&g, &LowerOptions::default()).unwrap();
        let names: Vec<&str> = program.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
