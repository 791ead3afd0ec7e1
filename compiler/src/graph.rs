// graph.rs — Tensor computation graph (node arena)
//
// Nodes live in a single `Vec` and refer to their operands by `NodeId`, so the
// graph owns every node and edges are plain indices. Nodes are append-only and
// an operand is always created before its users, which keeps the graph acyclic.
//
// Preconditions: operands passed to builder methods belong to this graph.
// Postconditions: every node's type is inferred at insertion.
// Failure modes: foreign/unknown ids and type mismatches → `GraphError`.
// Side effects: none.

use std::collections::HashMap;
use std::fmt;

use log::{debug, trace};
use serde::Serialize;
use thiserror::Error;

use crate::id::NodeId;
use crate::ops::{Annotate, Binary, BinaryKind, Constant, Op, Parameter, Unary, UnaryKind};
use crate::types::{Literal, TensorType};

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("value {id} does not belong to this graph ({len} nodes)")]
    UnknownValue { id: NodeId, len: usize },

    #[error("{op} operands have different types: {lhs} vs {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: TensorType,
        rhs: TensorType,
    },
}

// ── Public types ────────────────────────────────────────────────────────────

/// A node in the graph: one op producing one typed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub op: Op,
    pub ty: TensorType,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} = {}", self.id, self.ty, self.op)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Graph {
    nodes: Vec<Node>,
    outputs: Vec<NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// Parameters in declaration (index) order.
    pub fn parameters(&self) -> Vec<&Parameter> {
        self.nodes
            .iter()
            .filter_map(|n| match &n.op {
                Op::Parameter(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// Every annotate node with its label, in node order.
    pub fn annotations(&self) -> Vec<(NodeId, &str)> {
        self.nodes
            .iter()
            .filter_map(|n| n.op.as_annotate().map(|a| (n.id, a.annotation())))
            .collect()
    }

    fn check(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.node(id).ok_or(GraphError::UnknownValue {
            id,
            len: self.nodes.len(),
        })
    }

    // ── Builders ────────────────────────────────────────────────────────

    /// Append `op`, validating its operands and inferring its type.
    pub fn add(&mut self, op: Op) -> Result<NodeId, GraphError> {
        let ty = self.infer_type(&op)?;
        let id = NodeId(self.nodes.len() as u32);
        trace!("graph: {} = {}", id, op);
        self.nodes.push(Node { id, op, ty });
        Ok(id)
    }

    fn infer_type(&self, op: &Op) -> Result<TensorType, GraphError> {
        match op {
            Op::Parameter(p) => Ok(p.ty.clone()),
            Op::Constant(c) => Ok(c.literal.ty.clone()),
            Op::Unary(u) => Ok(self.check(u.input)?.ty.clone()),
            Op::Binary(b) => {
                let lhs = &self.check(b.lhs)?.ty;
                let rhs = &self.check(b.rhs)?.ty;
                if lhs != rhs {
                    return Err(GraphError::TypeMismatch {
                        op: b.kind.name(),
                        lhs: lhs.clone(),
                        rhs: rhs.clone(),
                    });
                }
                Ok(lhs.clone())
            }
            Op::Annotate(a) => Ok(self.check(a.input())?.ty.clone()),
        }
    }

    /// Declare the next graph input.
    pub fn parameter(&mut self, name: impl Into<String>, ty: TensorType) -> NodeId {
        let index = self.parameters().len();
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            op: Op::Parameter(Parameter {
                index,
                name: name.into(),
                ty: ty.clone(),
            }),
            ty,
        });
        id
    }

    pub fn constant(&mut self, literal: Literal) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let ty = literal.ty.clone();
        self.nodes.push(Node {
            id,
            op: Op::Constant(Constant { literal }),
            ty,
        });
        id
    }

    pub fn unary(&mut self, kind: UnaryKind, input: NodeId) -> Result<NodeId, GraphError> {
        self.add(Op::Unary(Unary { kind, input }))
    }

    pub fn binary(
        &mut self,
        kind: BinaryKind,
        lhs: NodeId,
        rhs: NodeId,
    ) -> Result<NodeId, GraphError> {
        self.add(Op::Binary(Binary { kind, lhs, rhs }))
    }

    /// Attach `annotation` to `input`. The new node has the input's type.
    pub fn annotate(
        &mut self,
        input: NodeId,
        annotation: impl Into<String>,
    ) -> Result<NodeId, GraphError> {
        self.add(Op::Annotate(Annotate::new(input, annotation)))
    }

    /// Tag the activation of a layer of type `layer_type` (`type=<layer_type>`).
    pub fn annotate_layer(&mut self, input: NodeId, layer_type: &str) -> Result<NodeId, GraphError> {
        self.add(Op::Annotate(Annotate::for_layer(input, layer_type)))
    }

    pub fn set_outputs(&mut self, outputs: Vec<NodeId>) -> Result<(), GraphError> {
        for &id in &outputs {
            self.check(id)?;
        }
        self.outputs = outputs;
        Ok(())
    }

    // ── Traversal ───────────────────────────────────────────────────────

    /// Nodes reachable from `roots`, operands before users, each exactly once.
    ///
    /// Order is deterministic: roots left to right, operands in positional
    /// order.
    pub fn post_order(&self, roots: &[NodeId]) -> Result<Vec<NodeId>, GraphError> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut stack: Vec<(NodeId, bool)> = Vec::new();

        for &root in roots {
            self.check(root)?;
            stack.push((root, false));
            while let Some((id, expanded)) = stack.pop() {
                if expanded {
                    order.push(id);
                    continue;
                }
                if visited[id.index()] {
                    continue;
                }
                visited[id.index()] = true;
                stack.push((id, true));
                for operand in self.nodes[id.index()].op.operands().into_iter().rev() {
                    if !visited[operand.index()] {
                        stack.push((operand, false));
                    }
                }
            }
        }

        Ok(order)
    }

    // ── Copying ─────────────────────────────────────────────────────────

    /// Copy of the whole graph built through `Op::clone_with`, as done when a
    /// graph is replicated per device.
    pub fn replicate(&self) -> Graph {
        let mut copy = Graph::new();
        for node in &self.nodes {
            let op = node.op.clone_with(&node.op.operands());
            copy.nodes.push(Node {
                id: node.id,
                op,
                ty: node.ty.clone(),
            });
        }
        copy.outputs = self.outputs.clone();
        debug!("graph: replicated {} nodes", copy.len());
        copy
    }

    /// New graph holding only the nodes reachable from `roots`, renumbered
    /// densely. Parameters are renumbered in the order they are kept; the
    /// roots become the outputs.
    pub fn extract(&self, roots: &[NodeId]) -> Result<Graph, GraphError> {
        let mut kept = self.post_order(roots)?;
        kept.sort();
        let mut remap: HashMap<NodeId, NodeId> = HashMap::with_capacity(kept.len());

        let mut sub = Graph::new();
        let mut next_param = 0;
        for old in kept {
            let node = &self.nodes[old.index()];
            let operands: Vec<NodeId> = node.op.operands().iter().map(|o| remap[o]).collect();
            let op = match node.op.clone_with(&operands) {
                Op::Parameter(p) => {
                    let index = next_param;
                    next_param += 1;
                    Op::Parameter(Parameter { index, ..p })
                }
                op => op,
            };
            let new = NodeId(sub.nodes.len() as u32);
            sub.nodes.push(Node {
                id: new,
                op,
                ty: node.ty.clone(),
            });
            remap.insert(old, new);
        }
        sub.outputs = roots.iter().map(|r| remap[r]).collect();
        debug!(
            "graph: extracted {} of {} nodes for {} roots",
            sub.len(),
            self.len(),
            roots.len()
        );
        Ok(sub)
    }

    /// Compact JSON used for fingerprinting.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ── Display ─────────────────────────────────────────────────────────────────

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph ({} nodes)", self.nodes.len())?;
        for node in &self.nodes {
            writeln!(f, "  {node}")?;
        }
        write!(f, "  return")?;
        for (i, id) in self.outputs.iter().enumerate() {
            if i == 0 {
                write!(f, " {id}")?;
            } else {
                write!(f, ", {id}")?;
            }
        }
        writeln!(f)
    }
}
