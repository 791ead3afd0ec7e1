// dot.rs — Graphviz DOT output for tensor graphs
//
// Preconditions: `graph` is a fully constructed Graph.
// Postconditions: returns a valid DOT string representing the graph.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::fmt::Write;

use crate::graph::{Graph, Node};
use crate::ops::Op;

/// Emit the graph as a Graphviz DOT string. Annotate nodes are drawn as
/// notes carrying their label; output nodes get a double border.
pub fn emit_dot(graph: &Graph) -> String {
    let mut buf = String::new();
    writeln!(buf, "digraph tir {{").unwrap();
    writeln!(buf, "    rankdir=TB;").unwrap();
    writeln!(buf, "    node [fontname=\"Helvetica\", fontsize=10];").unwrap();
    writeln!(buf, "    edge [fontname=\"Helvetica\", fontsize=9];").unwrap();
    writeln!(buf).unwrap();

    for node in graph.nodes() {
        let is_output = graph.outputs().contains(&node.id);
        writeln!(
            buf,
            "    n{} [{}];",
            node.id.0,
            node_attrs(node, is_output)
        )
        .unwrap();
    }

    writeln!(buf).unwrap();
    for node in graph.nodes() {
        for (slot, operand) in node.op.operands().iter().enumerate() {
            if node.op.operands().len() > 1 {
                writeln!(
                    buf,
                    "    n{} -> n{} [label=\"{}\"];",
                    operand.0, node.id.0, slot
                )
                .unwrap();
            } else {
                writeln!(buf, "    n{} -> n{};", operand.0, node.id.0).unwrap();
            }
        }
    }

    writeln!(buf, "}}").unwrap();
    buf
}

fn node_attrs(node: &Node, is_output: bool) -> String {
    let peripheries = if is_output { ", peripheries=2" } else { "" };
    match &node.op {
        Op::Annotate(a) => format!(
            "shape=note, style=filled, fillcolor=lightyellow, label=\"{}\\n{}\"{}",
            escape(a.annotation()),
            node.ty,
            peripheries
        ),
        Op::Parameter(p) => format!(
            "shape=invhouse, label=\"{}\\n{}\"{}",
            escape(&p.name),
            node.ty,
            peripheries
        ),
        Op::Constant(_) => format!("shape=box, label=\"const\\n{}\"{}", node.ty, peripheries),
        op => format!(
            "shape=ellipse, label=\"{}\\n{}\"{}",
            op.kind_name(),
            node.ty,
            peripheries
        ),
    }
}

/// Escape a string for use inside a DOT double-quoted label.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::BinaryKind;
    use crate::types::{DType, Literal, TensorType};

    #[test]
    fn annotate_is_a_note() {
        let mut g = Graph::new();
        let x = g.parameter("x", TensorType::scalar(DType::F64));
        let a = g.annotate(x, "say \"hi\"").unwrap();
        g.set_outputs(vec![a]).unwrap();
        let dot = emit_dot(&g);
        assert!(dot.starts_with("digraph tir {\n"));
        assert!(dot.contains(
            "n1 [shape=note, style=filled, fillcolor=lightyellow, label=\"say \\\"hi\\\"\\nf64[]\", peripheries=2];"
        ));
        assert!(dot.contains("    n0 -> n1;\n"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn binary_edges_are_labeled_by_slot() {
        let mut g = Graph::new();
        let a = g.constant(Literal::scalar(DType::F32, 1.0));
        let b = g.constant(Literal::scalar(DType::F32, 2.0));
        let s = g.binary(BinaryKind::Sub, a, b).unwrap();
        g.set_outputs(vec![s]).unwrap();
        let dot = emit_dot(&g);
        assert!(dot.contains("n0 -> n2 [label=\"0\"];"));
        assert!(dot.contains("n1 -> n2 [label=\"1\"];"));
        assert!(dot.contains("n2 [shape=ellipse, label=\"sub\\nf32[]\", peripheries=2];"));
    }

    #[test]
    fn deterministic() {
        let mut g = Graph::new();
        let x = g.parameter("x", TensorType::scalar(DType::F64));
        let a = g.annotate(x, "a").unwrap();
        g.set_outputs(vec![a]).unwrap();
        assert_eq!(emit_dot(&g), emit_dot(&g.replicate()));
    }
}
