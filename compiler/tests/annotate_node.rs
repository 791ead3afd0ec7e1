// Property tests for the annotate node.
//
// The annotation text is opaque: whatever string goes in comes back out of
// the accessor, survives cloning and lowering, and shows up verbatim in the
// node's text form. Cloning with any operand count other than one panics.

use std::panic::{catch_unwind, AssertUnwindSafe};

use proptest::prelude::*;

use tirc::graph::Graph;
use tirc::id::NodeId;
use tirc::lower::{lower_graph, LowerOptions};
use tirc::ops::annotate::Annotate;
use tirc::types::{DType, Literal};

fn annotated_scalar(value: f64, label: &str) -> Graph {
    let mut g = Graph::new();
    let c = g.constant(Literal::scalar(DType::F64, value));
    let a = g.annotate(c, label).unwrap();
    g.set_outputs(vec![a]).unwrap();
    g
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    #[test]
    fn accessor_returns_construction_text(label in ".*", input in 0u32..1000) {
        let node = Annotate::new(NodeId(input), label.clone());
        prop_assert_eq!(node.annotation(), label.as_str());
        prop_assert_eq!(node.input(), NodeId(input));
    }

    #[test]
    fn clone_keeps_text_and_takes_new_operand(label in ".*", from in 0u32..100, to in 0u32..100) {
        let node = Annotate::new(NodeId(from), label.clone());
        let copy = node.clone_with(&[NodeId(to)]);
        prop_assert_eq!(copy.annotation(), label.as_str());
        prop_assert_eq!(copy.input(), NodeId(to));
        prop_assert_eq!(node.input(), NodeId(from));
    }

    #[test]
    fn clone_with_wrong_arity_panics(n in 0usize..6) {
        prop_assume!(n != 1);
        let node = Annotate::new(NodeId(0), "x");
        let operands: Vec<NodeId> = (0..n as u32).map(NodeId).collect();
        let result = catch_unwind(AssertUnwindSafe(|| node.clone_with(&operands)));
        prop_assert!(result.is_err());
    }

    #[test]
    fn text_form_embeds_label_verbatim(label in "[ -~]*") {
        let node = Annotate::new(NodeId(7), label.clone());
        prop_assert_eq!(node.to_string(), format!("annotate(%7), annotation={label}"));
    }

    #[test]
    fn lowering_forwards_value_and_records_label(value in -1e6f64..1e6, label in ".*") {
        let program = lower_graph(&annotated_scalar(value, &label), &LowerOptions::default()).unwrap();
        prop_assert_eq!(program.instrs.len(), 1);
        prop_assert_eq!(program.annotations.len(), 1);
        prop_assert_eq!(&program.annotations[0].label, &label);
        prop_assert_eq!(program.annotations[0].handle, program.instrs[0].result);
        prop_assert_eq!(&program.outputs, &vec![program.instrs[0].result]);

        let eval = tirc::backend::evaluate(&program, &[]).unwrap();
        prop_assert_eq!(eval.outputs[0].as_scalar(), Some(value));
    }
}

#[test]
fn replicated_graph_keeps_annotations() {
    let g = annotated_scalar(3.14, "layer1_activation");
    let copy = g.replicate();
    assert_eq!(copy, g);
    assert_eq!(copy.annotations(), vec![(NodeId(1), "layer1_activation")]);
}

#[test]
fn annotating_an_annotation_stacks_records() {
    let mut g = Graph::new();
    let c = g.constant(Literal::scalar(DType::F32, 1.0));
    let inner = g.annotate(c, "inner").unwrap();
    let outer = g.annotate(inner, "outer").unwrap();
    g.set_outputs(vec![outer]).unwrap();

    let program = lower_graph(&g, &LowerOptions::default()).unwrap();
    assert_eq!(program.instrs.len(), 1);
    let labels: Vec<&str> = program.annotations.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["inner", "outer"]);
    assert!(program
        .annotations
        .iter()
        .all(|r| r.handle == program.instrs[0].result));
}
