// annotate.rs — IR node for collecting layer statistics
//
// Attaches a static label to a point in the graph. Lowering is an identity
// pass-through on the value: the input's handle is re-used as the output and
// the label goes to the lowering context's annotation channel.
//
// Preconditions: `input` names a value of the graph that owns this node.
// Postconditions: lowered output handle == lowered input handle.
// Failure modes: lowering before the input is lowered → `LoweringError`;
//                `clone_with` with an operand count other than 1 panics.
// Side effects: `lower` records one annotation in the context.

use std::fmt;

use serde::Serialize;

use crate::id::{Handle, NodeId};
use crate::lower::{LoweringContext, LoweringError};

/// Pass-through node carrying one operand and an immutable annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Annotate {
    input: NodeId,
    annotation: String,
}

impl Annotate {
    pub fn new(input: NodeId, annotation: impl Into<String>) -> Self {
        Self {
            input,
            annotation: annotation.into(),
        }
    }

    /// Annotation used for layer wrappers: `type=<LayerType>`.
    pub fn for_layer(input: NodeId, layer_type: &str) -> Self {
        Self::new(input, format!("type={layer_type}"))
    }

    pub fn input(&self) -> NodeId {
        self.input
    }

    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    pub fn operands(&self) -> [NodeId; 1] {
        [self.input]
    }

    /// Copy this node onto a replacement operand, keeping the annotation.
    ///
    /// # Panics
    ///
    /// Panics unless `operands` has exactly one element.
    pub fn clone_with(&self, operands: &[NodeId]) -> Self {
        assert_eq!(
            operands.len(),
            1,
            "annotate takes exactly 1 operand, got {}",
            operands.len()
        );
        Self {
            input: operands[0],
            annotation: self.annotation.clone(),
        }
    }

    pub fn lower(&self, ctx: &mut LoweringContext) -> Result<Vec<Handle>, LoweringError> {
        let handle = ctx.resolve(self.input)?;
        ctx.record_annotation(handle, &self.annotation);
        Ok(vec![handle])
    }
}

impl fmt::Display for Annotate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "annotate({}), annotation={}", self.input, self.annotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InstrKind;
    use crate::types::{DType, Literal};

    /// Context with node %0 already lowered to a scalar constant.
    fn ctx_with_constant(value: f64) -> (LoweringContext, Handle) {
        let mut ctx = LoweringContext::new();
        let h = ctx.emit(InstrKind::Const(Literal::scalar(DType::F64, value)));
        ctx.assign(NodeId(0), vec![h]);
        (ctx, h)
    }

    #[test]
    fn accessor_returns_text_unchanged() {
        let node = Annotate::new(NodeId(4), "layer1_activation");
        assert_eq!(node.annotation(), "layer1_activation");
        assert_eq!(node.input(), NodeId(4));
        assert_eq!(node.operands(), [NodeId(4)]);
    }

    #[test]
    fn empty_annotation_is_allowed() {
        let node = Annotate::new(NodeId(0), "");
        assert_eq!(node.annotation(), "");
        assert_eq!(node.to_string(), "annotate(%0), annotation=");
    }

    #[test]
    fn layer_annotation_format() {
        let node = Annotate::for_layer(NodeId(1), "Dense");
        assert_eq!(node.annotation(), "type=Dense");
    }

    #[test]
    fn clone_with_swaps_only_the_operand() {
        let node = Annotate::new(NodeId(2), "stats");
        let copy = node.clone_with(&[NodeId(9)]);
        assert_eq!(copy.input(), NodeId(9));
        assert_eq!(copy.annotation(), node.annotation());
        assert_eq!(node.input(), NodeId(2));
    }

    #[test]
    #[should_panic(expected = "exactly 1 operand, got 0")]
    fn clone_with_no_operands_panics() {
        Annotate::new(NodeId(0), "x").clone_with(&[]);
    }

    #[test]
    #[should_panic(expected = "exactly 1 operand, got 2")]
    fn clone_with_two_operands_panics() {
        Annotate::new(NodeId(0), "x").clone_with(&[NodeId(0), NodeId(1)]);
    }

    #[test]
    fn lower_forwards_the_input_handle() {
        let (mut ctx, h) = ctx_with_constant(3.14);
        let out = Annotate::new(NodeId(0), "layer1_activation")
            .lower(&mut ctx)
            .unwrap();
        assert_eq!(out, vec![h]);

        let records = ctx.annotations();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "layer1_activation");
        assert_eq!(records[0].handle, h);
        assert_eq!(records[0].position, 1);
    }

    #[test]
    fn lower_does_not_emit_instructions() {
        let (mut ctx, _) = ctx_with_constant(1.0);
        Annotate::new(NodeId(0), "a").lower(&mut ctx).unwrap();
        assert_eq!(ctx.instr_count(), 1);
    }

    #[test]
    fn lower_before_operand_fails() {
        let mut ctx = LoweringContext::new();
        let err = Annotate::new(NodeId(0), "a").lower(&mut ctx).unwrap_err();
        assert_eq!(
            err,
            LoweringError::UnloweredOperand { operand: NodeId(0) }
        );
        assert!(ctx.annotations().is_empty());
    }

    #[test]
    fn display_keeps_special_characters_verbatim() {
        let text = "type=\"Conv2D\" \\ α\tβ\n";
        let node = Annotate::new(NodeId(3), text);
        let shown = node.to_string();
        assert!(shown.starts_with("annotate(%3)"));
        assert!(shown.contains(text));
    }
}
