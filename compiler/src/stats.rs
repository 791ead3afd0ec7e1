// stats.rs — Layer-statistics summary from annotation points
//
// Runs a lowered program on zero-filled inputs shaped like its parameters and
// reports every annotated value with its type and min/max/mean. This is the
// "summary" view used to inspect a model layer by layer.

use std::fmt;

use log::info;
use serde::Serialize;

use crate::backend::{evaluate, EvalError, Program};
use crate::types::{Literal, TensorType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub label: String,
    pub ty: TensorType,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl SummaryRow {
    fn from_value(label: &str, value: &Literal) -> Self {
        let data = &value.data;
        let (min, max, mean) = if data.is_empty() {
            (None, None, None)
        } else {
            let min = data.iter().copied().fold(f64::INFINITY, f64::min);
            let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = data.iter().sum::<f64>() / data.len() as f64;
            (Some(min), Some(max), Some(mean))
        };
        Self {
            label: label.to_string(),
            ty: value.ty.clone(),
            min,
            max,
            mean,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub rows: Vec<SummaryRow>,
}

impl Summary {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Summarize `program` on zero inputs.
pub fn summarize(program: &Program) -> Result<Summary, EvalError> {
    let inputs = program
        .params
        .iter()
        .enumerate()
        .map(|(position, p)| {
            Literal::zeros(&p.ty).ok_or_else(|| EvalError::TooLarge {
                position,
                name: p.name.clone(),
                ty: p.ty.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    summarize_with(program, &inputs)
}

/// Summarize `program` on the given inputs.
pub fn summarize_with(program: &Program, inputs: &[Literal]) -> Result<Summary, EvalError> {
    let eval = evaluate(program, inputs)?;
    let rows: Vec<SummaryRow> = eval
        .samples
        .iter()
        .map(|s| SummaryRow::from_value(&s.label, &s.value))
        .collect();
    info!("stats: {} annotation points", rows.len());
    Ok(Summary { rows })
}

fn cell(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.4}"),
        None => "-".to_string(),
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .map(|r| r.label.chars().count())
            .chain(std::iter::once("annotation".len()))
            .max()
            .unwrap_or(0);
        writeln!(
            f,
            "{:<width$}  {:<12}  {:>10}  {:>10}  {:>10}",
            "annotation", "type", "min", "max", "mean"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<width$}  {:<12}  {:>10}  {:>10}  {:>10}",
                row.label,
                row.ty.to_string(),
                cell(row.min),
                cell(row.max),
                cell(row.mean)
            )?;
        }
        Ok(())
    }
}
