// tirc — Tensor IR compiler
//
// Library root. Source flows lexer → parser → resolve (graph) → lower
// (backend program); `pipeline` drives the phases end to end.

pub mod ast;
pub mod backend;
pub mod diag;
pub mod dot;
pub mod graph;
pub mod id;
pub mod lexer;
pub mod lower;
pub mod ops;
pub mod parser;
pub mod pipeline;
pub mod resolve;
pub mod stats;
pub mod types;
