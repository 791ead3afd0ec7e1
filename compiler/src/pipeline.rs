// pipeline.rs — Source-to-program compilation driver
//
// Runs parse → resolve → lower and folds every phase's failures into one
// diagnostic list. Each phase only runs if the previous one produced no
// error-level diagnostics.
//
// Preconditions: none.
// Postconditions: `program` is `Some` iff no error diagnostics were produced.
// Failure modes: parse errors (E0001), resolve errors (E01xx), lowering
//   errors (E0201).
// Side effects: logs phase progress through `log`.

use std::fmt::Write;

use chumsky::error::Rich;
use chumsky::span::SimpleSpan;
use log::{debug, info};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ast::Module;
use crate::backend::Program;
use crate::diag::{codes, has_errors, Diagnostic};
use crate::graph::Graph;
use crate::lexer::Token;
use crate::lower::{lower_graph, LowerOptions};

// ── Options and result ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub lower: LowerOptions,
}

#[derive(Debug)]
pub struct CompileResult {
    pub module: Option<Module>,
    pub graph: Option<Graph>,
    pub program: Option<Program>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileResult {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }
}

// ── Driver ──────────────────────────────────────────────────────────────────

/// Compile `.tir` source text to a lowered program.
pub fn compile(source: &str, options: &CompileOptions) -> CompileResult {
    let mut result = CompileResult {
        module: None,
        graph: None,
        program: None,
        diagnostics: Vec::new(),
    };

    let parsed = crate::parser::parse(source);
    result
        .diagnostics
        .extend(parsed.errors.iter().map(parse_diagnostic));
    let Some(module) = parsed.module else {
        return result;
    };
    info!("parse: {} statements", module.statements.len());
    if result.has_errors() {
        result.module = Some(module);
        return result;
    }

    let resolved = crate::resolve::resolve(&module);
    result.module = Some(module);
    result.diagnostics.extend(resolved.diagnostics);
    info!(
        "resolve: {} nodes, {} annotations",
        resolved.graph.len(),
        resolved.graph.annotations().len()
    );
    if result.has_errors() {
        result.graph = Some(resolved.graph);
        return result;
    }

    match lower_graph(&resolved.graph, &options.lower) {
        Ok(program) => {
            info!(
                "lower: {} instrs, {} annotation records",
                program.instrs.len(),
                program.annotations.len()
            );
            result.program = Some(program);
        }
        Err(e) => {
            let span = result
                .module
                .as_ref()
                .map(|m| m.span)
                .unwrap_or_else(|| SimpleSpan::from(0..0));
            result
                .diagnostics
                .push(Diagnostic::error(codes::LOWERING_FAILED, span, e.to_string()));
        }
    }
    result.graph = Some(resolved.graph);
    result
}

fn parse_diagnostic(err: &Rich<'static, Token, SimpleSpan>) -> Diagnostic {
    Diagnostic::error(codes::PARSE_ERROR, *err.span(), err.to_string())
}

// ── Provenance ──────────────────────────────────────────────────────────────

/// Provenance metadata for reproducible builds and cache keys.
///
/// `source_hash`: SHA-256 of the raw `.tir` source text.
/// `graph_fingerprint`: SHA-256 of `Graph::canonical_json()`.
/// `compiler_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub source_hash: [u8; 32],
    pub graph_fingerprint: [u8; 32],
    pub compiler_version: &'static str,
}

#[derive(Serialize)]
struct ProvenanceJson<'a> {
    source_hash: String,
    graph_fingerprint: String,
    compiler_version: &'a str,
}

impl Provenance {
    pub fn source_hash_hex(&self) -> String {
        bytes_to_hex(&self.source_hash)
    }

    pub fn graph_fingerprint_hex(&self) -> String {
        bytes_to_hex(&self.graph_fingerprint)
    }

    /// JSON document for `--emit build-info`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&ProvenanceJson {
            source_hash: self.source_hash_hex(),
            graph_fingerprint: self.graph_fingerprint_hex(),
            compiler_version: self.compiler_version,
        })
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Compute provenance from source text and the graph built from it.
///
/// The fingerprint hashes compact canonical JSON, so it is stable across
/// whitespace and comment edits that leave the graph unchanged.
pub fn compute_provenance(source: &str, graph: &Graph) -> Result<Provenance, serde_json::Error> {
    let canonical = graph.canonical_json()?;
    debug!("provenance: canonical graph is {} bytes", canonical.len());
    Ok(Provenance {
        source_hash: sha256(source.as_bytes()),
        graph_fingerprint: sha256(canonical.as_bytes()),
        compiler_version: env!("CARGO_PKG_VERSION"),
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────
