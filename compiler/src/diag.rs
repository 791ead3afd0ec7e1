// diag.rs — Diagnostics shared by the front-end phases
//
// Every phase reports through `Diagnostic`; chumsky parse errors are converted
// by the pipeline under code E0001.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use crate::ast::Span;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0101`, `W0101`).
///
/// Once assigned, a code keeps its meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    pub const PARSE_ERROR: DiagCode = DiagCode("E0001");
    pub const UNDEFINED_NAME: DiagCode = DiagCode("E0101");
    pub const DUPLICATE_NAME: DiagCode = DiagCode("E0102");
    pub const UNKNOWN_OP: DiagCode = DiagCode("E0103");
    pub const BAD_ARGUMENTS: DiagCode = DiagCode("E0104");
    pub const TYPE_MISMATCH: DiagCode = DiagCode("E0105");
    pub const MISSING_RETURN: DiagCode = DiagCode("E0106");
    pub const UNKNOWN_DTYPE: DiagCode = DiagCode("E0107");
    pub const DUPLICATE_RETURN: DiagCode = DiagCode("E0108");
    pub const TENSOR_TOO_LARGE: DiagCode = DiagCode("E0109");
    pub const LOWERING_FAILED: DiagCode = DiagCode("E0201");
    pub const UNUSED_VALUE: DiagCode = DiagCode("W0101");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Related span ─────────────────────────────────────────────────────────

/// A secondary source location providing context for a diagnostic.
#[derive(Debug, Clone)]
pub struct RelatedSpan {
    pub span: Span,
    pub label: String,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A compiler diagnostic emitted by any phase.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
    pub related_spans: Vec<RelatedSpan>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, hint or related spans.
    pub fn new(level: DiagLevel, span: Span, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            span,
            message: message.into(),
            hint: None,
            related_spans: Vec::new(),
        }
    }

    pub fn error(code: DiagCode, span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, span, message).with_code(code)
    }

    pub fn warning(code: DiagCode, span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, span, message).with_code(code)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a related span.
    pub fn with_related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.related_spans.push(RelatedSpan {
            span,
            label: label.into(),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

/// True if any diagnostic in the slice is an error.
pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_span() -> Span {
        use chumsky::span::Span as _;
        Span::new((), 0..1)
    }

    #[test]
    fn display_without_code() {
        let d = Diagnostic::new(DiagLevel::Error, dummy_span(), "something failed");
        assert_eq!(format!("{d}"), "error: something failed");
    }

    #[test]
    fn display_with_code_and_hint() {
        let d = Diagnostic::warning(codes::UNUSED_VALUE, dummy_span(), "unused value 'y'")
            .with_hint("remove the binding or return it");
        assert_eq!(
            format!("{d}"),
            "warning[W0101]: unused value 'y'\n  hint: remove the binding or return it"
        );
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let warn = Diagnostic::warning(codes::UNUSED_VALUE, dummy_span(), "unused");
        assert!(!has_errors(&[warn.clone()]));
        let err = Diagnostic::error(codes::UNDEFINED_NAME, dummy_span(), "undefined")
            .with_related(dummy_span(), "used here");
        assert!(has_errors(&[warn, err]));
    }
}
