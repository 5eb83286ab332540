//! Error emission helpers for `AnalyzerState`.
//!
//! All diagnostics funnel through these methods so that every record carries
//! the file name and a kind tag.

use forge_ast::Expr;
use forge_common::diagnostics::{Diagnostic, ErrorKind};
use forge_common::span::Span;
use forge_memory::MemoryError;

use crate::state::AnalyzerState;

impl AnalyzerState {
    /// Report an error at a span.
    pub(crate) fn error_at(&mut self, span: Span, kind: ErrorKind, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(self.file_name.clone(), span, kind, message));
    }

    /// Report an error at an expression.
    pub(crate) fn error_expr(&mut self, expr: &Expr, kind: ErrorKind, message: impl Into<String>) {
        self.error_at(expr.span, kind, message);
    }

    /// Convert a memory-table failure into a diagnostic.
    pub(crate) fn report_memory_error(&mut self, error: MemoryError) {
        self.diagnostics.push(Diagnostic::error(
            self.file_name.clone(),
            error.span,
            error.kind,
            error.message,
        ));
    }
}
