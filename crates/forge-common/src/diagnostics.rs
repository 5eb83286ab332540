//! Accumulated diagnostics for the semantic and memory analyzers.
//!
//! Errors are collected in a list owned by the analyzer and read by the
//! caller at the end of the run. Nothing in the analyzer throws; after an
//! error, traversal continues with a recovery type so later errors remain
//! meaningful.

use crate::span::Span;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCategory {
    Warning,
    Error,
    Message,
}

/// The closed taxonomy of semantic and memory error kinds.
///
/// Discriminants are stable numeric codes, usable in tooling output the way
/// diagnostic codes are.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ErrorKind {
    /// Referencing an object whose state is Invalidated, outside an escape block.
    UseAfterInvalidation = 1001,
    /// Wrapper transformation crossing group boundaries outside an escape block.
    MixedMemoryGroups = 1002,
    /// A wrapper transition forbidden by the transformation matrix.
    InvalidTransformation = 1003,
    /// `steal` with count != 1, `release` that would drop the count to zero,
    /// or a policy mismatch on a repeated `share`.
    ReferenceCountError = 1004,
    /// Container insertion of an invalidated object.
    ContainerMoveError = 1005,
    /// Non-usurping function returning `Hijacked`, or a scoped token returned
    /// from any function.
    UsurpingViolation = 1006,
    /// Escape-only operation used outside an escape block, or an escape block
    /// in Sweet mode.
    DangerBlockViolation = 1007,
    /// Thread-incompatible wrapper passed where a thread-safe one is required.
    ThreadSafetyViolation = 1008,
    /// A `.view()`/`.hijack()` result stored, assigned, returned, or passed to
    /// a container.
    InlineTokenEscape = 1009,
    /// Mutation through a `Viewed` or `Inspected` wrapper.
    ReadOnlyMutation = 1010,
    /// A fallible lock operation used outside a `when` scrutinee.
    FallibleLockOutsideWhen = 1011,
    /// The same named Hijacked handle appearing twice in one call.
    DuplicateHijackInCall = 1012,
    /// Assignment incompatibility, non-boolean condition, unknown identifier,
    /// invalid conversion, and other type-level failures.
    TypeError = 1013,
    /// Thrown expression is not a Crashable constructor.
    ThrowViolation = 1014,
    /// Function declared with a reserved variant prefix.
    ReservedPrefix = 1015,
    /// A non-function symbol redeclared in the same scope.
    DuplicateDeclaration = 1016,
}

impl ErrorKind {
    /// Stable numeric code for this kind.
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A single accumulated error record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub kind: ErrorKind,
    pub file: String,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn error(file: impl Into<String>, span: Span, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            kind,
            file: file.into(),
            span,
            message: message.into(),
        }
    }
}

/// Format a message template, substituting `{0}`, `{1}`, ... with `args`.
#[must_use]
pub fn format_message(message: &str, args: &[&str]) -> String {
    let mut result = message.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

#[cfg(test)]
#[path = "tests/diagnostics.rs"]
mod tests;
