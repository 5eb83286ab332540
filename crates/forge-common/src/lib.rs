//! Common types and utilities for the Forge/Sweet semantic analyzer.
//!
//! This crate provides foundational types used across all forge crates:
//! - Source spans (`Span`)
//! - Position/line-map types for rendering source locations
//! - Diagnostics (`Diagnostic`, `ErrorKind`, `DiagnosticCategory`)
//! - Analyzer configuration (`AnalyzerOptions`, `SourceLanguage`, `AnalyzerMode`)

// Span - Source location tracking (byte offsets)
pub mod span;
pub use span::Span;

// Position/Range types for line/column source locations
pub mod position;
pub use position::{LineMap, Position};

// Accumulated diagnostics and the semantic/memory error taxonomy
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticCategory, ErrorKind};

// Analyzer configuration
pub mod options;
pub use options::{AnalyzerMode, AnalyzerOptions, SourceLanguage};
