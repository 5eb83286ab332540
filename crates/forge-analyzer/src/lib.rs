//! Semantic analyzer for the Forge and Sweet surface languages.
//!
//! This crate provides:
//! - `SymbolTable` - lexical scope stack with declarations, lookup, and
//!   overload sets
//! - `AnalyzerState` - the recursive AST traversal that threads symbol,
//!   memory, and scoped-token state and accumulates diagnostics
//!
//! The traversal never throws: every error lands in the diagnostic list and
//! analysis continues with a recovery type.

pub mod symbols;
pub use symbols::{FunctionSymbol, Symbol, SymbolTable, TypeSymbol};

pub mod state;
pub use state::{AnalysisStats, AnalyzerState, InvalidatedSource};

mod error_reporter;
mod state_calls;
mod state_declarations;
mod state_expressions;
mod state_scoped_access;
mod state_statements;
mod type_resolution;
