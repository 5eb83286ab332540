//! Analyzer state.
//!
//! One `AnalyzerState` instance walks one program. It owns the symbol table,
//! the memory table, the scoped-token and invalidated-source maps, the
//! diagnostic list, and the contextual flags. Traversal logic is split
//! across the `state_*` modules; this module holds the state itself and the
//! scope lifecycle.

use forge_ast::{AccessKind, NodeId, Program};
use forge_common::diagnostics::Diagnostic;
use forge_common::options::AnalyzerOptions;
use forge_memory::{MemoryTable, TypeInfo};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::symbols::SymbolTable;

/// A source temporarily unreadable because a scoped token borrows it.
#[derive(Debug, Clone)]
pub struct InvalidatedSource {
    pub name: String,
    /// Scope depth of the borrowing block.
    pub depth: u32,
    pub access: AccessKind,
}

/// Counters maintained during analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisStats {
    pub scopes_entered: usize,
    pub objects_registered: usize,
    pub errors: usize,
}

/// The semantic analyzer: a recursive visitor threading symbol, memory, and
/// scoped-token state over one program.
pub struct AnalyzerState {
    pub options: AnalyzerOptions,
    pub file_name: String,
    pub symbols: SymbolTable,
    pub memory: MemoryTable,
    pub diagnostics: Vec<Diagnostic>,
    /// Token name -> scope depth of the declaring scoped-access block.
    pub(crate) scoped_tokens: FxHashMap<String, u32>,
    /// Source name -> borrow record, while a scoped token holds it.
    pub(crate) invalidated_sources: FxHashMap<String, InvalidatedSource>,
    /// Resolved types, keyed by expression identity.
    pub(crate) node_types: FxHashMap<NodeId, TypeInfo>,
    /// Expressions whose value is an inline-only token, keyed by the
    /// operation that produced them (`view` or `hijack`).
    pub(crate) inline_tokens: FxHashMap<NodeId, &'static str>,
    pub(crate) in_danger_block: bool,
    pub(crate) in_usurping_function: bool,
    pub(crate) in_when_condition: bool,
    /// Declared return type of the function being walked.
    pub(crate) current_return_type: Option<TypeInfo>,
    pub(crate) stats: AnalysisStats,
}

impl AnalyzerState {
    #[must_use]
    pub fn new(file_name: impl Into<String>, options: AnalyzerOptions) -> Self {
        Self {
            options,
            file_name: file_name.into(),
            symbols: SymbolTable::new(),
            memory: MemoryTable::new(options.language),
            diagnostics: Vec::new(),
            scoped_tokens: FxHashMap::default(),
            invalidated_sources: FxHashMap::default(),
            node_types: FxHashMap::default(),
            inline_tokens: FxHashMap::default(),
            in_danger_block: false,
            in_usurping_function: false,
            in_when_condition: false,
            current_return_type: None,
            stats: AnalysisStats::default(),
        }
    }

    /// Analyze a whole program. Diagnostics accumulate; nothing is thrown.
    pub fn analyze_program(&mut self, program: &Program) {
        debug!(file = %self.file_name, decls = program.declarations.len(), "analysis started");
        for decl in &program.declarations {
            self.visit_decl(decl);
        }
        self.stats.errors = self.diagnostics.len();
        debug!(
            file = %self.file_name,
            errors = self.stats.errors,
            objects = self.stats.objects_registered,
            "analysis finished"
        );
    }

    /// The accumulated error list.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn stats(&self) -> AnalysisStats {
        let mut stats = self.stats;
        stats.errors = self.diagnostics.len();
        stats
    }

    /// The resolved type of an expression, if analysis reached it.
    #[must_use]
    pub fn type_of(&self, id: NodeId) -> Option<&TypeInfo> {
        self.node_types.get(&id)
    }

    /// Whether a name is currently registered as a scoped token.
    #[must_use]
    pub fn is_scoped_token(&self, name: &str) -> bool {
        self.scoped_tokens.contains_key(name)
    }

    // ------------------------------------------------------------------
    // Scope lifecycle
    // ------------------------------------------------------------------

    pub(crate) fn current_depth(&self) -> u32 {
        u32::try_from(self.symbols.depth()).unwrap_or(u32::MAX)
    }

    /// Push fresh symbol and memory scopes.
    pub(crate) fn enter_scope(&mut self) {
        self.symbols.enter_scope();
        self.memory.enter_scope();
        self.stats.scopes_entered += 1;
    }

    /// Pop both scopes: objects declared at this depth are invalidated,
    /// tokens registered here disappear, and sources borrowed here are
    /// restored.
    pub(crate) fn exit_scope(&mut self) {
        let depth = self.current_depth();
        self.memory.exit_scope();
        self.symbols.exit_scope();

        self.scoped_tokens.retain(|_, d| *d != depth);

        let restored: Vec<String> = self
            .invalidated_sources
            .iter()
            .filter(|(_, src)| src.depth == depth)
            .map(|(name, _)| name.clone())
            .collect();
        for name in restored {
            self.memory.revalidate(&name);
            self.invalidated_sources.remove(&name);
        }
    }
}

#[cfg(test)]
#[path = "tests/state.rs"]
mod tests;
