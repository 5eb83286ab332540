//! Symbol table: a stack of name-keyed maps with overload-set formation.
//!
//! A name resolves to at most one symbol per scope; a second function
//! declared under an existing function's name collapses the two into an
//! overload set. Any other collision is a duplicate-declaration failure.

use forge_ast::Visibility;
use forge_memory::TypeInfo;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

/// A single callable signature.
#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub name: String,
    pub params: Vec<TypeInfo>,
    pub return_type: TypeInfo,
    pub visibility: Visibility,
    pub is_usurping: bool,
    pub generics: Vec<String>,
}

/// A declared type.
#[derive(Debug, Clone)]
pub enum TypeSymbol {
    Class {
        name: String,
        generics: Vec<String>,
        /// Names of implemented features (protocols).
        features: Vec<String>,
        fields: Vec<(String, TypeInfo)>,
    },
    Struct {
        name: String,
        generics: Vec<String>,
        fields: Vec<(String, TypeInfo)>,
    },
    Feature { name: String },
    Variant {
        name: String,
        generics: Vec<String>,
        cases: Vec<String>,
    },
    Menu { name: String, cases: Vec<String> },
    TypeParam { name: String },
}

impl TypeSymbol {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            TypeSymbol::Class { name, .. }
            | TypeSymbol::Struct { name, .. }
            | TypeSymbol::Feature { name }
            | TypeSymbol::Variant { name, .. }
            | TypeSymbol::Menu { name, .. }
            | TypeSymbol::TypeParam { name } => name,
        }
    }

    /// Field lookup for classes and structs.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&TypeInfo> {
        match self {
            TypeSymbol::Class { fields, .. } | TypeSymbol::Struct { fields, .. } => fields
                .iter()
                .find_map(|(name, ty)| (name == field).then_some(ty)),
            _ => None,
        }
    }

    /// Whether this type implements the named feature.
    #[must_use]
    pub fn implements(&self, feature: &str) -> bool {
        match self {
            TypeSymbol::Class { features, .. } => features.iter().any(|f| f == feature),
            _ => false,
        }
    }
}

/// An entry in the symbol table.
#[derive(Debug, Clone)]
pub enum Symbol {
    Variable {
        name: String,
        ty: TypeInfo,
        mutable: bool,
        visibility: Visibility,
    },
    Function(FunctionSymbol),
    /// Two or more functions sharing a name in one scope.
    Overloads(SmallVec<[FunctionSymbol; 2]>),
    Type(TypeSymbol),
}

impl Symbol {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Symbol::Variable { name, .. } => name,
            Symbol::Function(f) => &f.name,
            Symbol::Overloads(list) => &list[0].name,
            Symbol::Type(t) => t.name(),
        }
    }

    #[must_use]
    pub fn is_function(&self) -> bool {
        matches!(self, Symbol::Function(_) | Symbol::Overloads(_))
    }
}

/// Stack of name-keyed scopes. The global scope is never popped.
pub struct SymbolTable {
    scopes: Vec<FxHashMap<String, Symbol>>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: vec![FxHashMap::default()],
        }
    }

    /// Current depth; the global scope is depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    /// Pop the innermost scope. No-op on the global scope.
    pub fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Declare a symbol in the current scope.
    ///
    /// A function declared over an existing function (or overload set) with
    /// the same name extends the overload set and succeeds. Everything else
    /// fails on collision.
    pub fn try_declare(&mut self, symbol: Symbol) -> bool {
        let name = symbol.name().to_string();
        let Some(scope) = self.scopes.last_mut() else {
            return false;
        };
        if !scope.contains_key(&name) {
            trace!(name = %name, "symbol declared");
            scope.insert(name, symbol);
            return true;
        }
        // Collision: only a function over an existing function (or overload
        // set) is allowed, and extends the set.
        let Symbol::Function(added) = symbol else {
            return false;
        };
        match scope.get_mut(&name) {
            Some(entry) => match entry {
                Symbol::Function(existing) => {
                    let mut set: SmallVec<[FunctionSymbol; 2]> = SmallVec::new();
                    set.push(existing.clone());
                    set.push(added);
                    *entry = Symbol::Overloads(set);
                    true
                }
                Symbol::Overloads(set) => {
                    set.push(added);
                    true
                }
                _ => false,
            },
            None => false,
        }
    }

    /// Innermost-first lookup.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Lookup restricted to the current scope.
    #[must_use]
    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.scopes.last().and_then(|scope| scope.get(name))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/symbols.rs"]
mod tests;
