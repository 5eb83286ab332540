//! Syntactic type resolution and the angle-bracket type encodings.
//!
//! `TypeExpr` nodes out of the parser become `TypeInfo` descriptors here.
//! This module also owns the `Routine<(…), R>` callable encoding and the
//! `Maybe<T>` / `Result<T>` / `Lookup<T>` payload extraction used by `when`
//! arms.

use forge_ast::TypeExpr;
use forge_memory::wrapper::{split_policy_argument, split_wrapper_name};
use forge_memory::{TypeInfo, decode_wrapper};

use crate::state::AnalyzerState;
use crate::symbols::{Symbol, TypeSymbol};

/// Names the analyzer accepts without a matching type symbol.
pub(crate) fn is_primitive_name(name: &str) -> bool {
    let probe = TypeInfo::named(name);
    probe.is_numeric() || probe.is_boolean() || probe.is_none() || probe.is_textual()
}

/// Builtin container heads whose generic arguments drive element typing.
pub(crate) fn is_builtin_container_name(name: &str) -> bool {
    matches!(name, "List" | "Set" | "Dict" | "Slice" | "Range")
}

/// Render the callable encoding for a function value.
pub(crate) fn routine_type_name(params: &[TypeInfo], ret: &TypeInfo) -> String {
    let rendered: Vec<String> = params.iter().map(TypeInfo::full_name).collect();
    format!("Routine<({}), {}>", rendered.join(", "), ret.full_name())
}

/// Extract the return type from a `Routine<(…), R>` encoding.
pub(crate) fn routine_return_type(name: &str) -> Option<TypeInfo> {
    let (head, inner) = split_wrapper_name(name)?;
    if head != "Routine" {
        return None;
    }
    // The parameter tuple is bracketed, so the top-level comma after it
    // separates the return type.
    let inner = inner.trim();
    if !inner.starts_with('(') {
        return None;
    }
    let mut depth = 0usize;
    let mut params_end = None;
    for (i, ch) in inner.char_indices() {
        match ch {
            '(' | '<' | '[' => depth += 1,
            ')' | '>' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && ch == ')' {
                    params_end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let params_end = params_end?;
    let rest = inner[params_end + 1..].trim_start();
    let ret = rest.strip_prefix(',')?.trim();
    if ret.is_empty() {
        return None;
    }
    Some(TypeInfo::named(ret))
}

/// Extract `T` from `Maybe<T>`, `Result<T>`, or `Lookup<T>`.
pub(crate) fn failable_payload(name: &str) -> Option<TypeInfo> {
    let (head, inner) = split_wrapper_name(name)?;
    if !matches!(head, "Maybe" | "Result" | "Lookup") {
        return None;
    }
    let (payload, _) = split_policy_argument(inner);
    Some(TypeInfo::named(payload))
}

impl AnalyzerState {
    /// Resolve a syntactic type reference into a descriptor.
    ///
    /// Unknown names still resolve (class references may be forward or
    /// external); only the structure is checked here.
    pub(crate) fn resolve_type(&mut self, ty: &TypeExpr) -> TypeInfo {
        let args: Vec<TypeInfo> = ty.args.iter().map(|arg| self.resolve_type(arg)).collect();
        let is_generic_param = matches!(
            self.symbols.lookup(&ty.name),
            Some(Symbol::Type(TypeSymbol::TypeParam { .. }))
        );
        TypeInfo {
            name: ty.name.clone(),
            is_reference: ty.is_reference,
            generic_args: if args.is_empty() { None } else { Some(args) },
            is_generic_param,
        }
    }

    /// Whether a name denotes a constructible type here: a primitive, a
    /// declared type symbol, or a wrapper-encoded name.
    pub(crate) fn is_known_type_name(&self, name: &str) -> bool {
        if is_primitive_name(name) || is_builtin_container_name(name) {
            return true;
        }
        if decode_wrapper(name).is_some() {
            return true;
        }
        matches!(self.symbols.lookup(name), Some(Symbol::Type(_)))
    }
}

#[cfg(test)]
#[path = "tests/type_resolution.rs"]
mod tests;
