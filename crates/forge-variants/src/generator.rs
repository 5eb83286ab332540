//! The variant generator walk.
//!
//! Only function declarations matter; every other node kind is walked for
//! nested functions and otherwise ignored. For each eligible failable
//! function, the body is scanned for `fail` and `absent` and the matching
//! wrapper set is synthesized.

use forge_ast::{
    AstFactory, Block, Decl, DeclKind, Expr, ExprKind, FunctionDecl, Program, Stmt, StmtKind,
    TypeExpr,
};
use forge_common::span::Span;
use tracing::debug;

use crate::rewrite::{VariantKind, rewrite_block};

/// Prefixes that mark an already-generated variant.
const VARIANT_PREFIXES: &[&str] = &["try_", "check_", "find_"];

/// Intrinsics that abort instead of failing recoverably. A body that calls
/// one of these cannot be wrapped.
const UNRECOVERABLE_INTRINSICS: &[&str] = &["stop!", "breach!", "verify!"];

/// What a failable body signals with.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct FailureSignals {
    has_fail: bool,
    has_absent: bool,
}

impl FailureSignals {
    /// The generated set for this combination of signals.
    fn variants(self) -> &'static [VariantKind] {
        match (self.has_fail, self.has_absent) {
            (true, false) => &[VariantKind::Try, VariantKind::Check],
            (false, true) => &[VariantKind::Try],
            (true, true) => &[VariantKind::Try, VariantKind::Find],
            (false, false) => &[],
        }
    }
}

/// Synthesizes `try_`/`check_`/`find_` wrappers from failable functions.
pub struct VariantGenerator<'a> {
    factory: &'a mut AstFactory,
}

impl<'a> VariantGenerator<'a> {
    pub fn new(factory: &'a mut AstFactory) -> Self {
        Self { factory }
    }

    /// Walk the program and return the synthesized declarations, in source
    /// order. The input program is not modified; callers append the result.
    pub fn generate(&mut self, program: &Program) -> Vec<Decl> {
        let mut generated = Vec::new();
        for decl in &program.declarations {
            self.visit_decl(decl, &mut generated);
        }
        debug!(count = generated.len(), "variant generation finished");
        generated
    }

    fn visit_decl(&mut self, decl: &Decl, out: &mut Vec<Decl>) {
        match &decl.kind {
            DeclKind::Function(func) => self.visit_function(func, out),
            DeclKind::Class(class) => {
                for member in &class.members {
                    self.visit_decl(member, out);
                }
            }
            DeclKind::Implementation(imp) => {
                for member in &imp.members {
                    self.visit_decl(member, out);
                }
            }
            DeclKind::Namespace { declarations, .. } | DeclKind::External { declarations } => {
                for inner in declarations {
                    self.visit_decl(inner, out);
                }
            }
            // Nothing to generate for the remaining declaration kinds.
            _ => {}
        }
    }

    fn visit_function(&mut self, func: &FunctionDecl, out: &mut Vec<Decl>) {
        if !self.is_eligible(func) {
            return;
        }
        let signals = scan_block(&func.body);
        for &kind in signals.variants() {
            out.push(self.synthesize(func, kind));
        }
    }

    fn is_eligible(&self, func: &FunctionDecl) -> bool {
        // Only failable functions (declared with a trailing `!`) get wrappers.
        let Some(base) = func.name.strip_suffix('!') else {
            return false;
        };
        if VARIANT_PREFIXES.iter().any(|prefix| base.starts_with(prefix)) {
            return false;
        }
        if func.crash_only {
            return false;
        }
        if block_calls_unrecoverable(&func.body) {
            return false;
        }
        true
    }

    fn synthesize(&mut self, func: &FunctionDecl, kind: VariantKind) -> Decl {
        let name = format!("{}{}", kind.prefix(), base_name(&func.name));
        let inner = func
            .return_type
            .as_ref()
            .map(render_type_name)
            .unwrap_or_else(|| "none".to_string());
        let return_type = TypeExpr::named(
            format!("{}<{inner}>", kind.result_wrapper()),
            Span::DUMMY,
        );
        let body = rewrite_block(self.factory, &func.body, kind);

        debug!(source = %func.name, variant = %name, "variant synthesized");
        Decl {
            span: Span::DUMMY,
            kind: DeclKind::Function(FunctionDecl {
                name,
                type_qualifier: func.type_qualifier.clone(),
                generics: func.generics.clone(),
                params: func.params.clone(),
                return_type: Some(return_type),
                body,
                is_usurping: func.is_usurping,
                crash_only: false,
                visibility: func.visibility,
            }),
        }
    }
}

/// Strip the failable `!` and any `__dunder__` wrapping from a source name.
fn base_name(name: &str) -> String {
    let base = name.strip_suffix('!').unwrap_or(name);
    let base = base
        .strip_prefix("__")
        .and_then(|rest| rest.strip_suffix("__"))
        .unwrap_or(base);
    base.to_string()
}

/// Render a syntactic type as `name[arg1,arg2]`, matching descriptor
/// full names.
fn render_type_name(ty: &TypeExpr) -> String {
    if ty.args.is_empty() {
        ty.name.clone()
    } else {
        let args: Vec<String> = ty.args.iter().map(render_type_name).collect();
        format!("{}[{}]", ty.name, args.join(","))
    }
}

/// Scan a body for `fail` and `absent`, walking compound statements.
fn scan_block(block: &Block) -> FailureSignals {
    let mut signals = FailureSignals::default();
    for stmt in &block.statements {
        scan_stmt(stmt, &mut signals);
    }
    signals
}

fn scan_stmt(stmt: &Stmt, signals: &mut FailureSignals) {
    match &stmt.kind {
        StmtKind::Throw(_) => signals.has_fail = true,
        StmtKind::Absent => signals.has_absent = true,
        StmtKind::If {
            then_block,
            else_block,
            ..
        } => {
            *signals = merge(*signals, scan_block(then_block));
            if let Some(else_block) = else_block {
                *signals = merge(*signals, scan_block(else_block));
            }
        }
        StmtKind::While { body, .. }
        | StmtKind::For { body, .. }
        | StmtKind::Danger(body)
        | StmtKind::ScopedAccess { body, .. } => {
            *signals = merge(*signals, scan_block(body));
        }
        StmtKind::When { arms, .. } => {
            for arm in arms {
                *signals = merge(*signals, scan_block(&arm.body));
            }
        }
        StmtKind::Block(block) => {
            *signals = merge(*signals, scan_block(block));
        }
        _ => {}
    }
}

fn merge(a: FailureSignals, b: FailureSignals) -> FailureSignals {
    FailureSignals {
        has_fail: a.has_fail || b.has_fail,
        has_absent: a.has_absent || b.has_absent,
    }
}

/// Whether any statement in the body calls an unrecoverable intrinsic.
fn block_calls_unrecoverable(block: &Block) -> bool {
    block.statements.iter().any(stmt_calls_unrecoverable)
}

fn stmt_calls_unrecoverable(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Expression(expr)
        | StmtKind::Throw(expr)
        | StmtKind::Return(Some(expr)) => expr_calls_unrecoverable(expr),
        StmtKind::Declaration(decl) => decl
            .initializer
            .as_ref()
            .is_some_and(expr_calls_unrecoverable),
        StmtKind::Assignment { target, value } => {
            expr_calls_unrecoverable(target) || expr_calls_unrecoverable(value)
        }
        StmtKind::If {
            condition,
            then_block,
            else_block,
        } => {
            expr_calls_unrecoverable(condition)
                || block_calls_unrecoverable(then_block)
                || else_block.as_ref().is_some_and(block_calls_unrecoverable)
        }
        StmtKind::While { condition, body } => {
            expr_calls_unrecoverable(condition) || block_calls_unrecoverable(body)
        }
        StmtKind::For { iterable, body, .. } => {
            expr_calls_unrecoverable(iterable) || block_calls_unrecoverable(body)
        }
        StmtKind::When { scrutinee, arms } => {
            expr_calls_unrecoverable(scrutinee)
                || arms.iter().any(|arm| block_calls_unrecoverable(&arm.body))
        }
        StmtKind::Block(block) | StmtKind::Danger(block) => block_calls_unrecoverable(block),
        StmtKind::ScopedAccess { source, body, .. } => {
            expr_calls_unrecoverable(source) || block_calls_unrecoverable(body)
        }
        _ => false,
    }
}

fn expr_calls_unrecoverable(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Call { callee, args, .. } => {
            if let ExprKind::Identifier(name) = &callee.kind
                && UNRECOVERABLE_INTRINSICS.contains(&name.as_str())
            {
                return true;
            }
            expr_calls_unrecoverable(callee) || args.iter().any(expr_calls_unrecoverable)
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            expr_calls_unrecoverable(lhs) || expr_calls_unrecoverable(rhs)
        }
        ExprKind::Unary { operand, .. } => expr_calls_unrecoverable(operand),
        ExprKind::Member { object, .. } => expr_calls_unrecoverable(object),
        ExprKind::Index { object, index } => {
            expr_calls_unrecoverable(object) || expr_calls_unrecoverable(index)
        }
        ExprKind::Conditional {
            condition,
            then_value,
            else_value,
        } => {
            expr_calls_unrecoverable(condition)
                || expr_calls_unrecoverable(then_value)
                || expr_calls_unrecoverable(else_value)
        }
        ExprKind::ListLiteral(items) | ExprKind::SetLiteral(items) => {
            items.iter().any(expr_calls_unrecoverable)
        }
        ExprKind::DictLiteral(entries) => entries
            .iter()
            .any(|(k, v)| expr_calls_unrecoverable(k) || expr_calls_unrecoverable(v)),
        ExprKind::BlockExpr(block) => block_calls_unrecoverable(block),
        ExprKind::MemoryOperation { target, args, .. } => {
            expr_calls_unrecoverable(target) || args.iter().any(expr_calls_unrecoverable)
        }
        ExprKind::IntrinsicCall { args, .. } | ExprKind::NativeCall { args, .. } => {
            args.iter().any(expr_calls_unrecoverable)
        }
        ExprKind::NamedArgument { value, .. } => expr_calls_unrecoverable(value),
        ExprKind::Constructor { args, .. } => args.iter().any(expr_calls_unrecoverable),
        _ => false,
    }
}

#[cfg(test)]
#[path = "tests/generator.rs"]
mod tests;
