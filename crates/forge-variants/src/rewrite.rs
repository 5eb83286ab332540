//! Body rewrites for generated variants.
//!
//! Each rewrite is a pure function over the statement structure: the source
//! body is copied with fresh node ids, and `fail` / `absent` statements are
//! replaced according to the variant kind. Compound statements are walked
//! structurally so nested occurrences rewrite too.

use forge_ast::{AstFactory, Block, Stmt, StmtKind};

/// The three generated wrapper families.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VariantKind {
    /// `try_foo` - every failure path becomes `return None`.
    Try,
    /// `check_foo` - `fail X` becomes `return X`.
    Check,
    /// `find_foo` - `fail X` becomes `return X`, `absent` becomes
    /// `return None`.
    Find,
}

impl VariantKind {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            VariantKind::Try => "try_",
            VariantKind::Check => "check_",
            VariantKind::Find => "find_",
        }
    }

    /// The result wrapper around the source return type.
    #[must_use]
    pub const fn result_wrapper(self) -> &'static str {
        match self {
            VariantKind::Try => "Maybe",
            VariantKind::Check => "Result",
            VariantKind::Find => "Lookup",
        }
    }
}

/// Rewrite a whole body for the given variant kind.
pub fn rewrite_block(factory: &mut AstFactory, block: &Block, kind: VariantKind) -> Block {
    Block {
        statements: block
            .statements
            .iter()
            .map(|stmt| rewrite_stmt(factory, stmt, kind))
            .collect(),
        span: block.span,
    }
}

fn rewrite_stmt(factory: &mut AstFactory, stmt: &Stmt, kind: VariantKind) -> Stmt {
    let rewritten = match &stmt.kind {
        StmtKind::Throw(value) => match kind {
            VariantKind::Try => {
                let none = factory.lit_none();
                StmtKind::Return(Some(none))
            }
            VariantKind::Check | VariantKind::Find => {
                let value = factory.refresh_expr(value);
                StmtKind::Return(Some(value))
            }
        },
        StmtKind::Absent => match kind {
            VariantKind::Try | VariantKind::Find => {
                let none = factory.lit_none();
                StmtKind::Return(Some(none))
            }
            // check_ variants are only generated for fail-only bodies, so an
            // absent here survives untouched.
            VariantKind::Check => StmtKind::Absent,
        },
        StmtKind::Return(value) => {
            StmtKind::Return(value.as_ref().map(|v| factory.refresh_expr(v)))
        }
        StmtKind::If {
            condition,
            then_block,
            else_block,
        } => StmtKind::If {
            condition: factory.refresh_expr(condition),
            then_block: rewrite_block(factory, then_block, kind),
            else_block: else_block
                .as_ref()
                .map(|block| rewrite_block(factory, block, kind)),
        },
        StmtKind::While { condition, body } => StmtKind::While {
            condition: factory.refresh_expr(condition),
            body: rewrite_block(factory, body, kind),
        },
        StmtKind::For {
            variable,
            iterable,
            body,
        } => StmtKind::For {
            variable: variable.clone(),
            iterable: factory.refresh_expr(iterable),
            body: rewrite_block(factory, body, kind),
        },
        StmtKind::When { scrutinee, arms } => StmtKind::When {
            scrutinee: factory.refresh_expr(scrutinee),
            arms: arms
                .iter()
                .map(|arm| forge_ast::WhenArm {
                    pattern: refresh_pattern(factory, &arm.pattern),
                    body: rewrite_block(factory, &arm.body, kind),
                    span: arm.span,
                })
                .collect(),
        },
        StmtKind::Block(block) => StmtKind::Block(rewrite_block(factory, block, kind)),
        StmtKind::Danger(block) => StmtKind::Danger(rewrite_block(factory, block, kind)),
        StmtKind::ScopedAccess {
            access,
            source,
            binding,
            body,
        } => StmtKind::ScopedAccess {
            access: *access,
            source: factory.refresh_expr(source),
            binding: binding.clone(),
            body: rewrite_block(factory, body, kind),
        },
        _ => return factory.refresh_stmt(stmt),
    };
    Stmt {
        span: stmt.span,
        kind: rewritten,
    }
}

fn refresh_pattern(factory: &mut AstFactory, pattern: &forge_ast::Pattern) -> forge_ast::Pattern {
    match pattern {
        forge_ast::Pattern::Literal(expr) => {
            forge_ast::Pattern::Literal(factory.refresh_expr(expr))
        }
        other => other.clone(),
    }
}
