//! Synthetic node construction.
//!
//! `AstFactory` is the single allocator of `NodeId`s. The parser owns one
//! while lowering source text; the variant generator borrows it to synthesize
//! wrapper declarations; tests use it to build programs directly.
//!
//! Factory methods produce nodes with dummy spans. Callers that care about
//! locations (the parsers) overwrite `span` after construction.

use crate::node::{
    AccessKind, BinaryOp, Block, Decl, DeclKind, Expr, ExprKind, FunctionDecl, Literal, NodeId,
    Param, Pattern, Program, Stmt, StmtKind, TypeExpr, UnaryOp, VariableDecl, Visibility, WhenArm,
};
use forge_common::span::Span;

/// Allocates `NodeId`s and builds AST nodes.
#[derive(Debug, Default)]
pub struct AstFactory {
    next_id: u32,
}

impl AstFactory {
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Resume allocation after `start`, for callers that re-enter a tree
    /// whose ids were allocated elsewhere.
    #[must_use]
    pub fn starting_at(start: u32) -> Self {
        Self { next_id: start }
    }

    fn next(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Wrap an expression kind with a fresh id and a dummy span.
    pub fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr {
            id: self.next(),
            span: Span::DUMMY,
            kind,
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub fn ident(&mut self, name: impl Into<String>) -> Expr {
        self.expr(ExprKind::Identifier(name.into()))
    }

    pub fn lit_int(&mut self, value: i128) -> Expr {
        self.expr(ExprKind::Literal(Literal::Integer(value)))
    }

    pub fn lit_float(&mut self, value: f64) -> Expr {
        self.expr(ExprKind::Literal(Literal::Float(value)))
    }

    pub fn lit_bool(&mut self, value: bool) -> Expr {
        self.expr(ExprKind::Literal(Literal::Boolean(value)))
    }

    pub fn lit_text(&mut self, value: impl Into<String>) -> Expr {
        self.expr(ExprKind::Literal(Literal::Text(value.into())))
    }

    pub fn lit_none(&mut self) -> Expr {
        self.expr(ExprKind::Literal(Literal::None))
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn call(&mut self, callee: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            callee: Box::new(callee),
            type_args: Vec::new(),
            args,
        })
    }

    pub fn call_named(&mut self, name: impl Into<String>, args: Vec<Expr>) -> Expr {
        let callee = self.ident(name);
        self.call(callee, args)
    }

    pub fn member(&mut self, object: Expr, property: impl Into<String>) -> Expr {
        self.expr(ExprKind::Member {
            object: Box::new(object),
            property: property.into(),
        })
    }

    pub fn member_call(
        &mut self,
        object: Expr,
        property: impl Into<String>,
        args: Vec<Expr>,
    ) -> Expr {
        let callee = self.member(object, property);
        self.call(callee, args)
    }

    pub fn index(&mut self, object: Expr, index: Expr) -> Expr {
        self.expr(ExprKind::Index {
            object: Box::new(object),
            index: Box::new(index),
        })
    }

    pub fn memory_op(&mut self, target: Expr, op: impl Into<String>, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::MemoryOperation {
            target: Box::new(target),
            op: op.into(),
            args,
        })
    }

    pub fn intrinsic(
        &mut self,
        name: impl Into<String>,
        type_args: Vec<TypeExpr>,
        args: Vec<Expr>,
    ) -> Expr {
        self.expr(ExprKind::IntrinsicCall {
            name: name.into(),
            type_args,
            args,
        })
    }

    pub fn native(&mut self, name: impl Into<String>, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::NativeCall {
            name: name.into(),
            args,
        })
    }

    pub fn constructor(&mut self, ty: TypeExpr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Constructor { ty, args })
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    pub fn expr_stmt(&mut self, expr: Expr) -> Stmt {
        Stmt {
            span: expr.span,
            kind: StmtKind::Expression(expr),
        }
    }

    pub fn var_decl(
        &mut self,
        name: impl Into<String>,
        declared_type: Option<TypeExpr>,
        initializer: Option<Expr>,
    ) -> Stmt {
        Stmt {
            span: Span::DUMMY,
            kind: StmtKind::Declaration(Box::new(VariableDecl {
                name: name.into(),
                declared_type,
                initializer,
                mutable: true,
                visibility: Visibility::Private,
            })),
        }
    }

    pub fn assign(&mut self, target: Expr, value: Expr) -> Stmt {
        Stmt {
            span: target.span.cover(value.span),
            kind: StmtKind::Assignment { target, value },
        }
    }

    pub fn ret(&mut self, value: Option<Expr>) -> Stmt {
        Stmt {
            span: Span::DUMMY,
            kind: StmtKind::Return(value),
        }
    }

    pub fn if_stmt(&mut self, condition: Expr, then_block: Block, else_block: Option<Block>) -> Stmt {
        Stmt {
            span: Span::DUMMY,
            kind: StmtKind::If {
                condition,
                then_block,
                else_block,
            },
        }
    }

    pub fn while_stmt(&mut self, condition: Expr, body: Block) -> Stmt {
        Stmt {
            span: Span::DUMMY,
            kind: StmtKind::While { condition, body },
        }
    }

    pub fn for_stmt(&mut self, variable: impl Into<String>, iterable: Expr, body: Block) -> Stmt {
        Stmt {
            span: Span::DUMMY,
            kind: StmtKind::For {
                variable: variable.into(),
                iterable,
                body,
            },
        }
    }

    pub fn when(&mut self, scrutinee: Expr, arms: Vec<WhenArm>) -> Stmt {
        Stmt {
            span: Span::DUMMY,
            kind: StmtKind::When { scrutinee, arms },
        }
    }

    pub fn when_arm(&mut self, pattern: Pattern, body: Block) -> WhenArm {
        WhenArm {
            pattern,
            body,
            span: Span::DUMMY,
        }
    }

    pub fn throw(&mut self, value: Expr) -> Stmt {
        Stmt {
            span: value.span,
            kind: StmtKind::Throw(value),
        }
    }

    pub fn absent(&mut self) -> Stmt {
        Stmt {
            span: Span::DUMMY,
            kind: StmtKind::Absent,
        }
    }

    pub fn danger(&mut self, body: Block) -> Stmt {
        Stmt {
            span: body.span,
            kind: StmtKind::Danger(body),
        }
    }

    pub fn scoped_access(
        &mut self,
        access: AccessKind,
        source: Expr,
        binding: impl Into<String>,
        body: Block,
    ) -> Stmt {
        Stmt {
            span: Span::DUMMY,
            kind: StmtKind::ScopedAccess {
                access,
                source,
                binding: binding.into(),
                body,
            },
        }
    }

    pub fn block(&mut self, statements: Vec<Stmt>) -> Block {
        Block {
            statements,
            span: Span::DUMMY,
        }
    }

    pub fn block_stmt(&mut self, statements: Vec<Stmt>) -> Stmt {
        let block = self.block(statements);
        Stmt {
            span: block.span,
            kind: StmtKind::Block(block),
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    pub fn param(&mut self, name: impl Into<String>, ty: TypeExpr) -> Param {
        Param {
            name: name.into(),
            ty,
            span: Span::DUMMY,
        }
    }

    pub fn function(
        &mut self,
        name: impl Into<String>,
        params: Vec<Param>,
        return_type: Option<TypeExpr>,
        body: Block,
    ) -> FunctionDecl {
        FunctionDecl {
            name: name.into(),
            type_qualifier: None,
            generics: Vec::new(),
            params,
            return_type,
            body,
            is_usurping: false,
            crash_only: false,
            visibility: Visibility::Private,
        }
    }

    pub fn decl(&mut self, kind: DeclKind) -> Decl {
        Decl {
            span: Span::DUMMY,
            kind,
        }
    }

    // ------------------------------------------------------------------
    // Structural re-identification
    // ------------------------------------------------------------------
    //
    // The variant generator copies statements out of a failable body into a
    // synthesized wrapper. NodeIds key analysis side tables, so every copied
    // expression must receive a fresh id; sharing ids between the original
    // and the wrapper would make the two bodies collide in those tables.

    /// Deep-copy an expression, allocating fresh ids throughout.
    pub fn refresh_expr(&mut self, expr: &Expr) -> Expr {
        let kind = match &expr.kind {
            ExprKind::Literal(lit) => ExprKind::Literal(lit.clone()),
            ExprKind::ListLiteral(items) => {
                ExprKind::ListLiteral(items.iter().map(|e| self.refresh_expr(e)).collect())
            }
            ExprKind::SetLiteral(items) => {
                ExprKind::SetLiteral(items.iter().map(|e| self.refresh_expr(e)).collect())
            }
            ExprKind::DictLiteral(entries) => ExprKind::DictLiteral(
                entries
                    .iter()
                    .map(|(k, v)| (self.refresh_expr(k), self.refresh_expr(v)))
                    .collect(),
            ),
            ExprKind::Identifier(name) => ExprKind::Identifier(name.clone()),
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op: *op,
                lhs: Box::new(self.refresh_expr(lhs)),
                rhs: Box::new(self.refresh_expr(rhs)),
            },
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: Box::new(self.refresh_expr(operand)),
            },
            ExprKind::Call {
                callee,
                type_args,
                args,
            } => ExprKind::Call {
                callee: Box::new(self.refresh_expr(callee)),
                type_args: type_args.clone(),
                args: args.iter().map(|e| self.refresh_expr(e)).collect(),
            },
            ExprKind::Member { object, property } => ExprKind::Member {
                object: Box::new(self.refresh_expr(object)),
                property: property.clone(),
            },
            ExprKind::Index { object, index } => ExprKind::Index {
                object: Box::new(self.refresh_expr(object)),
                index: Box::new(self.refresh_expr(index)),
            },
            ExprKind::Conditional {
                condition,
                then_value,
                else_value,
            } => ExprKind::Conditional {
                condition: Box::new(self.refresh_expr(condition)),
                then_value: Box::new(self.refresh_expr(then_value)),
                else_value: Box::new(self.refresh_expr(else_value)),
            },
            ExprKind::BlockExpr(block) => ExprKind::BlockExpr(self.refresh_block(block)),
            ExprKind::Range { start, end, step } => ExprKind::Range {
                start: Box::new(self.refresh_expr(start)),
                end: Box::new(self.refresh_expr(end)),
                step: step.as_ref().map(|e| Box::new(self.refresh_expr(e))),
            },
            ExprKind::ChainedComparison { operands, ops } => ExprKind::ChainedComparison {
                operands: operands.iter().map(|e| self.refresh_expr(e)).collect(),
                ops: ops.clone(),
            },
            ExprKind::Lambda { params, body } => ExprKind::Lambda {
                params: params.clone(),
                body: self.refresh_block(body),
            },
            ExprKind::TypeRef(ty) => ExprKind::TypeRef(ty.clone()),
            ExprKind::SliceConstructor { element, length } => ExprKind::SliceConstructor {
                element: element.clone(),
                length: Box::new(self.refresh_expr(length)),
            },
            ExprKind::MemoryOperation { target, op, args } => ExprKind::MemoryOperation {
                target: Box::new(self.refresh_expr(target)),
                op: op.clone(),
                args: args.iter().map(|e| self.refresh_expr(e)).collect(),
            },
            ExprKind::IntrinsicCall {
                name,
                type_args,
                args,
            } => ExprKind::IntrinsicCall {
                name: name.clone(),
                type_args: type_args.clone(),
                args: args.iter().map(|e| self.refresh_expr(e)).collect(),
            },
            ExprKind::NativeCall { name, args } => ExprKind::NativeCall {
                name: name.clone(),
                args: args.iter().map(|e| self.refresh_expr(e)).collect(),
            },
            ExprKind::NamedArgument { name, value } => ExprKind::NamedArgument {
                name: name.clone(),
                value: Box::new(self.refresh_expr(value)),
            },
            ExprKind::Constructor { ty, args } => ExprKind::Constructor {
                ty: ty.clone(),
                args: args.iter().map(|e| self.refresh_expr(e)).collect(),
            },
        };
        Expr {
            id: self.next(),
            span: expr.span,
            kind,
        }
    }

    /// Deep-copy a statement, allocating fresh ids for every expression.
    pub fn refresh_stmt(&mut self, stmt: &Stmt) -> Stmt {
        let kind = match &stmt.kind {
            StmtKind::Expression(expr) => StmtKind::Expression(self.refresh_expr(expr)),
            StmtKind::Declaration(decl) => StmtKind::Declaration(Box::new(VariableDecl {
                name: decl.name.clone(),
                declared_type: decl.declared_type.clone(),
                initializer: decl.initializer.as_ref().map(|e| self.refresh_expr(e)),
                mutable: decl.mutable,
                visibility: decl.visibility,
            })),
            StmtKind::Assignment { target, value } => StmtKind::Assignment {
                target: self.refresh_expr(target),
                value: self.refresh_expr(value),
            },
            StmtKind::Return(value) => {
                StmtKind::Return(value.as_ref().map(|e| self.refresh_expr(e)))
            }
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => StmtKind::If {
                condition: self.refresh_expr(condition),
                then_block: self.refresh_block(then_block),
                else_block: else_block.as_ref().map(|b| self.refresh_block(b)),
            },
            StmtKind::While { condition, body } => StmtKind::While {
                condition: self.refresh_expr(condition),
                body: self.refresh_block(body),
            },
            StmtKind::For {
                variable,
                iterable,
                body,
            } => StmtKind::For {
                variable: variable.clone(),
                iterable: self.refresh_expr(iterable),
                body: self.refresh_block(body),
            },
            StmtKind::When { scrutinee, arms } => StmtKind::When {
                scrutinee: self.refresh_expr(scrutinee),
                arms: arms
                    .iter()
                    .map(|arm| WhenArm {
                        pattern: self.refresh_pattern(&arm.pattern),
                        body: self.refresh_block(&arm.body),
                        span: arm.span,
                    })
                    .collect(),
            },
            StmtKind::Block(block) => StmtKind::Block(self.refresh_block(block)),
            StmtKind::Break => StmtKind::Break,
            StmtKind::Continue => StmtKind::Continue,
            StmtKind::Throw(expr) => StmtKind::Throw(self.refresh_expr(expr)),
            StmtKind::Absent => StmtKind::Absent,
            StmtKind::Pass => StmtKind::Pass,
            StmtKind::Danger(block) => StmtKind::Danger(self.refresh_block(block)),
            StmtKind::ScopedAccess {
                access,
                source,
                binding,
                body,
            } => StmtKind::ScopedAccess {
                access: *access,
                source: self.refresh_expr(source),
                binding: binding.clone(),
                body: self.refresh_block(body),
            },
        };
        Stmt {
            span: stmt.span,
            kind,
        }
    }

    /// Deep-copy a block, allocating fresh ids for every expression.
    pub fn refresh_block(&mut self, block: &Block) -> Block {
        Block {
            statements: block.statements.iter().map(|s| self.refresh_stmt(s)).collect(),
            span: block.span,
        }
    }

    fn refresh_pattern(&mut self, pattern: &Pattern) -> Pattern {
        match pattern {
            Pattern::Wildcard => Pattern::Wildcard,
            Pattern::Binding(name) => Pattern::Binding(name.clone()),
            Pattern::TypedBinding { name, ty } => Pattern::TypedBinding {
                name: name.clone(),
                ty: ty.clone(),
            },
            Pattern::Literal(expr) => Pattern::Literal(self.refresh_expr(expr)),
        }
    }
}

/// Convenience constructor for a program from declarations.
impl Program {
    #[must_use]
    pub fn from_declarations(declarations: Vec<Decl>) -> Self {
        Self { declarations }
    }
}

#[cfg(test)]
#[path = "tests/build.rs"]
mod tests;
