//! Statement traversal.
//!
//! Blocks open paired symbol/memory scopes; exiting invalidates the scope's
//! objects. Assignment and return carry most of the token-escape and
//! read-only rules; `when` arms bind pattern variables against the
//! scrutinee's payload type.

use forge_ast::{Block, Expr, ExprKind, Pattern, Stmt, StmtKind, WhenArm};
use forge_common::diagnostics::ErrorKind;
use forge_common::options::AnalyzerMode;
use forge_memory::wrapper::is_read_only_wrapper_name;
use forge_memory::{TypeInfo, decode_wrapper};

use crate::state::AnalyzerState;
use crate::symbols::Symbol;
use crate::type_resolution::failable_payload;

impl AnalyzerState {
    pub(crate) fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.type_of_expr(expr);
            }
            StmtKind::Declaration(var) => self.visit_variable_decl(var, stmt.span),
            StmtKind::Assignment { target, value } => self.visit_assignment(target, value),
            StmtKind::Return(value) => self.visit_return(stmt, value.as_ref()),
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => {
                self.check_boolean_condition(condition);
                self.visit_block(then_block);
                if let Some(else_block) = else_block {
                    self.visit_block(else_block);
                }
            }
            StmtKind::While { condition, body } => {
                self.check_boolean_condition(condition);
                self.visit_block(body);
            }
            StmtKind::For {
                variable,
                iterable,
                body,
            } => {
                let iter_ty = self.type_of_expr(iterable);
                let elem_ty = iter_ty
                    .generic_args
                    .as_ref()
                    .and_then(|args| args.first().cloned())
                    .unwrap_or_else(TypeInfo::unknown);
                // The loop variable lives in its own scope around the body.
                self.enter_scope();
                self.bind_value_symbol(variable, elem_ty, stmt.span);
                for inner in &body.statements {
                    self.visit_stmt(inner);
                }
                self.exit_scope();
            }
            StmtKind::When { scrutinee, arms } => self.visit_when(scrutinee, arms),
            StmtKind::Block(block) => self.visit_block(block),
            StmtKind::Break | StmtKind::Continue | StmtKind::Pass | StmtKind::Absent => {}
            StmtKind::Throw(value) => self.visit_throw(value),
            StmtKind::Danger(block) => self.visit_danger(stmt, block),
            StmtKind::ScopedAccess {
                access,
                source,
                binding,
                body,
            } => self.visit_scoped_access(stmt, *access, source, binding, body),
        }
    }

    /// Walk a block in fresh symbol and memory scopes.
    pub(crate) fn visit_block(&mut self, block: &Block) {
        self.enter_scope();
        for stmt in &block.statements {
            self.visit_stmt(stmt);
        }
        self.exit_scope();
    }

    fn check_boolean_condition(&mut self, condition: &Expr) {
        let ty = self.type_of_expr(condition);
        if !ty.is_boolean() && !ty.is_unknown() {
            self.error_expr(
                condition,
                ErrorKind::TypeError,
                format!("condition must be `bool`, found `{ty}`"),
            );
        }
    }

    // ------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------

    fn visit_assignment(&mut self, target: &Expr, value: &Expr) {
        // Mutation through a read-only handle.
        if let ExprKind::Member { object, .. } | ExprKind::Index { object, .. } = &target.kind {
            let obj_ty = self.type_of_expr(object);
            if is_read_only_wrapper_name(&obj_ty.name) {
                self.error_expr(
                    target,
                    ErrorKind::ReadOnlyMutation,
                    format!("cannot mutate through read-only handle of type `{obj_ty}`"),
                );
            }
        }

        // Scoped tokens cannot be the assigned value.
        if let Some(name) = value.identifier_name()
            && self.is_scoped_token(name)
        {
            self.error_expr(
                value,
                ErrorKind::InlineTokenEscape,
                format!("scoped token `{name}` cannot be assigned to a variable"),
            );
        }

        let value_ty = self.type_of_expr(value);

        // Inline tokens cannot be the assigned value either.
        if self.inline_tokens.contains_key(&value.id) {
            self.error_expr(
                value,
                ErrorKind::InlineTokenEscape,
                "an inline access token cannot be assigned to a variable",
            );
        }

        let target_ty = match &target.kind {
            ExprKind::Identifier(name) => {
                let binding = match self.symbols.lookup(name) {
                    Some(Symbol::Variable { ty, mutable, .. }) => Some((ty.clone(), *mutable)),
                    Some(_) => None,
                    None => {
                        self.error_expr(
                            target,
                            ErrorKind::TypeError,
                            format!("unknown identifier `{name}`"),
                        );
                        Some((TypeInfo::unknown(), true))
                    }
                };
                let target_ty = match binding {
                    Some((ty, mutable)) => {
                        if !mutable {
                            // Presets and parameters are read-only bindings.
                            self.error_expr(
                                target,
                                ErrorKind::TypeError,
                                format!("cannot assign to immutable binding `{name}`"),
                            );
                        }
                        ty
                    }
                    None => {
                        self.error_expr(
                            target,
                            ErrorKind::TypeError,
                            format!("`{name}` is not assignable"),
                        );
                        TypeInfo::unknown()
                    }
                };

                // Object-to-object assignment follows the language's
                // move/alias model.
                if let Some(source) = value.identifier_name()
                    && self.memory.contains(name)
                    && self.memory.contains(source)
                    && let Err(error) = self.memory.assign_from_object(name, source, target.span)
                {
                    self.report_memory_error(error);
                }
                target_ty
            }
            _ => self
                .node_types
                .get(&target.id)
                .cloned()
                .unwrap_or_else(TypeInfo::unknown),
        };

        if !target_ty.is_unknown()
            && !value_ty.is_unknown()
            && !target_ty.is_generic_param
            && target_ty != value_ty
        {
            self.error_expr(
                value,
                ErrorKind::TypeError,
                format!("cannot assign `{value_ty}` to `{target_ty}`"),
            );
        }
    }

    // ------------------------------------------------------------------
    // Return
    // ------------------------------------------------------------------

    fn visit_return(&mut self, stmt: &Stmt, value: Option<&Expr>) {
        let Some(value) = value else {
            return;
        };

        let value_ty = self.type_of_expr(value);

        if self.inline_tokens.contains_key(&value.id) {
            self.error_expr(
                value,
                ErrorKind::InlineTokenEscape,
                "an inline access token cannot be returned",
            );
            return;
        }

        // Scoped tokens cannot escape through return; the sole exception is
        // a Hijacked token leaving an explicitly usurping function.
        if let Some(name) = value.identifier_name()
            && self.is_scoped_token(name)
        {
            let hijacked = matches!(
                decode_wrapper(&value_ty.name),
                Some((forge_memory::WrapperKind::Hijacked, _))
            );
            if !(hijacked && self.in_usurping_function) {
                self.error_expr(
                    value,
                    ErrorKind::UsurpingViolation,
                    format!("scoped token `{name}` cannot be returned from this function"),
                );
                return;
            }
        }

        if let Some(expected) = self.current_return_type.clone()
            && !expected.is_none()
            && !expected.is_unknown()
            && !value_ty.is_unknown()
            && !expected.is_generic_param
            && expected != value_ty
        {
            self.error_at(
                stmt.span,
                ErrorKind::TypeError,
                format!("returning `{value_ty}` from a function declared to return `{expected}`"),
            );
        }
    }

    // ------------------------------------------------------------------
    // When
    // ------------------------------------------------------------------

    fn visit_when(&mut self, scrutinee: &Expr, arms: &[WhenArm]) {
        // Fallible lock operations type-check only in this position.
        let saved = self.in_when_condition;
        self.in_when_condition = true;
        let scrutinee_ty = self.type_of_expr(scrutinee);
        self.in_when_condition = saved;

        let payload = failable_payload(&scrutinee_ty.name).unwrap_or_else(|| scrutinee_ty.clone());

        for arm in arms {
            self.enter_scope();
            match &arm.pattern {
                Pattern::Wildcard => {}
                Pattern::Binding(name) => {
                    self.bind_value_symbol(name, payload.clone(), arm.span);
                }
                Pattern::TypedBinding { name, ty } => {
                    let resolved = self.resolve_type(ty);
                    self.bind_value_symbol(name, resolved, arm.span);
                }
                Pattern::Literal(lit) => {
                    self.type_of_expr(lit);
                }
            }
            for stmt in &arm.body.statements {
                self.visit_stmt(stmt);
            }
            self.exit_scope();
        }
    }

    // ------------------------------------------------------------------
    // Throw
    // ------------------------------------------------------------------

    /// Only values of types implementing the `Crashable` feature may be
    /// thrown; string and other literals are rejected outright.
    fn visit_throw(&mut self, value: &Expr) {
        if matches!(&value.kind, ExprKind::Literal(_)) {
            self.error_expr(
                value,
                ErrorKind::ThrowViolation,
                "only Crashable values can be thrown, not literals",
            );
            return;
        }

        let ty = self.type_of_expr(value);
        if ty.is_unknown() {
            return;
        }
        match self.type_symbol_of(&ty.name) {
            Some(symbol) if symbol.implements("Crashable") => {}
            Some(_) => {
                self.error_expr(
                    value,
                    ErrorKind::ThrowViolation,
                    format!("`{ty}` does not implement the Crashable feature"),
                );
            }
            None => {
                self.error_expr(
                    value,
                    ErrorKind::ThrowViolation,
                    format!("`{ty}` is not a throwable type"),
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Danger blocks
    // ------------------------------------------------------------------

    fn visit_danger(&mut self, stmt: &Stmt, block: &Block) {
        if self.options.mode == AnalyzerMode::Sweet {
            self.error_at(
                stmt.span,
                ErrorKind::DangerBlockViolation,
                "escape blocks are not available in Sweet mode",
            );
        }
        let saved = self.in_danger_block;
        self.in_danger_block = true;
        self.memory.enter_danger();
        self.visit_block(block);
        self.memory.exit_danger();
        self.in_danger_block = saved;
    }
}
