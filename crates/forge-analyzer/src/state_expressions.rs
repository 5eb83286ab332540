//! Expression typing.
//!
//! `type_of_expr` resolves every expression to a `TypeInfo`, recording the
//! result in the node-type side table. Errors are reported in place and the
//! expression recovers as `unknown` so surrounding analysis stays useful.

use forge_ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use forge_common::diagnostics::ErrorKind;
use forge_memory::wrapper::decode_scoped_wrapper;
use forge_memory::{TypeInfo, decode_wrapper};

use crate::state::AnalyzerState;
use crate::symbols::{Symbol, TypeSymbol};
use crate::type_resolution::routine_type_name;

impl AnalyzerState {
    /// Type an expression, recording the result by node identity.
    pub(crate) fn type_of_expr(&mut self, expr: &Expr) -> TypeInfo {
        let ty = self.compute_expr_type(expr);
        self.node_types.insert(expr.id, ty.clone());
        ty
    }

    fn compute_expr_type(&mut self, expr: &Expr) -> TypeInfo {
        match &expr.kind {
            ExprKind::Literal(lit) => Self::literal_type(lit),
            ExprKind::ListLiteral(items) => {
                let elem = self.element_type(items);
                TypeInfo::generic("List", vec![elem])
            }
            ExprKind::SetLiteral(items) => {
                let elem = self.element_type(items);
                TypeInfo::generic("Set", vec![elem])
            }
            ExprKind::DictLiteral(entries) => {
                let mut key = TypeInfo::unknown();
                let mut value = TypeInfo::unknown();
                for (i, (k, v)) in entries.iter().enumerate() {
                    let kt = self.type_of_expr(k);
                    let vt = self.type_of_expr(v);
                    if i == 0 {
                        key = kt;
                        value = vt;
                    }
                }
                TypeInfo::generic("Dict", vec![key, value])
            }
            ExprKind::Identifier(name) => self.type_of_identifier(expr, name),
            ExprKind::Binary { op, lhs, rhs } => self.type_of_binary(expr, *op, lhs, rhs),
            ExprKind::Unary { op, operand } => self.type_of_unary(expr, *op, operand),
            ExprKind::Call {
                callee,
                type_args,
                args,
            } => self.type_of_call(expr, callee, type_args, args),
            ExprKind::Member { object, property } => self.type_of_member(object, property),
            ExprKind::Index { object, index } => self.type_of_index(object, index),
            ExprKind::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                let cond_ty = self.type_of_expr(condition);
                if !cond_ty.is_boolean() && !cond_ty.is_unknown() {
                    self.error_expr(
                        condition,
                        ErrorKind::TypeError,
                        format!("condition must be `bool`, found `{cond_ty}`"),
                    );
                }
                let then_ty = self.type_of_expr(then_value);
                let else_ty = self.type_of_expr(else_value);
                if then_ty == else_ty {
                    then_ty
                } else {
                    TypeInfo::unknown()
                }
            }
            ExprKind::BlockExpr(block) => {
                self.visit_block(block);
                TypeInfo::none()
            }
            ExprKind::Range { start, end, step } => {
                let start_ty = self.type_of_expr(start);
                let end_ty = self.type_of_expr(end);
                if let Some(step) = step {
                    self.type_of_expr(step);
                }
                if start_ty.is_integer() && start_ty == end_ty {
                    TypeInfo::generic("Range", vec![start_ty])
                } else if start_ty.is_unknown() || end_ty.is_unknown() {
                    TypeInfo::generic("Range", vec![TypeInfo::unknown()])
                } else if start_ty == end_ty {
                    TypeInfo::generic("Range", vec![start_ty])
                } else {
                    self.error_expr(
                        expr,
                        ErrorKind::TypeError,
                        format!("range bounds disagree: `{start_ty}` and `{end_ty}`"),
                    );
                    TypeInfo::generic("Range", vec![TypeInfo::unknown()])
                }
            }
            ExprKind::ChainedComparison { operands, ops: _ } => {
                let mut prev: Option<TypeInfo> = None;
                for operand in operands {
                    let ty = self.type_of_expr(operand);
                    if let Some(prev) = &prev
                        && !ty.is_unknown()
                        && !prev.is_unknown()
                        && *prev != ty
                        && !(prev.is_numeric() && ty.is_numeric())
                    {
                        self.error_expr(
                            operand,
                            ErrorKind::TypeError,
                            format!("cannot compare `{prev}` with `{ty}`"),
                        );
                    }
                    prev = Some(ty);
                }
                TypeInfo::boolean()
            }
            ExprKind::Lambda { params, body } => {
                self.enter_scope();
                let mut param_types = Vec::with_capacity(params.len());
                for param in params {
                    let ty = self.resolve_type(&param.ty);
                    self.bind_value_symbol(&param.name, ty.clone(), param.span);
                    param_types.push(ty);
                }
                for stmt in &body.statements {
                    self.visit_stmt(stmt);
                }
                self.exit_scope();
                TypeInfo::named(routine_type_name(&param_types, &TypeInfo::unknown()))
            }
            ExprKind::TypeRef(ty) => self.resolve_type(ty),
            ExprKind::SliceConstructor { element, length } => {
                let elem = self.resolve_type(element);
                let len_ty = self.type_of_expr(length);
                if !len_ty.is_integer() && !len_ty.is_unknown() {
                    self.error_expr(
                        length,
                        ErrorKind::TypeError,
                        format!("slice length must be an integer, found `{len_ty}`"),
                    );
                }
                TypeInfo::generic("Slice", vec![elem])
            }
            ExprKind::MemoryOperation { target, op, args } => {
                self.dispatch_memory_operation(expr, target, op, args)
            }
            ExprKind::IntrinsicCall {
                name,
                type_args,
                args,
            } => self.type_of_intrinsic(expr, name, type_args, args),
            ExprKind::NativeCall { name, args } => self.type_of_native(expr, name, args),
            ExprKind::NamedArgument { name: _, value } => self.type_of_expr(value),
            ExprKind::Constructor { ty, args } => {
                let resolved = self.resolve_type(ty);
                if !self.is_known_type_name(&resolved.name) && !resolved.is_unknown() {
                    self.error_expr(
                        expr,
                        ErrorKind::TypeError,
                        format!("unknown type `{}`", resolved.name),
                    );
                }
                for arg in args {
                    self.type_of_expr(arg);
                }
                resolved
            }
        }
    }

    fn literal_type(lit: &forge_ast::Literal) -> TypeInfo {
        match lit {
            forge_ast::Literal::Integer(_) => TypeInfo::named("s32"),
            forge_ast::Literal::Float(_) => TypeInfo::named("f64"),
            forge_ast::Literal::Boolean(_) => TypeInfo::boolean(),
            forge_ast::Literal::Text(_) => TypeInfo::named("text"),
            forge_ast::Literal::None => TypeInfo::none(),
        }
    }

    fn element_type(&mut self, items: &[Expr]) -> TypeInfo {
        let mut elem = TypeInfo::unknown();
        for (i, item) in items.iter().enumerate() {
            let ty = self.type_of_expr(item);
            if i == 0 {
                elem = ty;
            }
        }
        elem
    }

    fn type_of_identifier(&mut self, expr: &Expr, name: &str) -> TypeInfo {
        // Reading an object that a memory operation or a borrow invalidated
        // is the central use-after-invalidation check.
        if self.memory.contains(name)
            && let Err(error) = self.memory.check_usable(name, expr.span)
        {
            self.report_memory_error(error);
            return TypeInfo::unknown();
        }

        match self.symbols.lookup(name) {
            Some(Symbol::Variable { ty, .. }) => ty.clone(),
            Some(Symbol::Function(f)) => {
                TypeInfo::named(routine_type_name(&f.params, &f.return_type))
            }
            Some(Symbol::Overloads(set)) => {
                let first = &set[0];
                TypeInfo::named(routine_type_name(&first.params, &first.return_type))
            }
            Some(Symbol::Type(t)) => TypeInfo::named(t.name()),
            None => {
                self.error_expr(
                    expr,
                    ErrorKind::TypeError,
                    format!("unknown identifier `{name}`"),
                );
                TypeInfo::unknown()
            }
        }
    }

    fn type_of_binary(&mut self, expr: &Expr, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> TypeInfo {
        let lt = self.type_of_expr(lhs);
        let rt = self.type_of_expr(rhs);
        if lt.is_unknown() || rt.is_unknown() {
            return if op.is_comparison() {
                TypeInfo::boolean()
            } else {
                TypeInfo::unknown()
            };
        }

        if op.is_comparison() {
            if lt != rt && !(lt.is_numeric() && rt.is_numeric()) {
                self.error_expr(
                    expr,
                    ErrorKind::TypeError,
                    format!("cannot compare `{lt}` with `{rt}`"),
                );
            }
            return TypeInfo::boolean();
        }

        match op {
            BinaryOp::And | BinaryOp::Or => {
                if !lt.is_boolean() || !rt.is_boolean() {
                    self.error_expr(
                        expr,
                        ErrorKind::TypeError,
                        format!("logical operator requires `bool` operands, found `{lt}` and `{rt}`"),
                    );
                    return TypeInfo::unknown();
                }
                TypeInfo::boolean()
            }
            BinaryOp::Div => {
                if lt.is_integer() && rt.is_integer() {
                    self.error_expr(
                        expr,
                        ErrorKind::TypeError,
                        "true division is not defined on integers; use floor division",
                    );
                    return TypeInfo::unknown();
                }
                self.arithmetic_result(expr, &lt, &rt)
            }
            BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::Shl
            | BinaryOp::Shr => {
                if !lt.is_integer() || !rt.is_integer() {
                    self.error_expr(
                        expr,
                        ErrorKind::TypeError,
                        format!("bitwise operator requires integers, found `{lt}` and `{rt}`"),
                    );
                    return TypeInfo::unknown();
                }
                lt
            }
            BinaryOp::Add if lt.name == "text" && rt.name == "text" => lt,
            _ => self.arithmetic_result(expr, &lt, &rt),
        }
    }

    fn arithmetic_result(&mut self, expr: &Expr, lt: &TypeInfo, rt: &TypeInfo) -> TypeInfo {
        if lt.is_numeric() && lt == rt {
            return lt.clone();
        }
        if lt.is_numeric() && rt.is_numeric() {
            // No implicit widening: mixed-type arithmetic is rejected.
            self.error_expr(
                expr,
                ErrorKind::TypeError,
                format!("mixed-type arithmetic on `{lt}` and `{rt}`"),
            );
            return TypeInfo::unknown();
        }
        self.error_expr(
            expr,
            ErrorKind::TypeError,
            format!("arithmetic is not defined on `{lt}` and `{rt}`"),
        );
        TypeInfo::unknown()
    }

    fn type_of_unary(&mut self, expr: &Expr, op: UnaryOp, operand: &Expr) -> TypeInfo {
        let ty = self.type_of_expr(operand);
        if ty.is_unknown() {
            return ty;
        }
        match op {
            UnaryOp::Neg if ty.is_numeric() => ty,
            UnaryOp::Not if ty.is_boolean() => ty,
            UnaryOp::BitNot if ty.is_integer() => ty,
            _ => {
                self.error_expr(
                    expr,
                    ErrorKind::TypeError,
                    format!("unary operator is not defined on `{ty}`"),
                );
                TypeInfo::unknown()
            }
        }
    }

    fn type_of_member(&mut self, object: &Expr, property: &str) -> TypeInfo {
        let obj_ty = self.type_of_expr(object);
        // Reads go through wrappers transparently; strip any wrapper head to
        // find the underlying type for field lookup.
        let base_name = decode_wrapper(&obj_ty.name)
            .map(|(_, base)| base)
            .or_else(|| decode_scoped_wrapper(&obj_ty.name).map(|(_, base)| base))
            .unwrap_or_else(|| obj_ty.name.clone());

        match self.symbols.lookup(&base_name) {
            Some(Symbol::Type(t)) => t.field(property).cloned().unwrap_or_else(TypeInfo::unknown),
            _ => TypeInfo::unknown(),
        }
    }

    fn type_of_index(&mut self, object: &Expr, index: &Expr) -> TypeInfo {
        let obj_ty = self.type_of_expr(object);
        self.type_of_expr(index);
        match (obj_ty.name.as_str(), &obj_ty.generic_args) {
            ("List" | "Slice", Some(args)) if !args.is_empty() => args[0].clone(),
            ("Dict", Some(args)) if args.len() == 2 => args[1].clone(),
            ("text", _) => TypeInfo::named("text"),
            _ => TypeInfo::unknown(),
        }
    }

    /// Declare a value symbol and register the matching memory object.
    ///
    /// Wrapper-encoded types bind with the encoded kind over the base type;
    /// everything else binds with the language default wrapper.
    pub(crate) fn bind_value_symbol(
        &mut self,
        name: &str,
        ty: TypeInfo,
        span: forge_common::span::Span,
    ) {
        let (kind, object_ty) = match decode_wrapper(&ty.name) {
            Some((kind, base)) => (Some(kind), TypeInfo::named(base)),
            None => (None, ty.clone()),
        };
        self.memory.declare(name, object_ty, kind, span);
        self.stats.objects_registered += 1;
        if !self.symbols.try_declare(Symbol::Variable {
            name: name.to_string(),
            ty,
            mutable: true,
            visibility: forge_ast::Visibility::Private,
        }) {
            self.error_at(
                span,
                ErrorKind::DuplicateDeclaration,
                format!("`{name}` is already declared in this scope"),
            );
        }
    }

    /// Resolve the class/struct symbol a type name refers to, looking
    /// through wrapper encodings.
    pub(crate) fn type_symbol_of(&self, name: &str) -> Option<&TypeSymbol> {
        let base = decode_wrapper(name)
            .map(|(_, base)| base)
            .unwrap_or_else(|| name.to_string());
        match self.symbols.lookup(&base) {
            Some(Symbol::Type(t)) => Some(t),
            _ => None,
        }
    }
}
