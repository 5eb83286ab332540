//! Call dispatch.
//!
//! Calls are the busiest syntax in the language: failable type conversions,
//! constructions, error intrinsics, danger-only functions, memory
//! operations, container moves, qualified names, and ordinary calls all
//! arrive as call expressions. The checks run in that order.

use forge_ast::{Expr, ExprKind, TypeExpr};
use forge_common::diagnostics::ErrorKind;
use forge_common::span::Span;
use forge_memory::wrapper::ScopedWrapper;
use forge_memory::{LockPolicy, MemoryOp, TypeInfo, decode_wrapper, encode_wrapper};
use rustc_hash::FxHashSet;

use crate::state::AnalyzerState;
use crate::symbols::{FunctionSymbol, Symbol};
use crate::type_resolution::routine_return_type;

/// Method names recognized as container-storing operations.
const CONTAINER_STORE_METHODS: &[&str] = &[
    "push",
    "append",
    "insert",
    "add",
    "set",
    "put",
    "enqueue",
    "push_front",
    "push_back",
];

/// Member property names dispatched to the memory analyzer.
const MEMORY_OP_METHODS: &[&str] = &[
    "view",
    "hijack",
    "retain",
    "share",
    "track",
    "steal",
    "release",
    "snatch!",
    "recover!",
    "try_recover",
    "own",
    "reveal",
    "try_seize",
    "check_seize",
    "try_inspect",
    "check_inspect",
];

const ERROR_INTRINSICS: &[&str] = &["verify!", "breach!", "stop!"];

pub(crate) fn is_container_store_method(name: &str) -> bool {
    CONTAINER_STORE_METHODS.contains(&name)
}

pub(crate) fn is_memory_op_method(name: &str) -> bool {
    MEMORY_OP_METHODS.contains(&name)
}

impl AnalyzerState {
    pub(crate) fn type_of_call(
        &mut self,
        expr: &Expr,
        callee: &Expr,
        type_args: &[TypeExpr],
        args: &[Expr],
    ) -> TypeInfo {
        match &callee.kind {
            ExprKind::Identifier(name) => {
                let name = name.clone();
                self.type_of_named_call(expr, callee, &name, type_args, args)
            }
            ExprKind::Member { object, property } => {
                let property = property.clone();
                self.type_of_member_call(expr, object, &property, args)
            }
            _ => {
                let callee_ty = self.type_of_expr(callee);
                self.validate_call_args(args, None);
                routine_return_type(&callee_ty.name).unwrap_or_else(TypeInfo::unknown)
            }
        }
    }

    fn type_of_named_call(
        &mut self,
        expr: &Expr,
        callee: &Expr,
        name: &str,
        type_args: &[TypeExpr],
        args: &[Expr],
    ) -> TypeInfo {
        // 1. Failable type conversion: `s32!(x)`.
        if let Some(base) = name.strip_suffix('!')
            && self.is_known_type_name(base)
        {
            if args.len() != 1 {
                self.error_expr(
                    expr,
                    ErrorKind::TypeError,
                    format!("conversion to `{base}` takes exactly one argument"),
                );
            }
            for arg in args {
                self.type_of_expr(arg);
            }
            return TypeInfo::named(base);
        }

        // 2. Construction of a primitive or known type.
        if self.is_known_type_name(name) {
            self.validate_call_args(args, None);
            let resolved_args: Vec<TypeInfo> =
                type_args.iter().map(|t| self.resolve_type(t)).collect();
            return if resolved_args.is_empty() {
                TypeInfo::named(name)
            } else {
                TypeInfo::generic(name, resolved_args)
            };
        }

        // 3. Error intrinsics.
        if ERROR_INTRINSICS.contains(&name) {
            if name == "verify!" {
                match args.first() {
                    Some(cond) => {
                        let ty = self.type_of_expr(cond);
                        if !ty.is_boolean() && !ty.is_unknown() {
                            self.error_expr(
                                cond,
                                ErrorKind::TypeError,
                                format!("`verify!` requires a `bool` condition, found `{ty}`"),
                            );
                        }
                    }
                    None => {
                        self.error_expr(
                            expr,
                            ErrorKind::TypeError,
                            "`verify!` requires a condition",
                        );
                    }
                }
                for arg in args.iter().skip(1) {
                    self.type_of_expr(arg);
                }
            } else {
                for arg in args {
                    self.type_of_expr(arg);
                }
            }
            return TypeInfo::none();
        }

        // 4. Danger-only functions.
        if name == "address_of" || name == "invalidate" {
            if !self.in_danger_block {
                self.error_expr(
                    expr,
                    ErrorKind::DangerBlockViolation,
                    format!("`{name}` is only available inside an escape block"),
                );
            }
            if name == "invalidate" {
                if let Some(target) = args.first().and_then(Expr::identifier_name) {
                    let target = target.to_string();
                    self.memory.invalidate(&target, "invalidate");
                } else {
                    self.error_expr(
                        expr,
                        ErrorKind::TypeError,
                        "`invalidate` requires a named object",
                    );
                }
                return TypeInfo::none();
            }
            for arg in args {
                self.type_of_expr(arg);
            }
            return TypeInfo::named("uaddr");
        }

        // 7. Ordinary call through the symbol table.
        match self.symbols.lookup(name).cloned() {
            Some(Symbol::Function(f)) => {
                self.check_arity(expr, &f, args.len());
                self.validate_call_args(args, Some(&f.params));
                f.return_type
            }
            Some(Symbol::Overloads(set)) => {
                match set.iter().find(|f| f.params.len() == args.len()).cloned() {
                    Some(f) => {
                        self.validate_call_args(args, Some(&f.params));
                        f.return_type
                    }
                    None => {
                        self.error_expr(
                            expr,
                            ErrorKind::TypeError,
                            format!("no overload of `{name}` takes {} arguments", args.len()),
                        );
                        self.validate_call_args(args, None);
                        TypeInfo::unknown()
                    }
                }
            }
            Some(Symbol::Variable { ty, .. }) => {
                self.validate_call_args(args, None);
                match routine_return_type(&ty.name) {
                    Some(ret) => ret,
                    None => {
                        self.error_expr(
                            callee,
                            ErrorKind::TypeError,
                            format!("`{name}` of type `{ty}` is not callable"),
                        );
                        TypeInfo::unknown()
                    }
                }
            }
            Some(Symbol::Type(_)) => {
                // Covered by the construction branch; reaching here means a
                // type symbol shadowed after the check, treat as construction.
                self.validate_call_args(args, None);
                TypeInfo::named(name)
            }
            None => {
                self.error_expr(
                    callee,
                    ErrorKind::TypeError,
                    format!("unknown identifier `{name}`"),
                );
                self.validate_call_args(args, None);
                TypeInfo::unknown()
            }
        }
    }

    fn type_of_member_call(
        &mut self,
        expr: &Expr,
        object: &Expr,
        property: &str,
        args: &[Expr],
    ) -> TypeInfo {
        // 5. Memory operations dispatch to the memory analyzer.
        if is_memory_op_method(property) {
            return self.dispatch_memory_operation(expr, object, property, args);
        }

        // Container-storing methods move (Forge) or alias (Sweet) their
        // object arguments.
        if is_container_store_method(property) {
            let container = object
                .identifier_name()
                .map(str::to_string)
                .unwrap_or_else(|| "container".to_string());
            self.type_of_expr(object);
            self.validate_call_args(args, None);
            for arg in args {
                self.check_container_argument(&container, arg);
            }
            return TypeInfo::none();
        }

        // 6. Qualified `Namespace.member` calls.
        if let Some(ns) = object.identifier_name() {
            let qualified = format!("{ns}.{property}");
            if let Some(Symbol::Function(f)) = self.symbols.lookup(&qualified).cloned() {
                self.check_arity(expr, &f, args.len());
                self.validate_call_args(args, Some(&f.params));
                return f.return_type;
            }
        }

        // Ordinary method call; method signatures are not modelled, but the
        // receiver and arguments are still checked.
        self.type_of_expr(object);
        self.validate_call_args(args, None);
        TypeInfo::unknown()
    }

    fn check_arity(&mut self, expr: &Expr, f: &FunctionSymbol, supplied: usize) {
        if f.params.len() != supplied {
            self.error_expr(
                expr,
                ErrorKind::TypeError,
                format!(
                    "`{}` takes {} arguments, {} supplied",
                    f.name,
                    f.params.len(),
                    supplied
                ),
            );
        }
    }

    /// Checks applied to every argument list: inline tokens in container
    /// position, scoped tokens in container position, duplicate Hijacked
    /// operands, thread safety, and per-parameter type compatibility.
    pub(crate) fn validate_call_args(&mut self, args: &[Expr], params: Option<&[TypeInfo]>) {
        let mut hijacked_names: FxHashSet<String> = FxHashSet::default();
        for (i, arg) in args.iter().enumerate() {
            let arg_ty = self.type_of_expr(arg);

            // No two exclusive operands in one call may name the same object.
            if let Some(name) = self.hijacked_operand_name(arg, &arg_ty)
                && !hijacked_names.insert(name.clone())
            {
                self.error_expr(
                    arg,
                    ErrorKind::DuplicateHijackInCall,
                    format!("`{name}` appears twice as an exclusive operand in this call"),
                );
            }

            let Some(params) = params else { continue };
            let Some(param_ty) = params.get(i) else {
                continue;
            };
            if param_ty.is_unknown() || param_ty.is_generic_param || arg_ty.is_unknown() {
                continue;
            }
            if *param_ty == arg_ty {
                continue;
            }
            // Thread safety is validated on type names alone.
            if let (Some((param_kind, _)), Some((arg_kind, _))) =
                (decode_wrapper(&param_ty.name), decode_wrapper(&arg_ty.name))
                && param_kind.is_thread_safe()
                && !arg_kind.is_thread_safe()
            {
                self.error_expr(
                    arg,
                    ErrorKind::ThreadSafetyViolation,
                    format!(
                        "`{arg_ty}` is not safe to pass where `{param_ty}` is required"
                    ),
                );
                continue;
            }
            self.error_expr(
                arg,
                ErrorKind::TypeError,
                format!("argument {} has type `{arg_ty}`, expected `{param_ty}`", i + 1),
            );
        }
    }

    /// The object name behind an exclusive (Hijacked) operand, either a
    /// variable already typed `Hijacked<...>` or an inline `.hijack()` token.
    fn hijacked_operand_name(&self, arg: &Expr, arg_ty: &TypeInfo) -> Option<String> {
        if let Some(name) = arg.identifier_name() {
            if matches!(decode_wrapper(&arg_ty.name), Some((kind, _)) if kind == forge_memory::WrapperKind::Hijacked)
            {
                return Some(name.to_string());
            }
            return None;
        }
        if self.inline_tokens.get(&arg.id) == Some(&"hijack") {
            return inline_token_source(arg);
        }
        None
    }

    /// Container-position rules for one argument.
    fn check_container_argument(&mut self, container: &str, arg: &Expr) {
        if self.inline_tokens.contains_key(&arg.id) {
            self.error_expr(
                arg,
                ErrorKind::InlineTokenEscape,
                "an inline access token cannot be stored in a container",
            );
            return;
        }
        if let Some(name) = arg.identifier_name() {
            if self.is_scoped_token(name) {
                self.error_expr(
                    arg,
                    ErrorKind::InlineTokenEscape,
                    format!("scoped token `{name}` cannot be stored in a container"),
                );
                return;
            }
            if self.memory.contains(name) {
                let name = name.to_string();
                if let Err(error) = self.memory.container_move(container, &name, arg.span) {
                    self.report_memory_error(error);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Memory-operation dispatch
    // ------------------------------------------------------------------

    /// Dispatch a memory operation written as `target.op(args)`.
    pub(crate) fn dispatch_memory_operation(
        &mut self,
        expr: &Expr,
        target: &Expr,
        op_name: &str,
        args: &[Expr],
    ) -> TypeInfo {
        let Some(source) = target.identifier_name().map(str::to_string) else {
            self.type_of_expr(target);
            self.error_expr(
                expr,
                ErrorKind::TypeError,
                format!("`{op_name}` requires a named object"),
            );
            return TypeInfo::unknown();
        };

        match op_name {
            "view" => {
                if let Err(error) = self.memory.check_usable(&source, expr.span) {
                    self.report_memory_error(error);
                    return TypeInfo::unknown();
                }
                let base = self.object_base_name(&source);
                self.inline_tokens.insert(expr.id, "view");
                TypeInfo::named(ScopedWrapper::Viewed.encode(&base))
            }
            "hijack" => {
                let ty = self.apply_memory_op(MemoryOp::Hijack, &source, expr.span);
                self.inline_tokens.insert(expr.id, "hijack");
                ty
            }
            "retain" => self.apply_memory_op(MemoryOp::Retain, &source, expr.span),
            "share" => {
                let policy = self.share_policy_argument(expr, args);
                self.apply_memory_op(MemoryOp::Share(policy), &source, expr.span)
            }
            "track" => self.apply_memory_op(MemoryOp::Track, &source, expr.span),
            "steal" => self.apply_memory_op(MemoryOp::Steal, &source, expr.span),
            "release" => {
                if let Err(error) = self.memory.apply(MemoryOp::Release, &source, expr.span) {
                    self.report_memory_error(error);
                }
                TypeInfo::none()
            }
            "snatch!" => self.apply_memory_op(MemoryOp::Snatch, &source, expr.span),
            "recover!" => self.apply_memory_op(MemoryOp::Recover, &source, expr.span),
            "try_recover" => {
                let inner = self.apply_memory_op(MemoryOp::TryRecover, &source, expr.span);
                TypeInfo::named(format!("Maybe<{}>", inner.full_name()))
            }
            "own" => self.apply_memory_op(MemoryOp::Own, &source, expr.span),
            "reveal" => self.apply_memory_op(MemoryOp::Reveal, &source, expr.span),
            "try_seize" | "check_seize" | "try_inspect" | "check_inspect" => {
                self.fallible_lock_operation(expr, &source, op_name)
            }
            _ => TypeInfo::unknown(),
        }
    }

    fn apply_memory_op(&mut self, op: MemoryOp, source: &str, span: Span) -> TypeInfo {
        match self.memory.apply(op, source, span) {
            Ok(handle) => {
                TypeInfo::named(encode_wrapper(handle.kind, &handle.ty.full_name()))
            }
            Err(error) => {
                self.report_memory_error(error);
                TypeInfo::unknown()
            }
        }
    }

    fn share_policy_argument(&mut self, expr: &Expr, args: &[Expr]) -> LockPolicy {
        match args.first() {
            Some(arg) => {
                if let Some(policy) = arg.identifier_name().and_then(LockPolicy::parse) {
                    policy
                } else {
                    self.type_of_expr(arg);
                    self.error_expr(
                        arg,
                        ErrorKind::TypeError,
                        "`share` requires a locking policy: Mutex, MultiReadLock, or RejectEdit",
                    );
                    LockPolicy::Mutex
                }
            }
            None => {
                self.error_expr(
                    expr,
                    ErrorKind::TypeError,
                    "`share` requires a locking policy argument",
                );
                LockPolicy::Mutex
            }
        }
    }

    /// `try_seize` / `check_seize` / `try_inspect` / `check_inspect`: the
    /// compile-time model of runtime lock acquisition. Only legal as a
    /// `when` scrutinee, and only on Shared objects; the inspect forms
    /// additionally require the MultiReadLock policy.
    fn fallible_lock_operation(&mut self, expr: &Expr, source: &str, op_name: &str) -> TypeInfo {
        if !self.in_when_condition {
            self.error_expr(
                expr,
                ErrorKind::FallibleLockOutsideWhen,
                format!("`{op_name}` must be the scrutinee of a `when`"),
            );
        }
        if let Err(error) = self.memory.check_usable(source, expr.span) {
            self.report_memory_error(error);
        }

        let object = self
            .memory
            .get(source)
            .map(|obj| (obj.ty.full_name(), obj.kind));
        let (base, policy) = match object {
            Some((base, forge_memory::WrapperKind::Shared(policy))) => (base, Some(policy)),
            Some((base, other)) => {
                self.error_expr(
                    expr,
                    ErrorKind::ThreadSafetyViolation,
                    format!("`{op_name}` requires a Shared object, `{source}` is {other}"),
                );
                (base, None)
            }
            None => {
                self.error_expr(
                    expr,
                    ErrorKind::TypeError,
                    format!("no object named `{source}` in scope"),
                );
                (String::from("unknown"), None)
            }
        };

        let inspecting = op_name.ends_with("inspect");
        if inspecting && policy.is_some() && policy != Some(LockPolicy::MultiReadLock) {
            self.error_expr(
                expr,
                ErrorKind::TypeError,
                format!(
                    "`{op_name}` requires the MultiReadLock policy, `{source}` uses {}",
                    policy.map_or("another policy", LockPolicy::name)
                ),
            );
        }

        let wrapper = if inspecting {
            ScopedWrapper::Inspected
        } else {
            ScopedWrapper::Seized
        };
        let inner = wrapper.encode(&base);
        if op_name.starts_with("try_") {
            TypeInfo::named(format!("Maybe<{inner}>"))
        } else {
            TypeInfo::named(format!("Result<{inner}>"))
        }
    }

    /// The base (unwrapped) type name of a tracked object, for token typing.
    pub(crate) fn object_base_name(&self, name: &str) -> String {
        if let Some(obj) = self.memory.get(name) {
            return obj.ty.full_name();
        }
        if let Some(Symbol::Variable { ty, .. }) = self.symbols.lookup(name) {
            return decode_wrapper(&ty.name)
                .map(|(_, base)| base)
                .unwrap_or_else(|| ty.full_name());
        }
        String::from("unknown")
    }

    // ------------------------------------------------------------------
    // Intrinsics and native calls
    // ------------------------------------------------------------------

    /// Closed table of intrinsics. `sizeof`/`alignof` are compile-time and
    /// legal anywhere; everything else requires an escape block.
    pub(crate) fn type_of_intrinsic(
        &mut self,
        expr: &Expr,
        name: &str,
        type_args: &[TypeExpr],
        args: &[Expr],
    ) -> TypeInfo {
        let resolved: Vec<TypeInfo> = type_args.iter().map(|t| self.resolve_type(t)).collect();
        for arg in args {
            self.type_of_expr(arg);
        }

        if matches!(name, "sizeof" | "alignof") {
            return TypeInfo::named("uaddr");
        }

        if !self.in_danger_block {
            self.error_expr(
                expr,
                ErrorKind::DangerBlockViolation,
                format!("intrinsic `{name}` is only available inside an escape block"),
            );
        }

        match name {
            // Target-of-cast intrinsics.
            "bit_cast" | "addr_to_ref" => {
                resolved.first().cloned().unwrap_or_else(TypeInfo::unknown)
            }
            // Input-preserving intrinsics.
            "byte_swap" | "rotate_left" | "rotate_right" => args
                .first()
                .and_then(|arg| self.node_types.get(&arg.id).cloned())
                .unwrap_or_else(TypeInfo::unknown),
            // Integer-valued intrinsics.
            "popcount" | "leading_zeros" | "trailing_zeros" => TypeInfo::named("u32"),
            // Boolean-valued intrinsics.
            "is_null" => TypeInfo::boolean(),
            _ => {
                self.error_expr(
                    expr,
                    ErrorKind::TypeError,
                    format!("unknown intrinsic `{name}`"),
                );
                TypeInfo::unknown()
            }
        }
    }

    pub(crate) fn type_of_native(&mut self, expr: &Expr, name: &str, args: &[Expr]) -> TypeInfo {
        if !self.in_danger_block {
            self.error_expr(
                expr,
                ErrorKind::DangerBlockViolation,
                format!("native call `{name}` is only available inside an escape block"),
            );
        }
        for arg in args {
            self.type_of_expr(arg);
        }
        TypeInfo::unknown()
    }
}

/// The source object name inside an inline `a.hijack()` token expression.
fn inline_token_source(arg: &Expr) -> Option<String> {
    match &arg.kind {
        ExprKind::Call { callee, .. } => match &callee.kind {
            ExprKind::Member { object, .. } => {
                object.identifier_name().map(str::to_string)
            }
            _ => None,
        },
        ExprKind::MemoryOperation { target, .. } => {
            target.identifier_name().map(str::to_string)
        }
        _ => None,
    }
}
