//! Scoped-access statements: `viewing`, `hijacking`, `inspecting`, `seizing`.
//!
//! Each statement loans a source object to a handle token for exactly one
//! block. The handle is registered as a scoped token at the block's depth
//! and the source is invalidated for the duration; scope exit restores the
//! source and unregisters the token.

use forge_ast::{AccessKind, Block, Expr, Stmt};
use forge_common::diagnostics::ErrorKind;
use forge_memory::wrapper::ScopedWrapper;
use forge_memory::{LockPolicy, TypeInfo, WrapperKind};
use tracing::trace;

use crate::state::{AnalyzerState, InvalidatedSource};
use crate::symbols::Symbol;

impl AnalyzerState {
    pub(crate) fn visit_scoped_access(
        &mut self,
        stmt: &Stmt,
        access: AccessKind,
        source: &Expr,
        binding: &str,
        body: &Block,
    ) {
        let Some(source_name) = source.identifier_name().map(str::to_string) else {
            self.type_of_expr(source);
            self.error_expr(
                source,
                ErrorKind::TypeError,
                format!("`{}` requires a named object", access.keyword()),
            );
            self.visit_block(body);
            return;
        };

        if let Err(error) = self.memory.check_usable(&source_name, source.span) {
            self.report_memory_error(error);
        }

        let object_kind = self.memory.get(&source_name).map(|obj| obj.kind);
        if object_kind.is_none() && self.symbols.lookup(&source_name).is_none() {
            self.error_expr(
                source,
                ErrorKind::TypeError,
                format!("unknown identifier `{source_name}`"),
            );
        }
        self.check_access_policy(stmt, access, &source_name, object_kind);

        let base = self.object_base_name(&source_name);
        let wrapper = match access {
            AccessKind::View => ScopedWrapper::Viewed,
            AccessKind::Hijack => ScopedWrapper::Hijacked,
            AccessKind::Inspect => ScopedWrapper::Inspected,
            AccessKind::Seize => ScopedWrapper::Seized,
        };
        let handle_ty = TypeInfo::named(wrapper.encode(&base));
        trace!(
            source = %source_name,
            binding = %binding,
            access = access.keyword(),
            "scoped access opened"
        );

        self.enter_scope();
        let depth = self.current_depth();
        self.symbols.try_declare(Symbol::Variable {
            name: binding.to_string(),
            ty: handle_ty,
            mutable: !wrapper.is_read_only(),
            visibility: forge_ast::Visibility::Private,
        });
        self.scoped_tokens.insert(binding.to_string(), depth);
        if !self.invalidated_sources.contains_key(&source_name) {
            self.invalidated_sources.insert(
                source_name.clone(),
                InvalidatedSource {
                    name: source_name.clone(),
                    depth,
                    access,
                },
            );
            self.memory.invalidate(
                &source_name,
                format!("borrowed by `{binding}` in a `{}` block", access.keyword()),
            );
        }

        for inner in &body.statements {
            self.visit_stmt(inner);
        }

        // Restores the source and removes the token for this depth.
        self.exit_scope();
    }

    /// Lock-policy preconditions. `inspecting` is the shared-read form and
    /// requires `Shared<_, MultiReadLock>`; `seizing` takes the exclusive
    /// lock and cannot operate on a `RejectEdit` share. The block is still
    /// walked after a policy error.
    fn check_access_policy(
        &mut self,
        stmt: &Stmt,
        access: AccessKind,
        source_name: &str,
        object_kind: Option<WrapperKind>,
    ) {
        match access {
            AccessKind::View | AccessKind::Hijack => {}
            AccessKind::Inspect => match object_kind {
                Some(WrapperKind::Shared(LockPolicy::MultiReadLock)) => {}
                Some(WrapperKind::Shared(policy)) => {
                    self.error_at(
                        stmt.span,
                        ErrorKind::TypeError,
                        format!(
                            "`inspecting` requires the MultiReadLock policy, \
                             `{source_name}` uses {policy}"
                        ),
                    );
                }
                Some(other) => {
                    self.error_at(
                        stmt.span,
                        ErrorKind::ThreadSafetyViolation,
                        format!("`inspecting` requires a Shared object, `{source_name}` is {other}"),
                    );
                }
                None => {}
            },
            AccessKind::Seize => match object_kind {
                Some(WrapperKind::Shared(LockPolicy::RejectEdit)) => {
                    self.error_at(
                        stmt.span,
                        ErrorKind::TypeError,
                        format!(
                            "`seizing` needs write access, but `{source_name}` is shared \
                             with the RejectEdit policy"
                        ),
                    );
                }
                Some(WrapperKind::Shared(_)) => {}
                Some(other) => {
                    self.error_at(
                        stmt.span,
                        ErrorKind::ThreadSafetyViolation,
                        format!("`seizing` requires a Shared object, `{source_name}` is {other}"),
                    );
                }
                None => {}
            },
        }
    }
}
