//! Scope-keyed object storage and the wrapper transformation matrix.
//!
//! Objects live in a stack of name-keyed maps, one map per lexical scope;
//! an object's identity is (scope depth, name). Exiting a scope invalidates
//! everything declared at that depth. The global scope is never popped.
//!
//! Every memory operation funnels through [`MemoryTable::apply`], which owns
//! the transformation matrix: state gate, escape hatch, group containment,
//! then the kind-specific rules.

use crate::object::{MemoryObject, ObjectState};
use crate::type_info::TypeInfo;
use crate::wrapper::{LockPolicy, TrackOrigin, WrapperKind};
use forge_common::diagnostics::ErrorKind;
use forge_common::options::SourceLanguage;
use forge_common::span::Span;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

/// The memory operations dispatched by the semantic analyzer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemoryOp {
    Hijack,
    Retain,
    Share(LockPolicy),
    Track,
    Steal,
    Release,
    Recover,
    TryRecover,
    Snatch,
    Reveal,
    Own,
}

impl MemoryOp {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            MemoryOp::Hijack => "hijack",
            MemoryOp::Retain => "retain",
            MemoryOp::Share(_) => "share",
            MemoryOp::Track => "track",
            MemoryOp::Steal => "steal",
            MemoryOp::Release => "release",
            MemoryOp::Recover => "recover",
            MemoryOp::TryRecover => "try_recover",
            MemoryOp::Snatch => "snatch",
            MemoryOp::Reveal => "reveal",
            MemoryOp::Own => "own",
        }
    }

    /// Operations legal only inside an escape block.
    #[must_use]
    pub const fn is_escape_only(self) -> bool {
        matches!(self, MemoryOp::Snatch | MemoryOp::Reveal | MemoryOp::Own)
    }
}

/// An error produced by a memory operation. The traversal converts these
/// into accumulated diagnostics; nothing is thrown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
}

impl MemoryError {
    #[must_use]
    pub fn new(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }
}

fn err<T>(kind: ErrorKind, span: Span, message: impl Into<String>) -> Result<T, MemoryError> {
    Err(MemoryError::new(kind, span, message))
}

/// Scope-keyed storage for memory objects plus the transformation matrix.
pub struct MemoryTable {
    scopes: Vec<FxHashMap<String, MemoryObject>>,
    language: SourceLanguage,
    /// Nesting depth of `danger` blocks; non-zero enables the escape hatch.
    danger_depth: u32,
}

impl MemoryTable {
    #[must_use]
    pub fn new(language: SourceLanguage) -> Self {
        Self {
            scopes: vec![FxHashMap::default()],
            language,
            danger_depth: 0,
        }
    }

    #[must_use]
    pub fn language(&self) -> SourceLanguage {
        self.language
    }

    /// Current scope depth; the global scope is depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
        trace!(depth = self.depth(), "memory scope entered");
    }

    /// Pop the innermost scope, invalidating every object declared in it.
    /// Returns the invalidated objects. No-op on the global scope.
    pub fn exit_scope(&mut self) -> Vec<MemoryObject> {
        if self.scopes.len() <= 1 {
            return Vec::new();
        }
        let popped = self.scopes.pop().unwrap_or_default();
        let mut retired: Vec<MemoryObject> = Vec::with_capacity(popped.len());
        for (_, mut obj) in popped {
            if obj.is_valid() || matches!(obj.state, ObjectState::Dangerous) {
                obj.state = ObjectState::invalidated("scope end");
            }
            retired.push(obj);
        }
        debug!(depth = self.depth(), retired = retired.len(), "memory scope exited");
        retired
    }

    pub fn enter_danger(&mut self) {
        self.danger_depth += 1;
    }

    pub fn exit_danger(&mut self) {
        self.danger_depth = self.danger_depth.saturating_sub(1);
    }

    #[must_use]
    pub fn in_danger(&self) -> bool {
        self.danger_depth > 0
    }

    /// The wrapper kind a plain declaration receives in the active language.
    #[must_use]
    pub fn default_wrapper(&self) -> WrapperKind {
        match self.language {
            SourceLanguage::Forge => WrapperKind::Owned,
            SourceLanguage::Sweet => WrapperKind::Retained,
        }
    }

    /// Register a new object in the current scope. A `None` kind takes the
    /// language default.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        ty: TypeInfo,
        kind: Option<WrapperKind>,
        span: Span,
    ) {
        let name = name.into();
        let kind = kind.unwrap_or_else(|| self.default_wrapper());
        trace!(name = %name, kind = %kind, "object declared");
        let obj = MemoryObject::new(name.clone(), ty, kind, span);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, obj);
        }
    }

    /// Innermost-first lookup.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MemoryObject> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut MemoryObject> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Check that referencing `name` is legal here: the object must be
    /// valid, unless the escape hatch is active.
    pub fn check_usable(&self, name: &str, span: Span) -> Result<(), MemoryError> {
        let Some(obj) = self.get(name) else {
            return Ok(()); // not a tracked object; nothing to enforce
        };
        if obj.is_valid() || self.in_danger() {
            return Ok(());
        }
        let reason = obj
            .state
            .unusable_reason()
            .unwrap_or_else(|| "invalidated".to_string());
        err(
            ErrorKind::UseAfterInvalidation,
            span,
            format!("`{name}` cannot be used here: {reason}"),
        )
    }

    /// Force-invalidate an object (scoped-access borrows, explicit
    /// `invalidate` in escape blocks).
    pub fn invalidate(&mut self, name: &str, reason: impl Into<String>) {
        if let Some(obj) = self.get_mut(name) {
            obj.invalidate(reason);
        }
    }

    /// Restore an object invalidated for the duration of a borrow.
    pub fn revalidate(&mut self, name: &str) {
        if let Some(obj) = self.get_mut(name) {
            obj.state = ObjectState::Valid;
        }
    }

    // ------------------------------------------------------------------
    // The transformation matrix
    // ------------------------------------------------------------------

    /// Apply a memory operation to the named object.
    ///
    /// On success, returns the descriptor of the resulting handle (the
    /// caller decides what name it binds to). On failure the object is
    /// unchanged and an error describing the violated rule is returned.
    pub fn apply(
        &mut self,
        op: MemoryOp,
        name: &str,
        span: Span,
    ) -> Result<MemoryObject, MemoryError> {
        let danger = self.in_danger();
        let Some(obj) = self.get(name) else {
            return err(
                ErrorKind::TypeError,
                span,
                format!("no object named `{name}` in scope"),
            );
        };
        let kind = obj.kind;
        let ty = obj.ty.clone();
        let count = obj.ref_count;
        trace!(name = %name, op = op.name(), from = %kind, "memory operation");

        // State gate: the source must be valid unless the escape hatch is on.
        if !obj.is_valid() && !danger {
            let reason = obj
                .state
                .unusable_reason()
                .unwrap_or_else(|| "invalidated".to_string());
            return err(
                ErrorKind::UseAfterInvalidation,
                span,
                format!("cannot {} `{name}`: {reason}", op.name()),
            );
        }

        // Escape-only operations are gated on the block, not the matrix.
        if op.is_escape_only() && !danger {
            return err(
                ErrorKind::DangerBlockViolation,
                span,
                format!("`{}` requires an escape block", op.name()),
            );
        }

        match op {
            MemoryOp::Hijack => self.transform_hijack(name, &ty, kind, span, danger),
            MemoryOp::Retain => self.transform_retain(name, &ty, kind, count, span, danger),
            MemoryOp::Share(policy) => {
                self.transform_share(name, &ty, kind, count, policy, span, danger)
            }
            MemoryOp::Track => self.transform_track(name, &ty, kind, span, danger),
            MemoryOp::Steal => self.transform_steal(name, &ty, kind, count, span, danger),
            MemoryOp::Release => self.transform_release(name, &ty, kind, count, span, danger),
            MemoryOp::Recover | MemoryOp::TryRecover => {
                self.transform_recover(name, &ty, kind, span, danger)
            }
            MemoryOp::Snatch => {
                self.invalidate(name, "snatch");
                Ok(MemoryObject::new(name, ty, WrapperKind::Snatched, span))
            }
            MemoryOp::Reveal => {
                if !matches!(kind, WrapperKind::Snatched) && !danger {
                    return err(
                        ErrorKind::InvalidTransformation,
                        span,
                        format!("`reveal` requires a snatched object, `{name}` is {kind}"),
                    );
                }
                // Transient access: the snatched source stays registered.
                Ok(MemoryObject::new(name, ty, WrapperKind::Owned, span))
            }
            MemoryOp::Own => {
                if !matches!(kind, WrapperKind::Snatched) && !danger {
                    return err(
                        ErrorKind::InvalidTransformation,
                        span,
                        format!("`own` requires a snatched object, `{name}` is {kind}"),
                    );
                }
                self.invalidate(name, "own");
                Ok(MemoryObject::new(name, ty, WrapperKind::Owned, span))
            }
        }
    }

    /// Group containment: same group, or `Owned` source (the universal
    /// source), or the escape hatch.
    fn check_group(
        from: WrapperKind,
        to: WrapperKind,
        name: &str,
        span: Span,
        danger: bool,
    ) -> Result<(), MemoryError> {
        if danger || matches!(from, WrapperKind::Owned) {
            return Ok(());
        }
        match (from.group(), to.group()) {
            (Some(a), Some(b)) if a == b => Ok(()),
            _ => err(
                ErrorKind::MixedMemoryGroups,
                span,
                format!(
                    "cannot transform `{name}` from {from} to {to}: wrapper groups differ \
                     outside an escape block"
                ),
            ),
        }
    }

    fn transform_hijack(
        &mut self,
        name: &str,
        ty: &TypeInfo,
        kind: WrapperKind,
        span: Span,
        danger: bool,
    ) -> Result<MemoryObject, MemoryError> {
        if matches!(kind, WrapperKind::Hijacked) && !danger {
            return err(
                ErrorKind::InvalidTransformation,
                span,
                format!("`{name}` is already hijacked; exclusive handles cannot be hijacked again"),
            );
        }
        Self::check_group(kind, WrapperKind::Hijacked, name, span, danger)?;
        self.invalidate(name, "hijack");
        Ok(MemoryObject::new(name, ty.clone(), WrapperKind::Hijacked, span))
    }

    fn transform_retain(
        &mut self,
        name: &str,
        ty: &TypeInfo,
        kind: WrapperKind,
        count: u32,
        span: Span,
        danger: bool,
    ) -> Result<MemoryObject, MemoryError> {
        match kind {
            // Another retain of an already-retained object shares the count.
            WrapperKind::Retained => {
                if let Some(obj) = self.get_mut(name) {
                    obj.ref_count = count + 1;
                }
                let mut handle = MemoryObject::new(name, ty.clone(), WrapperKind::Retained, span);
                handle.ref_count = count + 1;
                Ok(handle)
            }
            WrapperKind::Tracked(TrackOrigin::Retained) if !danger => err(
                ErrorKind::InvalidTransformation,
                span,
                format!("cannot retain weak reference `{name}`; recover it first"),
            ),
            _ => {
                Self::check_group(kind, WrapperKind::Retained, name, span, danger)?;
                self.invalidate(name, "retain");
                Ok(MemoryObject::new(name, ty.clone(), WrapperKind::Retained, span))
            }
        }
    }

    fn transform_share(
        &mut self,
        name: &str,
        ty: &TypeInfo,
        kind: WrapperKind,
        count: u32,
        policy: LockPolicy,
        span: Span,
        danger: bool,
    ) -> Result<MemoryObject, MemoryError> {
        match kind {
            WrapperKind::Shared(existing) => {
                if existing != policy && !danger {
                    return err(
                        ErrorKind::ReferenceCountError,
                        span,
                        format!(
                            "`{name}` is shared with policy {existing}; cannot share it again \
                             with policy {policy}"
                        ),
                    );
                }
                if let Some(obj) = self.get_mut(name) {
                    obj.ref_count = count + 1;
                }
                let mut handle =
                    MemoryObject::new(name, ty.clone(), WrapperKind::Shared(existing), span);
                handle.ref_count = count + 1;
                Ok(handle)
            }
            WrapperKind::Tracked(TrackOrigin::Shared(_)) if !danger => err(
                ErrorKind::InvalidTransformation,
                span,
                format!("cannot share weak reference `{name}`; recover it first"),
            ),
            _ => {
                Self::check_group(kind, WrapperKind::Shared(policy), name, span, danger)?;
                self.invalidate(name, "share");
                Ok(MemoryObject::new(name, ty.clone(), WrapperKind::Shared(policy), span))
            }
        }
    }

    fn transform_track(
        &mut self,
        name: &str,
        ty: &TypeInfo,
        kind: WrapperKind,
        span: Span,
        danger: bool,
    ) -> Result<MemoryObject, MemoryError> {
        let origin = match kind {
            WrapperKind::Retained => TrackOrigin::Retained,
            WrapperKind::Shared(policy) => TrackOrigin::Shared(policy),
            _ if danger => TrackOrigin::Retained,
            _ => {
                return err(
                    ErrorKind::InvalidTransformation,
                    span,
                    format!("`track` requires a retained or shared source, `{name}` is {kind}"),
                );
            }
        };
        // A weak view never invalidates its source.
        Ok(MemoryObject::new(name, ty.clone(), WrapperKind::Tracked(origin), span))
    }

    fn transform_steal(
        &mut self,
        name: &str,
        ty: &TypeInfo,
        kind: WrapperKind,
        count: u32,
        span: Span,
        danger: bool,
    ) -> Result<MemoryObject, MemoryError> {
        match kind {
            WrapperKind::Retained | WrapperKind::Shared(_) => {
                if count != 1 && !danger {
                    return err(
                        ErrorKind::ReferenceCountError,
                        span,
                        format!(
                            "cannot steal `{name}`: reference count is {count}, \
                             sole ownership requires exactly 1"
                        ),
                    );
                }
                self.invalidate(name, "steal");
                Ok(MemoryObject::new(name, ty.clone(), WrapperKind::Owned, span))
            }
            // Exclusivity guarantees uniqueness.
            WrapperKind::Hijacked => {
                self.invalidate(name, "steal");
                Ok(MemoryObject::new(name, ty.clone(), WrapperKind::Owned, span))
            }
            WrapperKind::Snatched => {
                if !danger {
                    return err(
                        ErrorKind::DangerBlockViolation,
                        span,
                        format!(
                            "snatched object `{name}` can only be legitimized in an escape block"
                        ),
                    );
                }
                self.invalidate(name, "steal");
                Ok(MemoryObject::new(name, ty.clone(), WrapperKind::Owned, span))
            }
            WrapperKind::Owned | WrapperKind::Tracked(_) if danger => {
                self.invalidate(name, "steal");
                Ok(MemoryObject::new(name, ty.clone(), WrapperKind::Owned, span))
            }
            WrapperKind::Owned => err(
                ErrorKind::InvalidTransformation,
                span,
                format!("`{name}` is already owned"),
            ),
            WrapperKind::Tracked(_) => err(
                ErrorKind::InvalidTransformation,
                span,
                format!("cannot steal through weak reference `{name}`"),
            ),
        }
    }

    fn transform_release(
        &mut self,
        name: &str,
        ty: &TypeInfo,
        kind: WrapperKind,
        count: u32,
        span: Span,
        danger: bool,
    ) -> Result<MemoryObject, MemoryError> {
        match kind {
            WrapperKind::Retained | WrapperKind::Shared(_) => {
                if count <= 1 && !danger {
                    return err(
                        ErrorKind::ReferenceCountError,
                        span,
                        format!(
                            "releasing `{name}` would drop its reference count to zero; \
                             transfer or steal it instead"
                        ),
                    );
                }
                if let Some(obj) = self.get_mut(name) {
                    obj.ref_count = count.saturating_sub(1);
                    obj.invalidate("release");
                }
                let mut released = MemoryObject::new(name, ty.clone(), kind, span);
                released.ref_count = count.saturating_sub(1);
                released.state = ObjectState::invalidated("release");
                Ok(released)
            }
            _ if danger => {
                self.invalidate(name, "release");
                let mut released = MemoryObject::new(name, ty.clone(), kind, span);
                released.state = ObjectState::invalidated("release");
                Ok(released)
            }
            _ => err(
                ErrorKind::InvalidTransformation,
                span,
                format!("`release` requires a reference-counted object, `{name}` is {kind}"),
            ),
        }
    }

    fn transform_recover(
        &mut self,
        name: &str,
        ty: &TypeInfo,
        kind: WrapperKind,
        span: Span,
        danger: bool,
    ) -> Result<MemoryObject, MemoryError> {
        match kind {
            WrapperKind::Tracked(TrackOrigin::Retained) => {
                Ok(MemoryObject::new(name, ty.clone(), WrapperKind::Retained, span))
            }
            WrapperKind::Tracked(TrackOrigin::Shared(policy)) => Ok(MemoryObject::new(
                name,
                ty.clone(),
                WrapperKind::Shared(policy),
                span,
            )),
            _ if danger => Ok(MemoryObject::new(name, ty.clone(), kind, span)),
            _ => err(
                ErrorKind::InvalidTransformation,
                span,
                format!("`recover` requires a tracked reference, `{name}` is {kind}"),
            ),
        }
    }

    // ------------------------------------------------------------------
    // Assignment and container-move semantics
    // ------------------------------------------------------------------

    /// Handle `target = source` where both sides are object names.
    ///
    /// Forge: the target becomes a fresh Owned object; the source is moved
    /// unless its type is a trivially copyable primitive.
    /// Sweet: both names alias the object and the count goes up.
    ///
    /// An existing target is updated where it lives; a new one lands in the
    /// current scope (the declaration form, which shadows).
    pub fn assign_from_object(
        &mut self,
        target: &str,
        source: &str,
        span: Span,
    ) -> Result<(), MemoryError> {
        let handle = self.take_from_object(source, span)?;
        let Some(handle) = handle else {
            return Ok(());
        };
        let mut replacement = handle;
        replacement.name = target.to_string();
        if let Some(existing) = self.get_mut(target) {
            *existing = replacement;
        } else if let Some(scope) = self.scopes.last_mut() {
            scope.insert(target.to_string(), replacement);
        }
        Ok(())
    }

    /// The declaration form of [`assign_from_object`]: `let target = source`
    /// always binds in the current scope, shadowing any outer `target`.
    pub fn bind_from_object(
        &mut self,
        target: &str,
        source: &str,
        span: Span,
    ) -> Result<(), MemoryError> {
        let handle = self.take_from_object(source, span)?;
        let Some(handle) = handle else {
            return Ok(());
        };
        let mut bound = handle;
        bound.name = target.to_string();
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(target.to_string(), bound);
        }
        Ok(())
    }

    /// Apply the language's move/alias rule to `source` and produce the
    /// handle the receiving name will hold. `None` when the source is not a
    /// tracked object.
    fn take_from_object(
        &mut self,
        source: &str,
        span: Span,
    ) -> Result<Option<MemoryObject>, MemoryError> {
        self.check_usable(source, span)?;
        let Some(src) = self.get(source) else {
            return Ok(None);
        };
        let ty = src.ty.clone();
        let kind = src.kind;
        let count = src.ref_count;

        let handle = match self.language {
            SourceLanguage::Forge => {
                if !ty.is_trivially_copyable()
                    && let Some(src) = self.get_mut(source)
                {
                    src.state = ObjectState::Moved;
                }
                MemoryObject::new(source, ty, WrapperKind::Owned, span)
            }
            SourceLanguage::Sweet => {
                if let Some(src) = self.get_mut(source) {
                    src.ref_count = count + 1;
                }
                let mut alias = MemoryObject::new(source, ty, kind, span);
                alias.ref_count = count + 1;
                alias
            }
        };
        Ok(Some(handle))
    }

    /// Handle a container-storing call `container.push(source)` and friends.
    pub fn container_move(
        &mut self,
        container: &str,
        source: &str,
        span: Span,
    ) -> Result<(), MemoryError> {
        let Some(src) = self.get(source) else {
            return Ok(());
        };
        if !src.is_valid() && !self.in_danger() {
            let reason = src
                .state
                .unusable_reason()
                .unwrap_or_else(|| "invalidated".to_string());
            return err(
                ErrorKind::ContainerMoveError,
                span,
                format!("cannot move `{source}` into container `{container}`: {reason}"),
            );
        }
        match self.language {
            SourceLanguage::Forge => {
                self.invalidate(source, format!("moved into container `{container}`"));
            }
            SourceLanguage::Sweet => {
                if let Some(src) = self.get_mut(source) {
                    src.ref_count += 1;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/table.rs"]
mod tests;
