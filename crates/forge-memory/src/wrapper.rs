//! Wrapper kinds, groups, locking policies, and the type-name codec.
//!
//! A wrapper kind tags a memory object with its ownership semantics. Kinds
//! partition into groups; cross-group transformations are forbidden outside
//! escape blocks. `Owned` is the universal kind: it belongs to no group, and
//! transitions with `Owned` on either side are governed by the kind-specific
//! rules alone.
//!
//! Wrapper kinds surface in type names as `Kind<Base>` (with the policy as a
//! second argument for `Shared` and policy-carrying `Tracked`). The codec
//! here is the single source of truth for that encoding.

use std::fmt;

/// Locking policy carried by `Shared` wrappers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LockPolicy {
    Mutex,
    MultiReadLock,
    RejectEdit,
}

impl LockPolicy {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            LockPolicy::Mutex => "Mutex",
            LockPolicy::MultiReadLock => "MultiReadLock",
            LockPolicy::RejectEdit => "RejectEdit",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Mutex" => Some(LockPolicy::Mutex),
            "MultiReadLock" => Some(LockPolicy::MultiReadLock),
            "RejectEdit" => Some(LockPolicy::RejectEdit),
            _ => None,
        }
    }
}

impl fmt::Display for LockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a `Tracked` weak reference points back to. Carried forward so that
/// recovery produces the correct strong kind and policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TrackOrigin {
    Retained,
    Shared(LockPolicy),
}

/// The closed set of wrapper kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WrapperKind {
    /// Direct unique ownership; the starting state.
    Owned,
    /// Sole exclusive mutable borrow.
    Hijacked,
    /// Shared with a non-atomic count.
    Retained,
    /// Weak backreference to a Retained or Shared object.
    Tracked(TrackOrigin),
    /// Shared with an atomic count and a locking policy.
    Shared(LockPolicy),
    /// Forcibly taken; contaminated provenance, escape-block only.
    Snatched,
}

/// Equivalence classes over wrapper kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Group {
    Exclusive,
    SingleThreadedRc,
    MultiThreadedRc,
    Unsafe,
}

impl WrapperKind {
    /// The group of this kind. `Owned` is the universal kind and belongs to
    /// none; a `Tracked` weak reference lives in its origin's group.
    #[must_use]
    pub const fn group(self) -> Option<Group> {
        match self {
            WrapperKind::Owned => None,
            WrapperKind::Hijacked => Some(Group::Exclusive),
            WrapperKind::Retained | WrapperKind::Tracked(TrackOrigin::Retained) => {
                Some(Group::SingleThreadedRc)
            }
            WrapperKind::Shared(_) | WrapperKind::Tracked(TrackOrigin::Shared(_)) => {
                Some(Group::MultiThreadedRc)
            }
            WrapperKind::Snatched => Some(Group::Unsafe),
        }
    }

    /// Reference count a freshly created object of this kind carries.
    #[must_use]
    pub const fn initial_ref_count(self) -> u32 {
        match self {
            WrapperKind::Tracked(_) => 0,
            _ => 1,
        }
    }

    /// Whether passing this kind across a thread boundary is sound.
    #[must_use]
    pub const fn is_thread_safe(self) -> bool {
        matches!(
            self,
            WrapperKind::Shared(_) | WrapperKind::Tracked(TrackOrigin::Shared(_))
        )
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            WrapperKind::Owned => "Owned",
            WrapperKind::Hijacked => "Hijacked",
            WrapperKind::Retained => "Retained",
            WrapperKind::Tracked(_) => "Tracked",
            WrapperKind::Shared(_) => "Shared",
            WrapperKind::Snatched => "Snatched",
        }
    }
}

impl fmt::Display for WrapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Handle wrappers produced by scoped-access statements and inline tokens.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopedWrapper {
    Viewed,
    Hijacked,
    Inspected,
    Seized,
}

impl ScopedWrapper {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ScopedWrapper::Viewed => "Viewed",
            ScopedWrapper::Hijacked => "Hijacked",
            ScopedWrapper::Inspected => "Inspected",
            ScopedWrapper::Seized => "Seized",
        }
    }

    /// Mutation through the handle is forbidden.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, ScopedWrapper::Viewed | ScopedWrapper::Inspected)
    }

    #[must_use]
    pub fn encode(self, base: &str) -> String {
        format!("{}<{}>", self.name(), base)
    }
}

/// Encode a wrapper kind and base type name into a wrapper type name.
#[must_use]
pub fn encode_wrapper(kind: WrapperKind, base: &str) -> String {
    match kind {
        WrapperKind::Shared(policy) => format!("Shared<{base}, {}>", policy.name()),
        WrapperKind::Tracked(TrackOrigin::Shared(policy)) => {
            format!("Tracked<{base}, {}>", policy.name())
        }
        other => format!("{}<{base}>", other.display_name()),
    }
}

/// Decode a wrapper type name back into `(kind, base)`.
///
/// Returns `None` when the name is not wrapper-encoded.
#[must_use]
pub fn decode_wrapper(name: &str) -> Option<(WrapperKind, String)> {
    let (head, inner) = split_wrapper_name(name)?;
    let (base, policy) = split_policy_argument(inner);
    match head {
        "Owned" if policy.is_none() => Some((WrapperKind::Owned, base.to_string())),
        "Hijacked" if policy.is_none() => Some((WrapperKind::Hijacked, base.to_string())),
        "Retained" if policy.is_none() => Some((WrapperKind::Retained, base.to_string())),
        "Snatched" if policy.is_none() => Some((WrapperKind::Snatched, base.to_string())),
        "Tracked" => {
            let origin = match policy {
                Some(p) => TrackOrigin::Shared(LockPolicy::parse(p)?),
                None => TrackOrigin::Retained,
            };
            Some((WrapperKind::Tracked(origin), base.to_string()))
        }
        "Shared" => {
            let policy = LockPolicy::parse(policy?)?;
            Some((WrapperKind::Shared(policy), base.to_string()))
        }
        _ => None,
    }
}

/// The scoped wrapper head of a type name, if it has one.
#[must_use]
pub fn decode_scoped_wrapper(name: &str) -> Option<(ScopedWrapper, String)> {
    let (head, inner) = split_wrapper_name(name)?;
    let (base, _) = split_policy_argument(inner);
    let wrapper = match head {
        "Viewed" => ScopedWrapper::Viewed,
        "Hijacked" => ScopedWrapper::Hijacked,
        "Inspected" => ScopedWrapper::Inspected,
        "Seized" => ScopedWrapper::Seized,
        _ => return None,
    };
    Some((wrapper, base.to_string()))
}

/// Whether a type name encodes a read-only handle (`Viewed<` / `Inspected<`).
#[must_use]
pub fn is_read_only_wrapper_name(name: &str) -> bool {
    name.starts_with("Viewed<") || name.starts_with("Inspected<")
}

/// Whether a type name encodes an exclusive `Hijacked<...>` handle.
#[must_use]
pub fn is_hijacked_name(name: &str) -> bool {
    name.starts_with("Hijacked<")
}

/// The locking policy of a `Shared<...>` type name, when it has one.
#[must_use]
pub fn shared_policy_of(name: &str) -> Option<LockPolicy> {
    match decode_wrapper(name)? {
        (WrapperKind::Shared(policy), _) => Some(policy),
        _ => None,
    }
}

/// Split `Head<inner>` into `(Head, inner)`, requiring the trailing `>` to
/// close the opening bracket. Used for every angle-bracket type encoding
/// (wrappers, `Maybe<T>`-style results, `Routine<(…), R>` callables).
pub fn split_wrapper_name(name: &str) -> Option<(&str, &str)> {
    let open = name.find('<')?;
    if !name.ends_with('>') || open == 0 {
        return None;
    }
    let head = &name[..open];
    if !head.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((head, &name[open + 1..name.len() - 1]))
}

/// Split the inner text of a wrapper name at its top-level comma, yielding
/// the base type name and the optional trailing argument.
pub fn split_policy_argument(inner: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    for (i, ch) in inner.char_indices() {
        match ch {
            '<' | '[' | '(' => depth += 1,
            '>' | ']' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                return (inner[..i].trim(), Some(inner[i + 1..].trim()));
            }
            _ => {}
        }
    }
    (inner.trim(), None)
}

#[cfg(test)]
#[path = "tests/wrapper.rs"]
mod tests;
