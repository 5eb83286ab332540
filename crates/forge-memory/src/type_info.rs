//! Type descriptors.
//!
//! `TypeInfo` is a value type carrying no identity; two descriptors are the
//! same type when their name, reference-ness, and generic arguments agree.
//! Primitive classification is by name convention: `s8..s128` / `u8..u128`
//! plus the address-sized pair for integers, `f16..f128` / `d32..d128` for
//! floating point.

const SIGNED_NAMES: &[&str] = &["s8", "s16", "s32", "s64", "s128"];
const UNSIGNED_NAMES: &[&str] = &["u8", "u16", "u32", "u64", "u128"];
const ADDRESS_NAMES: &[&str] = &["saddr", "uaddr"];
const BINARY_FLOAT_NAMES: &[&str] = &["f16", "f32", "f64", "f128"];
const DECIMAL_FLOAT_NAMES: &[&str] = &["d32", "d64", "d128"];

/// Name of the recovery type substituted after an error.
pub const UNKNOWN_TYPE: &str = "unknown";

/// A structural type descriptor.
#[derive(Debug, Clone, Eq)]
pub struct TypeInfo {
    pub name: String,
    pub is_reference: bool,
    /// Ordered generic arguments, when present.
    pub generic_args: Option<Vec<TypeInfo>>,
    pub is_generic_param: bool,
}

// Equality is structural on (name, is_reference, generic_args);
// is_generic_param is a binding-site property, not part of identity.
impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.is_reference == other.is_reference
            && self.generic_args == other.generic_args
    }
}

impl TypeInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_reference: false,
            generic_args: None,
            is_generic_param: false,
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeInfo>) -> Self {
        Self {
            name: name.into(),
            is_reference: false,
            generic_args: Some(args),
            is_generic_param: false,
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_reference: true,
            generic_args: None,
            is_generic_param: false,
        }
    }

    pub fn generic_param(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_reference: false,
            generic_args: None,
            is_generic_param: true,
        }
    }

    /// The recovery type used to continue analysis after an error.
    #[must_use]
    pub fn unknown() -> Self {
        Self::named(UNKNOWN_TYPE)
    }

    #[must_use]
    pub fn none() -> Self {
        Self::named("none")
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::named("bool")
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_TYPE
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        self.name == "none"
    }

    #[must_use]
    pub fn is_boolean(&self) -> bool {
        self.name == "bool"
    }

    /// Signed/unsigned family or the two address-sized names.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        let n = self.name.as_str();
        SIGNED_NAMES.contains(&n) || UNSIGNED_NAMES.contains(&n) || ADDRESS_NAMES.contains(&n)
    }

    #[must_use]
    pub fn is_floating_point(&self) -> bool {
        let n = self.name.as_str();
        BINARY_FLOAT_NAMES.contains(&n) || DECIMAL_FLOAT_NAMES.contains(&n)
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_floating_point()
    }

    /// Text and bytes families.
    #[must_use]
    pub fn is_textual(&self) -> bool {
        self.name == "text" || self.name == "bytes" || self.name.starts_with("text")
    }

    /// Primitives that copy on assignment rather than move.
    #[must_use]
    pub fn is_trivially_copyable(&self) -> bool {
        self.is_numeric() || self.is_boolean() || self.is_none()
    }

    /// `name[arg1,arg2,…]` when generic args are present, `name` otherwise.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.generic_args {
            Some(args) if !args.is_empty() => {
                let rendered: Vec<String> = args.iter().map(TypeInfo::full_name).collect();
                format!("{}[{}]", self.name, rendered.join(","))
            }
            _ => self.name.clone(),
        }
    }
}

impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_reference {
            write!(f, "&{}", self.full_name())
        } else {
            write!(f, "{}", self.full_name())
        }
    }
}

#[cfg(test)]
#[path = "tests/type_info.rs"]
mod tests;
