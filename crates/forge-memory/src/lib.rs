//! Memory-ownership model for the Forge and Sweet surface languages.
//!
//! This crate provides:
//! - `TypeInfo` - value-typed descriptors with primitive classification
//! - `WrapperKind`/`Group`/`LockPolicy` - the closed wrapper-kind automaton
//! - The wrapper type-name codec (`encode`/`decode`)
//! - `MemoryObject` and its state machine
//! - `MemoryTable` - scope-keyed object storage plus the transformation
//!   matrix behind every memory operation

pub mod type_info;
pub use type_info::TypeInfo;

pub mod wrapper;
pub use wrapper::{
    Group, LockPolicy, ScopedWrapper, TrackOrigin, WrapperKind, decode_wrapper, encode_wrapper,
};

pub mod object;
pub use object::{MemoryObject, ObjectState};

pub mod table;
pub use table::{MemoryError, MemoryOp, MemoryTable};
