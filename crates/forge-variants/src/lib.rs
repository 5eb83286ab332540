//! Failable-function variant generator.
//!
//! A failable function (`foo!`) signals failure with `fail` and absence
//! with `absent`. This crate synthesizes the safe wrappers callers actually
//! use: `try_foo` returning `Maybe<T>`, `check_foo` returning `Result<T>`,
//! and `find_foo` returning `Lookup<T>`, each with the body rewritten so
//! failure paths become ordinary returns.
//!
//! The generator is an independent walk over the program; it never mutates
//! the source AST, and every synthesized node gets a fresh `NodeId`.

pub mod generator;
pub use generator::VariantGenerator;

pub mod rewrite;
pub use rewrite::VariantKind;
