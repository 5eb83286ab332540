//! Language-agnostic AST for the Forge and Sweet surface languages.
//!
//! The parser subsystems for both languages lower into these shapes; the
//! semantic analyzer and the variant generator consume them. Node kinds are
//! tagged sum types with exhaustive matching so that adding a kind forces
//! every consumer to handle it.
//!
//! Expressions carry a `NodeId` so analysis results can attach to them
//! through side tables without mutating the tree.

pub mod node;
pub use node::{
    AccessKind, BinaryOp, Block, ClassDecl, ComparisonOp, Decl, DeclKind, Expr, ExprKind,
    FeatureDecl, FunctionDecl, ImplementationDecl, Literal, NodeId, Param, Pattern, Program, Stmt,
    StmtKind, StructDecl, TypeExpr, UnaryOp, VariableDecl, VariantCase, VariantDecl, Visibility,
    WhenArm,
};

pub mod build;
pub use build::AstFactory;
