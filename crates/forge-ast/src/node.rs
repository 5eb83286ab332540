//! AST node shapes.
//!
//! Every expression owns a `NodeId`; statements and declarations are
//! identified by position. All nodes carry a `Span` into the source file
//! they were parsed from.

use forge_common::span::Span;
use serde::{Deserialize, Serialize};

/// Identity of an expression node, used to key analysis side tables.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// A parsed program: a flat list of top-level declarations.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub declarations: Vec<Decl>,
}

/// Symbol visibility as written in the source.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

/// A syntactic type reference, e.g. `List[s32]` or `Shared[T, Mutex]`.
///
/// Purely structural; the analyzer converts this into its own `TypeInfo`
/// descriptor during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub name: String,
    pub args: Vec<TypeExpr>,
    pub is_reference: bool,
    pub span: Span,
}

impl TypeExpr {
    pub fn named(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            is_reference: false,
            span,
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeExpr>, span: Span) -> Self {
        Self {
            name: name.into(),
            args,
            is_reference: false,
            span,
        }
    }
}

/// A function or lambda parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

/// A braced sequence of statements.
#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone)]
pub struct Decl {
    pub span: Span,
    pub kind: DeclKind,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Variable(VariableDecl),
    Function(FunctionDecl),
    Class(ClassDecl),
    Struct(StructDecl),
    Variant(VariantDecl),
    Feature(FeatureDecl),
    Implementation(ImplementationDecl),
    Import { path: String },
    Namespace { name: String, declarations: Vec<Decl> },
    Using { path: String },
    External { declarations: Vec<Decl> },
    Preset { name: String, value: Expr },
}

#[derive(Debug, Clone)]
pub struct VariableDecl {
    pub name: String,
    pub declared_type: Option<TypeExpr>,
    pub initializer: Option<Expr>,
    pub mutable: bool,
    pub visibility: Visibility,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    /// Base name as written, including a trailing `!` for failable functions
    /// and any `__dunder__` wrapping.
    pub name: String,
    /// `Type.method` qualifier, when the function is declared on a type.
    pub type_qualifier: Option<String>,
    pub generics: Vec<String>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Block,
    /// Explicitly flagged as permitted to return an exclusive token.
    pub is_usurping: bool,
    /// Annotated as unrecoverable; the variant generator skips it.
    pub crash_only: bool,
    pub visibility: Visibility,
}

impl FunctionDecl {
    /// Whether the declared name marks the function as failable.
    #[must_use]
    pub fn is_failable(&self) -> bool {
        self.name.ends_with('!')
    }
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub generics: Vec<String>,
    /// Names of the features (protocols) this class implements.
    pub features: Vec<String>,
    pub members: Vec<Decl>,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: String,
    pub generics: Vec<String>,
    pub fields: Vec<Param>,
}

#[derive(Debug, Clone)]
pub struct VariantDecl {
    pub name: String,
    pub generics: Vec<String>,
    pub cases: Vec<VariantCase>,
}

#[derive(Debug, Clone)]
pub struct VariantCase {
    pub name: String,
    pub payload: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FeatureDecl {
    pub name: String,
    pub generics: Vec<String>,
    /// Required method names; bodies live in implementations.
    pub methods: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ImplementationDecl {
    pub feature: String,
    pub target: TypeExpr,
    pub members: Vec<Decl>,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone)]
pub struct Stmt {
    pub span: Span,
    pub kind: StmtKind,
}

/// The scoped-access statement family.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessKind {
    /// `viewing x as v { ... }` - shared read of a local object.
    View,
    /// `hijacking x as h { ... }` - exclusive mutable borrow.
    Hijack,
    /// `inspecting x as i { ... }` - shared read through a MultiReadLock.
    Inspect,
    /// `seizing x as s { ... }` - exclusive lock on a Shared object.
    Seize,
}

impl AccessKind {
    /// Surface keyword for this access kind.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            AccessKind::View => "viewing",
            AccessKind::Hijack => "hijacking",
            AccessKind::Inspect => "inspecting",
            AccessKind::Seize => "seizing",
        }
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Expression(Expr),
    Declaration(Box<VariableDecl>),
    Assignment { target: Expr, value: Expr },
    Return(Option<Expr>),
    If {
        condition: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    While { condition: Expr, body: Block },
    For {
        variable: String,
        iterable: Expr,
        body: Block,
    },
    When { scrutinee: Expr, arms: Vec<WhenArm> },
    Block(Block),
    Break,
    Continue,
    /// `fail X` - raise a crashable value.
    Throw(Expr),
    /// `absent` - signal a missing value from a failable function.
    Absent,
    Pass,
    /// `danger { ... }` - escape block in which forbidden wrapper
    /// operations are accepted.
    Danger(Block),
    ScopedAccess {
        access: AccessKind,
        source: Expr,
        binding: String,
        body: Block,
    },
}

#[derive(Debug, Clone)]
pub struct WhenArm {
    pub pattern: Pattern,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Wildcard,
    Binding(String),
    TypedBinding { name: String, ty: TypeExpr },
    Literal(Expr),
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Integer(i128),
    Float(f64),
    Boolean(bool),
    Text(String),
    None,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    /// True division; an error on integer operands.
    Div,
    FloorDiv,
    Mod,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Whether this operator yields a boolean regardless of operand type.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    ListLiteral(Vec<Expr>),
    SetLiteral(Vec<Expr>),
    DictLiteral(Vec<(Expr, Expr)>),
    Identifier(String),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Call {
        callee: Box<Expr>,
        type_args: Vec<TypeExpr>,
        args: Vec<Expr>,
    },
    Member { object: Box<Expr>, property: String },
    Index { object: Box<Expr>, index: Box<Expr> },
    Conditional {
        condition: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
    BlockExpr(Block),
    Range {
        start: Box<Expr>,
        end: Box<Expr>,
        step: Option<Box<Expr>>,
    },
    ChainedComparison {
        operands: Vec<Expr>,
        ops: Vec<ComparisonOp>,
    },
    Lambda { params: Vec<Param>, body: Block },
    TypeRef(TypeExpr),
    SliceConstructor {
        element: TypeExpr,
        length: Box<Expr>,
    },
    /// A memory operation parsed in operator position, e.g. `a.retain()`
    /// when the parser recognizes the operation syntactically. The operation
    /// name is kept as written; the analyzer maps it onto the memory model.
    MemoryOperation {
        target: Box<Expr>,
        op: String,
        args: Vec<Expr>,
    },
    IntrinsicCall {
        name: String,
        type_args: Vec<TypeExpr>,
        args: Vec<Expr>,
    },
    NativeCall { name: String, args: Vec<Expr> },
    NamedArgument { name: String, value: Box<Expr> },
    Constructor { ty: TypeExpr, args: Vec<Expr> },
}

impl Expr {
    /// The identifier name, when this expression is a bare identifier.
    #[must_use]
    pub fn identifier_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

