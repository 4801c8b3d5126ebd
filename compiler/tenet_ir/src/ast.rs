//! The AST data model consumed by the checker/lowerer.
//!
//! The lexer and parser that produce this tree are out of scope here; this
//! module only fixes the shape the rest of the pipeline walks. Every node
//! carries a [`Located`] so diagnostics can always point at source text.

use crate::atom::Atom;
use crate::span::Located;

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: Atom,
    pub types: Vec<TypeDecl>,
    pub functions: Vec<FunctionDecl>,
    pub vars: Vec<VarDecl>,
    pub links: Vec<LinkDecl>,
    pub span: Located,
}

/// A type-level expression as written in source, pre-resolution.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    /// A bare name, possibly a type variable (lowercase, per convention).
    Id(Atom, Located),
    /// `Name(args...)`, type-level application/instantiation.
    Applied(Box<TypeExpr>, Vec<TypeExpr>, Located),
    Maybe(Box<TypeExpr>, Located),
    Ptr(Box<TypeExpr>, Located),
    Ref(Box<TypeExpr>, Located),
    Tuple(Vec<TypeExpr>, Located),
    /// `fn (params...) -> ret`.
    Function(Vec<TypeExpr>, Box<TypeExpr>, Located),
}

impl TypeExpr {
    #[must_use]
    pub fn span(&self) -> &Located {
        match self {
            TypeExpr::Id(_, s)
            | TypeExpr::Applied(_, _, s)
            | TypeExpr::Maybe(_, s)
            | TypeExpr::Ptr(_, s)
            | TypeExpr::Ref(_, s)
            | TypeExpr::Tuple(_, s)
            | TypeExpr::Function(_, _, s) => s,
        }
    }
}

/// A single named field in a struct or data-ctor declaration.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: Atom,
    pub ty: TypeExpr,
    pub span: Located,
}

/// A user-defined type declaration.
#[derive(Debug, Clone)]
pub enum TypeDecl {
    /// `type Name(generics...) { field: T, ... }`, a managed product type.
    Struct {
        name: Atom,
        generics: Vec<Atom>,
        fields: Vec<FieldDecl>,
        span: Located,
    },
    /// `type Name polymorph { Tag1 Tag2(T) ... }`, a closed sum of nullary
    /// tags and/or data constructors.
    Polymorph {
        name: Atom,
        generics: Vec<Atom>,
        variants: Vec<PolymorphVariant>,
        span: Located,
    },
    /// `type Name = Expr`, a possibly-parameterized alias.
    Alias {
        name: Atom,
        generics: Vec<Atom>,
        expansion: TypeExpr,
        span: Located,
    },
    /// `type Name link "extern-name"`, an opaque externally-defined type.
    Link {
        name: Atom,
        extern_name: Atom,
        span: Located,
    },
}

impl TypeDecl {
    #[must_use]
    pub fn name(&self) -> Atom {
        match self {
            TypeDecl::Struct { name, .. }
            | TypeDecl::Polymorph { name, .. }
            | TypeDecl::Alias { name, .. }
            | TypeDecl::Link { name, .. } => *name,
        }
    }

    #[must_use]
    pub fn span(&self) -> &Located {
        match self {
            TypeDecl::Struct { span, .. }
            | TypeDecl::Polymorph { span, .. }
            | TypeDecl::Alias { span, .. }
            | TypeDecl::Link { span, .. } => span,
        }
    }
}

/// One variant of a `polymorph` sum type.
#[derive(Debug, Clone)]
pub struct PolymorphVariant {
    pub name: Atom,
    /// Empty for a nullary tag; non-empty makes this a data constructor.
    pub fields: Vec<FieldDecl>,
    pub span: Located,
}

/// A single function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Atom,
    pub ty: TypeExpr,
    pub span: Located,
}

/// The non-body part of a function: parameters and declared return type.
#[derive(Debug, Clone)]
pub struct FunctionSig {
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub span: Located,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Atom,
    pub generics: Vec<Atom>,
    pub decl: FunctionSig,
    pub block: Block,
    pub span: Located,
}

/// A module-level variable declaration (`var`/`let`).
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: Atom,
    pub ty: Option<TypeExpr>,
    pub initializer: Option<Expr>,
    /// `let` bindings are immutable after initialization; `var` are not.
    pub mutable: bool,
    pub span: Located,
}

/// `link fn name(params...) -> ret = "extern_name"`.
#[derive(Debug, Clone)]
pub struct LinkDecl {
    pub name: Atom,
    pub extern_name: Atom,
    pub decl: FunctionSig,
    pub span: Located,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Ineq,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    Xor,
}

impl BinOp {
    /// The runtime operator-overload name this binary op desugars to when
    /// neither operand is a primitive integer or native pointer.
    #[must_use]
    pub fn runtime_name(self) -> &'static str {
        match self {
            BinOp::Add => "__plus__",
            BinOp::Sub => "__minus__",
            BinOp::Mul => "__times__",
            BinOp::Div => "__divide__",
            BinOp::Mod => "__mod__",
            BinOp::Lt => "__lt__",
            BinOp::Lte => "__lte__",
            BinOp::Gt => "__gt__",
            BinOp::Gte => "__gte__",
            BinOp::Eq => "__eq__",
            BinOp::Ineq => "__ineq__",
            BinOp::Shl => "__shl__",
            BinOp::Shr => "__shr__",
            BinOp::BitAnd => "__bitwise_and__",
            BinOp::BitOr => "__bitwise_or__",
            BinOp::Xor => "__xor__",
        }
    }

    /// The source-text operator symbol, for rendering an expression back
    /// the way the programmer wrote it (assertion messages, diagnostics).
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Lt => "<",
            BinOp::Lte => "<=",
            BinOp::Gt => ">",
            BinOp::Gte => ">=",
            BinOp::Eq => "==",
            BinOp::Ineq => "!=",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::Xor => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Negative,
    Positive,
    AddressOf,
    Not,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Int { value: i128, radix: u32, boxed: bool },
    Float(f64),
    Str(Atom),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal, Located),
    Reference(Atom, Located),
    Call(Box<Expr>, Vec<Expr>, Located),
    Binary(BinOp, Box<Expr>, Box<Expr>, Located),
    CompoundAssign(BinOp, Box<Expr>, Box<Expr>, Located),
    Assign(Box<Expr>, Box<Expr>, Located),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>, Located),
    And(Box<Expr>, Box<Expr>, Located),
    Or(Box<Expr>, Box<Expr>, Located),
    Dot(Box<Expr>, Atom, Located),
    Index(Box<Expr>, Box<Expr>, Located),
    Cast(Box<Expr>, TypeExpr, Located),
    TypeId(Box<Expr>, Located),
    SizeOf(TypeExpr, Located),
    Tuple(Vec<Expr>, Located),
    ArrayLiteral(Vec<Expr>, Located),
    Prefix(PrefixOp, Box<Expr>, Located),
    Bang(Box<Expr>, Located),
}

impl Expr {
    #[must_use]
    pub fn span(&self) -> &Located {
        match self {
            Expr::Literal(_, s)
            | Expr::Reference(_, s)
            | Expr::Call(_, _, s)
            | Expr::Binary(_, _, _, s)
            | Expr::CompoundAssign(_, _, _, s)
            | Expr::Assign(_, _, s)
            | Expr::Ternary(_, _, _, s)
            | Expr::And(_, _, s)
            | Expr::Or(_, _, s)
            | Expr::Dot(_, _, s)
            | Expr::Index(_, _, s)
            | Expr::Cast(_, _, s)
            | Expr::TypeId(_, s)
            | Expr::SizeOf(_, s)
            | Expr::Tuple(_, s)
            | Expr::ArrayLiteral(_, s)
            | Expr::Prefix(_, _, s)
            | Expr::Bang(_, s) => s,
        }
    }
}

/// A single `match` arm.
#[derive(Debug, Clone)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub body: Block,
    pub span: Located,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches a nullary tag or a data constructor by name, optionally
    /// binding its fields.
    Ctor(Atom, Vec<Atom>, Located),
    Literal(Literal, Located),
    /// `_` or a bare binding name: always matches.
    Binding(Option<Atom>, Located),
}

impl Pattern {
    #[must_use]
    pub fn span(&self) -> &Located {
        match self {
            Pattern::Ctor(_, _, s) | Pattern::Literal(_, s) | Pattern::Binding(_, s) => s,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Located,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    VarDecl(VarDecl),
    Expr(Expr, Located),
    Return(Option<Expr>, Located),
    If {
        cond: Expr,
        then_block: Block,
        elif_arms: Vec<(Expr, Block)>,
        else_block: Option<Block>,
        span: Located,
    },
    While {
        cond: Expr,
        body: Block,
        span: Located,
    },
    For {
        binding: Atom,
        iterable: Expr,
        body: Block,
        span: Located,
    },
    Break(Located),
    Continue(Located),
    Match {
        scrutinee: Expr,
        arms: Vec<MatchArm>,
        else_block: Option<Block>,
        span: Located,
    },
    Assert(Expr, Located),
    Block(Block),
}

impl Stmt {
    #[must_use]
    pub fn span(&self) -> &Located {
        match self {
            Stmt::VarDecl(v) => &v.span,
            Stmt::Expr(_, s)
            | Stmt::Return(_, s)
            | Stmt::If { span: s, .. }
            | Stmt::While { span: s, .. }
            | Stmt::For { span: s, .. }
            | Stmt::Break(s)
            | Stmt::Continue(s)
            | Stmt::Match { span: s, .. }
            | Stmt::Assert(_, s) => s,
            Stmt::Block(b) => &b.span,
        }
    }
}
