//! The closed set of user-facing error kinds the checker and lowerer report.
//!
//! Each variant carries the structured data needed to render its primary
//! message without string formatting at the call site; internal invariant
//! violations are not represented here — they `panic!` instead (see
//! [`crate::Diagnostic`] docs).

use thiserror::Error;

/// Scope-resolution failures (spec.md §7, "Scope errors").
#[derive(Debug, Clone, Error)]
pub enum ScopeErrorKind {
    #[error("'{name}' is already defined in this scope")]
    Redefinition { name: String },
    #[error("undefined symbol '{name}'")]
    MissingSymbol { name: String },
    #[error("'{name}' is not callable")]
    NotCallable { name: String },
    #[error("'{name}' is ambiguous: {count} matching overloads")]
    AmbiguousReference { name: String, count: usize },
    #[error("module '{name}' not found")]
    ModuleNotFound { name: String },
}

/// Type-checking failures (spec.md §7, "Type errors").
#[derive(Debug, Clone, Error)]
pub enum TypeErrorKind {
    #[error("cannot unify '{lhs}' with '{rhs}': {reason}")]
    UnificationFailure {
        lhs: String,
        rhs: String,
        reason: String,
    },
    #[error("no matching overload of '{name}' for argument types ({args})")]
    NoMatchingOverload { name: String, args: String },
    #[error("'{name}' is ambiguous: {count} overloads unify with these arguments")]
    AmbiguousOverload { name: String, count: usize },
    #[error("unbound free variable '{var}' at monomorphization site")]
    UnboundFreeVariable { var: String },
    #[error("use of a maybe value without a null-check")]
    UncheckedMaybe { signature: String },
    #[error("cannot cast '{from}' to '{to}'")]
    InvalidCast { from: String, to: String },
    #[error("cannot assign: '{signature}' is not a reference")]
    AssignToNonReference { signature: String },
    #[error("managed variable '{name}' of type '{signature}' has no initializer")]
    MissingInitializer { name: String, signature: String },
    #[error("non-exhaustive match on '{signature}'")]
    NonExhaustiveMatch { signature: String },
    #[error("'{name}' has no field '{field}'")]
    NoSuchField { name: String, field: String },
}

/// Control-flow failures (spec.md §7, "Control-flow errors").
#[derive(Debug, Clone, Error)]
pub enum ControlFlowErrorKind {
    #[error("'break' outside a loop")]
    BreakOutsideLoop,
    #[error("'continue' outside a loop")]
    ContinueOutsideLoop,
    #[error("not all paths return a value in function '{name}'")]
    NotAllPathsReturn { name: String },
    #[error("unreachable statement")]
    UnreachableStatement,
}

/// The top-level error kind, tagging which family produced it.
#[derive(Debug, Clone, Error)]
pub enum ErrorKind {
    #[error(transparent)]
    Scope(#[from] ScopeErrorKind),
    #[error(transparent)]
    Type(#[from] TypeErrorKind),
    #[error(transparent)]
    ControlFlow(#[from] ControlFlowErrorKind),
    /// A parse error forwarded verbatim from the external lexer/parser.
    #[error("parse error: {message}")]
    Parse { message: String },
}
