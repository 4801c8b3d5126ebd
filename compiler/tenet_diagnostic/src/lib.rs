//! Diagnostic representation and accumulation for the Tenet compiler.
//!
//! Every fallible operation in the checker and lowerer returns a
//! [`Diagnostic`] (directly, or via a pushed [`DiagnosticQueue`] entry)
//! rather than unwinding; only the small set of internal invariants called
//! out in spec.md §4.10/§7 use `panic!`.

pub mod diagnostic;
pub mod error_kind;
pub mod queue;
pub mod severity;

pub use diagnostic::{Diagnostic, Note};
pub use error_kind::{ControlFlowErrorKind, ErrorKind, ScopeErrorKind, TypeErrorKind};
pub use queue::DiagnosticQueue;
pub use severity::Severity;
