//! Scope setup, type checking, generic instantiation, and lowering
//! orchestration for the Tenet compiler core.

// Internal invariants (a function body resolved outside a function scope, a
// module scope missing for a module present in the AST, ...) are asserted
// with `expect` rather than threaded through `Result`, since they indicate a
// checker bug rather than a user-facing error.
#![allow(clippy::expect_used)]

pub mod checker;
pub mod instantiate;
pub mod lower;
pub mod scope;
pub mod scope_setup;
pub mod unchecked;

pub use instantiate::instantiate_generic;
pub use lower::{upsert_bound_type, Lowerer};
pub use scope::ScopeRef;
pub use scope_setup::setup_program;
pub use unchecked::{UncheckedType, UncheckedVar, UncheckedVarNode};
