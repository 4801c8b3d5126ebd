//! AST data model and atom interning shared by every crate in the Tenet
//! compiler core.

// The atom table asserts its u32 capacity invariant with `expect`; overflowing
// it means a single source file interned over 4 billion distinct strings.
#![allow(clippy::expect_used)]

pub mod ast;
pub mod atom;
pub mod span;

pub use atom::{intern, Atom, AtomTable};
pub use span::{Located, SourceFile, Span};
