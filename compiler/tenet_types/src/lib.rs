//! The Tenet type system: type terms, unification, substitution, and the
//! bound-entity representation the checker and lowerer share.

// The interner asserts its u32 capacity invariant with `expect`; overflowing
// it means a single compilation unit produced over 4 billion distinct types.
#![allow(clippy::expect_used)]

pub mod bound;
pub mod env;
pub mod flags;
pub mod output;
pub mod pool;
pub mod term;
pub mod unify;

pub use bound::{
    BoundType, BoundVar, IrBlockHandle, IrFunctionHandle, IrLayoutHandle, IrModuleHandle, IrTypeHandle,
    IrValueHandle,
};
pub use env::TypeNameEnv;
pub use flags::{compute_flags, TypeFlags};
pub use output::signature;
pub use pool::{Idx, Pool};
pub use term::{ftv, ftv_count, is_ground, rebind, Field, Subst, Term, TypeData};
pub use unify::{unify, UnifyOutcome};
