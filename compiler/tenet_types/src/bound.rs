//! Bound entities: language-level types/values paired with their IR-level
//! handle (spec.md §3.3).
//!
//! The handles are opaque `u32` indices rather than a concrete LLVM type —
//! `tenet_types`/`tenet_typeck` never depend on `tenet_llvm`. A backend
//! implements [`crate::pool::Pool`]-adjacent lookup tables keyed by these
//! handles (see `tenet_llvm::object_model`).

use crate::pool::Idx;
use tenet_ir::{Atom, Located};

/// An opaque handle into the lowering backend's IR-type table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct IrTypeHandle(pub u32);

/// An opaque handle into the lowering backend's layout table (e.g. field
/// offsets, managed-header size) — distinct from the plain IR type because
/// one IR type (e.g. `var_t*`) can back several distinct layouts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct IrLayoutHandle(pub u32);

/// An opaque handle into the lowering backend's IR-value table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct IrValueHandle(pub u32);

/// An opaque handle into the lowering backend's basic-block table, used for
/// `continue`/`break` targets and condition-refinement join points.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct IrBlockHandle(pub u32);

/// An opaque handle into the lowering backend's function table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct IrFunctionHandle(pub u32);

impl IrFunctionHandle {
    /// A function's callable value, for binding into a `BoundVar`. Backends
    /// are expected to allocate function and value handles from the same
    /// numbering scheme so a function's own value coincides with its
    /// function handle.
    #[must_use]
    pub fn as_value(self) -> IrValueHandle {
        IrValueHandle(self.0)
    }
}

/// An opaque handle into the lowering backend's IR-module table (one per
/// source module).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct IrModuleHandle(pub u32);

/// A type term that has been materialized into IR. Created once per ground
/// signature and cached in the program scope's `bound_types` table
/// (spec.md §3.3).
#[derive(Clone, Debug)]
pub struct BoundType {
    pub term: Idx,
    pub ir_type: IrTypeHandle,
    pub ir_layout: IrLayoutHandle,
    pub loc: Located,
}

/// A language-level value that has been lowered: a name paired with its
/// [`BoundType`] and IR value handle (spec.md §3.3).
#[derive(Clone, Debug)]
pub struct BoundVar {
    pub name: Atom,
    pub bound_type: BoundType,
    pub ir_value: IrValueHandle,
    /// A process-unique identifier, used as a cache/debug key independent of
    /// name (multiple overloads can share a name).
    pub id: u32,
    pub is_global: bool,
}

impl BoundVar {
    #[must_use]
    pub fn signature(&self, pool: &crate::pool::Pool) -> String {
        crate::output::signature(pool, self.bound_type.term)
    }
}
