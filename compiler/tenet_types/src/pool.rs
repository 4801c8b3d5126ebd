//! The arena that owns every type term for one compilation.
//!
//! Types are stored by value in a flat `Vec` and referenced everywhere else
//! by the `Copy`, 32-bit [`Idx`] handle rather than `Box<Term>` — this is the
//! ownership discipline spec.md's Design Notes recommends for the AST/type
//! DAG, mirroring the teacher's own `Idx`/`Pool` split between an
//! arena-indexed representation and the recursive view used at API
//! boundaries.

use crate::term::{Term, TypeData};
use rustc_hash::FxHashMap;
use std::cell::Cell;
use tenet_ir::{Atom, Located};

/// A `Copy` index into a [`Pool`]. Only meaningful relative to the pool that
/// produced it; comparing indices from different pools is a logic error.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Idx(u32);

impl Idx {
    fn new(i: usize) -> Self {
        Idx(u32::try_from(i).expect("tenet internal error: type pool exceeded u32 capacity"))
    }

    fn get(self) -> usize {
        self.0 as usize
    }
}

/// Owns every [`Term`] created during one compilation, plus the monotonic
/// counter that mints fresh type variables (spec.md §3.2).
pub struct Pool {
    terms: Vec<Term>,
    /// Interned compound terms, so structurally identical terms created at
    /// different sites share one `Idx` (keeps signature caching and
    /// pointer-style equality checks cheap).
    interned: FxHashMap<TypeData, Idx>,
    fresh_var_counter: Cell<u32>,
}

impl Default for Pool {
    fn default() -> Self {
        Pool::new()
    }
}

impl Pool {
    #[must_use]
    pub fn new() -> Self {
        Pool {
            terms: Vec::new(),
            interned: FxHashMap::default(),
            fresh_var_counter: Cell::new(0),
        }
    }

    /// Inserts `data` at `loc`, returning its index. Structurally identical
    /// data (including the Rigid/Generalized kind, since that's part of
    /// `TypeData`) is deduplicated so `Idx` equality can stand in for
    /// structural equality on interned terms.
    pub fn insert(&mut self, data: TypeData, loc: Located) -> Idx {
        if let Some(&idx) = self.interned.get(&data) {
            return idx;
        }
        let idx = Idx::new(self.terms.len());
        self.interned.insert(data.clone(), idx);
        self.terms.push(Term { data, loc });
        idx
    }

    /// Mints a fresh type variable, never reused, named `t{n}`.
    pub fn fresh_var(&mut self, loc: Located) -> Idx {
        let n = self.fresh_var_counter.get();
        self.fresh_var_counter.set(n + 1);
        let name = tenet_ir::intern(&format!("t{n}"));
        self.insert(TypeData::Variable(name), loc)
    }

    #[must_use]
    pub fn get(&self, idx: Idx) -> &Term {
        &self.terms[idx.get()]
    }

    #[must_use]
    pub fn data(&self, idx: Idx) -> &TypeData {
        &self.terms[idx.get()].data
    }

    #[must_use]
    pub fn loc(&self, idx: Idx) -> &Located {
        &self.terms[idx.get()].loc
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn intern_id(&mut self, name: Atom, loc: Located) -> Idx {
        self.insert(TypeData::Id(name), loc)
    }
}
