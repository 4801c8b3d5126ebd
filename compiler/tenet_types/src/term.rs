//! The type-term grammar (spec.md §3.2) and its pure operations: `ftv`,
//! `rebind`, `eval`, predicates, and canonicalizing smart constructors.

use crate::pool::{Idx, Pool};
use rustc_hash::{FxHashMap, FxHashSet};
use tenet_ir::{Atom, Located};

/// One named field inside a [`TypeData::Struct`] or [`TypeData::Args`].
/// Position in the owning `Vec<Field>` doubles as the `name_index` spec.md
/// §3.2 describes: `fields[i].name` maps name → position `i`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Field {
    pub name: Atom,
    pub ty: Idx,
}

/// The type-term grammar. Every compound variant holds `Idx` children rather
/// than `Box<Term>`, so this is `Copy`-friendly and cheap to hash for the
/// [`Pool`]'s interning table.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum TypeData {
    Id(Atom),
    Variable(Atom),
    Operator(Idx, Idx),
    Lambda(Atom, Idx),
    Struct { fields: Vec<Field>, managed: bool },
    Args { fields: Vec<Field> },
    Ref(Idx),
    Ptr(Idx),
    Managed(Idx),
    Maybe(Idx),
    Sum(Vec<Idx>),
    Function { ctx: Idx, args: Idx, ret: Idx },
    Module(Idx),
    TypeInfo,
    Extern {
        inner: Idx,
        underlying: Idx,
        finalize_fn: Option<Atom>,
        mark_fn: Option<Atom>,
    },
}

/// A source-located type term, as stored in the [`Pool`].
#[derive(Clone, Debug)]
pub struct Term {
    pub data: TypeData,
    pub loc: Located,
}

/// A substitution from type-variable name to the term it's bound to.
pub type Subst = FxHashMap<Atom, Idx>;

/// Free type variables mentioned in `idx`, as an (order-preserving within one
/// call, deduplicated) set.
#[must_use]
pub fn ftv(pool: &Pool, idx: Idx) -> FxHashSet<Atom> {
    let mut out = FxHashSet::default();
    ftv_into(pool, idx, &mut out);
    out
}

fn ftv_into(pool: &Pool, idx: Idx, out: &mut FxHashSet<Atom>) {
    match pool.data(idx).clone() {
        TypeData::Variable(name) => {
            out.insert(name);
        }
        TypeData::Id(_) | TypeData::TypeInfo => {}
        TypeData::Operator(f, x) => {
            ftv_into(pool, f, out);
            ftv_into(pool, x, out);
        }
        TypeData::Lambda(param, body) => {
            ftv_into(pool, body, out);
            out.remove(&param);
        }
        TypeData::Struct { fields, .. } | TypeData::Args { fields } => {
            for field in fields {
                ftv_into(pool, field.ty, out);
            }
        }
        TypeData::Ref(t) | TypeData::Ptr(t) | TypeData::Managed(t) | TypeData::Maybe(t) | TypeData::Module(t) => {
            ftv_into(pool, t, out);
        }
        TypeData::Sum(opts) => {
            for o in opts {
                ftv_into(pool, o, out);
            }
        }
        TypeData::Function { ctx, args, ret } => {
            ftv_into(pool, ctx, out);
            ftv_into(pool, args, out);
            ftv_into(pool, ret, out);
        }
        TypeData::Extern { inner, underlying, .. } => {
            ftv_into(pool, inner, out);
            ftv_into(pool, underlying, out);
        }
    }
}

/// Number of free `Variable` nodes. A type is ground iff this is zero.
#[must_use]
pub fn ftv_count(pool: &Pool, idx: Idx) -> usize {
    ftv(pool, idx).len()
}

#[must_use]
pub fn is_ground(pool: &Pool, idx: Idx) -> bool {
    ftv_count(pool, idx) == 0
}

/// Capture-avoiding substitution. Returns `idx` unchanged (same `Idx`, no new
/// allocation) when `subst` is empty, per spec.md §4.2.
pub fn rebind(pool: &mut Pool, idx: Idx, subst: &Subst) -> Idx {
    if subst.is_empty() {
        return idx;
    }
    let loc = pool.loc(idx).clone();
    match pool.data(idx).clone() {
        TypeData::Variable(name) => subst.get(&name).copied().unwrap_or(idx),
        TypeData::Id(_) | TypeData::TypeInfo => idx,
        TypeData::Operator(f, x) => {
            let f2 = rebind(pool, f, subst);
            let x2 = rebind(pool, x, subst);
            pool.insert(TypeData::Operator(f2, x2), loc)
        }
        TypeData::Lambda(param, body) => {
            // `param` is removed from the substitution before recursing so a
            // substitution for an outer variable of the same name cannot
            // capture the bound one.
            let mut inner = subst.clone();
            inner.remove(&param);
            let body2 = rebind(pool, body, &inner);
            pool.insert(TypeData::Lambda(param, body2), loc)
        }
        TypeData::Struct { fields, managed } => {
            let fields = rebind_fields(pool, &fields, subst);
            pool.insert(TypeData::Struct { fields, managed }, loc)
        }
        TypeData::Args { fields } => {
            let fields = rebind_fields(pool, &fields, subst);
            pool.insert(TypeData::Args { fields }, loc)
        }
        TypeData::Ref(t) => {
            let t2 = rebind(pool, t, subst);
            pool.insert(TypeData::Ref(t2), loc)
        }
        TypeData::Ptr(t) => {
            let t2 = rebind(pool, t, subst);
            pool.insert(TypeData::Ptr(t2), loc)
        }
        TypeData::Managed(t) => {
            let t2 = rebind(pool, t, subst);
            pool.insert(TypeData::Managed(t2), loc)
        }
        TypeData::Maybe(t) => {
            let t2 = rebind(pool, t, subst);
            mk_maybe(pool, t2, loc)
        }
        TypeData::Module(t) => {
            let t2 = rebind(pool, t, subst);
            pool.insert(TypeData::Module(t2), loc)
        }
        TypeData::Sum(opts) => {
            let opts2: Vec<Idx> = opts.into_iter().map(|o| rebind(pool, o, subst)).collect();
            mk_sum(pool, opts2, loc)
        }
        TypeData::Function { ctx, args, ret } => {
            let ctx2 = rebind(pool, ctx, subst);
            let args2 = rebind(pool, args, subst);
            let ret2 = rebind(pool, ret, subst);
            pool.insert(
                TypeData::Function {
                    ctx: ctx2,
                    args: args2,
                    ret: ret2,
                },
                loc,
            )
        }
        TypeData::Extern {
            inner,
            underlying,
            finalize_fn,
            mark_fn,
        } => {
            let inner2 = rebind(pool, inner, subst);
            let underlying2 = rebind(pool, underlying, subst);
            pool.insert(
                TypeData::Extern {
                    inner: inner2,
                    underlying: underlying2,
                    finalize_fn,
                    mark_fn,
                },
                loc,
            )
        }
    }
}

fn rebind_fields(pool: &mut Pool, fields: &[Field], subst: &Subst) -> Vec<Field> {
    fields
        .iter()
        .map(|f| Field {
            name: f.name,
            ty: rebind(pool, f.ty, subst),
        })
        .collect()
}

/// One step of alias expansion / β-reduction. `env` maps a type name to its
/// (possibly parameterized) expansion term. Returns `None` when no expansion
/// applies (spec.md §4.2's `eval(t, env) → t' | ⊥`).
pub fn eval(pool: &mut Pool, idx: Idx, env: &FxHashMap<Atom, Idx>) -> Option<Idx> {
    match pool.data(idx).clone() {
        TypeData::Id(name) => env.get(&name).copied(),
        TypeData::Operator(f, x) => {
            if let TypeData::Lambda(param, body) = pool.data(f).clone() {
                let mut subst = Subst::default();
                subst.insert(param, x);
                Some(rebind(pool, body, &subst))
            } else {
                None
            }
        }
        _ => None,
    }
}

#[must_use]
pub fn is_void(pool: &Pool, idx: Idx) -> bool {
    matches!(pool.data(idx), TypeData::Id(name) if name.text() == "void")
}

#[must_use]
pub fn is_null(pool: &Pool, idx: Idx) -> bool {
    matches!(pool.data(idx), TypeData::Id(name) if name.text() == "null")
}

#[must_use]
pub fn is_ref(pool: &Pool, idx: Idx) -> bool {
    matches!(pool.data(idx), TypeData::Ref(_))
}

#[must_use]
pub fn is_function(pool: &Pool, idx: Idx) -> bool {
    matches!(pool.data(idx), TypeData::Function { .. })
}

#[must_use]
pub fn is_maybe(pool: &Pool, idx: Idx) -> bool {
    matches!(pool.data(idx), TypeData::Maybe(_))
}

#[must_use]
pub fn is_ptr(pool: &Pool, idx: Idx) -> bool {
    matches!(pool.data(idx), TypeData::Ptr(_))
}

#[must_use]
pub fn is_managed_ptr(pool: &Pool, idx: Idx) -> bool {
    matches!(pool.data(idx), TypeData::Ptr(inner) if matches!(pool.data(*inner), TypeData::Managed(_)))
}

const INT_NAMES: &[(&str, u32, bool)] = &[
    ("int8", 8, true),
    ("int16", 16, true),
    ("int32", 32, true),
    ("int64", 64, true),
    ("uint8", 8, false),
    ("uint16", 16, false),
    ("uint32", 32, false),
    ("uint64", 64, false),
];

/// Width and signedness of a primitive integer name, if `idx` is one.
/// Integer types are modeled as `Id(name)` per spec.md §3.2; the naming
/// convention (`int{width}`/`uint{width}`) is resolved here rather than by a
/// dedicated variant.
#[must_use]
pub fn int_width_signed(pool: &Pool, idx: Idx) -> Option<(u32, bool)> {
    let TypeData::Id(name) = pool.data(idx) else {
        return None;
    };
    let text = name.text();
    INT_NAMES
        .iter()
        .find(|(n, _, _)| *n == text)
        .map(|(_, w, s)| (*w, *s))
}

#[must_use]
pub fn is_integer(pool: &Pool, idx: Idx) -> bool {
    int_width_signed(pool, idx).is_some()
}

/// `Maybe(Maybe(t)) → Maybe(t)`, `Maybe(null) → null`.
pub fn mk_maybe(pool: &mut Pool, inner: Idx, loc: Located) -> Idx {
    if is_null(pool, inner) {
        return inner;
    }
    if let TypeData::Maybe(_) = pool.data(inner) {
        return inner;
    }
    pool.insert(TypeData::Maybe(inner), loc)
}

/// `Sum({t}) → t`; construction deduplicates options by signature.
pub fn mk_sum(pool: &mut Pool, options: Vec<Idx>, loc: Located) -> Idx {
    let mut seen = FxHashSet::default();
    let mut deduped = Vec::with_capacity(options.len());
    for opt in options {
        let sig = crate::output::signature(pool, opt);
        if seen.insert(sig) {
            deduped.push(opt);
        }
    }
    if deduped.len() == 1 {
        return deduped[0];
    }
    pool.insert(TypeData::Sum(deduped), loc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenet_ir::{Located, SourceFile, Span};

    fn loc() -> Located {
        Located::new(SourceFile::new("test.tn"), Span::new(1, 1))
    }

    #[test]
    fn ground_type_has_no_free_variables() {
        let mut pool = Pool::new();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        assert!(is_ground(&pool, int_ty));
    }

    #[test]
    fn variable_is_its_own_free_variable() {
        let mut pool = Pool::new();
        let v = pool.insert(TypeData::Variable(tenet_ir::intern("a")), loc());
        assert_eq!(ftv_count(&pool, v), 1);
        assert!(!is_ground(&pool, v));
    }

    #[test]
    fn rebind_replaces_free_variables() {
        let mut pool = Pool::new();
        let a = tenet_ir::intern("a");
        let v = pool.insert(TypeData::Variable(a), loc());
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let mut subst = Subst::default();
        subst.insert(a, int_ty);
        let result = rebind(&mut pool, v, &subst);
        assert_eq!(result, int_ty);
    }

    #[test]
    fn rebind_does_not_capture_under_lambda() {
        let mut pool = Pool::new();
        let a = tenet_ir::intern("a");
        let v = pool.insert(TypeData::Variable(a), loc());
        let lambda = pool.insert(TypeData::Lambda(a, v), loc());
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let mut subst = Subst::default();
        subst.insert(a, int_ty);
        let result = rebind(&mut pool, lambda, &subst);
        let TypeData::Lambda(_, body) = pool.data(result).clone() else {
            panic!("expected Lambda");
        };
        // `a` is bound by the lambda, so the substitution must not reach its body.
        assert_eq!(body, v);
    }

    #[test]
    fn maybe_of_maybe_canonicalizes() {
        let mut pool = Pool::new();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let m1 = mk_maybe(&mut pool, int_ty, loc());
        let m2 = mk_maybe(&mut pool, m1, loc());
        assert_eq!(m1, m2);
    }

    #[test]
    fn maybe_of_null_is_null() {
        let mut pool = Pool::new();
        let null_ty = pool.intern_id(tenet_ir::intern("null"), loc());
        let m = mk_maybe(&mut pool, null_ty, loc());
        assert_eq!(m, null_ty);
    }

    #[test]
    fn sum_of_one_option_is_that_option() {
        let mut pool = Pool::new();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let sum = mk_sum(&mut pool, vec![int_ty], loc());
        assert_eq!(sum, int_ty);
    }

    #[test]
    fn sum_deduplicates_by_signature() {
        let mut pool = Pool::new();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let int_ty_again = pool.intern_id(tenet_ir::intern("int32"), loc());
        let sum = mk_sum(&mut pool, vec![int_ty, int_ty_again], loc());
        assert_eq!(sum, int_ty);
    }

    #[test]
    fn integer_width_and_signedness_are_recognized() {
        let mut pool = Pool::new();
        let i32_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let u8_ty = pool.intern_id(tenet_ir::intern("uint8"), loc());
        assert_eq!(int_width_signed(&pool, i32_ty), Some((32, true)));
        assert_eq!(int_width_signed(&pool, u8_ty), Some((8, false)));
    }
}
