//! Robinson-style unification over the type-term grammar (spec.md §4.3).
//!
//! Unlike the teacher's link-based union-find engine, this operates directly
//! on an explicit substitution map (`bindings`): spec.md describes
//! `unify(a, b, env, bindings) -> {result, bindings, reasons}` as producing a
//! substitution, not a union-find forest, and the checker relies on being
//! able to apply that substitution with [`crate::term::rebind`] independent
//! of any unify-internal state.

pub mod error;

use crate::pool::{Idx, Pool};
use crate::term::{self, Subst, TypeData};
use error::UnifyReason;
use rustc_hash::FxHashMap;
use tenet_ir::Atom;

/// The result of one `unify` call: either `bindings` was extended to make
/// `a` and `b` equal, or `reasons` explains why not.
#[derive(Debug, Clone)]
pub struct UnifyOutcome {
    pub ok: bool,
    pub bindings: Subst,
    pub reasons: Vec<UnifyReason>,
}

impl UnifyOutcome {
    fn success(bindings: Subst) -> Self {
        UnifyOutcome {
            ok: true,
            bindings,
            reasons: Vec::new(),
        }
    }

    fn failure(bindings: Subst, reason: UnifyReason) -> Self {
        UnifyOutcome {
            ok: false,
            bindings,
            reasons: vec![reason],
        }
    }
}

/// Resolves `idx` through `bindings` until it's no longer a bound variable
/// (possibly returning `idx` itself if unbound or non-variable).
fn resolve(pool: &Pool, bindings: &Subst, idx: Idx) -> Idx {
    let mut current = idx;
    loop {
        match pool.data(current) {
            TypeData::Variable(name) => match bindings.get(name) {
                Some(&next) if next != current => current = next,
                _ => return current,
            },
            _ => return current,
        }
    }
}

/// Attempts to unify `a` and `b` under the type-alias environment `env`,
/// starting from `bindings`. Total and confluent: every call terminates and
/// produces the same outcome regardless of argument order for structurally
/// symmetric rules.
pub fn unify(
    pool: &mut Pool,
    env: &FxHashMap<Atom, Idx>,
    a: Idx,
    b: Idx,
    bindings: Subst,
) -> UnifyOutcome {
    let a = resolve(pool, &bindings, a);
    let b = resolve(pool, &bindings, b);

    if a == b {
        return UnifyOutcome::success(bindings);
    }

    match (pool.data(a).clone(), pool.data(b).clone()) {
        (TypeData::Variable(v), _) => bind_var(pool, v, a, b, bindings),
        (_, TypeData::Variable(v)) => bind_var(pool, v, b, a, bindings),

        (TypeData::Id(n1), TypeData::Id(n2)) => {
            if n1 == n2 {
                return UnifyOutcome::success(bindings);
            }
            if let Some(expanded) = term::eval(pool, a, env) {
                return unify(pool, env, expanded, b, bindings);
            }
            if let Some(expanded) = term::eval(pool, b, env) {
                return unify(pool, env, a, expanded, bindings);
            }
            UnifyOutcome::failure(bindings, UnifyReason::Mismatch { lhs: a, rhs: b })
        }

        (TypeData::Operator(f1, x1), TypeData::Operator(f2, x2)) => {
            let step1 = unify(pool, env, f1, f2, bindings);
            if !step1.ok {
                return step1;
            }
            unify(pool, env, x1, x2, step1.bindings)
        }

        (TypeData::Struct { fields: f1, .. }, TypeData::Struct { fields: f2, .. }) => {
            unify_fields(pool, env, &f1, &f2, a, b, bindings)
        }
        (TypeData::Args { fields: f1 }, TypeData::Args { fields: f2 }) => {
            unify_fields(pool, env, &f1, &f2, a, b, bindings)
        }

        (TypeData::Ref(i1), TypeData::Ref(i2)) => unify(pool, env, i1, i2, bindings),
        (TypeData::Ref(i1), _) => unify(pool, env, i1, b, bindings),
        (_, TypeData::Ref(i2)) => unify(pool, env, a, i2, bindings),

        (TypeData::Ptr(i1), TypeData::Ptr(i2)) => unify(pool, env, i1, i2, bindings),
        (TypeData::Managed(i1), TypeData::Managed(i2)) => unify(pool, env, i1, i2, bindings),

        (TypeData::Maybe(i1), TypeData::Maybe(i2)) => unify(pool, env, i1, i2, bindings),
        (TypeData::Maybe(_), TypeData::Id(n)) if n.text() == "null" => UnifyOutcome::success(bindings),
        (TypeData::Id(n), TypeData::Maybe(_)) if n.text() == "null" => UnifyOutcome::success(bindings),
        (TypeData::Maybe(i1), _) => {
            let lifted = unify(pool, env, i1, b, bindings.clone());
            if lifted.ok {
                lifted
            } else {
                unify(pool, env, i1, b, bindings)
            }
        }
        (_, TypeData::Maybe(i2)) => unify(pool, env, a, i2, bindings),

        (TypeData::Sum(opts), _) if !matches!(pool.data(b), TypeData::Sum(_)) => {
            unify_sum_against_single(pool, env, a, &opts, b, bindings)
        }
        (_, TypeData::Sum(opts)) if !matches!(pool.data(a), TypeData::Sum(_)) => {
            unify_sum_against_single(pool, env, b, &opts, a, bindings)
        }
        (TypeData::Sum(o1), TypeData::Sum(o2)) => unify_sum_subset(pool, env, a, &o1, b, &o2, bindings),

        (
            TypeData::Function {
                ctx: c1,
                args: ar1,
                ret: r1,
            },
            TypeData::Function {
                ctx: c2,
                args: ar2,
                ret: r2,
            },
        ) => {
            let step1 = unify(pool, env, c1, c2, bindings);
            if !step1.ok {
                return step1;
            }
            let step2 = unify(pool, env, ar1, ar2, step1.bindings);
            if !step2.ok {
                return step2;
            }
            unify(pool, env, r1, r2, step2.bindings)
        }

        (TypeData::Module(i1), TypeData::Module(i2)) => unify(pool, env, i1, i2, bindings),
        (TypeData::TypeInfo, TypeData::TypeInfo) => UnifyOutcome::success(bindings),

        (
            TypeData::Extern { inner: i1, .. },
            TypeData::Extern { inner: i2, .. },
        ) => unify(pool, env, i1, i2, bindings),

        _ => UnifyOutcome::failure(bindings, UnifyReason::Mismatch { lhs: a, rhs: b }),
    }
}

fn bind_var(pool: &mut Pool, v: Atom, var_idx: Idx, target: Idx, mut bindings: Subst) -> UnifyOutcome {
    let target_ftv = term::ftv(pool, target);
    if target_ftv.contains(&v) {
        return UnifyOutcome::failure(
            bindings,
            UnifyReason::OccursCheck {
                var: v,
                in_term: target,
            },
        );
    }
    let _ = var_idx;
    bindings.insert(v, target);
    UnifyOutcome::success(bindings)
}

fn unify_fields(
    pool: &mut Pool,
    env: &FxHashMap<Atom, Idx>,
    f1: &[crate::term::Field],
    f2: &[crate::term::Field],
    a: Idx,
    b: Idx,
    bindings: Subst,
) -> UnifyOutcome {
    if f1.len() != f2.len() {
        return UnifyOutcome::failure(bindings, UnifyReason::ArityMismatch { lhs: a, rhs: b });
    }
    let mut current = bindings;
    for (x, y) in f1.iter().zip(f2.iter()) {
        let step = unify(pool, env, x.ty, y.ty, current);
        if !step.ok {
            return step;
        }
        current = step.bindings;
    }
    UnifyOutcome::success(current)
}

/// `Sum(opts)` vs a non-sum `single`: succeeds when every option in `opts`
/// unifies with `single` (spec.md §4.3's first disjunct).
fn unify_sum_against_single(
    pool: &mut Pool,
    env: &FxHashMap<Atom, Idx>,
    sum: Idx,
    opts: &[Idx],
    single: Idx,
    bindings: Subst,
) -> UnifyOutcome {
    let mut current = bindings;
    for &opt in opts {
        let step = unify(pool, env, opt, single, current);
        if !step.ok {
            return UnifyOutcome::failure(step.bindings, UnifyReason::Mismatch { lhs: sum, rhs: single });
        }
        current = step.bindings;
    }
    UnifyOutcome::success(current)
}

/// `Sum(o1)` vs `Sum(o2)`: succeeds when `o2` is a subset of `o1` (every
/// option in `o2` unifies with some option in `o1`), the one-way subtype
/// direction spec.md §4.3 describes.
fn unify_sum_subset(
    pool: &mut Pool,
    env: &FxHashMap<Atom, Idx>,
    lhs: Idx,
    o1: &[Idx],
    rhs: Idx,
    o2: &[Idx],
    bindings: Subst,
) -> UnifyOutcome {
    let mut current = bindings;
    for &right_opt in o2 {
        let mut matched = false;
        for &left_opt in o1 {
            let attempt = unify(pool, env, left_opt, right_opt, current.clone());
            if attempt.ok {
                current = attempt.bindings;
                matched = true;
                break;
            }
        }
        if !matched {
            return UnifyOutcome::failure(current, UnifyReason::SumSubset { lhs, rhs });
        }
    }
    UnifyOutcome::success(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Field;
    use tenet_ir::{Located, SourceFile, Span};

    fn loc() -> Located {
        Located::new(SourceFile::new("test.tn"), Span::new(1, 1))
    }

    fn env() -> FxHashMap<Atom, Idx> {
        FxHashMap::default()
    }

    #[test]
    fn identical_ids_unify_with_no_bindings() {
        let mut pool = Pool::new();
        let a = pool.intern_id(tenet_ir::intern("int32"), loc());
        let b = pool.intern_id(tenet_ir::intern("int32"), loc());
        let outcome = unify(&mut pool, &env(), a, b, Subst::default());
        assert!(outcome.ok);
        assert!(outcome.bindings.is_empty());
    }

    #[test]
    fn distinct_ids_fail() {
        let mut pool = Pool::new();
        let a = pool.intern_id(tenet_ir::intern("int32"), loc());
        let b = pool.intern_id(tenet_ir::intern("bool"), loc());
        let outcome = unify(&mut pool, &env(), a, b, Subst::default());
        assert!(!outcome.ok);
    }

    #[test]
    fn variable_binds_to_concrete_type() {
        let mut pool = Pool::new();
        let var_name = tenet_ir::intern("a");
        let v = pool.insert(TypeData::Variable(var_name), loc());
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let outcome = unify(&mut pool, &env(), v, int_ty, Subst::default());
        assert!(outcome.ok);
        assert_eq!(outcome.bindings.get(&var_name), Some(&int_ty));
    }

    #[test]
    fn occurs_check_rejects_self_reference() {
        let mut pool = Pool::new();
        let var_name = tenet_ir::intern("a");
        let v = pool.insert(TypeData::Variable(var_name), loc());
        let wrapped = pool.insert(TypeData::Ptr(v), loc());
        let outcome = unify(&mut pool, &env(), v, wrapped, Subst::default());
        assert!(!outcome.ok);
    }

    #[test]
    fn unification_is_sound() {
        let mut pool = Pool::new();
        let var_name = tenet_ir::intern("a");
        let v = pool.insert(TypeData::Variable(var_name), loc());
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let outcome = unify(&mut pool, &env(), v, int_ty, Subst::default());
        assert!(outcome.ok);
        let a_bound = term::rebind(&mut pool, v, &outcome.bindings);
        let b_bound = term::rebind(&mut pool, int_ty, &outcome.bindings);
        assert_eq!(
            crate::output::signature(&pool, a_bound),
            crate::output::signature(&pool, b_bound)
        );
    }

    #[test]
    fn bindings_are_idempotent_on_success() {
        let mut pool = Pool::new();
        let var_name = tenet_ir::intern("a");
        let v = pool.insert(TypeData::Variable(var_name), loc());
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let outcome = unify(&mut pool, &env(), v, int_ty, Subst::default());
        let once = term::rebind(&mut pool, v, &outcome.bindings);
        let twice = term::rebind(&mut pool, once, &outcome.bindings);
        assert_eq!(once, twice);
    }

    #[test]
    fn struct_fields_unify_pointwise() {
        let mut pool = Pool::new();
        let var_name = tenet_ir::intern("a");
        let v = pool.insert(TypeData::Variable(var_name), loc());
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let s1 = pool.insert(
            TypeData::Struct {
                fields: vec![Field {
                    name: tenet_ir::intern("x"),
                    ty: v,
                }],
                managed: false,
            },
            loc(),
        );
        let s2 = pool.insert(
            TypeData::Struct {
                fields: vec![Field {
                    name: tenet_ir::intern("x"),
                    ty: int_ty,
                }],
                managed: false,
            },
            loc(),
        );
        let outcome = unify(&mut pool, &env(), s1, s2, Subst::default());
        assert!(outcome.ok);
        assert_eq!(outcome.bindings.get(&var_name), Some(&int_ty));
    }

    #[test]
    fn maybe_unifies_with_null() {
        let mut pool = Pool::new();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let null_ty = pool.intern_id(tenet_ir::intern("null"), loc());
        let maybe_ty = term::mk_maybe(&mut pool, int_ty, loc());
        let outcome = unify(&mut pool, &env(), maybe_ty, null_ty, Subst::default());
        assert!(outcome.ok);
    }

    #[test]
    fn maybe_unifies_lifted_with_inner_type() {
        let mut pool = Pool::new();
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());
        let maybe_ty = term::mk_maybe(&mut pool, int_ty, loc());
        let outcome = unify(&mut pool, &env(), maybe_ty, int_ty, Subst::default());
        assert!(outcome.ok);
    }
}
