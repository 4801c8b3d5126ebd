//! Generic instantiation (spec.md §4.8): specializing a generic function or
//! data constructor to a ground call-site signature, with memoization.

use tenet_diagnostic::Diagnostic;
use tenet_ir::Located;
use tenet_types::{rebind, signature, BoundVar, Idx, Pool, Subst};

use crate::scope::ScopeRef;
use crate::unchecked::UncheckedVar;

/// Filters a unification substitution down to the user-named type variables
/// a generic definition actually abstracts over — internal `_`-prefixed
/// variables (introduced by the checker itself, e.g. for inference) are
/// never bound into a `GenericSubstitutionScope` (spec.md §4.8).
#[must_use]
pub fn restrict_to_user_named(substitution: &Subst) -> Subst {
    substitution
        .iter()
        .filter(|(name, _)| !name.text().starts_with('_'))
        .map(|(&name, &ty)| (name, ty))
        .collect()
}

/// Computes the monomorphic cache key for `callee_type` under `substitution`:
/// the signature string of the rebound, grounded type (spec.md §4.8's
/// "Compute a monomorphic key"). Keying on the signature rather than the
/// unification object's identity means two unifications that produce
/// signature-equal substitutions share one cached `BoundVar`
/// (SPEC_FULL §4 supplement).
#[must_use]
pub fn monomorphic_key(pool: &mut Pool, fqn: tenet_ir::Atom, callee_type: Idx, substitution: &Subst) -> (Idx, tenet_ir::Atom) {
    let monotype = rebind(pool, callee_type, substitution);
    let key = tenet_ir::intern(&format!("{}${}", fqn.text(), signature(pool, monotype)));
    (monotype, key)
}

/// Instantiates `callee` at `callee_type` under `substitution`, or returns
/// the cached `BoundVar` from a prior instantiation with a signature-equal
/// monotype. `check_under_scope` is the checker's entry point for resolving
/// the callee's body inside a freshly-pushed `GenericSubstitutionScope` —
/// passed as a callback to keep this module decoupled from the concrete
/// checker implementation it's invoked from.
pub fn instantiate_generic(
    program: &ScopeRef,
    pool: &mut Pool,
    callee: &UncheckedVar,
    callee_type: Idx,
    substitution: Subst,
    loc: &Located,
    check_under_scope: impl FnOnce(&ScopeRef, &UncheckedVar, Idx, &mut Pool) -> Result<BoundVar, Diagnostic>,
) -> Result<BoundVar, Diagnostic> {
    let (monotype, key) = monomorphic_key(pool, callee.fqn, callee_type, &substitution);

    if let Some(existing) = program.get_bound_variable(loc, key, false)? {
        return Ok(existing);
    }

    let restricted = restrict_to_user_named(&substitution);
    let gen_scope = ScopeRef::new_generic_substitution(
        &callee.owning_module,
        signature(pool, monotype),
        restricted,
    );

    let bound_var = check_under_scope(&gen_scope, callee, monotype, pool)?;
    program.put_bound_variable(key, bound_var.clone(), pool, loc)?;
    Ok(bound_var)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unchecked::UncheckedVarNode;
    use tenet_ir::{ast, SourceFile, Span};
    use tenet_types::bound::{IrLayoutHandle, IrTypeHandle, IrValueHandle};
    use tenet_types::{BoundType, TypeData};

    fn loc() -> Located {
        Located::new(SourceFile::new("t.tn"), Span::new(1, 1))
    }

    fn dummy_fn_decl(name: &str) -> ast::FunctionDecl {
        ast::FunctionDecl {
            name: tenet_ir::intern(name),
            generics: vec![tenet_ir::intern("A")],
            decl: ast::FunctionSig {
                params: Vec::new(),
                return_type: None,
                span: loc(),
            },
            block: ast::Block {
                statements: Vec::new(),
                span: loc(),
            },
            span: loc(),
        }
    }

    fn dummy_var(pool: &mut Pool, name: tenet_ir::Atom, id: u32) -> BoundVar {
        let term = pool.intern_id(tenet_ir::intern("int32"), loc());
        BoundVar {
            name,
            bound_type: BoundType {
                term,
                ir_type: IrTypeHandle(id),
                ir_layout: IrLayoutHandle(id),
                loc: loc(),
            },
            ir_value: IrValueHandle(id),
            id,
            is_global: false,
        }
    }

    #[test]
    fn instantiation_is_idempotent_for_signature_equal_monotypes() {
        let mut pool = Pool::new();
        let program = ScopeRef::new_program();
        let module = ScopeRef::new_module(&program, tenet_ir::intern("app"), tenet_types::bound::IrModuleHandle(0));

        let a = tenet_ir::intern("A");
        let var_ty = pool.insert(TypeData::Variable(a), loc());
        let int_ty = pool.intern_id(tenet_ir::intern("int32"), loc());

        let callee = UncheckedVar {
            fqn: tenet_ir::intern("app.id"),
            node: UncheckedVarNode::Function(dummy_fn_decl("id")),
            owning_module: module.clone(),
            ctor_signature: None,
            native: false,
            type_info: None,
        };

        let mut substitution = Subst::default();
        substitution.insert(a, int_ty);

        let mut call_count = 0;
        let result1 = instantiate_generic(&program, &mut pool, &callee, var_ty, substitution.clone(), &loc(), |_scope, _callee, _monotype, pool| {
            call_count += 1;
            Ok(dummy_var(pool, tenet_ir::intern("app.id$int32"), 1))
        });
        assert!(result1.is_ok());

        // A second unification producing a signature-equal monotype reuses
        // the cached BoundVar without invoking the checker callback again.
        let result2 = instantiate_generic(&program, &mut pool, &callee, var_ty, substitution, &loc(), |_scope, _callee, _monotype, pool| {
            call_count += 1;
            Ok(dummy_var(pool, tenet_ir::intern("app.id$int32"), 2))
        });
        assert!(result2.is_ok());
        assert_eq!(call_count, 1);
    }

    #[test]
    fn internal_variables_are_not_bound_in_the_substitution_scope() {
        let mut pool = Pool::new();
        let x = pool.intern_id(tenet_ir::intern("x"), loc());
        let y = pool.intern_id(tenet_ir::intern("y"), loc());
        let mut substitution = Subst::default();
        substitution.insert(tenet_ir::intern("_tmp"), x);
        substitution.insert(tenet_ir::intern("A"), y);

        let restricted = restrict_to_user_named(&substitution);
        assert!(restricted.contains_key(&tenet_ir::intern("A")));
        assert!(!restricted.contains_key(&tenet_ir::intern("_tmp")));
    }
}
