//! The type checker / resolver (spec.md §4.7): `resolve_statement`,
//! `resolve_expression`, and `resolve_condition`, driven by a single
//! [`Checker`] over one compilation's type pool, diagnostics, life tracking,
//! and lowering backend. Checking and lowering interleave — every
//! `resolve_*` call both produces a [`BoundVar`]/[`BoundType`] and emits the
//! IR for it through `self.lowerer`.

pub mod expr;
pub mod orchestration;
pub mod scope_guards;
pub mod stmt;
pub mod type_expr;

#[cfg(test)]
mod tests;

use tenet_arc::life::Life;
use tenet_diagnostic::{Diagnostic, DiagnosticQueue, TypeErrorKind};
use tenet_ir::Located;
use tenet_types::bound::IrFunctionHandle;
use tenet_types::{BoundVar, Idx, Pool};

use crate::lower::Lowerer;
use crate::scope::ScopeRef;
use crate::unchecked::UncheckedVar;

/// Mutable state threaded through every `resolve_*` call. `ScopeRef`s are
/// passed explicitly to each call rather than held here, since scopes nest
/// per AST node while a `Checker` is reused across an entire module.
pub struct Checker<'a, L: Lowerer> {
    pub pool: &'a mut Pool,
    pub lowerer: &'a mut L,
    pub diagnostics: &'a mut DiagnosticQueue,
    pub life: &'a mut Life,
    next_var_id: u32,
    /// The IR function currently being lowered, set for the duration of
    /// `check_function_body` — every `resolve_*` call that needs to open a
    /// new basic block (ternaries, short-circuit `and`/`or`, loops) reads it.
    pub current_function: Option<IrFunctionHandle>,
    /// The GC strategy string stamped onto every emitted function (spec.md
    /// §4.9, SPEC_FULL §4 supplement — `CompileOptions::gc_strategy` in
    /// `tenetc`, `"tenet-gc"` by default).
    pub gc_strategy: String,
}

impl<'a, L: Lowerer> Checker<'a, L> {
    pub fn new(pool: &'a mut Pool, lowerer: &'a mut L, diagnostics: &'a mut DiagnosticQueue, life: &'a mut Life, gc_strategy: impl Into<String>) -> Self {
        Checker {
            pool,
            lowerer,
            diagnostics,
            life,
            next_var_id: 0,
            current_function: None,
            gc_strategy: gc_strategy.into(),
        }
    }

    /// A process-unique id for a freshly-lowered `BoundVar`, independent of
    /// its IR value handle (several `BoundVar`s with distinct overloads can
    /// share one name).
    pub fn fresh_var_id(&mut self) -> u32 {
        let id = self.next_var_id;
        self.next_var_id += 1;
        id
    }

    /// Unifies `a` and `b`, turning a failed unification into a
    /// `TypeErrorKind::UnificationFailure` diagnostic. On success, returns
    /// the substitution produced (the pool itself holds no substitution
    /// state; callers `rebind` with it as needed).
    pub fn unify_or_error(
        &mut self,
        env: &rustc_hash::FxHashMap<tenet_ir::Atom, Idx>,
        a: Idx,
        b: Idx,
        at: &Located,
    ) -> Result<tenet_types::term::Subst, Diagnostic> {
        let outcome = tenet_types::unify(self.pool, env, a, b, tenet_types::term::Subst::default());
        if outcome.ok {
            return Ok(outcome.bindings);
        }
        let reason = outcome
            .reasons
            .iter()
            .map(|r| r.describe(self.pool))
            .collect::<Vec<_>>()
            .join("; ");
        Err(Diagnostic::error(
            TypeErrorKind::UnificationFailure {
                lhs: tenet_types::signature(self.pool, a),
                rhs: tenet_types::signature(self.pool, b),
                reason,
            },
            at.clone(),
        ))
    }

    /// Instantiates `callee` at `callee_type` under `substitution`, or reuses
    /// a prior instantiation with a signature-equal monotype (spec.md §4.8).
    /// This mirrors `crate::instantiate::instantiate_generic`'s algorithm
    /// exactly but is inlined rather than calling it: that function's
    /// `check_under_scope` callback takes `&mut Pool`, but checking a
    /// generic callee's body needs the whole `Checker` (lowerer,
    /// diagnostics, life) — which `self.pool` is already borrowed out of for
    /// the duration of the call.
    pub fn instantiate_and_check(
        &mut self,
        program: &ScopeRef,
        callee: &UncheckedVar,
        callee_type: Idx,
        substitution: tenet_types::Subst,
        loc: &Located,
    ) -> Result<BoundVar, Diagnostic> {
        let (monotype, key) = crate::instantiate::monomorphic_key(self.pool, callee.fqn, callee_type, &substitution);
        if let Some(existing) = program.get_bound_variable(loc, key, false)? {
            return Ok(existing);
        }

        let restricted = crate::instantiate::restrict_to_user_named(&substitution);
        let gen_scope = ScopeRef::new_generic_substitution(&callee.owning_module, tenet_types::signature(self.pool, monotype), restricted);

        let bound_var = self.check_generic_callee(program, &gen_scope, callee, monotype)?;
        program.put_bound_variable(key, bound_var.clone(), self.pool, loc)?;
        Ok(bound_var)
    }

    /// Dispatches to the right checking path for a generic callee's body
    /// under its freshly-pushed `GenericSubstitutionScope`.
    fn check_generic_callee(
        &mut self,
        program: &ScopeRef,
        gen_scope: &ScopeRef,
        callee: &UncheckedVar,
        monotype: Idx,
    ) -> Result<BoundVar, Diagnostic> {
        match &callee.node {
            crate::unchecked::UncheckedVarNode::Function(f) => self.check_function_body(program, gen_scope, f, monotype),
            crate::unchecked::UncheckedVarNode::Link(l) => self.bind_link_function(program, gen_scope, l, monotype),
            crate::unchecked::UncheckedVarNode::Ctor { variant, owner_type } => {
                self.bind_ctor_function(program, gen_scope, variant, *owner_type, monotype)
            }
        }
    }
}
