//! Expression resolution (spec.md §4.7): every [`ast::Expr`] variant resolves
//! to a [`BoundVar`], with IR emitted through `self.lowerer` as it goes.
//!
//! Reading a name bound to a `Ref(T)` (a local variable slot) auto-dereferences
//! in r-value position; [`Checker::resolve_lvalue`] is the l-value counterpart
//! used by assignment, compound assignment, and `&expr`.
//!
//! Protocol hooks — operator overloads (`__plus__`, …), `__getitem__`/
//! `__setitem__`, boxing constructors, vector-literal helpers — dispatch on
//! argument types rather than lexical visibility, so they're looked up
//! program-wide via `ScopeRef::lookup_global_callables`/
//! `lookup_global_unchecked_vars` instead of the lexical-scope-chain lookups
//! `get_callables`/`lookup_unchecked_vars` use for ordinary references.

use tenet_diagnostic::{Diagnostic, ScopeErrorKind, TypeErrorKind};
use tenet_ir::ast::{self, BinOp, Expr, Literal, PrefixOp};
use tenet_ir::{Atom, Located};
use tenet_types::bound::IrValueHandle;
use tenet_types::{term, BoundVar, Idx, TypeData};

use crate::lower::{upsert_bound_type, Lowerer};
use crate::scope::ScopeRef;
use crate::unchecked::UncheckedVar;

use super::Checker;

/// The value-producing half of `resolve_condition` (spec.md §4.7): the value
/// itself, plus scopes refined for the truthy/falsey continuations.
pub struct CondResult {
    pub value: BoundVar,
    pub scope_if_true: Option<ScopeRef>,
    pub scope_if_false: Option<ScopeRef>,
}

impl<'a, L: Lowerer> Checker<'a, L> {
    /// Builds an anonymous, freshly-id'd [`BoundVar`] for a temporary result,
    /// upserting its [`tenet_types::BoundType`] along the way.
    pub fn bind_temp(&mut self, program: &ScopeRef, term: Idx, ir_value: IrValueHandle) -> BoundVar {
        let bound_type = upsert_bound_type(program, self.pool, self.lowerer, term);
        let id = self.fresh_var_id();
        let var = BoundVar {
            name: Atom::EMPTY,
            bound_type,
            ir_value,
            id,
            is_global: false,
        };
        if term::is_managed_ptr(self.pool, term) {
            self.life.track(var.clone());
        }
        var
    }

    /// Resolves `expr` as an r-value: a name bound to `Ref(T)` is auto-loaded.
    pub fn resolve_expression(&mut self, program: &ScopeRef, scope: &ScopeRef, expr: &Expr) -> Result<BoundVar, Diagnostic> {
        tenet_stack::ensure_sufficient_stack(|| self.resolve_expression_inner(program, scope, expr))
    }

    fn resolve_expression_inner(&mut self, program: &ScopeRef, scope: &ScopeRef, expr: &Expr) -> Result<BoundVar, Diagnostic> {
        match expr {
            Expr::Literal(lit, loc) => self.resolve_literal(program, scope, lit, loc),
            Expr::Reference(name, loc) => {
                let var = self.resolve_reference_raw(scope, *name, loc)?;
                self.auto_deref(program, var)
            }
            Expr::Call(callee, args, loc) => self.resolve_call(program, scope, callee, args, loc),
            Expr::Binary(op, lhs, rhs, loc) => self.resolve_binary(program, scope, *op, lhs, rhs, loc),
            Expr::CompoundAssign(op, lhs, rhs, loc) => self.resolve_compound_assign(program, scope, *op, lhs, rhs, loc),
            Expr::Assign(lhs, rhs, loc) => self.resolve_assign(program, scope, lhs, rhs, loc),
            Expr::Ternary(cond, then_e, else_e, loc) => {
                let cond_result = self.resolve_condition(program, scope, cond)?;
                self.resolve_ternary_join(program, scope, &cond_result, then_e, else_e, loc)
            }
            Expr::And(lhs, rhs, loc) => Ok(self.resolve_and_condition(program, scope, lhs, rhs, loc)?.value),
            Expr::Or(lhs, rhs, loc) => Ok(self.resolve_or_condition(program, scope, lhs, rhs, loc)?.value),
            Expr::Dot(base, field, loc) => self.resolve_dot(program, scope, base, *field, loc, false),
            Expr::Index(base, index, loc) => self.resolve_index(program, scope, base, index, loc),
            Expr::Cast(inner, ty, loc) => self.resolve_cast(program, scope, inner, ty, loc),
            Expr::TypeId(inner, loc) => self.resolve_typeid(program, scope, inner, loc),
            Expr::SizeOf(ty, loc) => self.resolve_sizeof(program, scope, ty, loc),
            Expr::Tuple(elems, loc) => self.resolve_tuple(program, scope, elems, loc),
            Expr::ArrayLiteral(elems, loc) => self.resolve_array_literal(program, scope, elems, loc),
            Expr::Prefix(op, inner, loc) => self.resolve_prefix(program, scope, *op, inner, loc),
            Expr::Bang(inner, loc) => self.resolve_bang(program, scope, inner, loc),
        }
    }

    /// Loads through a `Ref(T)` binding; anything else passes through
    /// unchanged (spec.md §3.2's "Writable bindings have type `Ref(T)`;
    /// reading dereferences").
    fn auto_deref(&mut self, program: &ScopeRef, var: BoundVar) -> Result<BoundVar, Diagnostic> {
        if let TypeData::Ref(inner) = self.pool.data(var.bound_type.term).clone() {
            let loaded = self.lowerer.emit_load(var.ir_value);
            Ok(self.bind_temp(program, inner, loaded))
        } else {
            Ok(var)
        }
    }

    /// Resolves `expr` as an l-value: the result's type is always `Ref(T)`.
    /// Used by assignment and `&expr`. `Index` assignment targets bypass this
    /// entirely — `resolve_assign`/`resolve_compound_assign` special-case them
    /// directly, since `__setitem__` needs the right-hand value as a call
    /// argument rather than a store through a returned reference.
    pub fn resolve_lvalue(&mut self, program: &ScopeRef, scope: &ScopeRef, expr: &Expr) -> Result<BoundVar, Diagnostic> {
        match expr {
            Expr::Reference(name, loc) => self.resolve_reference_raw(scope, *name, loc),
            Expr::Dot(base, field, loc) => self.resolve_dot(program, scope, base, *field, loc, true),
            Expr::Index(base, index, loc) => self.resolve_index_ref(program, scope, base, index, loc),
            other => {
                let resolved = self.resolve_expression(program, scope, other)?;
                Err(Diagnostic::error(
                    TypeErrorKind::AssignToNonReference {
                        signature: resolved.signature(self.pool),
                    },
                    other.span().clone(),
                ))
            }
        }
    }

    fn resolve_reference_raw(&mut self, scope: &ScopeRef, name: Atom, loc: &Located) -> Result<BoundVar, Diagnostic> {
        if let Some(var) = scope.get_bound_variable(loc, name, true)? {
            return Ok(var);
        }
        let mut candidates = Vec::new();
        scope.get_callables(name, &mut candidates, true);
        if candidates.len() == 1 {
            return Ok(candidates.remove(0));
        }
        if candidates.len() > 1 {
            return Err(Diagnostic::error(
                ScopeErrorKind::AmbiguousReference {
                    name: name.text().to_owned(),
                    count: candidates.len(),
                },
                loc.clone(),
            ));
        }
        Err(Diagnostic::error(
            ScopeErrorKind::MissingSymbol {
                name: name.text().to_owned(),
            },
            loc.clone(),
        ))
    }

    // -- Literals ----------------------------------------------------------

    pub(crate) fn resolve_literal(&mut self, program: &ScopeRef, scope: &ScopeRef, lit: &Literal, loc: &Located) -> Result<BoundVar, Diagnostic> {
        match lit {
            Literal::Int { value, boxed, .. } => {
                let native_ty = self.pool.intern_id(tenet_ir::intern("int32"), loc.clone());
                let ir_value = self.lowerer.emit_int_const(*value, 32, true);
                let native = self.bind_temp(program, native_ty, ir_value);
                if *boxed {
                    self.box_native_value(program, scope, "int", native, loc)
                } else {
                    Ok(native)
                }
            }
            Literal::Float(value) => {
                let ty = self.pool.intern_id(tenet_ir::intern("float64"), loc.clone());
                let ir_value = self.lowerer.emit_float_const(*value);
                Ok(self.bind_temp(program, ty, ir_value))
            }
            Literal::Str(text) => {
                let ty = self.pool.intern_id(tenet_ir::intern("str"), loc.clone());
                let ir_value = self.lowerer.emit_str_const(text.text());
                Ok(self.bind_temp(program, ty, ir_value))
            }
            Literal::Bool(value) => {
                let ty = self.pool.intern_id(tenet_ir::intern("bool"), loc.clone());
                let ir_value = self.lowerer.emit_bool_const(*value);
                Ok(self.bind_temp(program, ty, ir_value))
            }
            Literal::Null => {
                let ty = self.pool.intern_id(tenet_ir::intern("null"), loc.clone());
                let bound_type = upsert_bound_type(program, self.pool, self.lowerer, ty);
                let ir_value = self.lowerer.emit_null(bound_type.ir_type);
                Ok(self.bind_temp(program, ty, ir_value))
            }
        }
    }

    /// Boxes a native value by calling the ctor named `type_name` registered
    /// for its managed form (`original_source/src/type_checker.cpp`'s integer
    /// literal handling boxes through the normal callsite path rather than a
    /// dedicated box instruction).
    fn box_native_value(&mut self, program: &ScopeRef, scope: &ScopeRef, type_name: &str, native: BoundVar, loc: &Located) -> Result<BoundVar, Diagnostic> {
        let ctor_name = tenet_ir::intern(type_name);
        let candidates = scope.lookup_global_callables(ctor_name);
        let unchecked = scope.lookup_global_unchecked_vars(ctor_name);
        self.resolve_overload(program, scope, ctor_name, &candidates, &unchecked, &[native], loc)
    }

    // -- Call / overload resolution -----------------------------------------

    fn resolve_call(&mut self, program: &ScopeRef, scope: &ScopeRef, callee: &Expr, args: &[Expr], loc: &Located) -> Result<BoundVar, Diagnostic> {
        let mut arg_vars = Vec::with_capacity(args.len());
        for arg in args {
            arg_vars.push(self.resolve_expression(program, scope, arg)?);
        }

        if let Some(dotted) = self.resolve_dotted_callee(scope, callee) {
            return self.resolve_call_via_module(program, &dotted, &arg_vars, loc);
        }

        if let Expr::Reference(name, callee_loc) = callee {
            let mut candidates = Vec::new();
            scope.get_callables(*name, &mut candidates, true);
            let unchecked = scope.lookup_unchecked_vars(*name);
            return self.resolve_overload(program, scope, *name, &candidates, &unchecked, &arg_vars, callee_loc);
        }

        let callee_var = self.resolve_expression(program, scope, callee)?;
        self.emit_direct_call(program, callee_var, &arg_vars, loc)
    }

    /// Recognizes `module.name(...)` callee shapes so module-qualified calls
    /// can be resolved against the referenced module's scope rather than the
    /// caller's (spec.md §4.7's callsite step 2).
    fn resolve_dotted_callee<'e>(&self, scope: &ScopeRef, callee: &'e Expr) -> Option<(Atom, Atom, &'e Located)> {
        let Expr::Dot(base, field, loc) = callee else {
            return None;
        };
        let Expr::Reference(module_name, _) = base.as_ref() else {
            return None;
        };
        scope.lookup_module(*module_name)?;
        Some((*module_name, *field, loc))
    }

    fn resolve_call_via_module(
        &mut self,
        program: &ScopeRef,
        (module_name, field, loc): &(Atom, Atom, &Located),
        arg_vars: &[BoundVar],
        call_loc: &Located,
    ) -> Result<BoundVar, Diagnostic> {
        let module_scope = program.lookup_module(*module_name).ok_or_else(|| {
            Diagnostic::error(
                ScopeErrorKind::ModuleNotFound {
                    name: module_name.text().to_owned(),
                },
                (*loc).clone(),
            )
        })?;
        let mut candidates = Vec::new();
        module_scope.get_callables(*field, &mut candidates, false);
        let fqn = tenet_ir::intern(&format!("{}.{}", module_name.text(), field.text()));
        let unchecked = module_scope.lookup_unchecked_vars(fqn);
        self.resolve_overload(program, &module_scope, *field, &candidates, &unchecked, arg_vars, call_loc)
    }

    /// Overload resolution (spec.md §4.7's callsite step 3): unify each
    /// candidate's `Function` type against `(args) -> 'ret`, keep matches,
    /// and require exactly one.
    pub(crate) fn resolve_overload(
        &mut self,
        program: &ScopeRef,
        scope: &ScopeRef,
        name: Atom,
        bound_candidates: &[BoundVar],
        unchecked_candidates: &[UncheckedVar],
        arg_vars: &[BoundVar],
        loc: &Located,
    ) -> Result<BoundVar, Diagnostic> {
        let env = scope.flattened_type_env();
        let arg_types: Vec<Idx> = arg_vars.iter().map(|v| v.bound_type.term).collect();
        let args_ty = self.make_args_type(&arg_types, loc);
        let ret_var = self.pool.fresh_var(loc.clone());
        let ctx_var = self.pool.fresh_var(loc.clone());
        let wanted = self.pool.insert(TypeData::Function { ctx: ctx_var, args: args_ty, ret: ret_var }, loc.clone());

        let mut bound_matches: Vec<BoundVar> = Vec::new();
        for candidate in bound_candidates {
            let outcome = tenet_types::unify(self.pool, &env, candidate.bound_type.term, wanted, tenet_types::Subst::default());
            if outcome.ok {
                bound_matches.push(candidate.clone());
            }
        }

        let mut generic_matches: Vec<(UncheckedVar, Idx, tenet_types::Subst)> = Vec::new();
        for candidate in unchecked_candidates {
            let Some(sig) = self.callable_signature(scope, candidate) else {
                continue;
            };
            let outcome = tenet_types::unify(self.pool, &env, sig, wanted, tenet_types::Subst::default());
            if outcome.ok {
                generic_matches.push((candidate.clone(), sig, outcome.bindings));
            }
        }

        let total = bound_matches.len() + generic_matches.len();
        if total == 0 {
            return Err(Diagnostic::error(
                TypeErrorKind::NoMatchingOverload {
                    name: name.text().to_owned(),
                    args: arg_types.iter().map(|t| tenet_types::signature(self.pool, *t)).collect::<Vec<_>>().join(", "),
                },
                loc.clone(),
            ));
        }
        if total > 1 {
            return Err(Diagnostic::error(
                TypeErrorKind::AmbiguousOverload {
                    name: name.text().to_owned(),
                    count: total,
                },
                loc.clone(),
            ));
        }

        if let Some(callee) = bound_matches.into_iter().next() {
            return self.emit_direct_call(program, callee, arg_vars, loc);
        }

        let (callee, sig, subst) = generic_matches.into_iter().next().expect("tenet internal error: exactly one match checked above");
        let bound_var = self.instantiate_and_check(program, &callee, sig, subst, loc)?;
        self.emit_direct_call(program, bound_var, arg_vars, loc)
    }

    fn make_args_type(&mut self, arg_types: &[Idx], loc: &Located) -> Idx {
        let fields = arg_types
            .iter()
            .enumerate()
            .map(|(i, &ty)| term::Field {
                name: tenet_ir::intern(&format!("_{i}")),
                ty,
            })
            .collect();
        self.pool.insert(TypeData::Args { fields }, loc.clone())
    }

    fn callable_signature(&mut self, scope: &ScopeRef, candidate: &UncheckedVar) -> Option<Idx> {
        match &candidate.node {
            crate::unchecked::UncheckedVarNode::Function(f) => Some(self.function_sig_type(scope, &f.decl)),
            crate::unchecked::UncheckedVarNode::Link(l) => Some(self.function_sig_type(scope, &l.decl)),
            crate::unchecked::UncheckedVarNode::Ctor { .. } => candidate.ctor_signature,
        }
    }

    pub(crate) fn function_sig_type(&mut self, scope: &ScopeRef, decl: &ast::FunctionSig) -> Idx {
        let fields = decl
            .params
            .iter()
            .map(|p| term::Field {
                name: p.name,
                ty: self.resolve_type_expr(scope, &p.ty),
            })
            .collect();
        let args = self.pool.insert(TypeData::Args { fields }, decl.span.clone());
        let ret = decl
            .return_type
            .as_ref()
            .map_or_else(|| self.pool.intern_id(tenet_ir::intern("void"), decl.span.clone()), |r| self.resolve_type_expr(scope, r));
        let ctx = self.pool.intern_id(tenet_ir::intern("void"), decl.span.clone());
        self.pool.insert(TypeData::Function { ctx, args, ret }, decl.span.clone())
    }

    fn emit_direct_call(&mut self, program: &ScopeRef, callee: BoundVar, arg_vars: &[BoundVar], loc: &Located) -> Result<BoundVar, Diagnostic> {
        let TypeData::Function { ret, .. } = self.pool.data(callee.bound_type.term).clone() else {
            return Err(Diagnostic::error(
                ScopeErrorKind::NotCallable {
                    name: callee.name.text().to_owned(),
                },
                loc.clone(),
            ));
        };
        let arg_values: Vec<IrValueHandle> = arg_vars.iter().map(|v| v.ir_value).collect();
        let result = self.lowerer.emit_call(callee.ir_value, &arg_values);
        Ok(self.bind_temp(program, ret, result))
    }

    // -- Binary / integer operators -----------------------------------------

    fn resolve_binary(&mut self, program: &ScopeRef, scope: &ScopeRef, op: BinOp, lhs: &Expr, rhs: &Expr, loc: &Located) -> Result<BoundVar, Diagnostic> {
        let lhs_var = self.resolve_expression(program, scope, lhs)?;
        let rhs_var = self.resolve_expression(program, scope, rhs)?;

        let lhs_ptr_like = term::is_ptr(self.pool, lhs_var.bound_type.term) || term::is_null(self.pool, lhs_var.bound_type.term);
        let rhs_ptr_like = term::is_ptr(self.pool, rhs_var.bound_type.term) || term::is_null(self.pool, rhs_var.bound_type.term);
        if lhs_ptr_like && rhs_ptr_like && matches!(op, BinOp::Eq | BinOp::Ineq) {
            let bool_ty = self.pool.intern_id(tenet_ir::intern("bool"), loc.clone());
            let ir = self.lowerer.emit_ptr_binop(op, lhs_var.ir_value, rhs_var.ir_value);
            return Ok(self.bind_temp(program, bool_ty, ir));
        }

        self.combine_binop(program, scope, op, lhs_var, rhs_var, loc)
    }

    /// Combines two already-resolved values with `op`: the native-integer
    /// promotion path if both are integers, otherwise the runtime
    /// operator-overload call (spec.md §4.7). Shared between plain binary
    /// expressions and compound-assignment desugaring.
    pub(crate) fn combine_binop(&mut self, program: &ScopeRef, scope: &ScopeRef, op: BinOp, lhs: BoundVar, rhs: BoundVar, loc: &Located) -> Result<BoundVar, Diagnostic> {
        if term::is_integer(self.pool, lhs.bound_type.term) && term::is_integer(self.pool, rhs.bound_type.term) {
            return self.resolve_integer_binop(program, op, lhs, rhs, loc);
        }
        let fn_name = tenet_ir::intern(op.runtime_name());
        let candidates = scope.lookup_global_callables(fn_name);
        let unchecked = scope.lookup_global_unchecked_vars(fn_name);
        self.resolve_overload(program, scope, fn_name, &candidates, &unchecked, &[lhs, rhs], loc)
    }

    /// Integer promotion (spec.md §4.7): both-same-width-and-sign keeps the
    /// common type (min width 32); any mismatch widens to signed, wider of
    /// the two, min width 32.
    fn resolve_integer_binop(&mut self, program: &ScopeRef, op: BinOp, lhs: BoundVar, rhs: BoundVar, loc: &Located) -> Result<BoundVar, Diagnostic> {
        let (lw, ls) = term::int_width_signed(self.pool, lhs.bound_type.term).expect("tenet internal error: checked is_integer above");
        let (rw, rs) = term::int_width_signed(self.pool, rhs.bound_type.term).expect("tenet internal error: checked is_integer above");

        let (result_width, result_signed) = if lw == rw && ls == rs { (lw.max(32), ls) } else { (lw.max(rw).max(32), true) };

        let lhs_val = self.widen_int(lhs.ir_value, lw, result_width, ls);
        let rhs_val = self.widen_int(rhs.ir_value, rw, result_width, rs);

        let is_compare = matches!(op, BinOp::Lt | BinOp::Lte | BinOp::Gt | BinOp::Gte | BinOp::Eq | BinOp::Ineq);
        let ir = self.lowerer.emit_int_binop(op, lhs_val, rhs_val, result_width, result_signed);
        let result_ty = if is_compare {
            self.pool.intern_id(tenet_ir::intern("bool"), loc.clone())
        } else {
            let name = int_type_name(result_width, result_signed);
            self.pool.intern_id(tenet_ir::intern(&name), loc.clone())
        };
        Ok(self.bind_temp(program, result_ty, ir))
    }

    fn widen_int(&mut self, value: IrValueHandle, from_width: u32, to_width: u32, signed: bool) -> IrValueHandle {
        if from_width == to_width {
            value
        } else {
            self.lowerer.emit_int_cast(value, from_width, to_width, signed)
        }
    }

    // -- Assignment ----------------------------------------------------------

    fn resolve_assign(&mut self, program: &ScopeRef, scope: &ScopeRef, lhs: &Expr, rhs: &Expr, loc: &Located) -> Result<BoundVar, Diagnostic> {
        if let Expr::Index(base, index, iloc) = lhs {
            let base_var = self.resolve_expression(program, scope, base)?;
            let index_var = self.resolve_expression(program, scope, index)?;
            let value_var = self.resolve_expression(program, scope, rhs)?;
            return self.store_index(program, scope, base_var, index_var, value_var, iloc);
        }

        let target = self.resolve_lvalue(program, scope, lhs)?;
        let TypeData::Ref(inner) = self.pool.data(target.bound_type.term).clone() else {
            return Err(Diagnostic::error(
                TypeErrorKind::AssignToNonReference {
                    signature: target.signature(self.pool),
                },
                loc.clone(),
            ));
        };
        let value = self.resolve_expression(program, scope, rhs)?;
        let env = scope.flattened_type_env();
        self.unify_or_error(&env, value.bound_type.term, inner, loc)?;
        self.lowerer.emit_store(target.ir_value, value.ir_value);
        Ok(value)
    }

    fn resolve_compound_assign(&mut self, program: &ScopeRef, scope: &ScopeRef, op: BinOp, lhs: &Expr, rhs: &Expr, loc: &Located) -> Result<BoundVar, Diagnostic> {
        // Desugars to `lhs = lhs op rhs` (spec.md §4.7).
        if let Expr::Index(base, index, iloc) = lhs {
            let base_var = self.resolve_expression(program, scope, base)?;
            let index_var = self.resolve_expression(program, scope, index)?;
            let current = self.load_index(program, scope, base_var.clone(), index_var.clone(), iloc)?;
            let rhs_var = self.resolve_expression(program, scope, rhs)?;
            let combined = self.combine_binop(program, scope, op, current, rhs_var, iloc)?;
            return self.store_index(program, scope, base_var, index_var, combined, iloc);
        }

        let target = self.resolve_lvalue(program, scope, lhs)?;
        let TypeData::Ref(inner) = self.pool.data(target.bound_type.term).clone() else {
            return Err(Diagnostic::error(
                TypeErrorKind::AssignToNonReference {
                    signature: target.signature(self.pool),
                },
                loc.clone(),
            ));
        };
        let loaded_ir = self.lowerer.emit_load(target.ir_value);
        let current = self.bind_temp(program, inner, loaded_ir);
        let rhs_var = self.resolve_expression(program, scope, rhs)?;
        let combined = self.combine_binop(program, scope, op, current, rhs_var, loc)?;
        self.lowerer.emit_store(target.ir_value, combined.ir_value);
        Ok(combined)
    }

    // -- Ternary / and / or --------------------------------------------------

    /// Shared condition resolution (spec.md §4.7): every boolean-producing
    /// form builds its two refined scopes the same way; callers differ only in
    /// which arm they ask for when.
    pub fn resolve_condition(&mut self, program: &ScopeRef, scope: &ScopeRef, cond: &Expr) -> Result<CondResult, Diagnostic> {
        match cond {
            Expr::And(lhs, rhs, loc) => self.resolve_and_condition(program, scope, lhs, rhs, loc),
            Expr::Or(lhs, rhs, loc) => self.resolve_or_condition(program, scope, lhs, rhs, loc),
            other => {
                let value = self.resolve_expression(program, scope, other)?;
                if let TypeData::Maybe(inner) = self.pool.data(value.bound_type.term).clone() {
                    return Ok(self.refine_maybe_condition(program, scope, other, value, inner, other.span()));
                }
                Ok(CondResult {
                    value,
                    scope_if_true: None,
                    scope_if_false: None,
                })
            }
        }
    }

    /// A bare `Maybe(T)`-typed condition (`if v { use(v) }`) branches on a
    /// raw null-compare and, when `v` is a plain reference, rebinds it to its
    /// unboxed `T` in the truthy continuation — `Maybe(T)` and `T` share one
    /// materialized representation (`upsert_bound_type`'s `Maybe` arm), so the
    /// rebinding reuses the same IR value rather than unboxing it.
    fn refine_maybe_condition(&mut self, program: &ScopeRef, scope: &ScopeRef, cond_expr: &Expr, value: BoundVar, inner: Idx, loc: &Located) -> CondResult {
        let is_null = self.lowerer.emit_is_null(value.ir_value);
        let true_const = self.lowerer.emit_bool_const(true);
        let truthy = self.lowerer.emit_int_binop(BinOp::Xor, is_null, true_const, 1, false);
        let bool_ty = self.pool.intern_id(tenet_ir::intern("bool"), loc.clone());
        let cond_value = self.bind_temp(program, bool_ty, truthy);

        let scope_if_true = ScopeRef::new_block(scope);
        if let Expr::Reference(name, ref_loc) = cond_expr {
            let mut named = self.bind_temp(program, inner, value.ir_value);
            named.name = *name;
            let _ = scope_if_true.put_bound_variable(*name, named, self.pool, ref_loc);
        }

        CondResult {
            value: cond_value,
            scope_if_true: Some(scope_if_true),
            scope_if_false: Some(ScopeRef::new_block(scope)),
        }
    }

    fn current_fn(&self) -> tenet_types::bound::IrFunctionHandle {
        self.current_function.expect("tenet internal error: short-circuit/ternary evaluated outside a function body")
    }

    /// Short-circuit `and`: evaluates `rhs` only when `lhs` is truthy
    /// (spec.md §4.7), joining the two paths through a real basic block
    /// rather than an unconditional phi, so `rhs`'s side effects only run
    /// when reached.
    fn resolve_and_condition(&mut self, program: &ScopeRef, scope: &ScopeRef, lhs: &Expr, rhs: &Expr, loc: &Located) -> Result<CondResult, Diagnostic> {
        let lhs_cond = self.resolve_condition(program, scope, lhs)?;

        let function = self.current_fn();
        let rhs_block = self.lowerer.new_block(function, "and.rhs");
        let false_block = self.lowerer.new_block(function, "and.false");
        let join_block = self.lowerer.new_block(function, "and.join");
        self.lowerer.emit_branch(lhs_cond.value.ir_value, rhs_block, false_block);

        self.lowerer.set_insert_block(rhs_block);
        let truthy_scope = lhs_cond.scope_if_true.clone().unwrap_or_else(|| ScopeRef::new_block(scope));
        let rhs_cond = self.resolve_condition(program, &truthy_scope, rhs)?;
        self.lowerer.emit_jump(join_block);

        self.lowerer.set_insert_block(false_block);
        let false_const = self.lowerer.emit_bool_const(false);
        self.lowerer.emit_jump(join_block);

        self.lowerer.set_insert_block(join_block);
        let bool_ty = self.pool.intern_id(tenet_ir::intern("bool"), loc.clone());
        let bool_ir_ty = upsert_bound_type(program, self.pool, self.lowerer, bool_ty).ir_type;
        let phi = self.lowerer.emit_phi(bool_ir_ty, &[(rhs_cond.value.ir_value, rhs_block), (false_const, false_block)]);
        let value = self.bind_temp(program, bool_ty, phi);
        Ok(CondResult {
            value,
            scope_if_true: rhs_cond.scope_if_true,
            scope_if_false: None,
        })
    }

    /// Short-circuit `or`: evaluates `rhs` only when `lhs` is falsey.
    fn resolve_or_condition(&mut self, program: &ScopeRef, scope: &ScopeRef, lhs: &Expr, rhs: &Expr, loc: &Located) -> Result<CondResult, Diagnostic> {
        let lhs_cond = self.resolve_condition(program, scope, lhs)?;

        let function = self.current_fn();
        let true_block = self.lowerer.new_block(function, "or.true");
        let rhs_block = self.lowerer.new_block(function, "or.rhs");
        let join_block = self.lowerer.new_block(function, "or.join");
        self.lowerer.emit_branch(lhs_cond.value.ir_value, true_block, rhs_block);

        self.lowerer.set_insert_block(true_block);
        let true_const = self.lowerer.emit_bool_const(true);
        self.lowerer.emit_jump(join_block);

        self.lowerer.set_insert_block(rhs_block);
        let falsey_scope = lhs_cond.scope_if_false.clone().unwrap_or_else(|| ScopeRef::new_block(scope));
        let rhs_cond = self.resolve_condition(program, &falsey_scope, rhs)?;
        self.lowerer.emit_jump(join_block);

        self.lowerer.set_insert_block(join_block);
        let bool_ty = self.pool.intern_id(tenet_ir::intern("bool"), loc.clone());
        let bool_ir_ty = upsert_bound_type(program, self.pool, self.lowerer, bool_ty).ir_type;
        let phi = self.lowerer.emit_phi(bool_ir_ty, &[(true_const, true_block), (rhs_cond.value.ir_value, rhs_block)]);
        let value = self.bind_temp(program, bool_ty, phi);
        Ok(CondResult {
            value,
            scope_if_true: None,
            scope_if_false: rhs_cond.scope_if_false,
        })
    }

    fn resolve_ternary_join(&mut self, program: &ScopeRef, scope: &ScopeRef, cond: &CondResult, then_e: &Expr, else_e: &Expr, loc: &Located) -> Result<BoundVar, Diagnostic> {
        let function = self.current_fn();
        let then_block = self.lowerer.new_block(function, "ternary.then");
        let else_block = self.lowerer.new_block(function, "ternary.else");
        let join_block = self.lowerer.new_block(function, "ternary.join");
        self.lowerer.emit_branch(cond.value.ir_value, then_block, else_block);

        let then_scope = cond.scope_if_true.clone().unwrap_or_else(|| ScopeRef::new_block(scope));
        let else_scope = cond.scope_if_false.clone().unwrap_or_else(|| ScopeRef::new_block(scope));

        self.lowerer.set_insert_block(then_block);
        let then_var = self.resolve_expression(program, &then_scope, then_e)?;
        self.lowerer.emit_jump(join_block);

        self.lowerer.set_insert_block(else_block);
        let else_var = self.resolve_expression(program, &else_scope, else_e)?;
        self.lowerer.emit_jump(join_block);

        self.lowerer.set_insert_block(join_block);
        let env = then_scope.flattened_type_env();
        let _ = self.unify_or_error(&env, then_var.bound_type.term, else_var.bound_type.term, loc);
        let joined_ty = term::mk_sum(self.pool, vec![then_var.bound_type.term, else_var.bound_type.term], loc.clone());
        let joined_bound = upsert_bound_type(program, self.pool, self.lowerer, joined_ty);
        let phi = self.lowerer.emit_phi(joined_bound.ir_type, &[(then_var.ir_value, then_block), (else_var.ir_value, else_block)]);
        Ok(self.bind_temp(program, joined_ty, phi))
    }

    // -- Dot / index ----------------------------------------------------------

    fn resolve_dot(&mut self, program: &ScopeRef, scope: &ScopeRef, base: &Expr, field: Atom, loc: &Located, as_lvalue: bool) -> Result<BoundVar, Diagnostic> {
        if let Expr::Reference(name, _) = base {
            if let Some(module_scope) = scope.lookup_module(*name) {
                let fqn = tenet_ir::intern(&format!("{}.{}", name.text(), field.text()));
                if let Some(var) = module_scope.get_bound_variable(loc, fqn, false)? {
                    return Ok(var);
                }
                let mut candidates = Vec::new();
                module_scope.get_callables(field, &mut candidates, false);
                if let Some(var) = candidates.into_iter().next() {
                    return Ok(var);
                }
                return Err(Diagnostic::error(
                    ScopeErrorKind::MissingSymbol { name: fqn.text().to_owned() },
                    loc.clone(),
                ));
            }
        }

        let base_var = self.resolve_expression(program, scope, base)?;
        let Some((struct_ty, managed)) = peel_to_struct(self.pool, base_var.bound_type.term) else {
            return Err(Diagnostic::error(
                TypeErrorKind::NoSuchField {
                    name: base_var.signature(self.pool),
                    field: field.text().to_owned(),
                },
                loc.clone(),
            ));
        };
        let TypeData::Struct { fields, .. } = self.pool.data(struct_ty).clone() else {
            unreachable!("tenet internal error: peel_to_struct returned a non-struct")
        };
        let Some(index) = fields.iter().position(|f| f.name == field) else {
            return Err(Diagnostic::error(
                TypeErrorKind::NoSuchField {
                    name: base_var.signature(self.pool),
                    field: field.text().to_owned(),
                },
                loc.clone(),
            ));
        };
        let field_ty = fields[index].ty;
        let gep = self
            .lowerer
            .emit_gep(base_var.ir_value, u32::try_from(index).expect("tenet internal error: field index overflow"), managed);
        if as_lvalue {
            let ref_ty = self.pool.insert(TypeData::Ref(field_ty), loc.clone());
            Ok(self.bind_temp(program, ref_ty, gep))
        } else {
            let loaded = self.lowerer.emit_load(gep);
            Ok(self.bind_temp(program, field_ty, loaded))
        }
    }

    fn resolve_index(&mut self, program: &ScopeRef, scope: &ScopeRef, base: &Expr, index: &Expr, loc: &Located) -> Result<BoundVar, Diagnostic> {
        let base_var = self.resolve_expression(program, scope, base)?;
        let index_var = self.resolve_expression(program, scope, index)?;
        self.load_index(program, scope, base_var, index_var, loc)
    }

    /// Shared r-value indexing: a native `Ptr` reads through
    /// `emit_index_gep`; anything else dispatches to `__getitem__`.
    fn load_index(&mut self, program: &ScopeRef, scope: &ScopeRef, base_var: BoundVar, index_var: BoundVar, loc: &Located) -> Result<BoundVar, Diagnostic> {
        if let TypeData::Ptr(inner) = self.pool.data(base_var.bound_type.term).clone() {
            let elem_ptr = self.lowerer.emit_index_gep(base_var.ir_value, index_var.ir_value);
            let loaded = self.lowerer.emit_load(elem_ptr);
            return Ok(self.bind_temp(program, inner, loaded));
        }
        let fn_name = tenet_ir::intern("__getitem__");
        let candidates = scope.lookup_global_callables(fn_name);
        let unchecked = scope.lookup_global_unchecked_vars(fn_name);
        self.resolve_overload(program, scope, fn_name, &candidates, &unchecked, &[base_var, index_var], loc)
    }

    /// Shared indexed store, used by `a[i] = v` and `a[i] += v`: a native
    /// `Ptr` stores through `emit_index_gep`; anything else dispatches to
    /// `__setitem__` with the value as a third call argument.
    fn store_index(&mut self, program: &ScopeRef, scope: &ScopeRef, base_var: BoundVar, index_var: BoundVar, value_var: BoundVar, loc: &Located) -> Result<BoundVar, Diagnostic> {
        if let TypeData::Ptr(inner) = self.pool.data(base_var.bound_type.term).clone() {
            let env = scope.flattened_type_env();
            self.unify_or_error(&env, value_var.bound_type.term, inner, loc)?;
            let elem_ptr = self.lowerer.emit_index_gep(base_var.ir_value, index_var.ir_value);
            self.lowerer.emit_store(elem_ptr, value_var.ir_value);
            return Ok(value_var);
        }
        let fn_name = tenet_ir::intern("__setitem__");
        let candidates = scope.lookup_global_callables(fn_name);
        let unchecked = scope.lookup_global_unchecked_vars(fn_name);
        self.resolve_overload(program, scope, fn_name, &candidates, &unchecked, &[base_var, index_var, value_var], loc)
    }

    /// `&container[i]` is only meaningful when `container` is a native
    /// pointer — a `__getitem__`/`__setitem__`-backed container has no
    /// addressable storage to take a reference to.
    fn resolve_index_ref(&mut self, program: &ScopeRef, scope: &ScopeRef, base: &Expr, index: &Expr, loc: &Located) -> Result<BoundVar, Diagnostic> {
        let base_var = self.resolve_expression(program, scope, base)?;
        let TypeData::Ptr(inner) = self.pool.data(base_var.bound_type.term).clone() else {
            return Err(Diagnostic::error(
                TypeErrorKind::AssignToNonReference {
                    signature: base_var.signature(self.pool),
                },
                loc.clone(),
            ));
        };
        let index_var = self.resolve_expression(program, scope, index)?;
        let elem_ptr = self.lowerer.emit_index_gep(base_var.ir_value, index_var.ir_value);
        let ref_ty = self.pool.insert(TypeData::Ref(inner), loc.clone());
        Ok(self.bind_temp(program, ref_ty, elem_ptr))
    }

    // -- Cast / typeid / sizeof ------------------------------------------------

    fn resolve_cast(&mut self, program: &ScopeRef, scope: &ScopeRef, inner: &Expr, ty: &ast::TypeExpr, loc: &Located) -> Result<BoundVar, Diagnostic> {
        let value = self.resolve_expression(program, scope, inner)?;
        let target_ty = self.resolve_type_expr(scope, ty);
        if !tenet_types::is_ground(self.pool, target_ty) {
            return Err(Diagnostic::error(
                TypeErrorKind::InvalidCast {
                    from: value.signature(self.pool),
                    to: tenet_types::signature(self.pool, target_ty),
                },
                loc.clone(),
            ));
        }

        let from_int = term::int_width_signed(self.pool, value.bound_type.term);
        let to_int = term::int_width_signed(self.pool, target_ty);
        let from_ptr = term::is_ptr(self.pool, value.bound_type.term);
        let to_ptr = term::is_ptr(self.pool, target_ty);

        let ir_value = match (from_int, to_int, from_ptr, to_ptr) {
            (Some((fw, fs)), Some((tw, _)), _, _) => self.lowerer.emit_int_cast(value.ir_value, fw, tw, fs),
            (_, _, true, true) => {
                let bound = upsert_bound_type(program, self.pool, self.lowerer, target_ty);
                self.lowerer.emit_ptr_cast(value.ir_value, bound.ir_type)
            }
            _ => {
                return Err(Diagnostic::error(
                    TypeErrorKind::InvalidCast {
                        from: value.signature(self.pool),
                        to: tenet_types::signature(self.pool, target_ty),
                    },
                    loc.clone(),
                ));
            }
        };
        Ok(self.bind_temp(program, target_ty, ir_value))
    }

    fn resolve_typeid(&mut self, program: &ScopeRef, scope: &ScopeRef, inner: &Expr, loc: &Located) -> Result<BoundVar, Diagnostic> {
        let value = self.resolve_expression(program, scope, inner)?;
        let int_ty = self.pool.intern_id(tenet_ir::intern("int32"), loc.clone());
        let ir_value = if term::is_managed_ptr(self.pool, value.bound_type.term) {
            self.lowerer.emit_typeid_call(value.ir_value)
        } else {
            let interned = tenet_ir::intern(&value.signature(self.pool));
            self.lowerer.emit_int_const(i128::from(interned.as_u32()), 32, false)
        };
        Ok(self.bind_temp(program, int_ty, ir_value))
    }

    fn resolve_sizeof(&mut self, program: &ScopeRef, scope: &ScopeRef, ty: &ast::TypeExpr, loc: &Located) -> Result<BoundVar, Diagnostic> {
        let target = self.resolve_type_expr(scope, ty);
        let bound = upsert_bound_type(program, self.pool, self.lowerer, target);
        let size_ty = self.pool.intern_id(tenet_ir::intern("uint64"), loc.clone());
        let ir_value = self.lowerer.emit_sizeof_const(bound.ir_type);
        Ok(self.bind_temp(program, size_ty, ir_value))
    }

    // -- Tuple / array literal --------------------------------------------------

    fn resolve_tuple(&mut self, program: &ScopeRef, scope: &ScopeRef, elems: &[Expr], loc: &Located) -> Result<BoundVar, Diagnostic> {
        let mut vars = Vec::with_capacity(elems.len());
        for e in elems {
            vars.push(self.resolve_expression(program, scope, e)?);
        }
        let fields = vars
            .iter()
            .enumerate()
            .map(|(i, v)| term::Field {
                name: tenet_ir::intern(&format!("_{i}")),
                ty: v.bound_type.term,
            })
            .collect();
        let tuple_ty = self.pool.insert(TypeData::Struct { fields, managed: false }, loc.clone());
        let bound = upsert_bound_type(program, self.pool, self.lowerer, tuple_ty);
        let slot = self.lowerer.emit_alloca(bound.ir_type);
        for (i, v) in vars.iter().enumerate() {
            let field_ptr = self.lowerer.emit_gep(slot, u32::try_from(i).expect("tenet internal error: tuple arity overflow"), false);
            self.lowerer.emit_store(field_ptr, v.ir_value);
        }
        let loaded = self.lowerer.emit_load(slot);
        Ok(self.bind_temp(program, tuple_ty, loaded))
    }

    fn resolve_array_literal(&mut self, program: &ScopeRef, scope: &ScopeRef, elems: &[Expr], loc: &Located) -> Result<BoundVar, Diagnostic> {
        let mut vars = Vec::with_capacity(elems.len());
        for e in elems {
            vars.push(self.resolve_expression(program, scope, e)?);
        }
        for v in &vars {
            if !term::is_managed_ptr(self.pool, v.bound_type.term) {
                return Err(Diagnostic::error(
                    TypeErrorKind::UnificationFailure {
                        lhs: v.signature(self.pool),
                        rhs: "managed".to_owned(),
                        reason: "array literal elements must be managed".to_owned(),
                    },
                    loc.clone(),
                ));
            }
        }

        let init_fn_name = tenet_ir::intern("__init_vector__");
        let init_candidates = scope.lookup_global_callables(init_fn_name);
        let init_unchecked = scope.lookup_global_unchecked_vars(init_fn_name);
        let size_ty = self.pool.intern_id(tenet_ir::intern("uint64"), loc.clone());
        let size_ir = self.lowerer.emit_int_const(i128::try_from(vars.len()).expect("tenet internal error: array literal size overflow"), 64, false);
        let size_var = self.bind_temp(program, size_ty, size_ir);
        let vector_var = self.resolve_overload(program, scope, init_fn_name, &init_candidates, &init_unchecked, std::slice::from_ref(&size_var), loc)?;

        let append_fn_name = tenet_ir::intern("__vector_unsafe_append__");
        let append_candidates = scope.lookup_global_callables(append_fn_name);
        let append_unchecked = scope.lookup_global_unchecked_vars(append_fn_name);
        for element in vars {
            self.resolve_overload(program, scope, append_fn_name, &append_candidates, &append_unchecked, &[vector_var.clone(), element], loc)?;
        }
        Ok(vector_var)
    }

    // -- Prefix / bang ----------------------------------------------------------

    fn resolve_prefix(&mut self, program: &ScopeRef, scope: &ScopeRef, op: PrefixOp, inner: &Expr, loc: &Located) -> Result<BoundVar, Diagnostic> {
        match op {
            PrefixOp::AddressOf => self.resolve_lvalue(program, scope, inner),
            PrefixOp::Not => {
                let value = self.resolve_expression(program, scope, inner)?;
                if term::is_ptr(self.pool, value.bound_type.term) || term::is_null(self.pool, value.bound_type.term) {
                    let bool_ty = self.pool.intern_id(tenet_ir::intern("bool"), loc.clone());
                    let ir_value = self.lowerer.emit_is_null(value.ir_value);
                    return Ok(self.bind_temp(program, bool_ty, ir_value));
                }
                self.resolve_unary_protocol(program, scope, "__not__", value, loc)
            }
            PrefixOp::Negative => {
                let value = self.resolve_expression(program, scope, inner)?;
                self.resolve_unary_protocol(program, scope, "__negative__", value, loc)
            }
            PrefixOp::Positive => {
                let value = self.resolve_expression(program, scope, inner)?;
                self.resolve_unary_protocol(program, scope, "__positive__", value, loc)
            }
        }
    }

    fn resolve_unary_protocol(&mut self, program: &ScopeRef, scope: &ScopeRef, name: &str, value: BoundVar, loc: &Located) -> Result<BoundVar, Diagnostic> {
        let fn_name = tenet_ir::intern(name);
        let candidates = scope.lookup_global_callables(fn_name);
        let unchecked = scope.lookup_global_unchecked_vars(fn_name);
        self.resolve_overload(program, scope, fn_name, &candidates, &unchecked, &[value], loc)
    }

    fn resolve_bang(&mut self, program: &ScopeRef, scope: &ScopeRef, inner: &Expr, loc: &Located) -> Result<BoundVar, Diagnostic> {
        let value = self.resolve_expression(program, scope, inner)?;
        let TypeData::Maybe(just) = self.pool.data(value.bound_type.term).clone() else {
            return Err(Diagnostic::error(
                TypeErrorKind::UncheckedMaybe {
                    signature: value.signature(self.pool),
                },
                loc.clone(),
            ));
        };
        Ok(self.bind_temp(program, just, value.ir_value))
    }
}

/// Peels `Ptr(Managed(Struct))`/`Struct` down to the underlying `Struct` term,
/// reporting whether a managed-header offset is needed for field GEPs
/// (spec.md §4.9's managed-header layout).
pub(crate) fn peel_to_struct(pool: &tenet_types::Pool, ty: Idx) -> Option<(Idx, bool)> {
    match pool.data(ty).clone() {
        TypeData::Struct { .. } => Some((ty, false)),
        TypeData::Ptr(inner) => match pool.data(inner).clone() {
            TypeData::Managed(managed_inner) => match pool.data(managed_inner).clone() {
                TypeData::Struct { .. } => Some((managed_inner, true)),
                _ => None,
            },
            TypeData::Struct { .. } => Some((inner, false)),
            _ => None,
        },
        _ => None,
    }
}

fn int_type_name(width: u32, signed: bool) -> String {
    format!("{}{width}", if signed { "int" } else { "uint" })
}
