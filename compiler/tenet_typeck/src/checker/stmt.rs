//! Statement resolution (spec.md §4.7/§4.9): every [`ast::Stmt`] variant
//! resolves and lowers in place, returning whether control already left
//! through an early `return`/`break`/`continue` (`Ok(true)`) so the
//! life-frame guards in [`super::scope_guards`] know to skip their own
//! release call.

use tenet_diagnostic::{ControlFlowErrorKind, Diagnostic, TypeErrorKind};
use tenet_ir::ast::{self, BinOp, Literal, Pattern, Stmt};
use tenet_ir::{Atom, Located};
use tenet_types::{term, BoundVar, TypeData};

use crate::lower::{upsert_bound_type, Lowerer};
use crate::scope::ScopeRef;

use super::expr::peel_to_struct;
use super::Checker;

impl<'a, L: Lowerer> Checker<'a, L> {
    /// Resolves `block` under a fresh `Block` scope/life frame.
    pub fn resolve_block(&mut self, program: &ScopeRef, parent: &ScopeRef, block: &ast::Block) -> Result<bool, Diagnostic> {
        self.with_block_scope(parent, |this, scope| this.resolve_block_body(program, scope, &block.statements))
    }

    /// Walks a statement list in a loop rather than recursing, so a `var`
    /// declaration can rebind the scope used by everything that follows it
    /// without nesting a new stack frame per statement.
    pub fn resolve_block_body(&mut self, program: &ScopeRef, scope: &ScopeRef, statements: &[Stmt]) -> Result<bool, Diagnostic> {
        let mut current_scope = scope.clone();
        let mut iter = statements.iter().peekable();
        while let Some(stmt) = iter.next() {
            if let Stmt::VarDecl(decl) = stmt {
                current_scope = self.resolve_var_decl(program, &current_scope, decl)?;
                continue;
            }
            let scope_for_stmt = current_scope.clone();
            let returned = self.with_statement_life(|this| this.resolve_statement_inner(program, &scope_for_stmt, stmt))?;
            if returned {
                if let Some(next) = iter.peek() {
                    self.diagnostics.push(Diagnostic::warning(ControlFlowErrorKind::UnreachableStatement, next.span().clone()));
                }
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn resolve_statement_inner(&mut self, program: &ScopeRef, scope: &ScopeRef, stmt: &Stmt) -> Result<bool, Diagnostic> {
        tenet_stack::ensure_sufficient_stack(|| match stmt {
            Stmt::VarDecl(_) => unreachable!("tenet internal error: VarDecl is handled by resolve_block_body directly"),
            Stmt::Expr(expr, _) => {
                self.resolve_expression(program, scope, expr)?;
                Ok(false)
            }
            Stmt::Return(value, loc) => self.resolve_return(program, scope, value.as_ref(), loc),
            Stmt::If { cond, then_block, elif_arms, else_block, span } => {
                self.resolve_if(program, scope, cond, then_block, elif_arms, else_block.as_ref(), span)
            }
            Stmt::While { cond, body, span } => self.resolve_while(program, scope, cond, body, span),
            Stmt::For { binding, iterable, body, span } => self.resolve_for(program, scope, *binding, iterable, body, span),
            Stmt::Break(loc) => self.resolve_break(scope, loc),
            Stmt::Continue(loc) => self.resolve_continue(scope, loc),
            Stmt::Match { scrutinee, arms, else_block, span } => self.resolve_match_stmt(program, scope, scrutinee, arms, else_block.as_ref(), span),
            Stmt::Assert(expr, loc) => self.resolve_assert(program, scope, expr, loc),
            Stmt::Block(block) => self.resolve_block(program, scope, block),
        })
    }

    // -- var decl -------------------------------------------------------------

    /// Resolves a `var`/`let` declaration and returns the child scope
    /// subsequent statements in the same block must use (spec.md §4.7: "new
    /// scope for all code that follows").
    ///
    /// The initializer is evaluated under its own `Statement` life frame so
    /// any transient sub-temporaries it produces (nested call args, …) are
    /// released immediately — except the initializer's own result, which is
    /// adopted by the new slot rather than released with the frame
    /// (`release_frame_except`), then re-tracked into the enclosing frame.
    fn resolve_var_decl(&mut self, program: &ScopeRef, scope: &ScopeRef, decl: &ast::VarDecl) -> Result<ScopeRef, Diagnostic> {
        let frame = self.life.push(tenet_arc::life::FrameKind::Statement);
        let initializer = match &decl.initializer {
            Some(expr) => Some(self.resolve_expression(program, scope, expr)?),
            None => None,
        };

        let declared_ty = decl.ty.as_ref().map(|t| self.resolve_type_expr(scope, t));
        let value_term = match (declared_ty, &initializer) {
            (Some(declared), Some(init)) => {
                let env = scope.flattened_type_env();
                self.unify_or_error(&env, init.bound_type.term, declared, &decl.span)?;
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(init)) => init.bound_type.term,
            (None, None) => {
                self.life.pop();
                return Err(Diagnostic::error(
                    TypeErrorKind::MissingInitializer {
                        name: decl.name.text().to_owned(),
                        signature: "<unknown>".to_owned(),
                    },
                    decl.span.clone(),
                ));
            }
        };

        let ir_value = match &initializer {
            Some(init) => init.ir_value,
            None => self.default_initial_value(program, scope, value_term, decl)?,
        };

        if let Some(init) = &initializer {
            self.release_frame_except(frame, init.id);
        } else {
            tenet_arc::release::release_vars(self.life, frame, self.lowerer);
        }
        self.life.pop();

        let kept = if term::is_managed_ptr(self.pool, value_term) {
            let mut var = self.bind_temp(program, value_term, ir_value);
            var.name = decl.name;
            var
        } else {
            self.bind_temp(program, value_term, ir_value)
        };

        let needs_slot = decl.mutable || term::is_managed_ptr(self.pool, value_term);
        let (final_term, final_ir) = if needs_slot {
            let bound = upsert_bound_type(program, self.pool, self.lowerer, value_term);
            let slot = self.lowerer.emit_alloca(bound.ir_type);
            self.lowerer.emit_store(slot, kept.ir_value);
            (self.pool.insert(TypeData::Ref(value_term), decl.span.clone()), slot)
        } else {
            (value_term, kept.ir_value)
        };

        let id = self.fresh_var_id();
        let bound_type = upsert_bound_type(program, self.pool, self.lowerer, final_term);
        let var = BoundVar {
            name: decl.name,
            bound_type,
            ir_value: final_ir,
            id,
            is_global: false,
        };

        let child_scope = ScopeRef::new_block(scope);
        child_scope.put_bound_variable(decl.name, var, self.pool, &decl.span)?;
        Ok(child_scope)
    }

    /// A declared-but-uninitialized `var`'s starting value (spec.md §4.7):
    /// `Maybe(T)` starts `null`; anything else with a registered `__init__`
    /// overload for its exact type is default-constructed through it;
    /// managed types with neither are an error; native primitives zero-init.
    fn default_initial_value(&mut self, program: &ScopeRef, scope: &ScopeRef, ty: tenet_types::Idx, decl: &ast::VarDecl) -> Result<tenet_types::bound::IrValueHandle, Diagnostic> {
        if term::is_maybe(self.pool, ty) {
            let bound = upsert_bound_type(program, self.pool, self.lowerer, ty);
            return Ok(self.lowerer.emit_null(bound.ir_type));
        }

        let init_name = tenet_ir::intern("__init__");
        let target_sig = tenet_types::signature(self.pool, ty);
        for candidate in scope.lookup_global_callables(init_name) {
            let TypeData::Function { ret, .. } = self.pool.data(candidate.bound_type.term).clone() else {
                continue;
            };
            if tenet_types::signature(self.pool, ret) == target_sig {
                let called = self.lowerer.emit_call(candidate.ir_value, &[]);
                return Ok(called);
            }
        }

        if term::is_managed_ptr(self.pool, ty) {
            return Err(Diagnostic::error(
                TypeErrorKind::MissingInitializer {
                    name: decl.name.text().to_owned(),
                    signature: target_sig,
                },
                decl.span.clone(),
            ));
        }

        let bound = upsert_bound_type(program, self.pool, self.lowerer, ty);
        Ok(self.lowerer.emit_null(bound.ir_type))
    }

    // -- return -----------------------------------------------------------------

    fn resolve_return(&mut self, program: &ScopeRef, scope: &ScopeRef, value: Option<&ast::Expr>, loc: &Located) -> Result<bool, Diagnostic> {
        let rt = scope.return_type_constraint().unwrap_or_else(|| self.pool.intern_id(tenet_ir::intern("void"), loc.clone()));

        let resolved = match value {
            Some(expr) => Some(self.resolve_expression(program, scope, expr)?),
            None => None,
        };

        let ir_value = match &resolved {
            Some(var) => {
                let env = scope.flattened_type_env();
                self.unify_or_error(&env, var.bound_type.term, rt, loc)?;
                Some(var.ir_value)
            }
            None => {
                if !term::is_void(self.pool, rt) {
                    return Err(Diagnostic::error(
                        TypeErrorKind::UnificationFailure {
                            lhs: "void".to_owned(),
                            rhs: tenet_types::signature(self.pool, rt),
                            reason: "bare 'return' in a non-void function".to_owned(),
                        },
                        loc.clone(),
                    ));
                }
                None
            }
        };

        let function_frame = self.life.enclosing_function().expect("tenet internal error: 'return' resolved outside a function body");
        tenet_arc::release::release_vars(self.life, function_frame, self.lowerer);
        self.lowerer.emit_return(ir_value);
        Ok(true)
    }

    // -- if / elif / else ---------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn resolve_if(
        &mut self,
        program: &ScopeRef,
        scope: &ScopeRef,
        cond: &ast::Expr,
        then_block: &ast::Block,
        elif_arms: &[(ast::Expr, ast::Block)],
        else_block: Option<&ast::Block>,
        span: &Located,
    ) -> Result<bool, Diagnostic> {
        let function = self.current_function.expect("tenet internal error: 'if' resolved outside a function body");
        let end_bb = self.lowerer.new_block(function, "if.end");
        let result = self.resolve_if_chain(program, scope, cond, then_block, elif_arms, else_block, end_bb, span)?;
        self.lowerer.set_insert_block(end_bb);
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_if_chain(
        &mut self,
        program: &ScopeRef,
        scope: &ScopeRef,
        cond: &ast::Expr,
        then_block: &ast::Block,
        elif_arms: &[(ast::Expr, ast::Block)],
        else_block: Option<&ast::Block>,
        end_bb: tenet_types::bound::IrBlockHandle,
        span: &Located,
    ) -> Result<bool, Diagnostic> {
        let cond_result = self.resolve_condition(program, scope, cond)?;
        let function = self.current_function.expect("tenet internal error: 'if' resolved outside a function body");
        let then_bb = self.lowerer.new_block(function, "if.then");
        let else_bb = self.lowerer.new_block(function, "if.else");
        self.lowerer.emit_branch(cond_result.value.ir_value, then_bb, else_bb);

        self.lowerer.set_insert_block(then_bb);
        let then_scope = cond_result.scope_if_true.unwrap_or_else(|| ScopeRef::new_block(scope));
        let then_returned = self.resolve_block(program, &then_scope, then_block)?;
        if !then_returned {
            self.lowerer.emit_jump(end_bb);
        }

        self.lowerer.set_insert_block(else_bb);
        let else_scope = cond_result.scope_if_false.unwrap_or_else(|| ScopeRef::new_block(scope));
        let else_returned = if let Some((first, rest)) = elif_arms.split_first() {
            self.resolve_if_chain(program, &else_scope, &first.0, &first.1, rest, else_block, end_bb, span)?
        } else if let Some(block) = else_block {
            let returned = self.resolve_block(program, &else_scope, block)?;
            if !returned {
                self.lowerer.emit_jump(end_bb);
            }
            returned
        } else {
            self.lowerer.emit_jump(end_bb);
            false
        };

        Ok(then_returned && else_returned)
    }

    // -- while ----------------------------------------------------------------

    fn resolve_while(&mut self, program: &ScopeRef, scope: &ScopeRef, cond: &ast::Expr, body: &ast::Block, _span: &Located) -> Result<bool, Diagnostic> {
        let function = self.current_function.expect("tenet internal error: 'while' resolved outside a function body");
        let header_bb = self.lowerer.new_block(function, "while.header");
        let body_bb = self.lowerer.new_block(function, "while.body");
        let end_bb = self.lowerer.new_block(function, "while.end");

        self.lowerer.emit_jump(header_bb);
        self.lowerer.set_insert_block(header_bb);
        let cond_result = self.with_statement_life(|this| {
            let c = this.resolve_condition(program, scope, cond)?;
            this.lowerer.emit_branch(c.value.ir_value, body_bb, end_bb);
            Ok(false)
        });
        cond_result?;

        self.lowerer.set_insert_block(body_bb);
        self.with_loop_scope(scope, header_bb, end_bb, |this, loop_scope| {
            let returned = this.resolve_block(program, loop_scope, body)?;
            if !returned {
                this.lowerer.emit_jump(header_bb);
            }
            Ok(returned)
        })?;

        self.lowerer.set_insert_block(end_bb);
        Ok(false)
    }

    // -- for --------------------------------------------------------------------

    fn resolve_for(&mut self, program: &ScopeRef, scope: &ScopeRef, binding: Atom, iterable: &ast::Expr, body: &ast::Block, _span: &Located) -> Result<bool, Diagnostic> {
        let loc = iterable.span();
        let iter_scope = ScopeRef::new_block(scope);
        let iterable_var = self.resolve_expression(program, &iter_scope, iterable)?;

        let begin_var = self.call_protocol(program, &iter_scope, "__iter_begin__", &[iterable_var.clone()], loc)?;
        let slot_bound = upsert_bound_type(program, self.pool, self.lowerer, begin_var.bound_type.term);
        let slot = self.lowerer.emit_alloca(slot_bound.ir_type);
        self.lowerer.emit_store(slot, begin_var.ir_value);

        let function = self.current_function.expect("tenet internal error: 'for' resolved outside a function body");
        let header_bb = self.lowerer.new_block(function, "for.header");
        let body_bb = self.lowerer.new_block(function, "for.body");
        let end_bb = self.lowerer.new_block(function, "for.end");

        self.lowerer.emit_jump(header_bb);
        self.lowerer.set_insert_block(header_bb);
        let iter_loaded = self.lowerer.emit_load(slot);
        let iter_current = self.bind_temp(program, begin_var.bound_type.term, iter_loaded);
        let end_var = self.call_protocol(program, &iter_scope, "__iter_end__", &[iterable_var.clone()], loc)?;
        let valid_var = self.call_protocol(program, &iter_scope, "__iter_valid__", &[iter_current.clone(), end_var], loc)?;
        self.lowerer.emit_branch(valid_var.ir_value, body_bb, end_bb);

        self.lowerer.set_insert_block(body_bb);
        self.with_loop_scope(scope, header_bb, end_bb, |this, loop_scope| {
            let iter_loaded = this.lowerer.emit_load(slot);
            let iter_current = this.bind_temp(program, begin_var.bound_type.term, iter_loaded);
            let item_var = this.call_protocol(program, &iter_scope, "__iter_item__", &[iter_current.clone()], loc)?;
            let mut named = item_var;
            named.name = binding;
            let body_scope = ScopeRef::new_block(loop_scope);
            body_scope.put_bound_variable(binding, named, this.pool, loc)?;

            let returned = this.resolve_block_body(program, &body_scope, &body.statements)?;
            if !returned {
                let advanced = this.call_protocol(program, &iter_scope, "__iterate__", &[iter_current], loc)?;
                this.lowerer.emit_store(slot, advanced.ir_value);
                this.lowerer.emit_jump(header_bb);
            }
            Ok(returned)
        })?;

        self.lowerer.set_insert_block(end_bb);
        Ok(false)
    }

    /// Looks up and calls a program-wide protocol hook by name (`for`'s
    /// `__iter_*__` family), mirroring the lookup `combine_binop`/`load_index`
    /// use for operator overloads and container access.
    fn call_protocol(&mut self, program: &ScopeRef, scope: &ScopeRef, name: &str, args: &[BoundVar], loc: &Located) -> Result<BoundVar, Diagnostic> {
        let fn_name = tenet_ir::intern(name);
        let candidates = scope.lookup_global_callables(fn_name);
        let unchecked = scope.lookup_global_unchecked_vars(fn_name);
        self.resolve_overload(program, scope, fn_name, &candidates, &unchecked, args, loc)
    }

    // -- break / continue ---------------------------------------------------

    fn resolve_break(&mut self, scope: &ScopeRef, loc: &Located) -> Result<bool, Diagnostic> {
        let (Some(loop_frame), Some((_, break_target))) = (self.life.innermost_loop(), scope.loop_targets()) else {
            return Err(Diagnostic::error(ControlFlowErrorKind::BreakOutsideLoop, loc.clone()));
        };
        tenet_arc::release::release_vars(self.life, loop_frame, self.lowerer);
        self.lowerer.emit_jump(break_target);
        Ok(true)
    }

    fn resolve_continue(&mut self, scope: &ScopeRef, loc: &Located) -> Result<bool, Diagnostic> {
        let (Some(loop_frame), Some((continue_target, _))) = (self.life.innermost_loop(), scope.loop_targets()) else {
            return Err(Diagnostic::error(ControlFlowErrorKind::ContinueOutsideLoop, loc.clone()));
        };
        tenet_arc::release::release_vars(self.life, loop_frame, self.lowerer);
        self.lowerer.emit_jump(continue_target);
        Ok(true)
    }

    // -- match ----------------------------------------------------------------

    fn resolve_match_stmt(
        &mut self,
        program: &ScopeRef,
        scope: &ScopeRef,
        scrutinee_expr: &ast::Expr,
        arms: &[ast::MatchArm],
        else_block: Option<&ast::Block>,
        span: &Located,
    ) -> Result<bool, Diagnostic> {
        let scrutinee = self.resolve_expression(program, scope, scrutinee_expr)?;
        let function = self.current_function.expect("tenet internal error: 'match' resolved outside a function body");
        let end_bb = self.lowerer.new_block(function, "match.end");

        let mut all_returned = !arms.is_empty();
        let mut current_no_match = None;
        for arm in arms {
            let match_bb = self.lowerer.new_block(function, "match.arm");
            let no_match_bb = self.lowerer.new_block(function, "match.next");
            if let Some(prev_no_match) = current_no_match {
                self.lowerer.set_insert_block(prev_no_match);
            }
            let arm_scope = self.emit_pattern_test(program, scope, &scrutinee, &arm.pattern, match_bb, no_match_bb)?;
            self.lowerer.set_insert_block(match_bb);
            let returned = self.resolve_block(program, &arm_scope, &arm.body)?;
            if !returned {
                self.lowerer.emit_jump(end_bb);
            }
            all_returned &= returned;
            current_no_match = Some(no_match_bb);
        }

        if let Some(no_match_bb) = current_no_match {
            self.lowerer.set_insert_block(no_match_bb);
        }
        let fallthrough_returned = if let Some(block) = else_block {
            let else_scope = ScopeRef::new_block(scope);
            let returned = self.resolve_block_body(program, &else_scope, &block.statements)?;
            if !returned {
                self.lowerer.emit_jump(end_bb);
            }
            returned
        } else {
            self.lowerer.emit_assert_failure_call(&format!(
                "{}: non-exhaustive match on '{}'",
                describe_span(span),
                scrutinee.signature(self.pool)
            ));
            self.lowerer.emit_jump(end_bb);
            false
        };

        self.lowerer.set_insert_block(end_bb);
        Ok(all_returned && fallthrough_returned)
    }

    /// Emits the test for one `match` arm's pattern against `scrutinee`, from
    /// whatever block is currently open, branching to `match_bb`/`no_match_bb`.
    /// Moves the insert point into `match_bb` before performing any field
    /// bindings, so a data constructor's field GEPs land in the matched arm's
    /// block rather than the test block.
    fn emit_pattern_test(
        &mut self,
        program: &ScopeRef,
        scope: &ScopeRef,
        scrutinee: &BoundVar,
        pattern: &Pattern,
        match_bb: tenet_types::bound::IrBlockHandle,
        no_match_bb: tenet_types::bound::IrBlockHandle,
    ) -> Result<ScopeRef, Diagnostic> {
        match pattern {
            Pattern::Binding(name, loc) => {
                self.lowerer.emit_jump(match_bb);
                self.lowerer.set_insert_block(match_bb);
                let arm_scope = ScopeRef::new_block(scope);
                if let Some(n) = name {
                    let mut var = self.bind_temp(program, scrutinee.bound_type.term, scrutinee.ir_value);
                    var.name = *n;
                    arm_scope.put_bound_variable(*n, var, self.pool, loc)?;
                }
                Ok(arm_scope)
            }
            Pattern::Literal(lit, loc) => {
                let lit_var = self.resolve_literal(program, scope, lit, loc)?;
                let eq_var = self.combine_binop(program, scope, BinOp::Eq, scrutinee.clone(), lit_var, loc)?;
                self.lowerer.emit_branch(eq_var.ir_value, match_bb, no_match_bb);
                self.lowerer.set_insert_block(match_bb);
                Ok(ScopeRef::new_block(scope))
            }
            Pattern::Ctor(name, bindings, loc) => self.emit_ctor_pattern(program, scope, scrutinee, *name, bindings, loc, match_bb, no_match_bb),
        }
    }

    fn emit_ctor_pattern(
        &mut self,
        program: &ScopeRef,
        scope: &ScopeRef,
        scrutinee: &BoundVar,
        name: Atom,
        bindings: &[Atom],
        loc: &Located,
        match_bb: tenet_types::bound::IrBlockHandle,
        no_match_bb: tenet_types::bound::IrBlockHandle,
    ) -> Result<ScopeRef, Diagnostic> {
        if let Some(tag) = scope.get_bound_variable(loc, name, true)? {
            let eq = self.lowerer.emit_ptr_binop(BinOp::Eq, scrutinee.ir_value, tag.ir_value);
            self.lowerer.emit_branch(eq, match_bb, no_match_bb);
            self.lowerer.set_insert_block(match_bb);
            return Ok(ScopeRef::new_block(scope));
        }

        let ctor_candidates = scope.lookup_global_unchecked_vars(name);
        let ctor = ctor_candidates
            .iter()
            .find(|v| matches!(v.node, crate::unchecked::UncheckedVarNode::Ctor { .. }))
            .ok_or_else(|| Diagnostic::error(tenet_diagnostic::ScopeErrorKind::MissingSymbol { name: name.text().to_owned() }, loc.clone()))?;
        let ctor_sig = ctor
            .ctor_signature
            .ok_or_else(|| Diagnostic::error(tenet_diagnostic::ScopeErrorKind::MissingSymbol { name: name.text().to_owned() }, loc.clone()))?;
        let TypeData::Function { ret: member_ty, .. } = self.pool.data(ctor_sig).clone() else {
            unreachable!("tenet internal error: ctor_signature is always a Function")
        };

        let signature = tenet_types::signature(self.pool, member_ty);
        let target_id = tenet_ir::intern(&signature).as_u32();
        let target_const = self.lowerer.emit_int_const(i128::from(target_id), 32, false);
        let actual = self.lowerer.emit_typeid_call(scrutinee.ir_value);
        let eq = self.lowerer.emit_int_binop(BinOp::Eq, actual, target_const, 32, false);
        self.lowerer.emit_branch(eq, match_bb, no_match_bb);
        self.lowerer.set_insert_block(match_bb);

        let arm_scope = ScopeRef::new_block(scope);
        let Some((struct_ty, managed)) = peel_to_struct(self.pool, member_ty) else {
            return Ok(arm_scope);
        };
        let TypeData::Struct { fields, .. } = self.pool.data(struct_ty).clone() else {
            unreachable!("tenet internal error: peel_to_struct returned a non-struct")
        };
        let ptr_ty = member_ty;
        let cast = self.lowerer.emit_ptr_cast(scrutinee.ir_value, upsert_bound_type(program, self.pool, self.lowerer, ptr_ty).ir_type);
        for (i, binding_name) in bindings.iter().enumerate() {
            if binding_name.text() == "_" {
                continue;
            }
            let Some(field) = fields.get(i) else { continue };
            let gep = self.lowerer.emit_gep(cast, u32::try_from(i).expect("tenet internal error: field index overflow"), managed);
            let loaded = self.lowerer.emit_load(gep);
            let mut var = self.bind_temp(program, field.ty, loaded);
            var.name = *binding_name;
            arm_scope.put_bound_variable(*binding_name, var, self.pool, loc)?;
        }
        Ok(arm_scope)
    }

    // -- assert -----------------------------------------------------------------

    fn resolve_assert(&mut self, program: &ScopeRef, scope: &ScopeRef, expr: &ast::Expr, loc: &Located) -> Result<bool, Diagnostic> {
        let cond_result = self.resolve_condition(program, scope, expr)?;
        let function = self
            .current_function
            .expect("tenet internal error: 'assert' resolved outside a function body");
        let fail_bb = self.lowerer.new_block(function, "assert.fail");
        let ok_bb = self.lowerer.new_block(function, "assert.ok");
        self.lowerer.emit_branch(cond_result.value.ir_value, ok_bb, fail_bb);

        self.lowerer.set_insert_block(fail_bb);
        let message = format!("{}: assertion {} failed", describe_span(loc), describe_expr(expr));
        self.lowerer.emit_assert_failure_call(&message);
        self.lowerer.emit_jump(ok_bb);

        self.lowerer.set_insert_block(ok_bb);
        Ok(false)
    }
}

/// A best-effort, non-exhaustive rendering of an expression for assertion
/// failure messages — not meant to round-trip, only to be readable.
fn describe_expr(expr: &ast::Expr) -> String {
    match expr {
        ast::Expr::Reference(name, _) => name.text().to_owned(),
        ast::Expr::Literal(Literal::Bool(b), _) => b.to_string(),
        ast::Expr::Literal(Literal::Int { value, .. }, _) => value.to_string(),
        ast::Expr::Binary(op, lhs, rhs, _) => format!("{} {} {}", describe_expr(lhs), op.symbol(), describe_expr(rhs)),
        ast::Expr::Dot(base, field, _) => format!("{}.{}", describe_expr(base), field.text()),
        ast::Expr::Call(callee, _, _) => format!("{}(...)", describe_expr(callee)),
        _ => "<expr>".to_owned(),
    }
}

fn describe_span(loc: &Located) -> String {
    format!("{loc}")
}
