//! Top-level driving of a whole program's check (spec.md §4.6/§4.7): binding
//! a generic callee's body (shared with [`super::Checker::instantiate_and_check`]),
//! eagerly checking every non-generic function/constructor, and building the
//! two program-wide synthetic functions module-level `var`s need —
//! `__init_module_vars` and `__visit_module_vars` (SPEC_FULL §4 supplement).

use tenet_diagnostic::{ControlFlowErrorKind, Diagnostic, TypeErrorKind};
use tenet_ir::ast;
use tenet_ir::{Atom, Located};
use tenet_types::bound::IrFunctionHandle;
use tenet_types::{term, BoundVar, TypeData};

use crate::lower::{upsert_bound_type, Lowerer};
use crate::scope::ScopeRef;
use crate::unchecked::{UncheckedVar, UncheckedVarNode};

use super::Checker;

impl<'a, L: Lowerer> Checker<'a, L> {
    /// Checks every module in a program end to end: type registration is
    /// assumed to have already run (`register_all_types`), so this only
    /// walks functions/constructors and module-level `var`s.
    pub fn check_program(&mut self, program: &ScopeRef, modules: &[ast::Module]) -> Result<(), Diagnostic> {
        self.check_all_functions(program)?;
        self.check_all_module_vars(program, modules)?;
        if let Some(first) = modules.first() {
            let host = program
                .lookup_module(first.name)
                .expect("tenet internal error: module scope missing for a module present in the AST");
            self.emit_visit_module_vars(program, &host, &first.span)?;
        }
        Ok(())
    }

    // -- functions / constructors --------------------------------------------

    /// Checks every unchecked function, link, and data constructor that
    /// isn't generic, in declaration order. Generic declarations are left
    /// unchecked here — they're only ever materialized on demand, at a call
    /// site, through [`super::Checker::instantiate_and_check`] (spec.md §4.8).
    pub fn check_all_functions(&mut self, program: &ScopeRef) -> Result<(), Diagnostic> {
        let candidates = program.with_program_data(|p| p.unchecked_vars.clone());
        for uv in &candidates {
            if program.has_checked(uv.fqn) {
                continue;
            }
            let is_generic = match &uv.node {
                UncheckedVarNode::Function(f) => !f.generics.is_empty(),
                UncheckedVarNode::Ctor { .. } => uv.is_generic(self.pool),
                UncheckedVarNode::Link(_) => false,
            };
            if is_generic {
                continue;
            }
            program.mark_checked(uv.fqn);
            let bound_var = self.check_unchecked_var_eagerly(program, uv)?;
            let (short_name, loc) = match &uv.node {
                UncheckedVarNode::Function(f) => (f.name, f.span.clone()),
                UncheckedVarNode::Link(l) => (l.name, l.span.clone()),
                UncheckedVarNode::Ctor { variant, .. } => (variant.name, variant.span.clone()),
            };
            uv.owning_module.put_bound_variable(short_name, bound_var, self.pool, &loc)?;
        }
        Ok(())
    }

    fn check_unchecked_var_eagerly(&mut self, program: &ScopeRef, uv: &UncheckedVar) -> Result<BoundVar, Diagnostic> {
        let module_scope = uv.owning_module.clone();
        match &uv.node {
            UncheckedVarNode::Function(f) => {
                let sig = self.function_sig_type(&module_scope, &f.decl);
                self.check_function_body(program, &module_scope, f, sig)
            }
            UncheckedVarNode::Link(l) => {
                let sig = self.function_sig_type(&module_scope, &l.decl);
                self.bind_link_function(program, &module_scope, l, sig)
            }
            UncheckedVarNode::Ctor { variant, owner_type } => {
                let sig = uv
                    .ctor_signature
                    .expect("tenet internal error: a non-generic constructor always has a ground ctor_signature");
                self.bind_ctor_function(program, &module_scope, variant, *owner_type, sig)
            }
        }
    }

    /// Checks one function body, emitting its IR under a fresh `Function`
    /// scope (spec.md §4.7). Returns the resulting `BoundVar` unregistered —
    /// both call sites (the eager pass here, and generic instantiation in
    /// `checker/mod.rs`) register it themselves once they know the right key
    /// to register it under (a bare name here, a monomorphic key there).
    pub fn check_function_body(&mut self, program: &ScopeRef, def_scope: &ScopeRef, func: &ast::FunctionDecl, monotype: tenet_types::Idx) -> Result<BoundVar, Diagnostic> {
        let TypeData::Function { args, ret, .. } = self.pool.data(monotype).clone() else {
            unreachable!("tenet internal error: check_function_body given a non-Function monotype")
        };
        let module_scope = def_scope.module_scope().expect("tenet internal error: function checked outside a module scope");
        let module_name = module_scope.module_name().expect("tenet internal error: function's module scope has no name");
        let ir_module = module_scope.ir_module().expect("tenet internal error: function's module scope has no IR module");

        let qualified_name = if func.generics.is_empty() {
            format!("{}.{}", module_name.text(), func.name.text())
        } else {
            format!("{}.{}${}", module_name.text(), func.name.text(), tenet_types::signature(self.pool, monotype))
        };

        let saved_block = self.lowerer.current_block();
        let bound_sig = upsert_bound_type(program, self.pool, self.lowerer, monotype);
        let ir_function = self.lowerer.begin_function(ir_module, &qualified_name, bound_sig.ir_type, &self.gc_strategy.clone());
        let entry_bb = self.lowerer.new_block(ir_function, "entry");
        self.lowerer.set_insert_block(entry_bb);

        let TypeData::Args { fields: arg_fields } = self.pool.data(args).clone() else {
            unreachable!("tenet internal error: Function.args is always Args")
        };

        let previous_function = self.current_function.replace(ir_function);
        let result = self.with_function_scope(def_scope, Some(ret), |this, fn_scope| {
            for (i, field) in arg_fields.iter().enumerate() {
                let param_value = this.lowerer.function_param(ir_function, u32::try_from(i).expect("tenet internal error: parameter count overflow"));
                this.bind_temp(program, field.ty, param_value);

                let bound = upsert_bound_type(program, this.pool, this.lowerer, field.ty);
                let slot = this.lowerer.emit_alloca(bound.ir_type);
                this.lowerer.emit_store(slot, param_value);

                let ref_ty = this.pool.insert(TypeData::Ref(field.ty), func.span.clone());
                let ref_bound = upsert_bound_type(program, this.pool, this.lowerer, ref_ty);
                let id = this.fresh_var_id();
                let var = BoundVar { name: field.name, bound_type: ref_bound, ir_value: slot, id, is_global: false };
                fn_scope.put_bound_variable(field.name, var, this.pool, &func.span)?;
            }
            this.resolve_block_body(program, fn_scope, &func.block.statements)
        });
        self.current_function = previous_function;

        let fell_through = result?;
        if fell_through {
            if term::is_void(self.pool, ret) {
                self.lowerer.emit_return(None);
            } else {
                self.lowerer.set_insert_block(saved_block);
                return Err(Diagnostic::error(
                    ControlFlowErrorKind::NotAllPathsReturn { name: func.name.text().to_owned() },
                    func.span.clone(),
                ));
            }
        }
        self.lowerer.set_insert_block(saved_block);

        let id = self.fresh_var_id();
        Ok(BoundVar { name: func.name, bound_type: bound_sig, ir_value: ir_function.as_value(), id, is_global: true })
    }

    /// Binds a `link` declaration to its extern target (spec.md §4.6): no
    /// body to check, just a declared signature handed to the backend.
    pub fn bind_link_function(&mut self, program: &ScopeRef, def_scope: &ScopeRef, link: &ast::LinkDecl, monotype: tenet_types::Idx) -> Result<BoundVar, Diagnostic> {
        let module_scope = def_scope.module_scope().expect("tenet internal error: link checked outside a module scope");
        let ir_module = module_scope.ir_module().expect("tenet internal error: link's module scope has no IR module");

        let bound_sig = upsert_bound_type(program, self.pool, self.lowerer, monotype);
        let ir_function = self.lowerer.declare_extern_function(ir_module, link.extern_name.text(), bound_sig.ir_type);

        let id = self.fresh_var_id();
        Ok(BoundVar { name: link.name, bound_type: bound_sig, ir_value: ir_function.as_value(), id, is_global: true })
    }

    /// Builds the synthesized constructor body for one `polymorph` variant
    /// with fields (spec.md §4.9): allocate the managed struct, store each
    /// parameter into its field, return the pointer. Also backfills the
    /// constructor's real `type_info` over the `PENDING_TYPE_INFO` placeholder
    /// `register_polymorph` left behind.
    pub fn bind_ctor_function(
        &mut self,
        program: &ScopeRef,
        def_scope: &ScopeRef,
        variant: &ast::PolymorphVariant,
        owner_type: Atom,
        monotype: tenet_types::Idx,
    ) -> Result<BoundVar, Diagnostic> {
        let TypeData::Function { args, ret, .. } = self.pool.data(monotype).clone() else {
            unreachable!("tenet internal error: bind_ctor_function given a non-Function monotype")
        };
        let module_scope = def_scope.module_scope().expect("tenet internal error: constructor checked outside a module scope");
        let module_name = module_scope.module_name().expect("tenet internal error: constructor's module scope has no name");
        let ir_module = module_scope.ir_module().expect("tenet internal error: constructor's module scope has no IR module");

        let member_bound = upsert_bound_type(program, self.pool, self.lowerer, ret);
        let member_signature = tenet_types::signature(self.pool, ret);
        let type_info = self.lowerer.materialize_type_info(&member_signature, 0, None, None);

        let variant_fqn = tenet_ir::intern(&format!("{}.{}", module_name.text(), variant.name.text()));
        program.finalize_ctor(variant_fqn, monotype, type_info);

        let TypeData::Args { fields } = self.pool.data(args).clone() else {
            unreachable!("tenet internal error: Function.args is always Args")
        };

        let saved_block = self.lowerer.current_block();
        let sig_bound = upsert_bound_type(program, self.pool, self.lowerer, monotype);
        let fn_name = format!("{}.{}.__ctor_{}", module_name.text(), owner_type.text(), variant.name.text());
        let ir_function = self.lowerer.begin_function(ir_module, &fn_name, sig_bound.ir_type, &self.gc_strategy.clone());
        let entry_bb = self.lowerer.new_block(ir_function, "entry");
        self.lowerer.set_insert_block(entry_bb);

        let obj = self.lowerer.emit_managed_alloc(member_bound.ir_type, type_info);
        for (i, _field) in fields.iter().enumerate() {
            let index = u32::try_from(i).expect("tenet internal error: field count overflow");
            let param = self.lowerer.function_param(ir_function, index);
            let field_ptr = self.lowerer.emit_gep(obj, index, true);
            self.lowerer.emit_store(field_ptr, param);
        }
        self.lowerer.emit_return(Some(obj));
        self.lowerer.set_insert_block(saved_block);

        let id = self.fresh_var_id();
        Ok(BoundVar { name: variant.name, bound_type: sig_bound, ir_value: ir_function.as_value(), id, is_global: true })
    }

    // -- module-level vars ----------------------------------------------------

    /// Checks every module's top-level `var` declarations into the shared
    /// `__init_module_vars` function, `runtime`'s first so every other
    /// module's initializers can depend on it being already set up.
    pub fn check_all_module_vars(&mut self, program: &ScopeRef, modules: &[ast::Module]) -> Result<(), Diagnostic> {
        if modules.is_empty() {
            return Ok(());
        }
        let mut ordered: Vec<&ast::Module> = Vec::with_capacity(modules.len());
        if let Some(runtime) = modules.iter().find(|m| m.name.text() == "runtime") {
            ordered.push(runtime);
        }
        ordered.extend(modules.iter().filter(|m| m.name.text() != "runtime"));

        let host = &ordered[0];
        let host_scope = program
            .lookup_module(host.name)
            .expect("tenet internal error: module scope missing for a module present in the AST");
        let init_fn = self.ensure_init_module_vars_fn(program, &host_scope, &host.span);

        let previous_function = self.current_function.replace(init_fn);
        for module in &ordered {
            let module_scope = program
                .lookup_module(module.name)
                .expect("tenet internal error: module scope missing for a module present in the AST");
            for decl in &module.vars {
                self.check_module_var(program, &module_scope, decl)?;
            }
        }
        self.lowerer.emit_return(None);
        self.current_function = previous_function;
        Ok(())
    }

    fn ensure_init_module_vars_fn(&mut self, program: &ScopeRef, host_module: &ScopeRef, loc: &Located) -> IrFunctionHandle {
        if let Some(existing) = program.init_module_vars_fn() {
            return existing;
        }
        let ir_module = host_module.ir_module().expect("tenet internal error: __init_module_vars checked outside a module scope");
        let sig = self.void_to_void_signature(loc);
        let bound_sig = upsert_bound_type(program, self.pool, self.lowerer, sig);
        let f = self.lowerer.begin_function(ir_module, "__init_module_vars", bound_sig.ir_type, &self.gc_strategy.clone());
        let entry = self.lowerer.new_block(f, "entry");
        self.lowerer.set_insert_block(entry);
        program.set_init_module_vars_fn(f);
        f
    }

    fn void_to_void_signature(&mut self, loc: &Located) -> tenet_types::Idx {
        let void_ty = self.pool.intern_id(tenet_ir::intern("void"), loc.clone());
        let args_ty = self.pool.insert(TypeData::Args { fields: Vec::new() }, loc.clone());
        self.pool.insert(TypeData::Function { ctx: void_ty, args: args_ty, ret: void_ty }, loc.clone())
    }

    /// Checks one module-level `var`, mirroring `stmt::resolve_var_decl`'s
    /// ownership-transfer pattern: the initializer's own result is adopted by
    /// the new global slot rather than released with its statement frame.
    /// Unlike a local `var`, a module var always lives in static storage
    /// (`Lowerer::declare_global`) regardless of mutability — it's a GC root
    /// `__visit_module_vars` walks, not a value released at scope exit.
    fn check_module_var(&mut self, program: &ScopeRef, module_scope: &ScopeRef, decl: &ast::VarDecl) -> Result<(), Diagnostic> {
        let frame = self.life.push(tenet_arc::life::FrameKind::Statement);
        let initializer = match &decl.initializer {
            Some(expr) => Some(self.resolve_expression(program, module_scope, expr)?),
            None => None,
        };

        let declared_ty = decl.ty.as_ref().map(|t| self.resolve_type_expr(module_scope, t));
        let value_term = match (declared_ty, &initializer) {
            (Some(declared), Some(init)) => {
                let env = module_scope.flattened_type_env();
                self.unify_or_error(&env, init.bound_type.term, declared, &decl.span)?;
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(init)) => init.bound_type.term,
            (None, None) => {
                self.life.pop();
                return Err(Diagnostic::error(
                    TypeErrorKind::MissingInitializer { name: decl.name.text().to_owned(), signature: "<unknown>".to_owned() },
                    decl.span.clone(),
                ));
            }
        };

        let ir_value = match &initializer {
            Some(init) => init.ir_value,
            None => self.default_global_initial_value(program, module_scope, value_term, decl)?,
        };

        if let Some(init) = &initializer {
            self.release_frame_except(frame, init.id);
        } else {
            tenet_arc::release::release_vars(self.life, frame, self.lowerer);
        }
        self.life.pop();

        let kept = self.bind_temp(program, value_term, ir_value);

        let bound = upsert_bound_type(program, self.pool, self.lowerer, value_term);
        let ir_module = module_scope.ir_module().expect("tenet internal error: module var checked outside a module scope");
        let module_name = module_scope.module_name().expect("tenet internal error: module var's scope has no name");
        let global_name = format!("{}.{}", module_name.text(), decl.name.text());
        let slot = self.lowerer.declare_global(ir_module, &global_name, bound.ir_type);
        self.lowerer.emit_store(slot, kept.ir_value);

        let ref_ty = self.pool.insert(TypeData::Ref(value_term), decl.span.clone());
        let ref_bound = upsert_bound_type(program, self.pool, self.lowerer, ref_ty);
        let id = self.fresh_var_id();
        let var = BoundVar { name: decl.name, bound_type: ref_bound, ir_value: slot, id, is_global: true };
        module_scope.put_bound_variable(decl.name, var, self.pool, &decl.span)?;
        Ok(())
    }

    /// A module-level `var`'s default value when it has no initializer —
    /// identical policy to `stmt::resolve_var_decl`'s local-variable default,
    /// duplicated here since module vars are checked at a different point in
    /// the pipeline (before any function body, under no `Function` scope).
    fn default_global_initial_value(&mut self, program: &ScopeRef, scope: &ScopeRef, ty: tenet_types::Idx, decl: &ast::VarDecl) -> Result<tenet_types::bound::IrValueHandle, Diagnostic> {
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
                return Ok(self.lowerer.emit_call(candidate.ir_value, &[]));
            }
        }

        if term::is_managed_ptr(self.pool, ty) {
            return Err(Diagnostic::error(
                TypeErrorKind::MissingInitializer { name: decl.name.text().to_owned(), signature: target_sig },
                decl.span.clone(),
            ));
        }

        let bound = upsert_bound_type(program, self.pool, self.lowerer, ty);
        Ok(self.lowerer.emit_null(bound.ir_type))
    }

    // -- GC root visitation -----------------------------------------------------

    /// Builds `__visit_module_vars`: calls a program-wide `__gc_mark__` hook
    /// (looked up the same way `default_global_initial_value` looks up
    /// `__init__`) for every managed-pointer module `var` across every
    /// module, so a collector can walk them as roots (spec.md §4.9's
    /// supplement — module vars are permanent, so they're marked rather than
    /// released).
    pub fn emit_visit_module_vars(&mut self, program: &ScopeRef, host_module: &ScopeRef, loc: &Located) -> Result<IrFunctionHandle, Diagnostic> {
        if let Some(existing) = program.visit_module_vars_fn() {
            return Ok(existing);
        }
        let ir_module = host_module.ir_module().expect("tenet internal error: __visit_module_vars checked outside a module scope");
        let sig = self.void_to_void_signature(loc);
        let bound_sig = upsert_bound_type(program, self.pool, self.lowerer, sig);
        let f = self.lowerer.begin_function(ir_module, "__visit_module_vars", bound_sig.ir_type, &self.gc_strategy.clone());
        let entry = self.lowerer.new_block(f, "entry");
        self.lowerer.set_insert_block(entry);

        let mark_name = tenet_ir::intern("__gc_mark__");
        let marks = program.lookup_global_callables(mark_name);
        if let Some(mark_fn) = marks.first().cloned() {
            for module_scope in program.all_module_scopes() {
                for var in module_scope.all_bound_vars() {
                    let inner = match self.pool.data(var.bound_type.term).clone() {
                        TypeData::Ref(inner) => inner,
                        _ => var.bound_type.term,
                    };
                    if !var.is_global || !term::is_managed_ptr(self.pool, inner) {
                        continue;
                    }
                    let loaded = self.lowerer.emit_load(var.ir_value);
                    self.lowerer.emit_call(mark_fn.ir_value, &[loaded]);
                }
            }
        }

        self.lowerer.emit_return(None);
        program.set_visit_module_vars_fn(f);
        Ok(f)
    }
}
