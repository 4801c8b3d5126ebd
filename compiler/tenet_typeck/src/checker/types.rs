//! Type-declaration materialization (spec.md §4.6/§4.9): registers every
//! `struct`/`polymorph`/`alias`/`link` type declaration's typename binding,
//! and — for a `polymorph`'s nullary tags — the global singleton value a
//! bare reference to that tag resolves to.
//!
//! Struct/alias/ctor signatures are registered whether or not they mention
//! generics; nothing here requires a ground type, since `resolve_type_expr`'s
//! `Applied` case (backed by `tenet_types::term::eval`'s one-step
//! β-reduction) only ever substitutes generics away at a *use* site.

use tenet_diagnostic::{Diagnostic, DiagnosticQueue};
use tenet_ir::ast::TypeDecl;
use tenet_ir::{Atom, Located};
use tenet_types::term::Field;
use tenet_types::{Idx, TypeData};

use tenet_types::bound::IrValueHandle;

use crate::lower::{upsert_bound_type, Lowerer};
use crate::scope::ScopeRef;
use crate::unchecked::UncheckedType;

use super::Checker;

/// Placeholder `type_info` for a data constructor whose signature is known
/// but whose owner struct hasn't been materialized yet — `bind_ctor_function`
/// overwrites it with the real value (via `ScopeRef::finalize_ctor`) the
/// first time the constructor is actually called (spec.md §4.8's lazy
/// checking applies to constructors exactly as it does to functions).
const PENDING_TYPE_INFO: IrValueHandle = IrValueHandle(u32::MAX);

impl<'a, L: Lowerer> Checker<'a, L> {
    /// Registers every type declaration collected by `scope_setup` into the
    /// program-wide typename environment (spec.md §4.6's first pass). Types
    /// are looked up by bare name rather than FQN — `ProgramScope`'s
    /// `TypeNameEnv` is the root of every module's, so one registration here
    /// is visible from every module.
    pub fn register_all_types(&mut self, program: &ScopeRef) -> DiagnosticQueue {
        let mut diagnostics = DiagnosticQueue::new();
        let unchecked_types: Vec<UncheckedType> = program.with_program_data(|p| p.unchecked_types.clone());
        for unchecked in &unchecked_types {
            if let Err(d) = self.register_type(program, unchecked) {
                diagnostics.push(d);
            }
        }
        diagnostics
    }

    fn register_type(&mut self, program: &ScopeRef, unchecked: &UncheckedType) -> Result<(), Diagnostic> {
        let module_scope = &unchecked.owning_module;
        match &unchecked.node {
            TypeDecl::Struct { name, generics, fields, span } => {
                let field_terms = self.resolve_fields(module_scope, fields);
                let struct_ty = self.pool.insert(TypeData::Struct { fields: field_terms, managed: true }, span.clone());
                let wrapped = wrap_generics(self.pool, generics, struct_ty, span);
                self.register_nominal(program, *name, wrapped, span)
            }
            TypeDecl::Alias { name, generics, expansion, span } => {
                let expanded = self.resolve_type_expr(module_scope, expansion);
                let wrapped = wrap_generics(self.pool, generics, expanded, span);
                program
                    .put_structural_typename(*name, wrapped)
                    .map_err(|()| redefinition(*name, span))
            }
            TypeDecl::Link { name, extern_name, span } => {
                let opaque = self.pool.intern_id(*extern_name, span.clone());
                self.register_nominal(program, *name, opaque, span)
            }
            TypeDecl::Polymorph { name, generics, variants, span } => self.register_polymorph(program, module_scope, *name, generics, variants, span),
        }
    }

    fn register_nominal(&mut self, program: &ScopeRef, name: Atom, expansion: Idx, span: &Located) -> Result<(), Diagnostic> {
        program.put_nominal_typename(name, expansion).map_err(|()| redefinition(name, span))
    }

    fn resolve_fields(&mut self, scope: &ScopeRef, fields: &[tenet_ir::ast::FieldDecl]) -> Vec<Field> {
        fields
            .iter()
            .map(|f| Field {
                name: f.name,
                ty: self.resolve_type_expr(scope, &f.ty),
            })
            .collect()
    }

    /// Builds the owner `Sum` type from each variant's member type, registers
    /// it nominally, and — for a nullary tag — materializes its singleton
    /// value eagerly (spec.md §4.9): a tag's representation is
    /// `Ptr(Managed(Id(fqn)))`, which never mentions the owner's generics, so
    /// it's always ground regardless of whether the `polymorph` itself is
    /// parameterized. A data constructor's signature is only backfilled here;
    /// its `type_info` is materialized lazily, the first time it's actually
    /// called, by `bind_ctor_function` (spec.md §4.8's lazy checking applies
    /// to constructors exactly as it does to ordinary functions).
    fn register_polymorph(
        &mut self,
        program: &ScopeRef,
        module_scope: &ScopeRef,
        name: Atom,
        generics: &[Atom],
        variants: &[tenet_ir::ast::PolymorphVariant],
        span: &Located,
    ) -> Result<(), Diagnostic> {
        let module_name = module_scope.module_name().expect("tenet internal error: type registered outside a module scope");
        let mut members = Vec::with_capacity(variants.len());

        for variant in variants {
            let variant_fqn = tenet_ir::intern(&format!("{}.{}", module_name.text(), variant.name.text()));
            if variant.fields.is_empty() {
                let tag_marker = self.pool.intern_id(variant_fqn, variant.span.clone());
                let managed = self.pool.insert(TypeData::Managed(tag_marker), variant.span.clone());
                let member_ty = self.pool.insert(TypeData::Ptr(managed), variant.span.clone());
                members.push(member_ty);
                self.materialize_tag(program, module_scope, variant.name, variant_fqn, member_ty, &variant.span);
            } else {
                let field_terms = self.resolve_fields(module_scope, &variant.fields);
                let struct_ty = self.pool.insert(TypeData::Struct { fields: field_terms, managed: true }, variant.span.clone());
                let managed = self.pool.insert(TypeData::Managed(struct_ty), variant.span.clone());
                let member_ty = self.pool.insert(TypeData::Ptr(managed), variant.span.clone());
                members.push(member_ty);

                let ctor_args: Vec<Field> = match self.pool.data(struct_ty).clone() {
                    TypeData::Struct { fields, .. } => fields,
                    _ => unreachable!("tenet internal error: just inserted a Struct"),
                };
                let args_ty = self.pool.insert(TypeData::Args { fields: ctor_args }, variant.span.clone());
                let ctx = self.pool.intern_id(tenet_ir::intern("void"), variant.span.clone());
                let ctor_sig = self.pool.insert(TypeData::Function { ctx, args: args_ty, ret: member_ty }, variant.span.clone());
                program.finalize_ctor(variant_fqn, ctor_sig, PENDING_TYPE_INFO);
            }
        }

        let owner_ty = tenet_types::term::mk_sum(self.pool, members, span.clone());
        let wrapped = wrap_generics(self.pool, generics, owner_ty, span);
        self.register_nominal(program, name, wrapped, span)
    }

    /// Publishes `type_info_t` + a tag singleton for one nullary `polymorph`
    /// variant and registers the resulting value as a module-level bound
    /// variable under the variant's short name, so a bare reference to it
    /// resolves like any other global (spec.md §4.9).
    fn materialize_tag(&mut self, program: &ScopeRef, module_scope: &ScopeRef, short_name: Atom, variant_fqn: Atom, member_ty: Idx, span: &Located) {
        let bound = upsert_bound_type(program, self.pool, self.lowerer, member_ty);
        let signature = tenet_types::signature(self.pool, member_ty);
        let type_info = self.lowerer.materialize_type_info(&signature, 0, None, None);
        let tag_value = self.lowerer.materialize_tag_singleton(&format!("__tag_{}", variant_fqn.text()), type_info);

        let id = self.fresh_var_id();
        let var = tenet_types::BoundVar {
            name: short_name,
            bound_type: bound,
            ir_value: tag_value,
            id,
            is_global: true,
        };
        let _ = module_scope.put_bound_variable(short_name, var, self.pool, span);
    }
}

fn wrap_generics(pool: &mut tenet_types::Pool, generics: &[Atom], body: Idx, span: &Located) -> Idx {
    generics.iter().rev().fold(body, |acc, &g| pool.insert(TypeData::Lambda(g, acc), span.clone()))
}

fn redefinition(name: Atom, span: &Located) -> Diagnostic {
    Diagnostic::error(
        tenet_diagnostic::ScopeErrorKind::Redefinition { name: name.text().to_owned() },
        span.clone(),
    )
}
